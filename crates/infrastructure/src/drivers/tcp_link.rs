use std::time::Duration;

use async_trait::async_trait;
use domain::driver::{ConnectionState, ControllerLink};
use domain::{DiscoveredModule, DomainError, Module, Output};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use super::protocol::{self, Command, Frame};

/// TCP link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpLinkConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_port() -> u16 {
    10001
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_io_timeout_ms() -> u64 {
    3000
}

impl TcpLinkConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Controller link over the controller's TCP port
pub struct TcpControllerLink {
    config: TcpLinkConfig,
    address: String,
    stream: Option<TcpStream>,
    state: ConnectionState,
}

impl TcpControllerLink {
    pub fn new(config: TcpLinkConfig) -> Self {
        Self {
            address: config.address(),
            config,
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Send one request and wait for its reply, bounded by the I/O timeout.
    ///
    /// Any failure drops the stream: after a partial exchange the framing can
    /// no longer be trusted.
    async fn exchange(&mut self, request: &Frame) -> Result<Frame, DomainError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DomainError::connection("not connected"))?;

        tracing::debug!(
            address = %self.address,
            command = ?request.header.command,
            module = request.header.address,
            "Sending request"
        );

        let timeout = Duration::from_millis(self.config.io_timeout_ms);
        let result = tokio::time::timeout(timeout, async move {
            protocol::write_frame(stream, request).await?;
            protocol::read_frame(stream).await
        })
        .await
        .unwrap_or(Err(DomainError::Timeout(timeout)));

        if let Err(e) = &result {
            tracing::warn!(address = %self.address, error = %e, "Exchange failed, dropping session");
            self.stream = None;
            self.state = self.state.to_failed();
        }
        result
    }
}

#[async_trait]
impl ControllerLink for TcpControllerLink {
    async fn connect(&mut self) -> Result<(), DomainError> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.state = self.state.to_connecting()?;

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let error = match tokio::time::timeout(timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(error = %e, "Unable to set TCP_NODELAY");
                }
                self.state = self.state.to_connected()?;
                self.stream = Some(stream);
                tracing::debug!(address = %self.address, "Controller session opened");
                return Ok(());
            }
            Ok(Err(e)) => format!("Failed to connect to {}: {}", self.address, e),
            Err(_) => format!("Connection to {} timed out after {:?}", self.address, timeout),
        };

        self.state = self.state.to_failed();
        tracing::warn!(address = %self.address, error = %error, "Failed to connect to controller");
        Err(DomainError::connection(error))
    }

    fn disconnect(&mut self) {
        // Dropping the stream closes the socket
        if self.stream.take().is_some() {
            tracing::debug!(address = %self.address, "Controller session closed");
        }
        self.state = self.state.to_disconnected();
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn endpoint(&self) -> &str {
        &self.address
    }

    async fn list_modules(&mut self) -> Result<Vec<DiscoveredModule>, DomainError> {
        let reply = self.exchange(&protocol::list_modules_request()).await?;
        protocol::decode_modules(&reply)
    }

    async fn list_outputs(
        &mut self,
        module: &DiscoveredModule,
    ) -> Result<Vec<Output>, DomainError> {
        let reply = self
            .exchange(&protocol::list_outputs_request(module))
            .await?;
        protocol::decode_outputs(module.address, &reply)
    }

    async fn read_levels(&mut self, module: &Module) -> Result<Vec<u8>, DomainError> {
        let reply = self
            .exchange(&protocol::status_request(
                module.module_type,
                module.address,
            ))
            .await?;
        if reply.header.address != module.address {
            return Err(DomainError::protocol(format!(
                "status of module {} requested, module {} answered",
                module.address, reply.header.address
            )));
        }
        protocol::decode_levels(&reply, module.output_count)
    }

    async fn write_level(
        &mut self,
        module: &Module,
        index: u8,
        level: u8,
    ) -> Result<(), DomainError> {
        let request = protocol::action_request(module.module_type, module.address, index, level);
        let reply = self.exchange(&request).await?;
        protocol::expect_reply(&reply, Command::Action, None)
    }
}

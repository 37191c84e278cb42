mod mock_controller;
pub mod protocol;
mod tcp_link;

pub use mock_controller::{Fault, LinkOp, MockController};
pub use tcp_link::{TcpControllerLink, TcpLinkConfig};

use domain::DomainError;
use domain::driver::ControllerLink;
use serde::{Deserialize, Serialize};

/// Transport used to reach the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Real controller over TCP
    #[default]
    Tcp,
    /// In-memory demo installation
    Simulator,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Simulator => "simulator",
        }
    }
}

/// Factory for creating controller links
pub struct DriverFactory;

impl DriverFactory {
    /// Create a controller link from its kind and TCP settings
    pub fn create_link(
        kind: LinkKind,
        config: TcpLinkConfig,
    ) -> Result<Box<dyn ControllerLink>, DomainError> {
        match kind {
            LinkKind::Tcp => {
                if config.host.trim().is_empty() {
                    return Err(DomainError::InvalidConfiguration(
                        "controller host is required".to_string(),
                    ));
                }
                Ok(Box::new(TcpControllerLink::new(config)) as Box<dyn ControllerLink>)
            }
            LinkKind::Simulator => {
                Ok(Box::new(MockController::demo()) as Box<dyn ControllerLink>)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_tcp_link() {
        let link = DriverFactory::create_link(LinkKind::Tcp, TcpLinkConfig::new("10.0.0.5", 10001))
            .unwrap();
        assert_eq!(link.endpoint(), "10.0.0.5:10001");
        assert!(!link.is_connected());
    }

    #[test]
    fn test_create_simulator_link() {
        let link =
            DriverFactory::create_link(LinkKind::Simulator, TcpLinkConfig::new("", 0)).unwrap();
        assert_eq!(link.endpoint(), "simulator:10001");
    }

    #[test]
    fn test_tcp_requires_host() {
        let result = DriverFactory::create_link(LinkKind::Tcp, TcpLinkConfig::new("  ", 10001));
        assert!(matches!(result, Err(DomainError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_link_kind_serde() {
        let kind: LinkKind = serde_json::from_value(json!("simulator")).unwrap();
        assert_eq!(kind, LinkKind::Simulator);
        assert_eq!(LinkKind::default(), LinkKind::Tcp);
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use infrastructure::AgentConfig;
use infrastructure::drivers::LinkKind;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Dobiss lighting controller agent", long_about = None)]
pub struct Cli {
    /// Path to config directory (defaults to the agent's own `config`)
    #[arg(long)]
    pub config_dir: Option<String>,

    /// Override controller host
    #[arg(long)]
    pub host: Option<String>,

    /// Override controller port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the polling interval, in seconds
    #[arg(long)]
    pub scan_interval: Option<u64>,

    /// Talk to the built-in simulator instead of a controller
    #[arg(long)]
    pub simulator: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll the controller on the configured interval (default)
    Run,
    /// Open and release one session
    Check,
    /// Import the installation and print it as JSON
    Import,
    /// Import, poll once and print the levels as JSON
    Status,
    /// Set one output to a level (0-100)
    Set { module: u8, index: u8, level: u8 },
    /// Switch one output fully on
    On { module: u8, index: u8 },
    /// Switch one output off
    Off { module: u8, index: u8 },
    /// Drive a cover by its id (e.g. 1.U4.D5)
    Cover { id: String, action: CoverAction },
    /// Poll continuously and print every snapshot
    Watch {
        #[arg(long, default_value_t = 1)]
        interval_secs: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverAction {
    Open,
    Close,
    Stop,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// CLI values win over every file and environment layer
    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(host) = &self.host {
            config.controller.host = host.clone();
        }
        if let Some(port) = self.port {
            config.controller.port = port;
        }
        if let Some(secs) = self.scan_interval {
            config.controller.scan_interval_secs = secs;
        }
        if self.simulator {
            config.controller.driver = LinkKind::Simulator;
        }
    }
}

pub mod cli;
pub mod config_manager;
pub mod report;

pub use cli::{Cli, Command, CoverAction};
pub use config_manager::ConfigManager;

mod config_cmd;
mod emoji_cmd;
mod resolve_cmd;
mod update_cmd;

use clap::ValueEnum;

pub use config_cmd::ConfigCommand;
pub use emoji_cmd::{ExportCommand, FingerprintCommand, ImportCommand, QueryCommand, SetCommand};
pub use resolve_cmd::ResolveCommand;
pub use update_cmd::UpdateCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

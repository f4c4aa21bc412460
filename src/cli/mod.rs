//! Command-line interface definitions and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction};
pub use commands::{handle_config_action, init_config_file, list_cameras, run, LiveCommand};

mod args;
mod commands;
mod handlers;
pub mod types;

pub use args::{Cli, Commands, TemplatesCommand};
pub use commands::run;

pub mod commands;
pub mod display;
pub mod stacks;

pub use commands::CliArgs;

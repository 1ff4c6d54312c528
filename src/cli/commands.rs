// CLI command definitions

use super::stacks::{GraphCommand, ListCommand, SynthCommand, ValidateCommand};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "infra-stacks",
    version,
    about = "Declares the application and regional database stacks",
    long_about = "Declares the primary application stack and the regional database stack, \
                  validates them and synthesizes their deployment templates"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Validate and write the cloud assembly (templates + manifest)
    Synth(SynthCommand),

    /// List declared stacks
    List(ListCommand),

    /// Run structural checks and print findings
    Validate(ValidateCommand),

    /// Show the resolved creation order of one stack
    Graph(GraphCommand),
}

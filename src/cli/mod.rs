//! Command-line interface for RADAR.

use clap::{Parser, Subcommand};

/// RADAR - meta-search backend
/// Aggregates Google, Bing and NewsAPI results behind one API
#[derive(Parser)]
#[command(name = "radar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API and the automation scheduler (default)
    #[command(alias = "daemon", alias = "-d")]
    Serve,

    /// Run every due automation once and exit
    #[command(alias = "-c", alias = "--check")]
    Check,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

impl Cli {
    /// The subcommand to run; `serve` when none is given.
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["radar"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["radar", "check"]).unwrap();
        assert_eq!(cli.command(), Commands::Check);

        let cli = Cli::try_parse_from(["radar", "init"]).unwrap();
        assert_eq!(cli.command(), Commands::Init);

        let cli = Cli::try_parse_from(["radar", "daemon"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["radar", "frobnicate"]).is_err());
    }
}

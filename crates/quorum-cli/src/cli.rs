//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quorum CLI - Extract form fields with several vision models and vote.
#[derive(Debug, Parser)]
#[command(name = "quorum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "QUORUM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a manifest against a local image and print the vote
    Vote(VoteArgs),

    /// Show a stored record
    Show(ShowArgs),
}

/// Arguments for the vote command.
#[derive(Debug, Parser)]
pub struct VoteArgs {
    /// Image or PDF of the form
    pub image: PathBuf,

    /// Which manifest to run
    #[arg(short, long, value_enum, default_value = "broad")]
    pub manifest: ManifestArg,

    /// Vision model endpoint (overrides the config file)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Dispatch every run before awaiting any
    #[arg(long)]
    pub concurrent: bool,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Record id
    pub id: String,

    /// SQLite database holding the records
    #[arg(short, long)]
    pub database: PathBuf,
}

/// Manifest argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ManifestArg {
    /// Primary and secondary model, each run twice
    Broad,
    /// Primary, secondary and review model, each run once
    Enhanced,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_command() {
        let cli = Cli::parse_from(["quorum", "vote", "form.png"]);
        match cli.command {
            Command::Vote(args) => {
                assert_eq!(args.image, PathBuf::from("form.png"));
                assert_eq!(args.manifest, ManifestArg::Broad);
                assert!(args.endpoint.is_none());
                assert!(!args.concurrent);
            }
            _ => panic!("Expected Vote command"),
        }
    }

    #[test]
    fn test_vote_with_options() {
        let cli = Cli::parse_from([
            "quorum",
            "vote",
            "form.png",
            "--manifest",
            "enhanced",
            "--format",
            "json",
            "--endpoint",
            "http://gpu-box:11434",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Command::Vote(args) => {
                assert_eq!(args.manifest, ManifestArg::Enhanced);
                assert_eq!(args.endpoint.as_deref(), Some("http://gpu-box:11434"));
            }
            _ => panic!("Expected Vote command"),
        }
    }

    #[test]
    fn test_show_command() {
        let cli = Cli::parse_from(["quorum", "show", "abc", "--database", "records.db"]);
        match cli.command {
            Command::Show(args) => {
                assert_eq!(args.id, "abc");
                assert_eq!(args.database, PathBuf::from("records.db"));
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_show_requires_database() {
        assert!(Cli::try_parse_from(["quorum", "show", "abc"]).is_err());
    }
}

//! Command-line surface. Kept in its own module so tests can exercise the
//! definitions without going through the binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "msgshot",
    version,
    about = "Renders Slack-message Jest snapshots into screenshots"
)]
pub struct Cli {
    /// Folder containing Jest snapshots
    #[arg(short = 'i', long = "in", value_name = "path")]
    pub in_root: Option<String>,

    /// Folder that images will be saved to
    #[arg(short = 'o', long = "out", value_name = "path")]
    pub out_root: Option<String>,

    /// Render all matched snapshots, not just modified ones
    #[arg(short = 'a', long)]
    pub all: bool,

    /// GitHub token, required for bot mode
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Login the bot commits under; used to spot its own commits in PR history
    #[arg(long, env = "MSGSHOT_BOT_LOGIN", default_value = "msgshot-bot")]
    pub bot_login: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle a GitHub webhook payload (pull_request or issues event)
    Event {
        /// Path to the event payload JSON
        #[arg(long, value_name = "file")]
        payload: PathBuf,
    },
    /// Re-render every snapshot on a dedicated branch and open a pull request
    RedoAll {
        /// Repository as owner/name
        #[arg(long, value_name = "owner/name")]
        repo: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_flags_parse() {
        let cli = Cli::parse_from(["msgshot", "-i", "snaps", "-o", "shots", "--all"]);
        assert_eq!(cli.in_root.as_deref(), Some("snaps"));
        assert_eq!(cli.out_root.as_deref(), Some("shots"));
        assert!(cli.all);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_event_subcommand_parses() {
        let cli = Cli::parse_from(["msgshot", "event", "--payload", "event.json"]);
        match cli.command {
            Some(Commands::Event { payload }) => {
                assert_eq!(payload, PathBuf::from("event.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_redo_all_subcommand_parses() {
        let cli = Cli::parse_from(["msgshot", "redo-all", "--repo", "acme/widgets"]);
        match cli.command {
            Some(Commands::RedoAll { repo }) => assert_eq!(repo, "acme/widgets"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

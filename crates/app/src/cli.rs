//! Command line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(version, about = "Authenticated command line client for the Roster API")]
pub struct Cli {
    /// TOML settings file; ROSTER_* environment variables override it
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Sign out and remove the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// GET a path relative to the base URL
    Get {
        /// API path, e.g. /api/members/dashboard/
        path: String,
    },
    /// POST a JSON body to a path
    Post {
        /// API path
        path: String,
        /// JSON body
        #[arg(long, default_value = "{}")]
        json: String,
    },
    /// DELETE a path
    Delete {
        /// API path
        path: String,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_post_defaults_to_empty_object() {
        let cli = Cli::try_parse_from(["roster", "post", "/api/members/"]).unwrap_or_else(|e| {
            panic!("parse failed: {e}");
        });
        match cli.command {
            Command::Post { path, json } => {
                assert_eq!(path, "/api/members/");
                assert_eq!(json, "{}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Environment;

/// Video Token Service - signed access tokens for a real-time video platform
#[derive(Parser, Debug)]
#[command(name = "video-token-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "VIDEO_TOKEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "VIDEO_TOKEN_HOST")]
    pub host: Option<String>,

    /// Deployment environment
    #[arg(long, env = "NODE_ENV", value_enum, global = true)]
    pub environment: Option<Environment>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "VIDEO_TOKEN_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "VIDEO_TOKEN_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the token server (default)
    Serve,

    /// Issue a single credential locally and print it as JSON
    Token {
        /// Raw user id (normalized before signing)
        #[arg(required = true)]
        user_id: String,
    },

    /// Print the effective configuration as YAML (secrets excluded)
    Config,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_token_subcommand() {
        let cli = Cli::try_parse_from(["video-token-service", "token", "Bob Smith"]).unwrap();
        match cli.command {
            Some(Command::Token { user_id }) => assert_eq!(user_id, "Bob Smith"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_environment_and_port() {
        let cli = Cli::try_parse_from([
            "video-token-service",
            "--environment",
            "production",
            "--port",
            "8080",
            "serve",
        ])
        .unwrap();
        assert_eq!(cli.environment, Some(Environment::Production));
        assert_eq!(cli.port, Some(8080));
        assert!(matches!(cli.command, Some(Command::Serve)));
    }
}

//! Video Token Service - signed access tokens for a real-time video platform.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use video_token_service::{
    api::TokenService,
    cli::{Cli, Command},
    config::Config,
    issuer::CredentialIssuer,
    secrets::ServiceSecrets,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let Some(config) = load_config(&cli) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Some(Command::Config) => print_config(&config),
        Some(Command::Token { ref user_id }) => run_token(&config, user_id).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> Option<Config> {
    match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            if let Some(environment) = cli.environment {
                config.environment = environment;
            }
            Some(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            None
        }
    }
}

/// Load env files, then the platform secrets. Refuses to continue without both.
fn load_secrets(config: &Config) -> Option<ServiceSecrets> {
    config.load_env_files();
    match ServiceSecrets::from_env() {
        Ok(secrets) => Some(secrets),
        Err(e) => {
            error!("{e}");
            None
        }
    }
}

/// Print the effective configuration
fn print_config(config: &Config) -> ExitCode {
    match serde_yaml::to_string(config) {
        Ok(yaml) => {
            print!("{yaml}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to serialize configuration: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Issue one credential and print it
async fn run_token(config: &Config, user_id: &str) -> ExitCode {
    let Some(secrets) = load_secrets(config) else {
        return ExitCode::FAILURE;
    };

    let issuer = CredentialIssuer::from_config(secrets, &config.signing);
    match issuer.issue_for(user_id).await {
        Ok(credential) => match serde_json::to_string_pretty(&credential) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Failed to serialize credential: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("❌ Failed to generate token: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the token server
async fn run_server(config: Config) -> ExitCode {
    let Some(secrets) = load_secrets(&config) else {
        return ExitCode::FAILURE;
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        environment = %config.environment,
        "Starting Video Token Service"
    );

    if let Err(e) = TokenService::new(config, secrets).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Video Token Service shutdown complete");
    ExitCode::SUCCESS
}

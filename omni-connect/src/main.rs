//! omni-connect - Manage platform connections
//!
//! Stores OAuth tokens minted by a companion OAuth flow. Tokens are
//! accepted one platform at a time or as a JSON export; this tool never
//! runs an OAuth dance itself.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libomnipost::logging::{LogFormat, LoggingConfig};
use libomnipost::service::{ConnectRequest, OmnipostService};
use libomnipost::{ConnectionIdentity, PlatformKind};
use tracing::error;

#[derive(Parser)]
#[command(name = "omni-connect")]
#[command(version)]
#[command(about = "Manage Omnipost platform connections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a connection for a platform
    Set {
        /// Platform name (linkedin, twitter, instagram, threads)
        platform: String,

        /// Access token value (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Read the access token from stdin (for automation/agents)
        #[arg(long)]
        stdin: bool,

        /// Refresh token, if the platform issued one
        #[arg(long)]
        refresh_token: Option<String>,

        /// Seconds until the access token expires
        #[arg(long, value_name = "SECONDS")]
        expires_in: Option<i64>,

        /// Account identity as "username|accountId|parentId"
        #[arg(long)]
        identity: Option<String>,
    },

    /// List stored connections (without showing token values)
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Deactivate a platform connection
    Remove {
        /// Platform name (linkedin, twitter, instagram, threads)
        platform: String,
    },

    /// Import connections from a JSON export
    Import {
        /// Path to the export file ("-" for stdin)
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    LoggingConfig::new(LogFormat::Text, level.to_string(), cli.verbose).init();

    if let Err(e) = run_command(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Set {
            platform,
            token,
            stdin,
            refresh_token,
            expires_in,
            identity,
        } => {
            set_connection(&platform, token, stdin, refresh_token, expires_in, identity).await
        }
        Commands::List { format } => list_connections(&format).await,
        Commands::Remove { platform } => remove_connection(&platform).await,
        Commands::Import { file } => import_connections(&file).await,
    }
}

/// Store a connection for one platform
async fn set_connection(
    platform: &str,
    token: Option<String>,
    use_stdin: bool,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    identity: Option<String>,
) -> Result<()> {
    let kind: PlatformKind = platform.parse()?;

    if token.is_some() && use_stdin {
        anyhow::bail!("Cannot use --token and --stdin together. Choose one.");
    }

    // Get the token value: flag, stdin, or interactive prompt
    let access_token = match token {
        Some(value) => value,
        None if use_stdin => {
            use std::io::Read;
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read token from stdin")?;
            buffer.trim().to_string()
        }
        None => {
            if !atty::is(atty::Stream::Stdin) {
                anyhow::bail!(
                    "Not a TTY. Use --stdin or --token to supply the access token for automation."
                );
            }
            rpassword::prompt_password(format!("Access token for {}: ", kind))?
        }
    };

    let identity = match identity.as_deref() {
        Some(packed) => ConnectionIdentity::from_packed(packed)?,
        None => ConnectionIdentity::default(),
    };

    let expires_at = expires_in.map(|secs| chrono::Utc::now().timestamp() + secs);

    let service = OmnipostService::new().await?;
    let connection = service
        .connections()
        .set(ConnectRequest {
            platform: kind,
            access_token,
            refresh_token,
            expires_at,
            identity,
        })
        .await?;

    if connection.identity.username.is_empty() {
        println!("✓ Stored {} connection", kind);
    } else {
        println!(
            "✓ Stored {} connection for '{}'",
            kind, connection.identity.username
        );
    }

    Ok(())
}

/// List stored connections. Token values never appear in the output.
async fn list_connections(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        anyhow::bail!("Invalid format '{}'. Must be 'text' or 'json'", format);
    }

    let service = OmnipostService::new().await?;
    let connections = service.connections().list().await?;

    if format == "json" {
        let json: Vec<serde_json::Value> = connections
            .iter()
            .map(|c| {
                serde_json::json!({
                    "platform": c.platform,
                    "username": c.identity.username,
                    "account_id": c.identity.account_id,
                    "active": c.active,
                    "expires_at": c.expires_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json).unwrap());
        return Ok(());
    }

    if connections.is_empty() {
        println!("No connections stored.");
        println!();
        println!("Use 'omni-connect set <platform>' to store one.");
        return Ok(());
    }

    println!("Stored connections:");
    println!();
    for connection in &connections {
        let who = if connection.identity.username.is_empty() {
            String::new()
        } else {
            format!(" ({})", connection.identity.username)
        };
        let expiry = match connection.expires_at {
            Some(ts) => format!("expires {}", format_timestamp(ts)),
            None => "no expiry".to_string(),
        };
        let state = if connection.active { "" } else { " [inactive]" };

        println!("  ✓ {}{}: {}{}", connection.platform, who, expiry, state);
    }

    Ok(())
}

/// Deactivate a platform connection
async fn remove_connection(platform: &str) -> Result<()> {
    let kind: PlatformKind = platform.parse()?;

    let service = OmnipostService::new().await?;
    service.connections().remove(kind).await?;

    println!("✓ Deactivated {} connection", kind);
    Ok(())
}

/// Import connections from a JSON export file
async fn import_connections(file: &str) -> Result<()> {
    let contents = if file == "-" {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read export from stdin")?;
        buffer
    } else {
        let expanded = shellexpand::tilde(file).to_string();
        std::fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read export file {}", expanded))?
    };

    let service = OmnipostService::new().await?;
    let imported = service.connections().import(&contents).await?;

    println!("✓ Imported {} connection(s):", imported.len());
    for platform in imported {
        println!("  - {}", platform);
    }

    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    use chrono::DateTime;

    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ts.to_string(),
    }
}

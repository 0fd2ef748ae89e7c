//! omni-queue - Manage scheduled posts
//!
//! Unix-style tool for inspecting and managing the scheduled post queue.

use clap::{Parser, Subcommand};
use libomnipost::logging::{LogFormat, LoggingConfig};
use libomnipost::service::OmnipostService;
use libomnipost::{OmnipostError, PlatformKind, Post, PostStatus, Result};

#[derive(Parser, Debug)]
#[command(name = "omni-queue")]
#[command(version)]
#[command(about = "Manage scheduled posts")]
#[command(long_about = "\
omni-queue - Manage scheduled posts

DESCRIPTION:
    omni-queue is a Unix-style tool for managing scheduled posts in the
    Omnipost queue. Use it to list queued posts, inspect a single post,
    cancel a schedule, or push a post out immediately.

COMMANDS:
    list      List all scheduled posts
    show      Show one post in full
    cancel    Cancel a scheduled post (back to draft)
    now       Publish a scheduled post immediately

USAGE EXAMPLES:
    # List all scheduled posts
    omni-queue list

    # List posts in JSON format
    omni-queue list --format json

    # Only posts targeting one platform
    omni-queue list --platform linkedin

    # Inspect a post
    omni-queue show <POST_ID>

    # Cancel a specific post
    omni-queue cancel <POST_ID>

    # Publish a scheduled post immediately
    omni-queue now <POST_ID>

CONFIGURATION:
    Configuration file: ~/.config/omnipost/config.toml
    Database location: ~/.local/share/omnipost/posts.db

    Override with environment variables:
        OMNIPOST_CONFIG    - Path to config file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication failure
    3 - Invalid input (bad post ID, unknown format, etc.)

For more information, visit: https://github.com/omnipost/omnipost
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List scheduled posts
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Filter by platform
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Show one post in full
    Show {
        /// Post ID to show
        post_id: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Cancel a scheduled post
    Cancel {
        /// Post ID to cancel
        post_id: String,
    },

    /// Publish immediately
    Now {
        /// Post ID to publish now
        post_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "error" };
    LoggingConfig::new(LogFormat::Text, level.to_string(), cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let service = OmnipostService::new().await?;

    match cli.command {
        Commands::List { format, platform } => {
            cmd_list(&service, &format, platform.as_deref()).await
        }
        Commands::Show { post_id, format } => cmd_show(&service, &post_id, &format).await,
        Commands::Cancel { post_id } => cmd_cancel(&service, &post_id).await,
        Commands::Now { post_id } => cmd_now(&service, &post_id).await,
    }
}

/// List scheduled posts
async fn cmd_list(service: &OmnipostService, format: &str, platform: Option<&str>) -> Result<()> {
    validate_format(format)?;

    let mut posts = service.queue().list().await?;

    if let Some(filter) = platform {
        let kind: PlatformKind = filter.parse()?;
        posts.retain(|p| p.platforms.contains(&kind));
    }

    if format == "json" {
        output_list_json(&posts);
    } else {
        output_list_text(&posts);
    }

    Ok(())
}

/// Show one post in full
async fn cmd_show(service: &OmnipostService, post_id: &str, format: &str) -> Result<()> {
    validate_format(format)?;

    let post = service.queue().show(post_id).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&post).unwrap());
        return Ok(());
    }

    println!("ID:         {}", post.id);
    println!("Status:     {}", post.status);
    println!("Platforms:  {}", platform_list(&post));
    if let Some(ts) = post.scheduled_at {
        println!("Scheduled:  {}", format_timestamp(ts));
    }
    println!("Created:    {}", format_timestamp(post.created_at));
    if !post.media.is_empty() {
        println!("Media:      {} attachment(s)", post.media.len());
    }
    if !post.comments.is_empty() {
        println!("Comments:   {}", post.comments.len());
    }
    if let Some(ref error) = post.error_message {
        println!("Error:      {}", error);
    }
    println!();
    println!("{}", post.content);

    Ok(())
}

/// Cancel a scheduled post
async fn cmd_cancel(service: &OmnipostService, post_id: &str) -> Result<()> {
    service.queue().cancel(post_id).await?;
    println!("Cancelled post {}", post_id);
    Ok(())
}

/// Publish a scheduled post immediately
async fn cmd_now(service: &OmnipostService, post_id: &str) -> Result<()> {
    let report = service.posts().publish_now(post_id).await?;

    for outcome in &report.outcomes {
        match (&outcome.remote_id, &outcome.error) {
            (Some(remote_id), _) => println!("{}: published ({})", outcome.platform, remote_id),
            (None, Some(error)) => println!("{}: failed - {}", outcome.platform, error),
            (None, None) => println!("{}: failed", outcome.platform),
        }
    }
    for platform in &report.skipped {
        println!("{}: already published, skipped", platform);
    }
    println!("Post {}: status {}", report.post_id, report.status);

    if report.status == PostStatus::Failed {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(OmnipostError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

/// Output posts as JSON
fn output_list_json(posts: &[Post]) {
    let json: Vec<serde_json::Value> = posts
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "content": p.content,
                "platforms": p.platforms,
                "scheduled_at": p.scheduled_at,
                "created_at": p.created_at,
                "status": p.status,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json).unwrap());
}

/// Output posts as human-readable text
fn output_list_text(posts: &[Post]) {
    use chrono::Utc;

    if posts.is_empty() {
        return;
    }

    let now = Utc::now().timestamp();

    for post in posts {
        let content_preview = truncate_content(&post.content, 50);
        let time_until = post
            .scheduled_at
            .map(|ts| format_time_until(now, ts))
            .unwrap_or_else(|| "unknown".to_string());

        println!(
            "{} | {} | {} | {}",
            post.id,
            content_preview,
            platform_list(post),
            time_until
        );
    }
}

fn platform_list(post: &Post) -> String {
    post.platforms
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Truncate content to max length with ellipsis
fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}

/// Format time until scheduled time in human-readable format
fn format_time_until(now: i64, scheduled_at: i64) -> String {
    let diff = scheduled_at - now;

    if diff < 0 {
        return "overdue".to_string();
    }

    let minutes = diff / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("in {} day{}", days, if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if minutes > 0 {
        format!("in {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        "in <1 minute".to_string()
    }
}

fn format_timestamp(ts: i64) -> String {
    use chrono::DateTime;

    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ts.to_string(),
    }
}

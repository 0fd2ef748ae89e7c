//! omni-post - Compose once, publish everywhere
//!
//! Creates a draft, schedules it for later, or publishes immediately to
//! every connected platform.

use std::io::Read;

use clap::Parser;
use libomnipost::logging::{LogFormat, LoggingConfig};
use libomnipost::service::{NewPostRequest, OmnipostService};
use libomnipost::types::{MediaAsset, MediaKind, Mention};
use libomnipost::{OmnipostError, PlatformKind, Post, PostStatus, PublishReport, Result};

#[derive(Parser, Debug)]
#[command(name = "omni-post")]
#[command(version)]
#[command(about = "Publish a post to your connected social platforms")]
#[command(long_about = "\
omni-post - Publish a post to your connected social platforms

DESCRIPTION:
    omni-post composes a post once and fans it out to LinkedIn, Twitter/X,
    Instagram and Threads. Without --now or --at the post is saved as a
    draft. With --at it is queued for omni-send to pick up; with --now it
    is published immediately.

USAGE EXAMPLES:
    # Save a draft for the default platforms
    omni-post \"Shipping day!\"

    # Publish immediately to selected platforms
    omni-post \"Shipping day!\" --platform twitter,linkedin --now

    # Read content from stdin
    echo \"Shipping day!\" | omni-post --now

    # Schedule for later
    omni-post \"Shipping day!\" --at \"tomorrow 9am\"
    omni-post \"Shipping day!\" --at \"random:1h-4h\"

    # Attach media and a follow-up comment
    omni-post \"New release\" --media image:https://cdn.example.com/shot.png \\
        --comment \"Changelog below\" --now

CONFIGURATION:
    Configuration file: ~/.config/omnipost/config.toml
    Database location: ~/.local/share/omnipost/posts.db

    Override with environment variables:
        OMNIPOST_CONFIG    - Path to config file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication failure
    3 - Invalid input (bad platform, time format, etc.)

For more information, visit: https://github.com/omnipost/omnipost
")]
struct Cli {
    /// Post content (reads from stdin when omitted)
    content: Option<String>,

    /// Comma-separated target platforms (linkedin, twitter, instagram, threads)
    #[arg(short, long)]
    platform: Option<String>,

    /// Media URL to attach, optionally prefixed with a kind ("image:" or "video:")
    #[arg(short, long, value_name = "URL")]
    media: Vec<String>,

    /// Comment to post underneath once published (repeatable)
    #[arg(short, long, value_name = "TEXT")]
    comment: Vec<String>,

    /// Person to mention, given as "First Last" (repeatable)
    #[arg(long, value_name = "NAME")]
    mention: Vec<String>,

    /// Schedule for later (e.g. "2h", "tomorrow 9am", "random:1h-6h")
    #[arg(long, value_name = "WHEN", conflicts_with = "now")]
    at: Option<String>,

    /// Publish immediately instead of saving a draft
    #[arg(long)]
    now: bool,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
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
    // Validate everything we can before touching config or database.
    if cli.format != "text" && cli.format != "json" {
        return Err(OmnipostError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            cli.format
        )));
    }

    let platforms = parse_platforms(cli.platform.as_deref())?;
    let media = cli
        .media
        .iter()
        .map(|spec| parse_media_spec(spec))
        .collect::<Result<Vec<_>>>()?;
    let mentions = cli
        .mention
        .iter()
        .map(|name| parse_mention(name))
        .collect::<Result<Vec<_>>>()?;
    let content = read_content(cli.content)?;

    let service = OmnipostService::new().await?;

    let scheduled_at = match cli.at.as_deref() {
        Some(input) => Some(service.posts().resolve_schedule(input).await?),
        None => None,
    };

    let post = service
        .posts()
        .create(NewPostRequest {
            content,
            platforms,
            media,
            comments: cli.comment,
            mentions,
            scheduled_at,
        })
        .await?;

    if cli.now {
        let report = service.posts().publish_now(&post.id).await?;
        print_report(&report, &cli.format);
        if report.status == PostStatus::Failed {
            std::process::exit(1);
        }
    } else {
        print_created(&post, &cli.format);
    }

    Ok(())
}

/// Use the positional argument if given, otherwise read stdin to EOF.
fn read_content(arg: Option<String>) -> Result<String> {
    match arg {
        Some(content) => Ok(content),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map_err(|e| {
                OmnipostError::InvalidInput(format!("Failed to read content from stdin: {}", e))
            })?;
            Ok(buffer.trim_end().to_string())
        }
    }
}

fn parse_platforms(arg: Option<&str>) -> Result<Vec<PlatformKind>> {
    match arg {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse())
            .collect(),
        None => Ok(Vec::new()),
    }
}

/// Parse a `--media` argument. An explicit "image:" or "video:" prefix
/// wins; otherwise the kind is inferred from the URL extension.
fn parse_media_spec(spec: &str) -> Result<MediaAsset> {
    let (kind, url) = match spec.split_once(':') {
        Some((prefix, rest))
            if prefix.eq_ignore_ascii_case("image") || prefix.eq_ignore_ascii_case("video") =>
        {
            (prefix.parse()?, rest.trim().to_string())
        }
        _ => (infer_media_kind(spec), spec.trim().to_string()),
    };

    if url.is_empty() {
        return Err(OmnipostError::InvalidInput(format!(
            "Media URL missing in '{}'",
            spec
        )));
    }

    let filename = filename_from_url(&url);
    Ok(MediaAsset {
        kind,
        url,
        filename,
    })
}

fn infer_media_kind(url: &str) -> MediaKind {
    let lowered = url.to_lowercase();
    for ext in [".mp4", ".mov", ".webm", ".m4v"] {
        if lowered.ends_with(ext) {
            return MediaKind::Video;
        }
    }
    MediaKind::Image
}

fn filename_from_url(url: &str) -> String {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let name = tail.split('?').next().unwrap_or(tail);
    let name = name.split('#').next().unwrap_or(name);
    if name.is_empty() {
        "media".to_string()
    } else {
        name.to_string()
    }
}

fn parse_mention(name: &str) -> Result<Mention> {
    let trimmed = name.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.next().unwrap_or("").trim().to_string();

    if first.is_empty() || last.is_empty() {
        return Err(OmnipostError::InvalidInput(format!(
            "Mention '{}' must be given as \"First Last\"",
            name
        )));
    }

    Ok(Mention {
        first_name: first,
        last_name: last,
    })
}

fn print_created(post: &Post, format: &str) {
    if format == "json" {
        let json = serde_json::json!({
            "id": post.id,
            "status": post.status,
            "platforms": post.platforms,
            "scheduled_at": post.scheduled_at,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap());
        return;
    }

    match post.scheduled_at {
        Some(ts) => println!("Scheduled post {} for {}", post.id, format_timestamp(ts)),
        None => println!("Created draft {}", post.id),
    }
}

fn print_report(report: &PublishReport, format: &str) {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report).unwrap());
        return;
    }

    for outcome in &report.outcomes {
        match (&outcome.remote_id, &outcome.error) {
            (Some(remote_id), _) => println!("{}: published ({})", outcome.platform, remote_id),
            (None, Some(error)) => println!("{}: failed - {}", outcome.platform, error),
            (None, None) => println!("{}: failed", outcome.platform),
        }
        for comment_error in &outcome.comment_errors {
            println!("{}: comment failed - {}", outcome.platform, comment_error);
        }
    }
    for platform in &report.skipped {
        println!("{}: already published, skipped", platform);
    }
    println!(
        "Post {}: {} succeeded, {} failed, status {}",
        report.post_id, report.succeeded, report.failed, report.status
    );
}

fn format_timestamp(ts: i64) -> String {
    use chrono::DateTime;

    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platforms_comma_separated() {
        let platforms = parse_platforms(Some("twitter, linkedin")).unwrap();
        assert_eq!(
            platforms,
            vec![PlatformKind::Twitter, PlatformKind::Linkedin]
        );
    }

    #[test]
    fn test_parse_platforms_accepts_x_alias() {
        let platforms = parse_platforms(Some("x")).unwrap();
        assert_eq!(platforms, vec![PlatformKind::Twitter]);
    }

    #[test]
    fn test_parse_platforms_none_is_empty() {
        assert!(parse_platforms(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_platforms_rejects_unknown() {
        let result = parse_platforms(Some("twitter,myspace"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_media_spec_with_prefix() {
        let asset = parse_media_spec("video:https://cdn.example.com/clip.bin").unwrap();

        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.url, "https://cdn.example.com/clip.bin");
        assert_eq!(asset.filename, "clip.bin");
    }

    #[test]
    fn test_parse_media_spec_infers_kind_from_extension() {
        let image = parse_media_spec("https://cdn.example.com/shot.png").unwrap();
        assert_eq!(image.kind, MediaKind::Image);

        let video = parse_media_spec("https://cdn.example.com/clip.mp4").unwrap();
        assert_eq!(video.kind, MediaKind::Video);
    }

    #[test]
    fn test_parse_media_spec_rejects_empty_url() {
        assert!(parse_media_spec("image:").is_err());
        assert!(parse_media_spec("   ").is_err());
    }

    #[test]
    fn test_filename_from_url_strips_query() {
        assert_eq!(
            filename_from_url("https://cdn.example.com/a/b/shot.png?sig=abc"),
            "shot.png"
        );
    }

    #[test]
    fn test_filename_from_url_fallback() {
        assert_eq!(filename_from_url("https://cdn.example.com/media/"), "media");
    }

    #[test]
    fn test_parse_mention_splits_first_and_last() {
        let mention = parse_mention("Grace Hopper").unwrap();

        assert_eq!(mention.first_name, "Grace");
        assert_eq!(mention.last_name, "Hopper");
    }

    #[test]
    fn test_parse_mention_keeps_compound_last_name() {
        let mention = parse_mention("Ada King Lovelace").unwrap();

        assert_eq!(mention.first_name, "Ada");
        assert_eq!(mention.last_name, "King Lovelace");
    }

    #[test]
    fn test_parse_mention_rejects_single_name() {
        assert!(parse_mention("Prince").is_err());
        assert!(parse_mention("").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00 UTC");
    }
}

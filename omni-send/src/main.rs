//! omni-send - Background daemon for scheduled publishing
//!
//! Monitors the scheduled post queue and automatically publishes content
//! at the scheduled time.

use clap::Parser;
use libomnipost::logging::{LogFormat, LoggingConfig};
use libomnipost::service::OmnipostService;
use libomnipost::{OmnipostError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "omni-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled publishing")]
#[command(long_about = "\
omni-send - Background daemon for scheduled publishing

DESCRIPTION:
    omni-send is a long-running daemon that monitors the Omnipost queue
    and automatically publishes scheduled content at the right time.

    It polls the database at regular intervals, picks up posts whose
    scheduled time has passed, publishes them to every target platform,
    and records the outcome on each post.

USAGE:
    # Run in foreground (logs to stderr)
    omni-send

    # Run with custom poll interval
    omni-send --poll-interval 30

    # Enable verbose logging
    omni-send --verbose

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes current post)

CONFIGURATION:
    Configuration file: ~/.config/omnipost/config.toml
    Database location: ~/.local/share/omnipost/posts.db

    [publish]
    call_timeout_secs = 30     # timeout per platform call
    comment_delay_secs = 2     # pause before each follow-up comment
    refresh_margin_secs = 120  # refresh tokens expiring this soon

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error

For more information, visit: https://github.com/omnipost/omnipost
")]
struct Cli {
    /// Poll interval in seconds
    #[arg(long, value_name = "SECONDS")]
    #[arg(help = "How often to check for scheduled posts (default: 60)")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,

    /// Run once and exit (for testing)
    #[arg(long, hide = true)]
    #[arg(help = "Process due posts once and exit (for testing)")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let service = OmnipostService::new().await?;

    info!("omni-send daemon starting");

    // Set up graceful shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let poll_interval = cli.poll_interval.unwrap_or(60);
    info!("Poll interval: {}s", poll_interval);

    if cli.once {
        process_due_posts(&service).await?;
        info!("omni-send: processed posts once, exiting");
    } else {
        run_daemon_loop(&service, poll_interval, shutdown).await?;
    }

    info!("omni-send daemon stopped");
    Ok(())
}

/// Initialize logging based on verbosity level. The output format can be
/// switched to JSON via OMNIPOST_LOG_FORMAT for log collectors.
fn init_logging(verbose: bool) {
    let format = std::env::var("OMNIPOST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    LoggingConfig::new(format, "info".to_string(), verbose).init();
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| OmnipostError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    // Spawn thread to handle signals
    let shutdown_clone = shutdown.clone();
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown_clone.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(
    service: &OmnipostService,
    poll_interval: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        if let Err(e) = process_due_posts(service).await {
            error!("Error processing posts: {}", e);
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    Ok(())
}

/// Publish every post whose scheduled time has passed
async fn process_due_posts(service: &OmnipostService) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let due_posts = service.queue().due(now).await?;

    if due_posts.is_empty() {
        return Ok(());
    }

    info!("Found {} post(s) due for publishing", due_posts.len());

    for post in due_posts {
        info!("Publishing post {}", post.id);

        match service.posts().publish_now(&post.id).await {
            Ok(report) => {
                if report.failed == 0 {
                    info!(
                        "Post {} published to {} platform(s)",
                        report.post_id, report.succeeded
                    );
                } else {
                    warn!(
                        "Post {} finished with {} platform(s) failed: {}",
                        report.post_id,
                        report.failed,
                        report.error_message.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            Err(e) => {
                // One broken post must not stall the rest of the queue.
                error!("Failed to publish post {}: {}", post.id, e);
            }
        }
    }

    Ok(())
}

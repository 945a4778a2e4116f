//! autocast-queue - Manage topics and the post queue
//!
//! Unix-style tool for feeding topics in, reviewing generated posts and
//! triggering cycles by hand.

use clap::{Parser, Subcommand};
use libautocast::error::PlatformError;
use libautocast::service::{GenerationReport, PublishReport};
use libautocast::{
    AutocastError, AutocastService, Config, CycleOutcome, NewTopic, Platform, Post, PostFilter,
    PostStatus, PublishOutcome, Result, Topic, TopicStatus,
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "autocast-queue")]
#[command(version)]
#[command(about = "Manage topics and the post queue")]
#[command(long_about = "\
autocast-queue - Manage topics and the post queue

DESCRIPTION:
    autocast-queue is a Unix-style tool for the Autocast store. Add topics for
    the generation cycle, review and approve the posts it produces, schedule
    or publish them, and run either cycle by hand.

USAGE EXAMPLES:
    # Add a topic for LinkedIn and X
    autocast-queue topic add \"Rust 2024 edition\" --platform linkedin --platform x

    # List generated posts as JSON
    autocast-queue post list --status draft --format json

    # Approve a draft and hold it until tomorrow morning
    autocast-queue post approve 12
    autocast-queue post schedule 12 \"tomorrow 9am\"

    # Regenerate content for one topic now
    autocast-queue generate 3

    # Run the publish cycle immediately
    autocast-queue run publish

CONFIGURATION:
    Configuration file: ~/.config/autocast/config.toml
    Database location: ~/.local/share/autocast/autocast.db

    Override with environment variables:
        AUTOCAST_CONFIG    - Path to config file
        AUTOCAST_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Authentication error
    3 - Invalid input (bad id, platform, status or time format)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    #[arg(help = "Enable verbose logging to stderr (useful for debugging)")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add, list or delete topics
    #[command(subcommand)]
    Topic(TopicCommand),

    /// Review, approve, schedule or publish posts
    #[command(subcommand)]
    Post(PostCommand),

    /// Generate posts for one topic now
    Generate {
        /// Topic ID
        topic_id: i64,

        /// Limit generation to these platforms (repeatable)
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },

    /// Run a cycle once
    Run {
        /// Cycle to run: generate or publish
        cycle: String,
    },
}

#[derive(Subcommand, Debug)]
enum TopicCommand {
    /// Add a pending topic
    Add {
        /// Topic title
        title: String,

        /// Extra context for the AI provider
        #[arg(short, long)]
        description: Option<String>,

        /// Target platform (repeatable, default: linkedin, facebook, instagram, x)
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },

    /// List topics
    List {
        /// Filter by status: pending, generating, generated, posted
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Delete a topic and all of its posts
    Delete {
        /// Topic ID
        topic_id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum PostCommand {
    /// List posts
    List {
        /// Filter by status: draft, approved, scheduled, posted
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by topic ID
        #[arg(short, long)]
        topic: Option<i64>,

        /// Filter by platform
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// Approve a draft
    Approve {
        /// Post ID
        post_id: i64,
    },

    /// Set or clear the earliest publish time
    Schedule {
        /// Post ID
        post_id: i64,

        /// When to publish (e.g., "tomorrow 3pm", "in 2h")
        #[arg(required_unless_present = "clear")]
        time: Option<String>,

        /// Remove the scheduled time
        #[arg(long, conflicts_with = "time")]
        clear: bool,
    },

    /// Publish a post immediately
    Publish {
        /// Post ID
        post_id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(AutocastError::InvalidInput(format!(
                "Invalid format '{}'. Must be 'text' or 'json'",
                other
            ))),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Command output owns stdout; logs stay quiet unless asked for
    let level = if cli.verbose { "debug" } else { "error" };
    libautocast::logging::LoggingConfig::new(Default::default(), level, cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = OutputFormat::parse(&cli.format)?;

    let config = Config::load()?;
    debug!(database = %config.database.path, "Loaded configuration");
    let service = AutocastService::from_config(config).await?;

    match cli.command {
        Commands::Topic(command) => cmd_topic(&service, command, format).await,
        Commands::Post(command) => cmd_post(&service, command, format).await,
        Commands::Generate {
            topic_id,
            platforms,
        } => cmd_generate(&service, topic_id, &platforms, format).await,
        Commands::Run { cycle } => cmd_run(&service, &cycle, format).await,
    }
}

fn parse_platforms(values: &[String]) -> Result<Vec<Platform>> {
    values.iter().map(|v| v.parse()).collect()
}

async fn cmd_topic(service: &AutocastService, command: TopicCommand, format: OutputFormat) -> Result<()> {
    let db = service.database();

    match command {
        TopicCommand::Add {
            title,
            description,
            platforms,
        } => {
            let platforms = if platforms.is_empty() {
                NewTopic::DEFAULT_PLATFORMS.to_vec()
            } else {
                parse_platforms(&platforms)?
            };

            let mut topic = NewTopic::new(title, platforms);
            if let Some(description) = description {
                topic = topic.with_description(description);
            }

            let topic = db.create_topic(&topic).await?;
            match format {
                OutputFormat::Json => print_json(&topic),
                OutputFormat::Text => println!("{}", topic.id),
            }
        }
        TopicCommand::List { status } => {
            let status = status.map(|s| s.parse::<TopicStatus>()).transpose()?;
            let topics = db.list_topics(status, None).await?;
            match format {
                OutputFormat::Json => print_json(&topics),
                OutputFormat::Text => topics.iter().for_each(print_topic_line),
            }
        }
        TopicCommand::Delete { topic_id } => {
            if !db.delete_topic(topic_id).await? {
                return Err(AutocastError::InvalidInput(format!(
                    "Topic not found: {}",
                    topic_id
                )));
            }
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": topic_id })),
                OutputFormat::Text => println!("Deleted topic {}", topic_id),
            }
        }
    }

    Ok(())
}

async fn cmd_post(service: &AutocastService, command: PostCommand, format: OutputFormat) -> Result<()> {
    let publishing = service.publishing();

    match command {
        PostCommand::List {
            status,
            topic,
            platform,
        } => {
            let mut filter = PostFilter::default();
            if let Some(status) = status {
                filter = filter.status(status.parse::<PostStatus>()?);
            }
            if let Some(topic_id) = topic {
                filter = filter.topic(topic_id);
            }
            if let Some(platform) = platform {
                filter = filter.platform(platform.parse()?);
            }

            let posts = service.database().list_posts(&filter).await?;
            match format {
                OutputFormat::Json => print_json(&posts),
                OutputFormat::Text => {
                    let now = chrono::Utc::now().timestamp();
                    posts.iter().for_each(|post| print_post_line(post, now));
                }
            }
        }
        PostCommand::Approve { post_id } => {
            let post = publishing.approve_post(post_id).await?;
            print_post_change(&post, format, "Approved");
        }
        PostCommand::Schedule {
            post_id,
            time,
            clear,
        } => {
            let when = if clear { None } else { time.as_deref() };
            let post = publishing.schedule_post(post_id, when).await?;
            print_post_change(&post, format, "Scheduled");
        }
        PostCommand::Publish { post_id } => {
            let outcome = publishing.publish_post_by_id(post_id).await?;
            print_outcome(post_id, &outcome, format);
            if !outcome.is_success() {
                return Err(PlatformError::Posting(outcome.message.unwrap_or_default()).into());
            }
        }
    }

    Ok(())
}

async fn cmd_generate(
    service: &AutocastService,
    topic_id: i64,
    platforms: &[String],
    format: OutputFormat,
) -> Result<()> {
    let platforms = if platforms.is_empty() {
        None
    } else {
        Some(parse_platforms(platforms)?)
    };

    let summary = service
        .generation()
        .regenerate_topic(topic_id, platforms)
        .await?;

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            println!(
                "Topic {}: {} created, {} updated",
                summary.topic_id, summary.created, summary.updated
            );
            for platform in &summary.degraded {
                println!("  {} used fallback content", platform);
            }
        }
    }

    Ok(())
}

async fn cmd_run(service: &AutocastService, cycle: &str, format: OutputFormat) -> Result<()> {
    match cycle {
        "generate" => {
            let report = finish_cycle(service.generation().run_cycle().await)?;
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Text => print_generation_report(&report),
            }
        }
        "publish" => {
            let report = finish_cycle(service.publishing().run_cycle().await)?;
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Text => print_publish_report(&report),
            }
        }
        other => {
            return Err(AutocastError::InvalidInput(format!(
                "Unknown cycle '{}'. Must be 'generate' or 'publish'",
                other
            )))
        }
    }

    Ok(())
}

fn finish_cycle<T>(outcome: CycleOutcome<T>) -> Result<T> {
    match outcome {
        CycleOutcome::Completed(report) => Ok(report),
        CycleOutcome::Skipped => Err(AutocastError::Scheduler(
            "Cycle is already running".to_string(),
        )),
        CycleOutcome::Failed(reason) => Err(AutocastError::Scheduler(reason)),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode JSON: {}", e),
    }
}

fn print_topic_line(topic: &Topic) {
    let platforms: Vec<&str> = topic.platforms.iter().map(Platform::as_str).collect();
    println!(
        "{} | {} | {} | {}",
        topic.id,
        topic.status,
        platforms.join(","),
        truncate_content(&topic.title, 50)
    );
}

fn print_post_line(post: &Post, now: i64) {
    let when = match (post.status, post.scheduled_time) {
        (PostStatus::Posted, _) => "posted".to_string(),
        (_, Some(at)) => format_time_until(now, at),
        (_, None) => "when due".to_string(),
    };

    println!(
        "{} | topic {} | {} | {} | {} | {}",
        post.id,
        post.topic_id,
        post.platform,
        post.status,
        when,
        truncate_content(&post.content, 50)
    );
}

fn print_post_change(post: &Post, format: OutputFormat, verb: &str) {
    match format {
        OutputFormat::Json => print_json(post),
        OutputFormat::Text => match (verb, post.scheduled_time) {
            ("Scheduled", Some(at)) => {
                let at = chrono::DateTime::from_timestamp(at, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| at.to_string());
                println!("Scheduled post {} for {}", post.id, at);
            }
            ("Scheduled", None) => println!("Cleared schedule for post {}", post.id),
            _ => println!("{} post {}", verb, post.id),
        },
    }
}

fn print_outcome(post_id: i64, outcome: &PublishOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Text if outcome.is_success() => println!(
            "Published post {} to {}: {}",
            post_id,
            outcome.platform,
            outcome.remote_id.as_deref().unwrap_or_default()
        ),
        OutputFormat::Text => eprintln!(
            "Failed to publish post {} to {}: {}",
            post_id,
            outcome.platform,
            outcome.message.as_deref().unwrap_or_default()
        ),
    }
}

fn print_generation_report(report: &GenerationReport) {
    println!(
        "Generated {} topic(s), skipped {}, failed {}",
        report.generated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for summary in &report.generated {
        println!(
            "  topic {}: {} created, {} updated",
            summary.topic_id, summary.created, summary.updated
        );
    }
}

fn print_publish_report(report: &PublishReport) {
    println!(
        "Published {} of {} post(s), {} failed",
        report.published,
        report.selected.len(),
        report.failed
    );
}

/// Truncate content to max characters with ellipsis
fn truncate_content(content: &str, max_len: usize) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() <= max_len {
        single_line
    } else {
        let head: String = single_line.chars().take(max_len).collect();
        format!("{}...", head)
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

//! # Oshin CLI
//!
//! Team status relay: fans out working-on updates by tag and posts a daily
//! per-user digest to every configured destination.
//!
//! Usage:
//!   oshin serve                        # HTTP endpoints + daily scheduler
//!   oshin digest                       # Run the digest now
//!   oshin digest --dry-run             # Print the digest instead of posting
//!   oshin routes                       # Show routing rules
//!   oshin info                         # Show configuration summary

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mockable::{Clock, DefaultClock};
use oshin_core::config::SinkKind;
use oshin_core::traits::{NotificationSink, OwnerDirectory, RecordStore};
use oshin_core::{OshinConfig, RoutingConfig};
use oshin_engine::{DigestAggregator, FanoutRouter, PrimaryTarget};
use oshin_scheduler::{DailyTime, DigestJob, ReminderJob, SchedulerEngine};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "oshin=debug,oshin_core=debug,oshin_memory=debug,oshin_channels=debug,oshin_engine=debug,oshin_scheduler=debug,oshin_gateway=debug,tower_http=debug";
const DEFAULT_FILTER: &str = "oshin=info,oshin_core=info,oshin_memory=info,oshin_channels=info,oshin_engine=info,oshin_scheduler=info,oshin_gateway=info";

#[derive(Parser)]
#[command(
    name = "oshin",
    version,
    about = "Oshin: team status fan-out and daily digest bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP endpoints and the daily scheduler
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the digest for the current time
    Digest {
        /// Print the digest instead of delivering it
        #[arg(long)]
        dry_run: bool,
    },

    /// Load, validate and list routing rules
    Routes,

    /// Show system info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let mut config = if let Some(path) = &cli.config {
        OshinConfig::load_from(std::path::Path::new(path))?
    } else {
        OshinConfig::load()?
    };
    config.apply_env(|name| std::env::var(name).ok())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(p) = port {
                config.server.port = p;
            }
            config.validate()?;
            serve(config).await?;
        }

        Commands::Digest { dry_run } => {
            config.validate()?;
            let routing = Arc::new(RoutingConfig::load_from(&config.routing_path())?);
            let store = oshin_memory::create_store(&config.store)?;
            let directory = oshin_channels::create_directory(&config.slack);
            let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

            if dry_run {
                let capture = Arc::new(oshin_channels::capture::CaptureSink::new(
                    config.slack.sink == SinkKind::Api,
                ));
                let aggregator =
                    build_aggregator(&config, store, capture.clone(), directory, routing, clock)?;
                let report = aggregator.run().await?;
                println!("🧪 Dry run: {}", report.title);
                println!("   Window: {} .. {}", report.window.start, report.window.end);
                for delivery in capture.deliveries() {
                    println!("\n── {} ──", delivery.destination);
                    println!("{}", delivery.message.text);
                    for field in &delivery.message.fields {
                        println!("\n{}\n{}", field.title, field.value);
                    }
                }
                if !report.skipped.is_empty() {
                    println!("\nNothing to report for: {}", report.skipped.join(", "));
                }
            } else {
                let sink = oshin_channels::create_sink(&config.slack);
                let aggregator = build_aggregator(&config, store, sink, directory, routing, clock)?;
                let report = aggregator.run().await?;
                println!("📰 {}", report.title);
                for (destination, owners) in &report.posted {
                    println!("   ✅ {destination} ({owners} owner(s))");
                }
                for destination in &report.skipped {
                    println!("   ➖ {destination} (nothing to report)");
                }
                for failure in &report.failed {
                    println!("   ❌ {}: {}", failure.destination, failure.error);
                }
            }
        }

        Commands::Routes => {
            let path = config.routing_path();
            let routing = RoutingConfig::load_from(&path)?;
            println!("Routing rules from {} ({}):", path.display(), routing.len());
            for (idx, rule) in routing.rules().iter().enumerate() {
                let tags = if rule.tags.is_empty() {
                    "(all items)".to_string()
                } else {
                    rule.tags.join(", ")
                };
                println!(
                    "  {:>2}. {:<20} tags: {:<30} token: {}",
                    idx + 1,
                    rule.destination,
                    tags,
                    rule.credential.masked()
                );
            }
        }

        Commands::Info => {
            println!("🗞️  Oshin v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", OshinConfig::default_path().display());
            println!("   Listen: {}:{}", config.server.host, config.server.port);
            println!("   Primary channel: {}", config.slack.primary_channel);
            println!("   Bot token: {}", config.slack.bot_token.masked());
            println!("   Sink: {:?}", config.slack.sink);
            println!("   Digest: {} {}", config.digest.time, config.digest.timezone);
            println!("   Store: {:?} ({})", config.store.backend, config.store_path().display());
            println!("   Routing: {}", config.routing_path().display());
            match &config.reminder {
                Some(r) => println!("   Reminder: {} → {}", r.time, r.channel),
                None => println!("   Reminder: disabled"),
            }
        }
    }

    Ok(())
}

fn build_aggregator(
    config: &OshinConfig,
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn NotificationSink>,
    directory: Arc<dyn OwnerDirectory>,
    routing: Arc<RoutingConfig>,
    clock: Arc<dyn Clock>,
) -> Result<DigestAggregator> {
    let tz = oshin_core::time::parse_timezone(&config.digest.timezone)?;
    Ok(
        DigestAggregator::new(store, sink, directory, routing, clock)
            .with_presentation(config.slack.presentation())
            .with_title(tz, config.digest.title_format.clone()),
    )
}

async fn serve(config: OshinConfig) -> Result<()> {
    let routing = Arc::new(RoutingConfig::load_from(&config.routing_path())?);
    let store = oshin_memory::create_store(&config.store)?;
    let sink = oshin_channels::create_sink(&config.slack);
    let directory = oshin_channels::create_directory(&config.slack);
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let router = FanoutRouter::new(
        store.clone(),
        sink.clone(),
        routing.clone(),
        PrimaryTarget::new(
            config.slack.primary_channel.clone(),
            config.slack.bot_token.clone(),
        ),
        clock.clone(),
    )
    .with_presentation(config.slack.presentation());

    let aggregator = build_aggregator(
        &config,
        store,
        sink.clone(),
        directory,
        routing,
        clock.clone(),
    )?;

    let mut scheduler = SchedulerEngine::new(clock);
    scheduler.add_job(
        DailyTime::parse(&config.digest.time, &config.digest.timezone)?,
        Arc::new(DigestJob::new(Arc::new(aggregator))),
    )?;
    if let Some(reminder) = &config.reminder {
        scheduler.add_job(
            DailyTime::parse(&reminder.time, &config.digest.timezone)?,
            Arc::new(ReminderJob::new(
                sink,
                config.slack.bot_token.clone(),
                reminder.channel.clone(),
                reminder.message(),
                config.slack.presentation(),
            )),
        )?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    let scheduler_handle = tokio::spawn(scheduler.run(wait_for(shutdown_rx.clone())));

    let state = Arc::new(oshin_gateway::AppState::new(
        config.server.clone(),
        Arc::new(router),
    ));
    println!("🗞️  Oshin v{} running", env!("CARGO_PKG_VERSION"));
    println!("   Endpoints: POST /on /til /done on {}:{}", config.server.host, config.server.port);
    println!("   Digest daily at {} {}", config.digest.time, config.digest.timezone);
    println!("   Press Ctrl+C to stop.");

    oshin_gateway::serve(state, wait_for(shutdown_rx)).await?;
    scheduler_handle.await?;
    println!("\n👋 Oshin stopped.");
    Ok(())
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

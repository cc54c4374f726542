mod chat;
mod config;
mod llm;
mod pipeline;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::chat::ChatSession;
use crate::chat::history::ChatHistory;
use crate::config::Config;
use crate::llm::{ChatModel, OpenAiChat};
use crate::pipeline::feed::GoogleNewsFeed;
use crate::pipeline::fetch::HttpPageFetcher;
use crate::pipeline::publish::{NotionPublisher, Publisher};
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::{NewsPipeline, Pipeline, PipelineOutcome};
use crate::scheduler::Scheduler;
use crate::scheduler::log::ExecutionLog;
use crate::scheduler::store::{DayOfWeek, JobStore};

#[derive(Parser)]
#[command(name = "newsdesk", about = "News-scraping chat assistant with scheduled Notion briefs")]
enum Cli {
    /// Interactive chat session with the scheduler running in the background
    Chat,
    /// Run the news pipeline once for a keyword
    Run {
        #[arg(long)]
        keyword: String,
    },
    /// Run only the scheduler, until interrupted
    Serve,
    /// Manage recurring keyword scrapes
    #[command(subcommand)]
    Schedule(ScheduleCmd),
    /// Show recent pipeline runs, newest first
    Logs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ScheduleCmd {
    /// Add a recurring scrape at HH:MM (daily, or weekly with --days)
    Add {
        #[arg(long)]
        keyword: String,
        #[arg(long)]
        hour: u32,
        #[arg(long)]
        minute: u32,
        /// Comma-separated weekdays, e.g. --days mon,wed,fri
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<DayOfWeek>>,
    },
    /// Remove a schedule by id
    Remove { id: String },
    /// List all schedules
    List,
}

struct App {
    config: Config,
    store: Arc<JobStore>,
    log: Arc<ExecutionLog>,
    model: Arc<dyn ChatModel>,
    publisher: Arc<dyn Publisher>,
    pipeline: Arc<dyn Pipeline>,
    scheduler: Arc<Scheduler>,
}

fn build_app(config: Config) -> Result<App> {
    let http_client = Arc::new(
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?,
    );

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set -- chat replies and summaries will fail");
    }
    if config.notion().is_none() {
        tracing::warn!("NOTION_API_KEY or NOTION_DATABASE_ID not set -- publishing is disabled");
    }

    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
        http_client.clone(),
        config.openai_api_key.clone().unwrap_or_default(),
        config.openai_model.clone(),
    ));
    let feed = Arc::new(GoogleNewsFeed::new(
        http_client.clone(),
        config.feed_locale.clone(),
    ));
    let fetcher = Arc::new(HttpPageFetcher::new(http_client.clone()));
    let publisher: Arc<dyn Publisher> =
        Arc::new(NotionPublisher::new(http_client.clone(), config.notion()));
    let pipeline: Arc<dyn Pipeline> = Arc::new(NewsPipeline::new(
        feed,
        fetcher,
        Summarizer::new(model.clone()),
        publisher.clone(),
    ));

    let store = Arc::new(JobStore::new(config.data_dir.join("schedules.json")));
    let log = Arc::new(ExecutionLog::new(config.data_dir.join("execution_log.json")));
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        log.clone(),
        pipeline.clone(),
    ));

    Ok(App {
        config,
        store,
        log,
        model,
        publisher,
        pipeline,
        scheduler,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let app = build_app(Config::from_env())?;

    match cli {
        Cli::Chat => run_chat(app).await,
        Cli::Run { keyword } => run_once(app, &keyword).await,
        Cli::Serve => run_serve(app).await,
        Cli::Schedule(cmd) => run_schedule(app, cmd).await,
        Cli::Logs { limit } => run_logs(app, limit).await,
    }
}

async fn run_chat(app: App) -> Result<()> {
    let restored = app.scheduler.restore().await;
    if restored > 0 {
        println!("Restored {restored} schedule(s).");
    }

    let history = ChatHistory::load(app.config.data_dir.join("chat_history.json"))?;
    let mut session = ChatSession::new(history, app.model, app.pipeline, app.publisher);
    session.run().await?;

    app.scheduler.shutdown().await;
    Ok(())
}

async fn run_once(app: App, keyword: &str) -> Result<()> {
    match app.pipeline.run(keyword, keyword).await? {
        PipelineOutcome::Published { cards, url } => {
            println!("Published {} article summaries.", cards.len());
            if let Some(url) = url {
                println!("Notion page: {url}");
            }
        }
        PipelineOutcome::PublishFailed { cards } => {
            println!(
                "Summarized {} articles, but saving to Notion failed:",
                cards.len()
            );
            for diagnostic in app.publisher.diagnostics() {
                println!("  {diagnostic}");
            }
        }
        PipelineOutcome::NoResults => {
            println!("No articles found for '{keyword}'.");
        }
    }
    Ok(())
}

async fn run_serve(app: App) -> Result<()> {
    let restored = app.scheduler.restore().await;
    println!("Scheduler running with {restored} schedule(s). Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    app.scheduler.shutdown().await;
    Ok(())
}

async fn run_schedule(app: App, cmd: ScheduleCmd) -> Result<()> {
    match cmd {
        ScheduleCmd::Add {
            keyword,
            hour,
            minute,
            days,
        } => {
            let entry = app.scheduler.add(&keyword, hour, minute, days).await?;
            println!(
                "Added {}: '{}' {} at {:02}:{:02}",
                entry.id, entry.keyword, entry.frequency_label, entry.hour, entry.minute
            );
            println!("Schedules fire while `newsdesk serve` or `newsdesk chat` is running.");
        }
        ScheduleCmd::Remove { id } => {
            if app.scheduler.remove(&id).await? {
                println!("Removed {id}.");
            } else {
                println!("No schedule with id {id}.");
            }
        }
        ScheduleCmd::List => {
            let entries = app.store.load()?;
            if entries.is_empty() {
                println!("No schedules.");
            }
            for entry in entries {
                println!(
                    "{}  '{}' {} at {:02}:{:02}  (created {})",
                    entry.id,
                    entry.keyword,
                    entry.frequency_label,
                    entry.hour,
                    entry.minute,
                    entry.created_at.format("%Y-%m-%d"),
                );
            }
        }
    }
    Ok(())
}

async fn run_logs(app: App, limit: usize) -> Result<()> {
    let entries = app.log.recent(limit).await?;
    if entries.is_empty() {
        println!("No pipeline runs recorded yet.");
    }
    for entry in entries {
        println!(
            "{}  {:<24} {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.keyword,
            entry.status,
            entry.page_url.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

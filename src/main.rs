//! CLI entry point for the outbreak feeds tool.
//!
//! Provides subcommands for fetching a single feed, snapshotting all feeds
//! concurrently, aggregating series with an optional forecast, tallying by
//! region, and listing configured feeds.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use tracing::Instrument;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use outbreak_feeds::aggregate::{
    Bucket, DetectionSummary, NormalizedEvent, Reducer, aggregate, detection_summary, tally,
};
use outbreak_feeds::envelope::Envelope;
use outbreak_feeds::fallback::{FallbackPolicy, demo_events, with_fallback};
use outbreak_feeds::feeds::service::fetch_feed;
use outbreak_feeds::feeds::{FeedProfile, FeedQuery, Scope, TextFilter, profile, registry};
use outbreak_feeds::fetch::BasicClient;
use outbreak_feeds::forecast::forecast;
use outbreak_feeds::output::{export_filename, print_json, write_csv};
use outbreak_feeds::rate::{rate_per_100k, state_population};
use outbreak_feeds::window::clamp_months;

#[derive(Parser)]
#[command(name = "outbreak_feeds")]
#[command(about = "Fetch, normalize, and aggregate public food-safety data feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct QueryArgs {
    /// Geographic scope: US or a two-letter state code
    #[arg(short, long, default_value = "US")]
    scope: String,

    /// Months back from now (clamped per feed)
    #[arg(short, long)]
    months: Option<i64>,

    /// Case-insensitive substring filter on product/category
    #[arg(long)]
    product_q: Option<String>,

    /// Case-insensitive substring filter on etiology
    #[arg(long)]
    etiology: Option<String>,

    /// Case-insensitive substring filter on recall classification
    #[arg(long)]
    class: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one feed and print its normalized envelope as JSON
    Fetch {
        /// Feed id (see list-feeds)
        feed: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Surface upstream failures as error envelopes instead of demo data
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Also write a CSV export next to the current directory
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Fetch every configured feed concurrently and write one envelope each
    Snapshot {
        /// Directory to write per-feed JSON and CSV files
        #[arg(short, long, default_value = "snapshots")]
        output_dir: String,

        /// Maximum number of concurrent feed fetches
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        #[command(flatten)]
        query: QueryArgs,
    },
    /// Aggregate one feed into a time series, optionally with a forecast
    Series {
        feed: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Bucket size for grouping
        #[arg(short, long, value_enum, default_value_t = Bucket::Day)]
        bucket: Bucket,

        /// Reduction applied within each bucket
        #[arg(short, long, value_enum, default_value_t = Reducer::Sum)]
        reducer: Reducer,

        /// Project this many points past the end of the series
        #[arg(long, default_value_t = 0)]
        horizon: usize,

        /// Trailing points the forecast line is fitted over
        #[arg(long, default_value_t = 28)]
        trailing: usize,
    },
    /// Count one feed's events per state, with rates per 100k residents
    Tally {
        feed: String,

        #[command(flatten)]
        query: QueryArgs,
    },
    /// List configured feeds
    ListFeeds,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesResponse {
    series: Vec<outbreak_feeds::aggregate::TimeSeriesPoint>,
    forecast: Vec<outbreak_feeds::aggregate::TimeSeriesPoint>,
    /// Present only for feeds whose events carry a detection flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    detection: Option<DetectionSummary>,
    status: outbreak_feeds::envelope::Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    fetched_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TallyResponse {
    counts: std::collections::BTreeMap<&'static str, u64>,
    rates_per_100k: std::collections::BTreeMap<&'static str, u64>,
    status: outbreak_feeds::envelope::Status,
    fetched_at: chrono::DateTime<Utc>,
}

fn build_query(args: &QueryArgs) -> Result<FeedQuery> {
    let scope = Scope::parse(&args.scope)
        .ok_or_else(|| anyhow::anyhow!("unknown scope {:?}", args.scope))?;
    let mut filters = Vec::new();
    if let Some(q) = &args.product_q {
        filters.push(TextFilter {
            role: "category",
            needle: q.clone(),
        });
    }
    if let Some(q) = &args.etiology {
        filters.push(TextFilter {
            role: "category",
            needle: q.clone(),
        });
    }
    if let Some(q) = &args.class {
        filters.push(TextFilter {
            role: "classification",
            needle: q.clone(),
        });
    }
    Ok(FeedQuery {
        scope,
        months: args.months,
        filters,
    })
}

/// Runs one feed end to end and settles the result through the fallback
/// layer into an envelope.
async fn run_feed(
    client: &BasicClient,
    profile: &FeedProfile,
    query: &FeedQuery,
    strict: bool,
) -> Envelope<NormalizedEvent> {
    let policy = FallbackPolicy {
        never_throw: !strict,
    };
    with_fallback(
        fetch_feed(client, profile, query, Utc::now()),
        || demo_events(profile.id),
        policy,
        profile.cache,
    )
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/outbreak_feeds.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("outbreak_feeds.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            feed,
            query,
            strict,
            csv,
        } => {
            let profile = lookup(&feed)?;
            let q = build_query(&query)?;
            let client = BasicClient::new();
            let envelope = run_feed(&client, &profile, &q, strict).await;

            if csv {
                let months = clamp_months(
                    q.months.unwrap_or(i64::from(profile.default_months)),
                    profile.months_max,
                );
                let path = export_filename(profile.id, &q.scope, months);
                write_csv(&path, &envelope.data)?;
            }
            print_json(&envelope)?;
        }
        Commands::Snapshot {
            output_dir,
            concurrency,
            query,
        } => {
            snapshot_all(&output_dir, concurrency, &query).await?;
        }
        Commands::Series {
            feed,
            query,
            bucket,
            reducer,
            horizon,
            trailing,
        } => {
            let profile = lookup(&feed)?;
            let q = build_query(&query)?;
            let client = BasicClient::new();
            let envelope = run_feed(&client, &profile, &q, false).await;

            let series = aggregate(&envelope.data, bucket, reducer);
            let projected = if horizon > 0 {
                forecast(&series, trailing, horizon)
            } else {
                Vec::new()
            };
            print_json(&SeriesResponse {
                series,
                forecast: projected,
                detection: detection_summary(&envelope.data),
                status: envelope.status,
                detail: envelope.detail,
                fetched_at: envelope.fetched_at,
            })?;
        }
        Commands::Tally { feed, query } => {
            let profile = lookup(&feed)?;
            let q = build_query(&query)?;
            let client = BasicClient::new();
            let envelope = run_feed(&client, &profile, &q, false).await;

            let counts = tally(&envelope.data);
            let population = state_population();
            let rates = counts
                .iter()
                .map(|(code, n)| (*code, rate_per_100k(code, *n, population)))
                .collect();
            print_json(&TallyResponse {
                counts,
                rates_per_100k: rates,
                status: envelope.status,
                fetched_at: envelope.fetched_at,
            })?;
        }
        Commands::ListFeeds => {
            let feeds = registry();
            info!(total = feeds.len(), "Configured feeds");
            for p in &feeds {
                info!(
                    feed_id = p.id,
                    name = p.name,
                    source = p.source,
                    months_max = p.months_max,
                    "Feed"
                );
            }
        }
    }

    Ok(())
}

fn lookup(feed: &str) -> Result<FeedProfile> {
    profile(feed).ok_or_else(|| {
        let known: Vec<_> = registry().iter().map(|p| p.id).collect();
        anyhow::anyhow!("unknown feed {feed:?}; known feeds: {}", known.join(", "))
    })
}

/// Fetches all configured feeds concurrently (fan-out, wait-for-all) and
/// writes one envelope JSON plus a CSV per feed. One feed failing degrades
/// only its own files.
async fn snapshot_all(output_dir: &str, concurrency: usize, query_args: &QueryArgs) -> Result<()> {
    let query = build_query(query_args)?;

    std::fs::create_dir_all(output_dir)?;
    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));

    info!(
        feed_count = registry().len(),
        concurrency, "Starting snapshot"
    );

    let mut tasks = vec![];

    for profile in registry() {
        let sem = semaphore.clone();
        let output_dir = output_dir.to_string();
        let query = query.clone();

        let feed_span = tracing::info_span!("snapshot_feed", feed_id = profile.id);

        let task = tokio::spawn(
            async move {
                let Ok(_permit) = sem.acquire().await else {
                    return;
                };

                let client = BasicClient::new();
                let envelope = run_feed(&client, &profile, &query, false).await;

                info!(
                    status = ?envelope.status,
                    rows = envelope.data.len(),
                    "Feed settled"
                );

                let json_path = format!("{output_dir}/{}.json", profile.id);
                match serde_json::to_string_pretty(&envelope) {
                    Ok(body) => {
                        if let Err(e) = std::fs::write(&json_path, body) {
                            error!(path = %json_path, error = %e, "Failed to write envelope");
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to serialize envelope"),
                }

                // Full rewrite, not append: a re-run must replace the
                // previous snapshot's rows, same as the JSON envelope.
                let csv_path = format!("{output_dir}/{}.csv", profile.id);
                if let Err(e) = write_csv(&csv_path, &envelope.data) {
                    error!(path = %csv_path, error = %e, "Failed to write CSV export");
                }
            }
            .instrument(feed_span),
        );

        tasks.push(task);
    }

    // Wait for all tasks to complete
    for task in tasks {
        let _ = task.await;
    }

    info!(output_dir, "Snapshot complete");
    Ok(())
}

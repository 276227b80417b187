use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod analytics;
mod models;
mod period;
mod report;
mod source;

use crate::source::Source;

#[derive(Parser)]
#[command(name = "feedback-insights")]
#[command(about = "Derived analytics over course feedback from the feedback portal", long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .args(["input", "teacher"])
        .required(true)
        .multiple(false)
))]
struct Cli {
    /// JSON or CSV export of feedback records
    #[arg(long)]
    input: Option<PathBuf>,
    /// Fetch the feedback of this teacher from the portal backend
    #[arg(long)]
    teacher: Option<String>,
    /// Backend base URL (defaults to $FEEDBACK_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Newline-separated stop-word list
    #[arg(long)]
    stop_words: Option<PathBuf>,
    /// Add the list to the built-in stop words instead of replacing them
    #[arg(long, requires = "stop_words")]
    extend_stop_words: bool,
    /// Number of words kept in word-frequency views
    #[arg(long, default_value_t = analytics::DEFAULT_TOP_WORDS)]
    top: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overall statistics, category averages and quick insights
    Summary,
    /// Monthly sentiment counts
    Trends,
    /// Monthly submission volume
    Volume,
    /// Most frequent words in comments and suggestions
    Words,
    /// Category scores on a 0-5 scale
    Radar,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "feedback-report.md")]
        out: PathBuf,
    },
    /// Write every derived view as JSON
    Export {
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl Cli {
    fn source(&self) -> anyhow::Result<Source> {
        if let Some(path) = &self.input {
            return Ok(Source::File(path.clone()));
        }
        let teacher = self
            .teacher
            .clone()
            .context("either --input or --teacher must be given")?;
        let base_url = self
            .api_url
            .clone()
            .or_else(|| std::env::var("FEEDBACK_API_URL").ok())
            .unwrap_or_else(|| source::DEFAULT_API_URL.to_string());
        Ok(Source::Backend { base_url, teacher })
    }

    fn stop_words(&self) -> anyhow::Result<Vec<String>> {
        let custom = match &self.stop_words {
            Some(path) => {
                let words = source::load_stop_words(path)?;
                info!(
                    path = %path.display(),
                    words = words.len(),
                    extend = self.extend_stop_words,
                    "loaded stop words"
                );
                Some(words)
            }
            None => None,
        };
        Ok(source::resolve_stop_words(custom, self.extend_stop_words))
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("FEEDBACK_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let source = cli.source()?;
    let records = source::load(&source)
        .await
        .with_context(|| format!("failed to load feedback from {}", source.describe()))?;
    let stop_words = cli.stop_words()?;

    let undated = records
        .iter()
        .filter(|record| record.created_month().is_none())
        .count();
    if undated > 0 {
        warn!(undated, "records without a parseable created_at are left out of monthly views");
    }

    match cli.command {
        Commands::Summary => {
            let stats = analytics::aggregate_stats(&records);
            let insights = analytics::quick_insights(&records, &stop_words, cli.top);

            if stats.total == 0 {
                println!("No feedback found.");
                return Ok(());
            }

            println!(
                "{} responses, average rating {}/5, {} positive ({:.1}%), {} negative",
                stats.total, stats.avg_rating, stats.positive, insights.positive_rate, stats.negative
            );
            if let Some(averages) = analytics::average_ratings(&records) {
                println!("Category averages:");
                for average in averages {
                    println!("- {}: {:.2}", average.category, average.value);
                }
            }
            let distribution = analytics::sentiment_distribution(&records);
            println!(
                "Sentiment labels: {} positive, {} neutral, {} negative",
                distribution.positive, distribution.neutral, distribution.negative
            );
            println!("Overall rating distribution:");
            for bucket in analytics::rating_distribution(&records) {
                println!("- {}: {}", bucket.rating, bucket.count);
            }
            println!(
                "Most active period: {}",
                insights.most_active_period.as_deref().unwrap_or("N/A")
            );
            println!(
                "Top feedback word: {}",
                insights.top_word.as_deref().unwrap_or("N/A")
            );
        }
        Commands::Trends => {
            let trends = analytics::sentiment_trends(&records);
            if trends.is_empty() {
                println!("No dated feedback found.");
                return Ok(());
            }
            for bucket in trends {
                println!(
                    "{}: {} positive, {} neutral, {} negative of {}",
                    bucket.month, bucket.positive, bucket.neutral, bucket.negative, bucket.total
                );
            }
        }
        Commands::Volume => {
            let volume = analytics::volume_by_month(&records);
            if volume.is_empty() {
                println!("No dated feedback found.");
                return Ok(());
            }
            for entry in volume {
                println!("{}: {}", entry.month, entry.count);
            }
        }
        Commands::Words => {
            let words = analytics::word_frequency(&records, &stop_words, cli.top);
            if words.is_empty() {
                println!("No words found in comments or suggestions.");
                return Ok(());
            }
            for entry in words {
                println!("{} {} (size {})", entry.word, entry.count, entry.size);
            }
        }
        Commands::Radar => {
            for score in analytics::radar_scores(&records) {
                println!("{}: {:.2}/{}", score.category, score.score, score.full_mark);
            }
        }
        Commands::Report { out } => {
            let dashboard = analytics::dashboard(&records, &stop_words, cli.top);
            let scope = match &source {
                Source::Backend { teacher, .. } => Some(format!("teacher {teacher}")),
                Source::File(_) => None,
            };
            let report = report::build_report(scope.as_deref(), &dashboard);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let dashboard = analytics::dashboard(&records, &stop_words, cli.top);
            let json = serde_json::to_string_pretty(&dashboard)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

mod diagnostics;
mod discovery;
mod fetch;
mod harvest;
mod model;
mod pagination;
mod parser;
mod settings;
mod sink;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use diagnostics::{DiagnosticKind, Diagnostics};
use fetch::HttpFetcher;
use harvest::Harvester;
use settings::Settings;
use sink::CsvSink;

#[derive(Parser)]
#[command(
    name = "distributor_harvest",
    about = "Harvest distributor licensing windows for streaming catalogs"
)]
struct Cli {
    /// Configuration file (default: ./harvest.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Output directory for the CSV files
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Scope {
    /// Seed name (default: every configured seed)
    #[arg(short, long)]
    seed: Option<String>,
    /// Listing pages to walk per seed (50 titles each)
    #[arg(short, long, default_value = "1")]
    pages: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured distributor seeds
    Seeds,
    /// Print the listing page URLs that discovery would fetch
    Pages {
        #[command(flatten)]
        scope: Scope,
    },
    /// Discover titles without enriching them
    Discover {
        #[command(flatten)]
        scope: Scope,
        /// Print titles as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Discover + details + company credits, appended to CSV
    Run {
        #[command(flatten)]
        scope: Scope,
        /// Max titles to enrich per seed
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Year that closes open-ended distribution windows
        #[arg(long)]
        as_of: Option<i32>,
    },
    /// Collect first-page review dates and ratings, appended to CSV
    Reviews {
        #[command(flatten)]
        scope: Scope,
        /// Max titles per seed
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output {
        settings.output_dir = dir;
    }

    let result = match cli.command {
        Commands::Seeds => {
            for s in &settings.seeds {
                println!("{:<12} {}", s.name, s.url);
            }
            Ok(())
        }
        Commands::Pages { scope } => {
            for seed in settings.selected_seeds(scope.seed.as_deref())? {
                for url in pagination::generate_page_urls(&seed.url, scope.pages) {
                    println!("{}\t{}", seed.name, url);
                }
            }
            Ok(())
        }
        Commands::Discover { scope, json } => {
            let fetcher = HttpFetcher::new(&settings)?;
            let harvester = Harvester::new(&fetcher, &settings);
            for seed in settings.selected_seeds(scope.seed.as_deref())? {
                let mut diags = Diagnostics::new();
                let titles = harvester.discover(&seed, scope.pages, &mut diags).await;
                if json {
                    for t in &titles {
                        println!("{}", serde_json::to_string(t)?);
                    }
                    continue;
                }
                println!("{:>4} | {:<11} | {:<40}", "#", "Id", "Title");
                println!("{}", "-".repeat(62));
                for (i, t) in titles.iter().enumerate() {
                    println!("{:>4} | {:<11} | {:<40}", i + 1, t.id, truncate(&t.title, 40));
                }
                if diags.is_empty() {
                    println!("\n[{}] {} titles", seed.name, titles.len());
                } else {
                    println!(
                        "\n[{}] {} titles ({} diagnostics, {} pages failed)",
                        seed.name,
                        titles.len(),
                        diags.entries().len(),
                        diags.count(DiagnosticKind::FetchFailed)
                    );
                    for d in diags.entries() {
                        println!("  {:<20} {:<11} {}", d.kind, d.title_id, truncate(&d.detail, 60));
                    }
                }
            }
            Ok(())
        }
        Commands::Run { scope, limit, as_of } => {
            if as_of.is_some() {
                settings.as_of_year = as_of;
            }
            let as_of_year = settings.require_as_of_year()?;
            let seeds = settings.selected_seeds(scope.seed.as_deref())?;
            let sink = CsvSink::open(&settings.output_dir)?;
            let fetcher = HttpFetcher::new(&settings)?;
            let harvester = Harvester::new(&fetcher, &settings);

            for seed in &seeds {
                let t_seed = Instant::now();
                let report = harvester
                    .run_seed(seed, scope.pages, limit, as_of_year, &sink)
                    .await?;
                report.print();
                println!("[{}] done in {}", seed.name, format_duration(t_seed.elapsed()));
            }
            Ok(())
        }
        Commands::Reviews { scope, limit } => {
            let seeds = settings.selected_seeds(scope.seed.as_deref())?;
            let sink = CsvSink::open(&settings.output_dir)?;
            let fetcher = HttpFetcher::new(&settings)?;
            let harvester = Harvester::new(&fetcher, &settings);

            for seed in &seeds {
                harvester
                    .run_reviews(seed, scope.pages, limit, &sink)
                    .await?
                    .print();
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

mod aggregate;
mod cache;
mod config;
mod db;
mod enrich;
mod extract;
mod models;
mod pipeline;
mod sources;
mod trends;
mod tui;

use anyhow::Result;
use cache::FetchCache;
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::Config;
use db::Database;
use enrich::{GeminiEnricher, SkillEnricher};
use pipeline::{RefreshRequest, RefreshSnapshot, Refresher};
use sources::{SourceKind, source_for};
use trends::{DEFAULT_TOP_MOVERS, TrendReport, aggregate_runs_by_day, compare_to_yesterday};

#[derive(Parser)]
#[command(name = "skillpulse")]
#[command(about = "Job market intelligence - fetch postings, extract skill signals, track trends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FetchArgs {
    /// Data source to query
    #[arg(short, long, value_enum, default_value = "adzuna")]
    source: SourceKind,

    /// Search keyword
    #[arg(short, long, default_value = "product manager")]
    keyword: String,

    /// Search location
    #[arg(short, long, default_value = "United States")]
    location: String,

    /// Max results per refresh
    #[arg(short, long, default_value = "50")]
    results: u32,

    /// Enrich a capped subset of postings with AI skill extraction
    #[arg(long)]
    ai: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Fetch live postings, extract signals, persist snapshots
    Refresh {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Show today's risers and decliners vs yesterday
    Movers {
        /// Number of movers per direction
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show the stored daily history for one skill
    History {
        /// Skill name (lowercase)
        skill: String,

        /// Number of days to look back
        #[arg(short, long, default_value = "14")]
        days: usize,
    },

    /// Show recent refresh runs, aggregated by day
    Runs {
        /// Number of days to look back
        #[arg(short, long, default_value = "14")]
        days: usize,
    },

    /// Interactive dashboard
    Dashboard {
        #[command(flatten)]
        fetch: FetchArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    let db = Database::open(&config)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            match db.path() {
                Some(path) => println!("Database initialized at {}", path.display()),
                None => println!("Database initialized."),
            }
        }

        Commands::Refresh { fetch } => {
            db.ensure_initialized()?;
            let snapshot = run_refresh(&db, &config, &fetch)?;
            print_snapshot(&snapshot);
            println!("\nArchive total: {} postings", db.posting_count()?);
        }

        Commands::Movers { limit } => {
            db.ensure_initialized()?;
            let today = Utc::now().format("%Y-%m-%d").to_string();
            let current = db.counts_for_date(&today)?;
            let previous = db.yesterday_counts(&today)?;
            match compare_to_yesterday(&current, &previous, limit) {
                TrendReport::InsufficientHistory => {
                    println!(
                        "Not enough history yet. Refresh today and again tomorrow to unlock movers."
                    );
                }
                TrendReport::Movers { risers, decliners } => {
                    println!("Top risers vs yesterday");
                    print_movers(&risers);
                    println!();
                    println!("Top decliners vs yesterday");
                    print_movers(&decliners);
                }
            }
        }

        Commands::History { skill, days } => {
            db.ensure_initialized()?;
            let skill = skill.to_lowercase();
            let history = db.load_skill_history(&skill, days)?;
            if history.is_empty() {
                println!("No history for '{}' yet.", skill);
            } else {
                println!("{:<12} {:>6}", "DATE", "COUNT");
                println!("{}", "-".repeat(19));
                for point in history {
                    println!("{:<12} {:>6}", point.date, point.count);
                }
            }
        }

        Commands::Runs { days } => {
            db.ensure_initialized()?;
            // rough: up to ~6 refreshes/day
            let runs = db.load_recent_runs(days * 6)?;
            if runs.is_empty() {
                println!("No run history yet. Refresh live data a few times to build trends.");
            } else {
                println!(
                    "{:<20} {:<8} {:<20} {:>6} {:>10} {:>8}",
                    "RUN TS", "SOURCE", "KEYWORD", "JOBS", "COMPANIES", "REMOTE"
                );
                println!("{}", "-".repeat(78));
                for run in &runs {
                    println!(
                        "{:<20} {:<8} {:<20} {:>6} {:>10} {:>7.1}%",
                        run.run_ts,
                        run.source,
                        truncate(&run.keyword, 18),
                        run.jobs_fetched,
                        run.unique_companies,
                        run.remote_share * 100.0
                    );
                }

                println!("\nBy day:");
                for day in aggregate_runs_by_day(&runs) {
                    println!(
                        "  {}  jobs {:>5}  companies {:>4}  remote {:>5.1}%",
                        day.date,
                        day.jobs_fetched,
                        day.unique_companies,
                        day.remote_share * 100.0
                    );
                }
            }
        }

        Commands::Dashboard { fetch } => {
            db.ensure_initialized()?;
            let refresher = Refresher::new(config.clone())?;
            let source = source_for(fetch.source, &config)?;
            let enricher = enricher_for(&fetch, &config);
            let mut cache = FetchCache::new(config.cache_ttl);
            let request = request_from(&fetch, &config);
            tui::run_dashboard(
                &db,
                &mut cache,
                &refresher,
                source.as_ref(),
                enricher.as_deref(),
                &request,
            )?;
        }
    }

    Ok(())
}

fn request_from(fetch: &FetchArgs, config: &Config) -> RefreshRequest {
    RefreshRequest {
        keyword: fetch.keyword.trim().to_string(),
        location: fetch.location.trim().to_string(),
        max_results: fetch.results.min(config.max_results),
        enable_ai: fetch.ai,
    }
}

fn enricher_for(fetch: &FetchArgs, config: &Config) -> Option<Box<dyn SkillEnricher>> {
    if !fetch.ai {
        return None;
    }
    match GeminiEnricher::from_config(config) {
        Some(enricher) => Some(Box::new(enricher)),
        None => {
            println!("GEMINI_API_KEY not set; continuing with keyword extraction only.");
            None
        }
    }
}

fn run_refresh(db: &Database, config: &Config, fetch: &FetchArgs) -> Result<RefreshSnapshot> {
    let refresher = Refresher::new(config.clone())?;
    let source = source_for(fetch.source, config)?;
    let enricher = enricher_for(fetch, config);
    let mut cache = FetchCache::new(config.cache_ttl);
    let request = request_from(fetch, config);

    println!(
        "Fetching up to {} postings from {} ({} / {})...",
        request.max_results,
        fetch.source.display_name(),
        request.keyword,
        request.location
    );
    refresher.refresh(db, &mut cache, source.as_ref(), enricher.as_deref(), &request)
}

fn print_snapshot(snapshot: &RefreshSnapshot) {
    println!(
        "Run {}: {} jobs, {} companies, {:.1}% remote",
        snapshot.run.run_id,
        snapshot.run.jobs_fetched,
        snapshot.run.unique_companies,
        snapshot.run.remote_share * 100.0
    );
    if snapshot.ai_enriched > 0 {
        println!("AI-enriched postings: {}", snapshot.ai_enriched);
    }

    if snapshot.skill_counts.is_empty() {
        println!("\nNo skills matched in this batch.");
    } else {
        println!("\nTop skills (this refresh):");
        println!("{:<22} {:>6}", "SKILL", "COUNT");
        println!("{}", "-".repeat(29));
        for count in snapshot.skill_counts.iter().take(10) {
            println!("{:<22} {:>6}", truncate(&count.skill, 20), count.count);
        }
    }

    if !snapshot.role_mix.is_empty() {
        println!("\nRole mix:");
        for (role, count) in &snapshot.role_mix {
            println!("  {:<16} {:>4}", role.as_str(), count);
        }
    }

    let companies = aggregate::company_leaderboard(&snapshot.postings);
    if !companies.is_empty() {
        println!("\nTop companies:");
        for (company, count) in companies.iter().take(10) {
            println!("  {:<30} {:>4}", truncate(company, 28), count);
        }
    }

    if !snapshot.skill_pairs.is_empty() {
        println!("\nCo-occurring skills (top pairs):");
        for pair in &snapshot.skill_pairs {
            println!(
                "  {} + {} ({})",
                pair.skill_a, pair.skill_b, pair.co_occurrences
            );
        }
    }

    match &snapshot.trend {
        TrendReport::InsufficientHistory => {
            println!("\nNot enough history yet for movers. Refresh again tomorrow.");
        }
        TrendReport::Movers { risers, decliners } => {
            println!("\nTop risers vs yesterday:");
            print_movers(&risers[..risers.len().min(DEFAULT_TOP_MOVERS)]);
            println!("\nTop decliners vs yesterday:");
            print_movers(&decliners[..decliners.len().min(DEFAULT_TOP_MOVERS)]);
        }
    }
}

fn print_movers(deltas: &[trends::SkillDelta]) {
    for d in deltas {
        println!(
            "  {:<20} {:+4} ({:.0}%)  today {} / yesterday {}",
            truncate(&d.skill, 18),
            d.delta,
            d.pct_delta,
            d.today,
            d.yesterday
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let cut = max.saturating_sub(3);
    let end = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= cut)
        .last()
        .unwrap_or(0);
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("python", 10), "python");
        assert_eq!(truncate("machine learning", 10), "machine...");
    }

    #[test]
    fn truncate_clamps_to_char_boundaries() {
        // multi-byte company names must not split mid-character
        let name = "ソフトバンクグループ株式会社";
        let cut = truncate(name, 28);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 28);
        assert_eq!(truncate("日本", 28), "日本");
    }
}

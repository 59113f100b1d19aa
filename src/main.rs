use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use election_insight::analysis::filter::{CandidateFilter, ScoreRange, StatusFilter};
use election_insight::analysis::report::ElectionReport;
use election_insight::analysis::{
    CandidateAnalysis, CandidateProfile, PartyPerformance, PartyStats, ProvinceAnalysis,
    RegionAnalysis, SeatAnalysis, SeatBuckets, SeatCategory,
};
use election_insight::config::{Config, ConfigOverrides};
use election_insight::ingest::{load_years, SourceKind};
use election_insight::model::{CandidateId, PartyId, ProvinceId, RegionId, Snapshot};
use election_insight::output::csv::{
    candidates_to_csv, party_stats_to_csv, provinces_to_csv, regions_to_csv, seats_to_csv,
    trend_to_csv,
};
use election_insight::output::json::render_json;
use election_insight::output::table::{
    render_candidate_profile_table, render_candidates_table, render_elections_table, render_party_performance_table,
    render_party_stats_table, render_provinces_table, render_regions_table,
    render_seat_summary_table, render_seats_table, render_trend_table,
};
use election_insight::server::run_server;
use election_insight::snapshot::store::SnapshotStore;
use election_insight::trend::{analyze_trends, TrendReport};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "election-insight",
    about = "Constituency election analytics",
    version
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Election year to analyze. Defaults to `current_year`, then the latest configured year.
    #[arg(short, long)]
    year: Option<u16>,
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct FilterArgs {
    #[arg(long, value_delimiter = ',')]
    party: Vec<u32>,
    #[arg(long, value_delimiter = ',')]
    province: Vec<u32>,
    #[arg(long, value_delimiter = ',')]
    region: Vec<u32>,
    /// all, winner, loser or competitive.
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    #[arg(long = "min-score")]
    min_score: Option<u64>,
    #[arg(long = "max-score")]
    max_score: Option<u64>,
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn to_filter(&self, query: Option<String>) -> Result<CandidateFilter> {
        let score_range = ScoreRange {
            min: self.min_score.unwrap_or(0),
            max: self.max_score.unwrap_or(u64::MAX),
        };
        if score_range.min > score_range.max {
            return Err(anyhow!("--min-score is above --max-score"));
        }
        Ok(CandidateFilter {
            query,
            parties: self.party.iter().copied().map(PartyId).collect(),
            provinces: self.province.iter().copied().map(ProvinceId).collect(),
            regions: self
                .region
                .iter()
                .copied()
                .map(RegionId)
                .collect::<BTreeSet<_>>(),
            score_range,
            status: self.status,
        })
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    Candidates {
        #[command(flatten)]
        filter: FilterArgs,
    },
    Candidate {
        id: u64,
    },
    Search {
        query: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Seats {
        /// safe, marginal, competitive or toss_up.
        #[arg(long)]
        category: Option<SeatCategory>,
    },
    Targets {
        #[arg(long)]
        category: Option<SeatCategory>,
        #[arg(long)]
        party: Option<u32>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Provinces,
    Regions,
    Parties,
    Party {
        id: u32,
    },
    Trend,
    Years,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    let (host, port) = match &cli.command {
        Commands::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    config.apply_overrides(ConfigOverrides {
        current_year: cli.year,
        db_path: cli.db.clone(),
        host,
        port,
    });

    match &cli.command {
        Commands::Config { init, show } => {
            return handle_config_command(*init, *show, &config, &config_path);
        }
        Commands::Serve { .. } => {
            let bind = format!("{}:{}", config.server.host, config.server.port);
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            return run_server(config, addr).await;
        }
        Commands::Years => return print_years(&config, cli.output),
        Commands::Trend => {
            let data = load_years(&config, None).await?;
            let report = analyze_trends(&data)?;
            return print_trend(&report, config.analysis.percent_decimals, cli.output);
        }
        _ => {}
    }

    let year = config
        .selected_year()
        .ok_or_else(|| anyhow!("no election years configured"))?;
    let data = load_years(&config, Some(year)).await?;
    let election = data
        .year(year)
        .ok_or_else(|| anyhow!("election year {year} did not load"))?;
    let report = ElectionReport::build(election);
    let decimals = config.analysis.percent_decimals;

    match &cli.command {
        Commands::Candidates { filter } => {
            let matches = limited(report.search(&filter.to_filter(None)?), filter.limit);
            print_candidates(&matches, decimals, cli.output)?;
        }
        Commands::Candidate { id } => {
            let profile = report
                .candidate(CandidateId(*id))
                .ok_or_else(|| anyhow!("candidate {id} not found in {}", election.label))?;
            print_candidate(&profile, decimals, cli.output)?;
        }
        Commands::Search { query, filter } => {
            let matches = limited(
                report.search(&filter.to_filter(Some(query.clone()))?),
                filter.limit,
            );
            print_candidates(&matches, decimals, cli.output)?;
        }
        Commands::Seats { category } => {
            let buckets = match category {
                Some(category) => SeatBuckets::from_seats(report.seats.bucket(*category).to_vec()),
                None => report.seats.clone(),
            };
            print_seats(&buckets, decimals, cli.output)?;
        }
        Commands::Targets {
            category,
            party,
            limit,
        } => {
            let targets = limited(report.targets(*category, party.map(PartyId)), Some(*limit));
            print_seat_list(&targets, decimals, cli.output)?;
        }
        Commands::Provinces => {
            let provinces = report.provinces(config.analysis.province_competitive_rule);
            print_provinces(&provinces, &election.snapshot, decimals, cli.output)?;
        }
        Commands::Regions => {
            let regions = report.regions(config.analysis.region_competitive_rule);
            print_regions(&regions, decimals, cli.output)?;
        }
        Commands::Parties => print_party_stats(&report.party_stats(), cli.output)?,
        Commands::Party { id } => {
            let performance = report
                .party(PartyId(*id))
                .ok_or_else(|| anyhow!("party {id} not found in {}", election.label))?;
            print_party(&performance, decimals, cli.output)?;
        }
        Commands::Trend | Commands::Years | Commands::Serve { .. } | Commands::Config { .. } => {
            unreachable!("handled before loading a single year")
        }
    }

    Ok(())
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn limited<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

fn print_years(config: &Config, format: OutputFormat) -> Result<()> {
    let db_path = config.resolved_db_path();
    let stored = if config.years.iter().any(|y| y.source == SourceKind::Sqlite)
        || db_path.exists()
    {
        SnapshotStore::open(&db_path)?.elections()?
    } else {
        Vec::new()
    };
    match format {
        OutputFormat::Table => {
            for year in &config.years {
                let marker = if Some(year.year) == config.selected_year() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {} [{}] {}",
                    year.display_label(),
                    year.source,
                    year.description
                );
            }
            if !stored.is_empty() {
                println!("{}", render_elections_table(&stored));
            }
        }
        OutputFormat::Json => println!("{}", render_json(&stored)?),
        OutputFormat::Csv => {
            warn!("CSV output for years not implemented, using JSON");
            println!("{}", render_json(&stored)?);
        }
    }
    Ok(())
}

fn print_candidates(
    candidates: &[&CandidateAnalysis],
    decimals: usize,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_candidates_table(candidates, decimals)),
        OutputFormat::Json => println!("{}", render_json(candidates)?),
        OutputFormat::Csv => println!("{}", candidates_to_csv(candidates)?),
    }
    Ok(())
}

fn print_candidate(profile: &CandidateProfile, decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_candidate_profile_table(profile, decimals))
        }
        OutputFormat::Json => println!("{}", render_json(profile)?),
        OutputFormat::Csv => {
            let rows = std::iter::once(&profile.candidate)
                .chain(&profile.competitors)
                .collect::<Vec<_>>();
            println!("{}", candidates_to_csv(&rows)?);
        }
    }
    Ok(())
}

fn print_seats(buckets: &SeatBuckets, decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_seat_summary_table(buckets, decimals));
            let seats = buckets.all.iter().collect::<Vec<_>>();
            println!("{}", render_seats_table(&seats, decimals));
        }
        OutputFormat::Json => println!("{}", render_json(buckets)?),
        OutputFormat::Csv => {
            let seats = buckets.all.iter().collect::<Vec<_>>();
            println!("{}", seats_to_csv(&seats)?);
        }
    }
    Ok(())
}

fn print_seat_list(seats: &[&SeatAnalysis], decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_seats_table(seats, decimals)),
        OutputFormat::Json => println!("{}", render_json(seats)?),
        OutputFormat::Csv => println!("{}", seats_to_csv(seats)?),
    }
    Ok(())
}

fn print_provinces(
    provinces: &[ProvinceAnalysis],
    snapshot: &Snapshot,
    decimals: usize,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_provinces_table(provinces, snapshot, decimals))
        }
        OutputFormat::Json => println!("{}", render_json(provinces)?),
        OutputFormat::Csv => println!("{}", provinces_to_csv(provinces)?),
    }
    Ok(())
}

fn print_regions(regions: &[RegionAnalysis], decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_regions_table(regions, decimals)),
        OutputFormat::Json => println!("{}", render_json(regions)?),
        OutputFormat::Csv => println!("{}", regions_to_csv(regions)?),
    }
    Ok(())
}

fn print_party_stats(stats: &[PartyStats], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_party_stats_table(stats)),
        OutputFormat::Json => println!("{}", render_json(stats)?),
        OutputFormat::Csv => println!("{}", party_stats_to_csv(stats)?),
    }
    Ok(())
}

fn print_party(performance: &PartyPerformance, decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_party_performance_table(performance, decimals))
        }
        OutputFormat::Json => println!("{}", render_json(performance)?),
        OutputFormat::Csv => {
            warn!("CSV output for party not implemented, using JSON");
            println!("{}", render_json(performance)?);
        }
    }
    Ok(())
}

fn print_trend(report: &TrendReport, decimals: usize, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_trend_table(report, decimals)),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", trend_to_csv(report)?),
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hots_draft::analysis::profile_store::ProfileFetcher;
use hots_draft::api::client::HeroesProfileClient;
use hots_draft::cache::ProfileCache;
use hots_draft::catalog::combine::{combine_files, CombineOptions};
use hots_draft::catalog::dataset::COMBINED_FILE;
use hots_draft::catalog::{Role, StatsCatalog};
use hots_draft::config::Config;
use hots_draft::display::output::{
    display_combine_summary, display_draft_board, display_error, display_info,
    display_recent_teams, display_recommendations, display_success, display_warning,
};
use hots_draft::draft::session::DraftSession;
use hots_draft::draft::TeamSide;
use hots_draft::error::AppError;
use hots_draft::teams::RecentTeams;
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hots-draft")]
#[command(about = "Hero draft pick and ban recommendations", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Saved teams file (default: ~/.hots_draft/recent_teams.json)
    #[arg(long)]
    teams_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank heroes for one side of a draft
    Recommend(RecommendArgs),

    /// Build hero_data_combined.json from raw stats and matchup exports
    Combine {
        /// Raw hero stats JSON
        #[arg(long)]
        stats: PathBuf,

        /// Raw matchup counts JSON
        #[arg(long)]
        matchups: PathBuf,

        /// Output file (default: <data dir>/hero_data_combined.json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Confidence level for the Wilson interval
        #[arg(long, default_value = "0.80")]
        confidence: f64,

        /// Samples below this many games get a zero delta
        #[arg(long, default_value = "100")]
        min_games: u32,

        /// Cap on the absolute delta
        #[arg(long, default_value = "5.0")]
        max_delta: f64,
    },

    /// List saved teams
    Teams,
}

#[derive(Args)]
struct RecommendArgs {
    /// Directory holding hero_data_combined.json (default: HOTS_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Map name
    #[arg(long)]
    map: Option<String>,

    /// Side to recommend for
    #[arg(long, default_value = "blue")]
    side: String,

    /// Heroes already picked by your team (comma separated)
    #[arg(long, value_delimiter = ',')]
    allies: Vec<String>,

    /// Heroes already picked by the enemy team
    #[arg(long, value_delimiter = ',')]
    enemies: Vec<String>,

    /// Heroes banned by your team
    #[arg(long, value_delimiter = ',')]
    bans: Vec<String>,

    /// Heroes banned by the enemy team
    #[arg(long, value_delimiter = ',')]
    enemy_bans: Vec<String>,

    /// Battletags on your team (Name#1234, comma separated)
    #[arg(long, value_delimiter = ',')]
    players: Vec<String>,

    /// Load players from a saved team
    #[arg(long)]
    team: Option<String>,

    /// Save the players under this name
    #[arg(long)]
    save_team: Option<String>,

    /// Only show these roles (comma separated)
    #[arg(long, value_delimiter = ',')]
    roles: Vec<String>,

    /// Number of heroes to display
    #[arg(short, long, default_value = "10")]
    top_n: usize,

    /// Ignore cached player profiles
    #[arg(long)]
    refresh: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli) {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let teams_path = cli.teams_file.unwrap_or_else(RecentTeams::default_path);

    match cli.command {
        Commands::Recommend(args) => recommend(&config, &teams_path, args),
        Commands::Combine {
            stats,
            matchups,
            output,
            confidence,
            min_games,
            max_delta,
        } => {
            let output = output.unwrap_or_else(|| config.data_dir.join(COMBINED_FILE));
            let options = CombineOptions {
                confidence_level: confidence,
                min_games,
                max_delta,
            };
            let dataset = combine_files(&stats, &matchups, &output, &options)
                .with_context(|| format!("combining {} and {}", stats.display(), matchups.display()))?;
            display_combine_summary(&dataset, &output.display().to_string());
            Ok(())
        }
        Commands::Teams => {
            let teams = RecentTeams::load(&teams_path)?;
            display_recent_teams(teams.list());
            Ok(())
        }
    }
}

fn recommend(config: &Config, teams_path: &Path, args: RecommendArgs) -> Result<()> {
    let side: TeamSide = args.side.parse()?;
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let catalog = StatsCatalog::load(&data_dir)
        .with_context(|| format!("loading hero data from {}", data_dir.display()))?;
    if let Some(patch) = &catalog.metadata().stats_patch {
        display_info(&format!("Hero stats from patch {}", patch));
    }

    let mut session = DraftSession::new(Arc::new(catalog), config.scoring_settings());

    if let Some(map) = &args.map {
        session.select_map(Some(map.as_str()))?;
    }
    for hero in &args.bans {
        session.ban_next(side, hero)?;
    }
    for hero in &args.enemy_bans {
        session.ban_next(side.opponent(), hero)?;
    }
    for hero in &args.allies {
        session.pick_next(side, hero)?;
    }
    for hero in &args.enemies {
        session.pick_next(side.opponent(), hero)?;
    }

    let mut recent = RecentTeams::load(teams_path)?;
    let mut players: Vec<String> = match &args.team {
        Some(name) => recent.require(name)?.battletags.clone(),
        None => Vec::new(),
    };
    for player in &args.players {
        if !players.iter().any(|p| p.eq_ignore_ascii_case(player.trim())) {
            players.push(player.trim().to_string());
        }
    }

    if !players.is_empty() {
        let client = HeroesProfileClient::new(config)?
            .with_cache(ProfileCache::new(ProfileCache::default_dir(), config.cache_ttl_days))
            .bypass_cache(args.refresh);
        add_players(&mut session, side, &players, &client);

        if let Some(name) = &args.save_team {
            recent.add(name, &players);
            recent.save()?;
            display_success(&format!("Saved team '{}'", name));
        }
    }

    if !args.roles.is_empty() {
        let roles = args
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<BTreeSet<Role>, AppError>>()?;
        session.set_role_filter(side, roles);
    }

    display_draft_board(&session);
    display_recommendations(session.recommendations(side), side, args.top_n);
    Ok(())
}

fn add_players<F>(session: &mut DraftSession, side: TeamSide, players: &[String], fetcher: &F)
where
    F: ProfileFetcher + Sync,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Fetching {} player profiles...", players.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let results = session.add_players(side, players, fetcher);
    spinner.finish_and_clear();

    for (player, result) in players.iter().zip(results) {
        match result {
            Ok(_) => display_success(&format!("Loaded {}", player)),
            Err(e) => display_warning(&format!("{}: {}", player, e)),
        }
    }
}

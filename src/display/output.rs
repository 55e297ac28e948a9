use crate::analysis::profile_store::ProfileStatus;
use crate::analysis::recommender::Recommendation;
use crate::analysis::scoring::ScoreTag;
use crate::catalog::dataset::CombinedDataset;
use crate::draft::session::DraftSession;
use crate::draft::{TeamSide, PICK_SLOTS};
use crate::teams::RecentTeam;
use colored::*;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct RecommendationRow {
    rank: String,
    hero: String,
    role: String,
    #[tabled(rename = "win %")]
    win_rate: String,
    total: String,
    global: String,
    map: String,
    enemies: String,
    allies: String,
    player: String,
    tags: String,
}

#[derive(Tabled)]
struct PickRow {
    #[tabled(rename = "#")]
    slot: String,
    hero: String,
    player: String,
}

#[derive(Tabled)]
struct TeamRow {
    rank: String,
    name: String,
    players: String,
    saved: String,
}

fn signed(value: f64) -> String {
    format!("{:+.1}", value)
}

fn format_tags(tags: &[ScoreTag]) -> String {
    tags.iter()
        .map(|tag| {
            if tag.is_positive() {
                tag.text.green().to_string()
            } else {
                tag.text.red().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn recommendation_rows(recommendations: &[Recommendation], top_n: usize) -> Vec<RecommendationRow> {
    recommendations
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, rec)| RecommendationRow {
            rank: format!("#{}", idx + 1),
            hero: rec.hero.name.clone(),
            role: rec.hero.role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()),
            win_rate: format!("{:.1}%", rec.expected_win_rate),
            total: signed(rec.total_delta),
            global: signed(rec.breakdown.global),
            map: signed(rec.breakdown.map),
            enemies: signed(rec.breakdown.vs_enemies),
            allies: signed(rec.breakdown.with_allies),
            player: signed(rec.breakdown.player_delta),
            tags: format_tags(&rec.tags),
        })
        .collect()
}

pub fn display_recommendations(recommendations: &[Recommendation], side: TeamSide, top_n: usize) {
    println!(
        "\n{}",
        format!("🎮 Pick Recommendations for {} ", side).bold().cyan()
    );
    println!("{}\n", "=".repeat(60).cyan());

    if recommendations.is_empty() {
        println!(
            "{}",
            "No recommendations yet (select a map or enter a pick)".yellow()
        );
        return;
    }

    let mut table = Table::new(recommendation_rows(recommendations, top_n));
    table.with(Style::rounded());
    println!("{}", table);

    println!("\n{}", "Interpretation".bold().yellow());
    println!("• Win %: 50 plus the sum of every delta in the row");
    println!("• Map / Enemies / Allies: percentage points from map, matchup and synergy data");
    println!("• Player: your best teammate's personal delta on the hero (25+ games)\n");

    if let Some(top) = recommendations.first() {
        println!("{}", "Top Pick".bold().green());
        println!(
            "  {} at {:.1}% expected win rate ({})",
            top.hero.name,
            top.expected_win_rate,
            signed(top.total_delta)
        );
        if let Some(player) = &top.player {
            println!("  {} Personal stats from {}", "👤".cyan(), player);
        }
    }

    println!();
}

pub fn display_draft_board(session: &DraftSession) {
    let catalog = session.catalog();
    if let Some(map) = session.context().selected_map() {
        println!("\n{} {}", "🗺️  Map:".bold(), catalog.map_name(map));
    }

    for side in TeamSide::ALL {
        let team = session.draft().team(side);
        let roster = session.players().roster(side);
        let bans: Vec<&str> = team.banned_heroes().map(|h| catalog.hero_name(h)).collect();

        let header = format!("{} team", side.to_string().to_uppercase());
        let header = match side {
            TeamSide::Blue => header.bold().blue(),
            TeamSide::Red => header.bold().red(),
        };
        println!("\n{}  {} {}", header, "Bans:".dimmed(), if bans.is_empty() { "-".to_string() } else { bans.join(", ") });

        let mut rows = vec![];
        for slot in 0..PICK_SLOTS {
            let hero = team.picks()[slot]
                .as_deref()
                .map(|h| catalog.hero_name(h).to_string())
                .unwrap_or_else(|| "-".to_string());
            let player = team.assignments()[slot]
                .and_then(|p| roster.slot(p))
                .map(|p| {
                    let marker = if team.manual_assignment()[slot] { " (manual)" } else { "" };
                    match &p.status {
                        ProfileStatus::Ready(_) => format!("{}{}", p.identifier, marker),
                        ProfileStatus::Pending => format!("{} (loading){}", p.identifier, marker),
                        ProfileStatus::Failed(_) => format!("{} (no stats){}", p.identifier, marker),
                    }
                })
                .unwrap_or_else(|| "-".to_string());
            rows.push(PickRow {
                slot: format!("{}", slot + 1),
                hero,
                player,
            });
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }
}

pub fn display_recent_teams(teams: &[RecentTeam]) {
    println!("\n{}", "👥 RECENT TEAMS".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());

    if teams.is_empty() {
        println!("{}", "No saved teams yet (use --save-team)".yellow());
        return;
    }

    let rows: Vec<TeamRow> = teams
        .iter()
        .enumerate()
        .map(|(idx, team)| TeamRow {
            rank: format!("#{}", idx + 1),
            name: team.name.clone(),
            players: team.battletags.join(", "),
            saved: team.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

pub fn display_combine_summary(dataset: &CombinedDataset, output: &str) {
    println!("\n{}", "📊 COMBINED HERO DATA".bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());
    let meta = &dataset.metadata;
    println!("{} {}", "Heroes:".bold(), dataset.heroes.len());
    if let Some(patch) = &meta.stats_patch {
        println!("{} {}", "Patch:".bold(), patch);
    }
    if let (Some(level), Some(z)) = (meta.confidence_level, meta.z_score) {
        println!(
            "{} {:.0}% (z = {:.3}), min {} games, max delta {:.1}",
            "Confidence:".bold(),
            level * 100.0,
            z,
            meta.min_games_threshold.unwrap_or_default(),
            meta.max_delta_cap.unwrap_or_default()
        );
    }
    display_success(&format!("Wrote {}", output));
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", "⚠️".yellow(), message);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

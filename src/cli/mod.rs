use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::services::importer::{import_vectors as upsert_export, load_export};
use crate::services::{build_team_analysis, ChromaClient, SimilarTeamsSource, VectorSimilarity};
use crate::store::PredictionsStore;
use crate::utils::current_calendar_year;

fn open_store(settings: &Settings) -> PredictionsStore {
    let fallback_year = settings.current_year.unwrap_or_else(current_calendar_year);
    PredictionsStore::new(settings.predictions_dir(), fallback_year)
}

pub async fn list_teams(settings: &Settings) -> Result<()> {
    let store = open_store(settings);
    let year = store.season_year().await?;
    let teams = store.all_teams().await?;

    println!("🏀 {} tournament field ({} seeded teams):\n", year, teams.len());
    for team in teams {
        println!("   ({:>2}) {}", team.seed, team.name);
    }
    Ok(())
}

pub async fn query_team(settings: &Settings, team_name: &str) -> Result<()> {
    let store = open_store(settings);

    println!("🔍 Searching for team: {}", team_name);

    let Some(team) = store.find_team(team_name).await? else {
        println!("❌ No team named '{}' in the current predictions", team_name);
        let suggestions = store.suggest(team_name, 5).await?;
        if !suggestions.is_empty() {
            println!("\n💡 Did you mean:");
            for name in suggestions {
                println!("   • {}", name);
            }
        }
        return Ok(());
    };

    let year = store.season_year().await?;
    let similarity = VectorSimilarity::new(ChromaClient::new(settings)?, settings.chroma_collection.clone());
    let similar = similarity.similar_teams(&team.name, year).await;
    let analysis = build_team_analysis(&team, similar);

    println!("📊 Team Details:");
    println!("   Name: {} ({})", analysis.name, analysis.conference);
    println!("   Seed: {}", analysis.seed);
    println!("   Record: {}-{}", analysis.wins, analysis.losses);
    if !analysis.profile_summary.is_empty() {
        println!("   Summary: {}", analysis.profile_summary);
    }

    let dist = &analysis.win_probability_distribution;
    println!("\n🎯 Tournament wins:");
    println!(
        "   0: {:.1}% | 1: {:.1}% | 2+: {:.1}%",
        dist.zero_wins * 100.0,
        dist.one_win * 100.0,
        dist.two_plus_wins * 100.0
    );

    println!("\n👥 Top Players:");
    if analysis.top_players.is_empty() {
        println!("   No roster data");
    }
    for player in &analysis.top_players {
        println!(
            "   {:<24} {:<3} {:>5}  {:>4.1} min  {:>4.1} pts  FT {:.1}%",
            player.name,
            player.position,
            player.height,
            player.avg_minutes,
            player.avg_points,
            player.free_throw_pct
        );
    }

    let stats = &analysis.team_stats;
    println!("\n📈 Team Stats (per game):");
    println!("   Avg height: {}", stats.avg_height);
    println!("   2P%: {:.2} | 3P%: {:.2}", stats.two_point_pct, stats.three_point_pct);
    println!(
        "   BLK {:.2} | OREB {:.2} | DREB {:.2} | TOV {:.2} | STL {:.2} | PF {:.2}",
        stats.blocks,
        stats.offensive_rebounds,
        stats.defensive_rebounds,
        stats.turnovers,
        stats.steals,
        stats.fouls
    );

    println!("\n🕰️  Most Similar Historical Teams:");
    if analysis.similar_teams.is_empty() {
        println!("   Unavailable (vector database unreachable or team not indexed)");
    }
    for similar in &analysis.similar_teams {
        println!(
            "   {} {} - {} tournament wins (similarity {:.3})",
            similar.year, similar.name, similar.tournament_wins, similar.similarity
        );
    }

    Ok(())
}

pub async fn import_vectors(settings: &Settings, file: &Path, batch_size: usize) -> Result<()> {
    println!("📥 Loading vectors from {}", file.display());
    let export = load_export(file).await?;
    println!("   {} records", export.len());

    let chroma = ChromaClient::new(settings)?;
    chroma
        .heartbeat()
        .await
        .with_context(|| format!("cannot reach ChromaDB at {}", settings.chroma_base_url()))?;
    println!("🔗 Connected to ChromaDB at {}", settings.chroma_base_url());

    let imported = upsert_export(&chroma, &settings.chroma_collection, &export, batch_size).await?;

    let collection = chroma.get_collection(&settings.chroma_collection).await?;
    let count = chroma.count(&collection).await?;
    println!(
        "✅ Imported {} records into '{}' ({} total)",
        imported, settings.chroma_collection, count
    );
    Ok(())
}

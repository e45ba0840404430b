use std::collections::HashMap;

use crate::models::{
    PlayerProfile, PoolTeamSummary, RawPlayer, RawTeam, SimilarTeam, TeamAnalysis, TeamStats,
    WinProbabilityDistribution,
};
use crate::utils::{
    avg_per_game, format_height, format_position, free_throw_pct, per_game_2dp, shot_pct_2dp,
};

/// Number of players shown on a team profile.
pub const TOP_PLAYERS: usize = 5;

pub fn build_player_profile(player: &RawPlayer) -> PlayerProfile {
    PlayerProfile {
        name: player.name.clone(),
        position: player.position.map_or("?", format_position).to_string(),
        height: format_height(player.height),
        avg_minutes: avg_per_game(player.minutes, player.games),
        avg_points: avg_per_game(player.points, player.games),
        free_throw_pct: free_throw_pct(player.free_throws_made, player.free_throws_attempted),
    }
}

/// Missing buckets are 0.0.
pub fn build_win_distribution(raw: Option<&HashMap<String, f64>>) -> WinProbabilityDistribution {
    let bucket = |key: &str| raw.and_then(|m| m.get(key)).copied().unwrap_or(0.0);
    WinProbabilityDistribution {
        zero_wins: bucket("0"),
        one_win: bucket("1"),
        two_plus_wins: bucket("2+"),
    }
}

/// Sums the roster's season totals and divides by games played (wins + losses).
pub fn build_team_stats(team: &RawTeam) -> TeamStats {
    let players = team.roster();
    let games = team.games();
    let total = |stat: fn(&RawPlayer) -> u32| players.iter().map(stat).sum::<u32>();

    TeamStats {
        avg_height: format_height(team.avg_height.max(0.0).round_ties_even() as u32),
        two_point_pct: shot_pct_2dp(
            total(|p| p.two_point_field_goals_made),
            total(|p| p.two_point_field_goals_attempted),
        ),
        three_point_pct: shot_pct_2dp(
            total(|p| p.three_point_field_goals_made),
            total(|p| p.three_point_field_goals_attempted),
        ),
        blocks: per_game_2dp(total(|p| p.blocks), games),
        offensive_rebounds: per_game_2dp(total(|p| p.offensive_rebounds), games),
        defensive_rebounds: per_game_2dp(total(|p| p.defensive_rebounds), games),
        turnovers: per_game_2dp(total(|p| p.turnovers), games),
        steals: per_game_2dp(total(|p| p.steals), games),
        fouls: per_game_2dp(total(|p| p.fouls), games),
    }
}

pub fn build_team_analysis(team: &RawTeam, similar_teams: Vec<SimilarTeam>) -> TeamAnalysis {
    let mut by_minutes: Vec<&RawPlayer> = team.roster().iter().collect();
    // stable: ties keep file order
    by_minutes.sort_by(|a, b| b.minutes.cmp(&a.minutes));

    TeamAnalysis {
        name: team.name.clone(),
        seed: team.tournament_seed.unwrap_or(0),
        conference: team.conference.clone().unwrap_or_default(),
        wins: team.wins,
        losses: team.losses,
        profile_summary: team.profile_summary.clone().unwrap_or_default(),
        top_players: by_minutes
            .into_iter()
            .take(TOP_PLAYERS)
            .map(build_player_profile)
            .collect(),
        team_stats: build_team_stats(team),
        win_probability_distribution: build_win_distribution(
            team.win_probability_distribution.as_ref(),
        ),
        similar_teams,
    }
}

pub fn build_pool_team_summary(team: &RawTeam) -> PoolTeamSummary {
    PoolTeamSummary {
        name: team.name.clone(),
        seed: team.tournament_seed.unwrap_or(0),
        conference: team.conference.clone().unwrap_or_default(),
        win_probability_distribution: build_win_distribution(
            team.win_probability_distribution.as_ref(),
        ),
    }
}

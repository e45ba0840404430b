use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Reads an explicit JSON `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Season predictions file ───────────────────────────────────────────────────

/// One tournament team as exported by the offline model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTeam {
    pub name: String,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub tournament_seed: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wins: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub losses: u32,
    /// Roster average height in inches.
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_height: f64,
    #[serde(default)]
    pub players: Option<Vec<RawPlayer>>,
    #[serde(default)]
    pub profile_summary: Option<String>,
    /// Keyed by bucket: "0", "1", "2+".
    #[serde(default)]
    pub win_probability_distribution: Option<HashMap<String, f64>>,
}

impl RawTeam {
    pub fn roster(&self) -> &[RawPlayer] {
        self.players.as_deref().unwrap_or_default()
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Season totals for a single player. Missing or `null` totals read as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlayer {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Unknown when absent; rendered as "?".
    pub position: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub height: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub games: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub minutes: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub points: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub free_throws_made: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub free_throws_attempted: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub two_point_field_goals_made: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub two_point_field_goals_attempted: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub three_point_field_goals_made: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub three_point_field_goals_attempted: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub blocks: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub offensive_rebounds: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub defensive_rebounds: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub turnovers: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub steals: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub fouls: u32,
}

// ── API response types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamListItem {
    pub name: String,
    pub seed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub project: String,
    pub description: String,
    pub model: String,
    pub data_source: String,
    pub vector_db: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub position: String,
    pub height: String,
    pub avg_minutes: f64,
    pub avg_points: f64,
    pub free_throw_pct: f64,
}

/// Model probabilities for 0, 1 and 2+ tournament wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinProbabilityDistribution {
    pub zero_wins: f64,
    pub one_win: f64,
    pub two_plus_wins: f64,
}

/// Per-game team averages derived from summed player totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub avg_height: String,
    pub two_point_pct: f64,
    pub three_point_pct: f64,
    pub blocks: f64,
    pub offensive_rebounds: f64,
    pub defensive_rebounds: f64,
    pub turnovers: f64,
    pub steals: f64,
    pub fouls: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarTeam {
    pub name: String,
    pub year: i32,
    pub tournament_wins: u32,
    /// 0..=1, higher is closer.
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub name: String,
    pub seed: u32,
    pub conference: String,
    pub wins: u32,
    pub losses: u32,
    pub profile_summary: String,
    pub top_players: Vec<PlayerProfile>,
    pub team_stats: TeamStats,
    pub win_probability_distribution: WinProbabilityDistribution,
    pub similar_teams: Vec<SimilarTeam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarTeamsResponse {
    pub team: String,
    pub similar_teams: Vec<SimilarTeam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolRequest {
    #[serde(default)]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolTeamSummary {
    pub name: String,
    pub seed: u32,
    pub conference: String,
    pub win_probability_distribution: WinProbabilityDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolResponse {
    pub teams: Vec<PoolTeamSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_team_tolerates_missing_and_null_fields() {
        let team: RawTeam = serde_json::from_str(
            r#"{"name": "Duke", "tournament_seed": null, "players": null, "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(team.name, "Duke");
        assert!(team.tournament_seed.is_none());
        assert!(team.roster().is_empty());
        assert_eq!(team.games(), 0);
        assert!(team.win_probability_distribution.is_none());
    }

    #[test]
    fn test_raw_player_defaults_missing_totals() {
        let player: RawPlayer =
            serde_json::from_str(r#"{"name": "Test Player", "position": 2, "height": 80}"#).unwrap();
        assert_eq!(player.position, Some(2));
        assert_eq!(player.minutes, 0);
        assert_eq!(player.free_throws_attempted, 0);
    }

    #[test]
    fn test_null_totals_read_as_zero() {
        let player: RawPlayer = serde_json::from_str(
            r#"{"name": null, "position": null, "height": null, "minutes": null, "fouls": null}"#,
        )
        .unwrap();
        assert_eq!(player.name, "");
        assert_eq!(player.position, None);
        assert_eq!(player.height, 0);
        assert_eq!(player.minutes, 0);
        assert_eq!(player.fouls, 0);

        let team: RawTeam = serde_json::from_str(
            r#"{"name": "Duke", "wins": null, "losses": 4, "avg_height": null}"#,
        )
        .unwrap();
        assert_eq!(team.games(), 4);
        assert_eq!(team.avg_height, 0.0);
    }
}

use chrono::{Datelike, Utc};
use std::path::Path;

/// Display labels for the numeric position codes used in the predictions file.
const POSITION_LABELS: [&str; 5] = ["G", "G/F", "F", "F/C", "C"];

/// Round to a fixed number of decimal places, halves to even (6.25 -> 6.2)
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Format a height given in inches as feet and inches (e.g. 79 -> 6'7")
pub fn format_height(total_inches: u32) -> String {
    format!("{}'{}\"", total_inches / 12, total_inches % 12)
}

/// Map a position code to its label, "?" for anything outside 0..=4
pub fn format_position(code: i64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|i| POSITION_LABELS.get(i).copied())
        .unwrap_or("?")
}

/// Per-game average rounded to one decimal; 0.0 when no games were played
pub fn avg_per_game(total: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    round_to(total as f64 / games as f64, 1)
}

/// Free-throw percentage (0-100) rounded to one decimal; 0.0 on zero attempts
pub fn free_throw_pct(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    round_to(made as f64 / attempted as f64 * 100.0, 1)
}

/// Team per-game average, two decimals
pub fn per_game_2dp(total: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    round_to(total as f64 / games as f64, 2)
}

/// Team shooting percentage (0-100), two decimals
pub fn shot_pct_2dp(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    round_to(made as f64 / attempted as f64 * 100.0, 2)
}

/// Caseless form of a team name for comparisons. Lowercases, then expands the
/// full case folds `to_lowercase` leaves alone (ß -> ss, final sigma -> σ).
pub fn fold_name(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        match c {
            'ß' => folded.push_str("ss"),
            'ς' => folded.push('σ'),
            other => folded.push(other),
        }
    }
    folded
}

/// Vector database document id: lowercased name, spaces to underscores, then the season
pub fn vector_id(name: &str, year: i32) -> String {
    format!("{}_{}", name.to_lowercase().replace(' ', "_"), year)
}

/// Map an L2 distance onto (0, 1]; distance 0 is similarity 1.0
pub fn distance_to_similarity(distance: f64) -> f64 {
    round_to(1.0 / (1.0 + distance.max(0.0)), 4)
}

/// Season year used when neither config nor the file name pins one
pub fn current_calendar_year() -> i32 {
    Utc::now().year()
}

/// First plausible four-digit year in a file stem, e.g. "predictions_2025.json" -> 2025
pub fn season_year_from_path(path: &Path) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    stem.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .find(|year| (1900..=2100).contains(year))
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::models::{RawTeam, TeamListItem};
use crate::utils::{fold_name, season_year_from_path};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read predictions directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no predictions JSON found in {0}")]
    NoSeasonFile(PathBuf),
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed predictions file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The loaded season: every tournament team plus the season year.
#[derive(Debug)]
pub struct Season {
    pub year: i32,
    pub teams: Vec<RawTeam>,
}

/// Current-season predictions, read from disk on first use and kept for the
/// lifetime of the process.
pub struct PredictionsStore {
    dir: PathBuf,
    fallback_year: i32,
    season: OnceCell<Arc<Season>>,
}

impl PredictionsStore {
    /// `fallback_year` is used when the season file name carries no year.
    pub fn new(dir: impl Into<PathBuf>, fallback_year: i32) -> Self {
        Self {
            dir: dir.into(),
            fallback_year,
            season: OnceCell::new(),
        }
    }

    /// A store that never touches the filesystem.
    #[cfg(test)]
    pub fn preloaded(teams: Vec<RawTeam>, year: i32) -> Self {
        Self {
            dir: PathBuf::new(),
            fallback_year: year,
            season: OnceCell::new_with(Some(Arc::new(Season { year, teams }))),
        }
    }

    pub async fn season(&self) -> Result<Arc<Season>, StoreError> {
        self.season
            .get_or_try_init(|| load_latest_season(&self.dir, self.fallback_year))
            .await
            .cloned()
    }

    pub async fn season_year(&self) -> Result<i32, StoreError> {
        Ok(self.season().await?.year)
    }

    /// Caseless exact name match; first hit wins.
    pub async fn find_team(&self, name: &str) -> Result<Option<RawTeam>, StoreError> {
        let season = self.season().await?;
        let needle = fold_name(name);
        Ok(season
            .teams
            .iter()
            .find(|t| fold_name(&t.name) == needle)
            .cloned())
    }

    /// Seeded teams only, ordered by seed then name.
    pub async fn all_teams(&self) -> Result<Vec<TeamListItem>, StoreError> {
        let season = self.season().await?;
        let mut teams: Vec<TeamListItem> = season
            .teams
            .iter()
            .filter_map(|t| {
                t.tournament_seed.map(|seed| TeamListItem {
                    name: t.name.clone(),
                    seed,
                })
            })
            .collect();
        teams.sort_by(|a, b| a.seed.cmp(&b.seed).then_with(|| a.name.cmp(&b.name)));
        Ok(teams)
    }

    /// Closest team names to `name`, best first.
    pub async fn suggest(&self, name: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let season = self.season().await?;
        let needle = fold_name(name);
        let mut scored: Vec<(f64, &str)> = season
            .teams
            .iter()
            .map(|t| (strsim::jaro_winkler(&needle, &fold_name(&t.name)), t.name.as_str()))
            .filter(|(score, _)| *score >= 0.7)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.to_string())
            .collect())
    }
}

/// Picks the lexicographically last `*.json` in `dir` as the current season.
async fn load_latest_season(dir: &Path, fallback_year: i32) -> Result<Arc<Season>, StoreError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| StoreError::ReadDir { path: dir.to_path_buf(), source })?;

    let mut latest: Option<PathBuf> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| StoreError::ReadDir { path: dir.to_path_buf(), source })?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if latest.as_ref().map_or(true, |current| path.file_name() > current.file_name()) {
            latest = Some(path);
        }
    }

    let path = latest.ok_or_else(|| StoreError::NoSeasonFile(dir.to_path_buf()))?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| StoreError::ReadFile { path: path.clone(), source })?;
    let teams: Vec<RawTeam> = serde_json::from_str(&raw)
        .map_err(|source| StoreError::Parse { path: path.clone(), source })?;
    let year = season_year_from_path(&path).unwrap_or(fallback_year);

    tracing::info!("Loaded {} teams for season {} from {}", teams.len(), year, path.display());
    Ok(Arc::new(Season { year, teams }))
}

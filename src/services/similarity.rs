//! Similar-team lookup backed by a ChromaDB collection of pre-computed team vectors.
//!
//! The service never ranks anything itself: it fetches the team's stored
//! embedding, asks Chroma for the nearest neighbours, drops same-season hits
//! and reshapes what is left.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::Settings;
use crate::models::SimilarTeam;
use crate::utils::{distance_to_similarity, vector_id};

/// Neighbours requested from Chroma, enough to survive the same-season filter.
pub const NEIGHBOUR_CANDIDATES: usize = 10;
/// Similar teams returned to callers.
pub const SIMILAR_TEAMS: usize = 3;

pub type Metadata = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("vector database request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vector database returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("neighbour metadata missing or invalid field '{0}'")]
    BadMetadata(&'static str),
}

/// Source of similar historical teams. Implementations swallow their own
/// failures and return an empty list.
#[async_trait]
pub trait SimilarTeamsSource: Send + Sync {
    async fn similar_teams(&self, team_name: &str, season_year: i32) -> Vec<SimilarTeam>;
}

// ── Chroma HTTP API types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Debug, Serialize)]
struct GetRequest<'a> {
    ids: &'a [String],
    include: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: &'a [&'a str],
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Serialize)]
pub struct UpsertBatch<'a> {
    pub ids: &'a [String],
    pub embeddings: &'a [Vec<f32>],
    pub metadatas: &'a [Metadata],
    pub documents: &'a [String],
}

// ── ChromaClient ──────────────────────────────────────────────────────────────

/// Minimal client for the ChromaDB v2 REST API, scoped to one tenant/database.
#[derive(Clone)]
pub struct ChromaClient {
    client: Client,
    base_url: String,
    tenant: String,
    database: String,
}

impl ChromaClient {
    pub fn new(settings: &Settings) -> Result<Self, SimilarityError> {
        let client = Client::builder().timeout(settings.chroma_timeout).build()?;
        Ok(Self {
            client,
            base_url: settings.chroma_base_url(),
            tenant: settings.chroma_tenant.clone(),
            database: settings.chroma_database.clone(),
        })
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    pub async fn heartbeat(&self) -> Result<(), SimilarityError> {
        let response = self
            .client
            .get(format!("{}/api/v2/heartbeat", self.base_url))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    pub async fn get_collection(&self, name: &str) -> Result<Collection, SimilarityError> {
        let response = self
            .client
            .get(format!("{}/{}", self.collections_url(), name))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection, SimilarityError> {
        let response = self
            .client
            .post(self.collections_url())
            .json(&CreateCollectionRequest { name, get_or_create: true })
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn count(&self, collection: &Collection) -> Result<u64, SimilarityError> {
        let response = self
            .client
            .get(format!("{}/{}/count", self.collections_url(), collection.id))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Stored embedding for one document id, `None` if the id is not indexed.
    pub async fn get_embedding(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Vec<f32>>, SimilarityError> {
        let ids = [id.to_string()];
        let response = self
            .client
            .post(format!("{}/{}/get", self.collections_url(), collection.id))
            .json(&GetRequest { ids: &ids, include: &["embeddings"] })
            .send()
            .await?;
        let body: GetResponse = check_status(response).await?.json().await?;
        Ok(body.embeddings.and_then(|e| e.into_iter().next()))
    }

    pub async fn query(
        &self,
        collection: &Collection,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<QueryResponse, SimilarityError> {
        let response = self
            .client
            .post(format!("{}/{}/query", self.collections_url(), collection.id))
            .json(&QueryRequest {
                query_embeddings: vec![embedding],
                n_results,
                include: &["metadatas", "distances"],
            })
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn upsert(
        &self,
        collection: &Collection,
        batch: &UpsertBatch<'_>,
    ) -> Result<(), SimilarityError> {
        let response = self
            .client
            .post(format!("{}/{}/upsert", self.collections_url(), collection.id))
            .json(batch)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SimilarityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SimilarityError::Status { status, body })
}

// ── VectorSimilarity ──────────────────────────────────────────────────────────

/// Similar-team lookup against one Chroma collection.
pub struct VectorSimilarity {
    chroma: ChromaClient,
    collection: String,
}

impl VectorSimilarity {
    pub fn new(chroma: ChromaClient, collection: impl Into<String>) -> Self {
        Self {
            chroma,
            collection: collection.into(),
        }
    }

    async fn lookup(&self, team_name: &str, season_year: i32) -> Result<Vec<SimilarTeam>, SimilarityError> {
        let collection = self.chroma.get_collection(&self.collection).await?;

        let id = vector_id(team_name, season_year);
        tracing::debug!("Looking up embedding for {}", id);
        let Some(embedding) = self.chroma.get_embedding(&collection, &id).await? else {
            tracing::warn!("No embedding found for {}", id);
            return Ok(Vec::new());
        };

        let neighbours = self
            .chroma
            .query(&collection, &embedding, NEIGHBOUR_CANDIDATES)
            .await?;
        rank_neighbours(neighbours, season_year, SIMILAR_TEAMS)
    }
}

#[async_trait]
impl SimilarTeamsSource for VectorSimilarity {
    async fn similar_teams(&self, team_name: &str, season_year: i32) -> Vec<SimilarTeam> {
        match self.lookup(team_name, season_year).await {
            Ok(similar) => {
                tracing::info!("Returning {} similar teams for '{}'", similar.len(), team_name);
                similar
            }
            Err(e) => {
                tracing::error!("Similar team lookup failed for '{}': {}", team_name, e);
                Vec::new()
            }
        }
    }
}

/// Turns the first query row into at most `limit` similar teams, in the order
/// Chroma returned them, skipping anything from `season_year`.
pub fn rank_neighbours(
    response: QueryResponse,
    season_year: i32,
    limit: usize,
) -> Result<Vec<SimilarTeam>, SimilarityError> {
    let metadatas = response
        .metadatas
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();

    let mut similar = Vec::with_capacity(limit);
    for (meta, distance) in metadatas.into_iter().zip(distances) {
        if similar.len() == limit {
            break;
        }
        let meta = meta.ok_or(SimilarityError::BadMetadata("metadata"))?;
        let year = meta_int(&meta, "year")?;
        if year == i64::from(season_year) {
            continue;
        }
        let distance = distance.ok_or(SimilarityError::BadMetadata("distance"))?;

        similar.push(SimilarTeam {
            name: meta
                .get("name")
                .and_then(Value::as_str)
                .ok_or(SimilarityError::BadMetadata("name"))?
                .to_string(),
            year: i32::try_from(year).map_err(|_| SimilarityError::BadMetadata("year"))?,
            tournament_wins: u32::try_from(meta_int(&meta, "tournament_wins")?)
                .map_err(|_| SimilarityError::BadMetadata("tournament_wins"))?,
            similarity: distance_to_similarity(distance),
        });
    }
    Ok(similar)
}

/// Integer metadata field; Chroma may hand back ints, floats or numeric strings.
fn meta_int(meta: &Metadata, key: &'static str) -> Result<i64, SimilarityError> {
    let value = meta.get(key).ok_or(SimilarityError::BadMetadata(key))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or(SimilarityError::BadMetadata(key))
}

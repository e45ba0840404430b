use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Settings;
use crate::models::{
    ErrorResponse, HealthResponse, InfoResponse, PoolRequest, PoolResponse, SimilarTeamsResponse,
    TeamAnalysis, TeamListItem,
};
use crate::services::{
    build_pool_team_summary, build_team_analysis, ChromaClient, SimilarTeamsSource, VectorSimilarity,
};
use crate::store::{PredictionsStore, StoreError};
use crate::utils::current_calendar_year;

/// Largest pool accepted by POST /create-a-team.
pub const MAX_POOL_TEAMS: usize = 8;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PredictionsStore>,
    pub similarity: Arc<dyn SimilarTeamsSource>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Team '{0}' not found.")]
    TeamNotFound(String),
    #[error("A pool holds at most 8 teams, got {0}.")]
    PoolTooLarge(usize),
    #[error("Predictions data unavailable.")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::TeamNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PoolTooLarge(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Store(e) => {
                tracing::error!("Failed to load predictions: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}

pub async fn serve(settings: Settings, port: u16) -> anyhow::Result<()> {
    let fallback_year = settings.current_year.unwrap_or_else(current_calendar_year);
    let store = Arc::new(PredictionsStore::new(settings.predictions_dir(), fallback_year));
    let chroma = ChromaClient::new(&settings)?;
    let state = AppState {
        store,
        similarity: Arc::new(VectorSimilarity::new(chroma, settings.chroma_collection.clone())),
    };

    let app = create_router(state).layer(cors_layer(&settings.cors_origins));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Pool analytics API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/teams", get(list_teams_handler))
        .route("/info", get(info_handler))
        .route("/analyze/most-similar/{team}", get(most_similar_handler))
        .route("/analyze/{team}", get(team_analysis_handler))
        .route("/create-a-team", post(create_a_team_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

// GET / - health check
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "March Madness Pool Analytics API is running.".to_string(),
    })
}

// GET /teams - seeded tournament field
async fn list_teams_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamListItem>>, ApiError> {
    Ok(Json(state.store.all_teams().await?))
}

// GET /info - project information for the frontend
async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse {
        project: "March Madness Pool Analytics".to_string(),
        description: "Predicts NCAA tournament team performance using historical data and a \
                      machine learning model trained on seasons from 2009-10 onwards."
            .to_string(),
        model: "Gradient Boosting classifier trained on team season statistics".to_string(),
        data_source: "College Basketball Reference (Sports Reference)".to_string(),
        vector_db: "ChromaDB, nearest neighbours on PCA-reduced team vectors".to_string(),
    })
}

// GET /analyze/most-similar/{team} - three closest historical teams
async fn most_similar_handler(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> Result<Json<SimilarTeamsResponse>, ApiError> {
    let Some(found) = state.store.find_team(&team).await? else {
        tracing::warn!("most-similar: team not found: '{}'", team);
        return Err(ApiError::TeamNotFound(team));
    };

    let year = state.store.season_year().await?;
    let similar_teams = state.similarity.similar_teams(&found.name, year).await;
    Ok(Json(SimilarTeamsResponse {
        team: found.name,
        similar_teams,
    }))
}

// GET /analyze/{team} - full team profile
async fn team_analysis_handler(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> Result<Json<TeamAnalysis>, ApiError> {
    let Some(found) = state.store.find_team(&team).await? else {
        tracing::warn!("analyze: team not found: '{}'", team);
        return Err(ApiError::TeamNotFound(team));
    };

    let year = state.store.season_year().await?;
    let similar = state.similarity.similar_teams(&found.name, year).await;
    Ok(Json(build_team_analysis(&found, similar)))
}

// POST /create-a-team - pool summaries, unknown names skipped
async fn create_a_team_handler(
    State(state): State<AppState>,
    Json(request): Json<PoolRequest>,
) -> Result<Json<PoolResponse>, ApiError> {
    if request.teams.len() > MAX_POOL_TEAMS {
        return Err(ApiError::PoolTooLarge(request.teams.len()));
    }

    let mut summaries = Vec::with_capacity(request.teams.len());
    for name in &request.teams {
        match state.store.find_team(name).await? {
            Some(team) => summaries.push(build_pool_team_summary(&team)),
            None => tracing::warn!("pool: team not found: '{}'", name),
        }
    }

    tracing::info!("pool: resolved {} / {} teams", summaries.len(), request.teams.len());
    Ok(Json(PoolResponse { teams: summaries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt; // for oneshot

    use crate::models::{RawTeam, SimilarTeam};

    /// Records every lookup and answers with a fixed list.
    struct FixedSimilarity {
        teams: Vec<SimilarTeam>,
        calls: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait]
    impl SimilarTeamsSource for FixedSimilarity {
        async fn similar_teams(&self, team_name: &str, season_year: i32) -> Vec<SimilarTeam> {
            self.calls.lock().unwrap().push((team_name.to_string(), season_year));
            self.teams.clone()
        }
    }

    fn raw_team(value: Value) -> RawTeam {
        serde_json::from_value(value).unwrap()
    }

    fn fixture_teams() -> Vec<RawTeam> {
        let players: Vec<Value> = (0..7u32)
            .map(|i| {
                json!({
                    "name": format!("Player {}", i),
                    "position": i % 5,
                    "height": 75 + i,
                    "games": 30,
                    "minutes": 200 + i * 100,
                    "points": 100 + i * 40,
                    "free_throws_made": 14,
                    "free_throws_attempted": 20,
                })
            })
            .collect();
        vec![
            raw_team(json!({
                "name": "Duke",
                "tournament_seed": 1,
                "conference": "ACC",
                "wins": 35,
                "losses": 4,
                "avg_height": 79.0,
                "profile_summary": "A strong team.",
                "win_probability_distribution": {"0": 0.1, "1": 0.3, "2+": 0.6},
                "players": players,
            })),
            raw_team(json!({
                "name": "Auburn",
                "tournament_seed": 1,
                "conference": "SEC",
                "wins": 28,
                "losses": 6,
                "win_probability_distribution": {"0": 0.3, "1": 0.4},
            })),
            raw_team(json!({"name": "No-Seed Team", "tournament_seed": null})),
        ]
    }

    fn test_app_with(similar: Vec<SimilarTeam>) -> (Router, Arc<FixedSimilarity>) {
        let similarity = Arc::new(FixedSimilarity {
            teams: similar,
            calls: Mutex::new(Vec::new()),
        });
        let state = AppState {
            store: Arc::new(PredictionsStore::preloaded(fixture_teams(), 2025)),
            similarity: similarity.clone(),
        };
        (create_router(state), similarity)
    }

    fn test_app() -> Router {
        test_app_with(Vec::new()).0
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn pool_req(teams: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/create-a-team")
            .header("Content-Type", "application/json")
            .body(Body::from(json!({ "teams": teams }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(test_app(), get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_info_fields() {
        let (status, body) = send(test_app(), get_req("/info")).await;
        assert_eq!(status, StatusCode::OK);
        for key in ["project", "model", "data_source", "vector_db"] {
            assert!(body.get(key).is_some(), "missing {}", key);
        }
    }

    #[tokio::test]
    async fn test_teams_excludes_unseeded() {
        let (status, body) = send(test_app(), get_req("/teams")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"name": "Auburn", "seed": 1}, {"name": "Duke", "seed": 1}]));
    }

    #[tokio::test]
    async fn test_analyze_known_team() {
        let (status, body) = send(test_app(), get_req("/analyze/duke")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Duke");
        assert_eq!(body["seed"], 1);
        assert_eq!(body["wins"], 35);
        assert_eq!(body["losses"], 4);
        assert_eq!(body["similar_teams"], json!([]));
        assert_eq!(body["win_probability_distribution"]["two_plus_wins"], 0.6);

        let players = body["top_players"].as_array().unwrap();
        assert_eq!(players.len(), 5);
        assert_eq!(players[0]["name"], "Player 6");
        assert_eq!(players[0]["free_throw_pct"], 70.0);
        assert_eq!(players[4]["name"], "Player 2");
    }

    #[tokio::test]
    async fn test_analyze_multi_word_path() {
        let (status, _) = send(test_app(), get_req("/analyze/No-Seed%20Team")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_analyze_unknown_team_is_404() {
        let (status, body) = send(test_app(), get_req("/analyze/Nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Team 'Nonexistent' not found.");
    }

    #[tokio::test]
    async fn test_most_similar_uses_season_year() {
        let similar = vec![SimilarTeam {
            name: "Duke".to_string(),
            year: 2015,
            tournament_wins: 6,
            similarity: 0.8123,
        }];
        let (app, source) = test_app_with(similar);
        let (status, body) = send(app, get_req("/analyze/most-similar/DUKE")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["team"], "Duke");
        assert_eq!(body["similar_teams"][0]["year"], 2015);
        assert_eq!(source.calls.lock().unwrap().as_slice(), &[("Duke".to_string(), 2025)]);
    }

    #[tokio::test]
    async fn test_most_similar_unknown_team_skips_backend() {
        let (app, source) = test_app_with(Vec::new());
        let (status, _) = send(app, get_req("/analyze/most-similar/Nobody")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pool_partial_resolution_keeps_order() {
        let (status, body) = send(test_app(), pool_req(json!(["auburn", "Unknown Team", "Duke"]))).await;
        assert_eq!(status, StatusCode::OK);
        let teams = body["teams"].as_array().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0]["name"], "Auburn");
        assert_eq!(teams[0]["conference"], "SEC");
        assert_eq!(teams[0]["win_probability_distribution"]["two_plus_wins"], 0.0);
        assert_eq!(teams[1]["name"], "Duke");
    }

    #[tokio::test]
    async fn test_pool_one_valid_one_invalid() {
        let (status, body) = send(test_app(), pool_req(json!(["Duke", "Unknown Team"]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teams"].as_array().unwrap().len(), 1);
        assert_eq!(body["teams"][0]["seed"], 1);
    }

    #[tokio::test]
    async fn test_pool_empty_request() {
        let (status, body) = send(test_app(), pool_req(json!([]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teams"], json!([]));
    }

    #[tokio::test]
    async fn test_pool_rejects_more_than_eight() {
        let names: Vec<String> = (0..9).map(|i| format!("Team {}", i)).collect();
        let (status, body) = send(test_app(), pool_req(json!(names))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("at most 8"));
    }

    #[tokio::test]
    async fn test_missing_predictions_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            store: Arc::new(PredictionsStore::new(dir.path(), 2025)),
            similarity: Arc::new(FixedSimilarity {
                teams: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }),
        };
        let (status, body) = send(create_router(state), get_req("/teams")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Predictions data unavailable.");
    }
}

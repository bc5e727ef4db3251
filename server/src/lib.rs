use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use searchcore::persist::{load_index, save_index};
use searchcore::{search, Config, ExtractorRegistry, IndexBuilder, SealedIndex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct SearchResult {
    pub doc_id: u32,
    pub score: u32,
    pub title: String,
    pub path: String,
}

/// Shared server state. The served generation is swapped wholesale on rebuild;
/// searches hold their own `Arc` to whichever generation they started with.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    index: Arc<RwLock<Arc<SealedIndex>>>,
    rebuilding: Arc<AtomicBool>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(config: Config, index: SealedIndex, admin_token: Option<String>) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(RwLock::new(Arc::new(index))),
            rebuilding: Arc::new(AtomicBool::new(false)),
            admin_token,
        }
    }

    pub fn current(&self) -> Arc<SealedIndex> {
        self.index.read().clone()
    }

    fn replace(&self, index: SealedIndex) {
        *self.index.write() = Arc::new(index);
    }
}

/// Build a fresh generation from the configured document root and persist it.
pub fn rebuild(config: &Config) -> searchcore::Result<SealedIndex> {
    let root = config
        .doc_root
        .as_deref()
        .ok_or_else(|| searchcore::Error::InvalidRoot(Default::default()))?;
    let (sealed, _stats) = IndexBuilder::new(ExtractorRegistry::default())
        .with_tokenizer(config.tokenizer())
        .build(root)?;
    save_index(&config.index_dir, &sealed)?;
    Ok(sealed)
}

/// Load the persisted index named by `config` and wire up the routes.
pub fn build_app(config: Config) -> Result<Router> {
    let sealed = load_index(&config.index_dir)?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState::new(config, sealed, admin_token)))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let index = state.current();
    let opts = state.config.search_options();
    let k = params.k.clamp(1, opts.max_results.max(1));

    // intersection and ranking are CPU-bound; keep them off the async workers
    let query = params.q.clone();
    let hits = tokio::task::spawn_blocking(move || search(&index, &query, &opts))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "search task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let total_hits = hits.len();
    let results = hits
        .into_iter()
        .take(k)
        .map(|h| SearchResult { doc_id: h.doc_id, score: h.score, title: h.title, path: h.path.to_string_lossy().into_owned() })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let index = state.current();
    match index.document(doc_id) {
        Ok(meta) => Ok(Json(serde_json::json!({
            "doc_id": doc_id,
            "title": meta.title,
            "path": meta.path.to_string_lossy(),
        }))),
        Err(_) => Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" })))),
    }
}

struct RebuildGuard(Arc<AtomicBool>);

impl Drop for RebuildGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    if state.config.doc_root.is_none() {
        return Err((StatusCode::CONFLICT, "no document root configured".into()));
    }
    if state.rebuilding.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
        return Err((StatusCode::CONFLICT, "rebuild already in progress".into()));
    }
    let _guard = RebuildGuard(state.rebuilding.clone());

    let config = state.config.clone();
    let sealed = tokio::task::spawn_blocking(move || rebuild(&config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "index rebuild failed");
            let status = match e {
                searchcore::Error::InvalidRoot(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })?;

    let body = serde_json::json!({
        "num_docs": sealed.document_count(),
        "num_terms": sealed.index().term_count(),
    });
    state.replace(sealed);
    tracing::info!("serving rebuilt index");
    Ok(Json(body))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

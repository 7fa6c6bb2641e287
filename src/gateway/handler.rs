//! HTTP handlers for the assistant API
//!
//! - POST   /api/v1/ask: ask a question
//! - GET    /api/v1/history: recent exchanges (`?last=n`)
//! - GET    /api/v1/history/search: keyword search (`?q=`)
//! - GET    /api/v1/history/stats: memory counters
//! - DELETE /api/v1/history: clear the memory
//! - GET    /api/v1/products: product rows
//! - GET    /api/v1/dashboard: metrics and per-product series
//! - GET    /api/v1/report: commercial report

use crate::agent::{AnswerSource, DataBot};
use crate::memory::{ConversationMemory, Entry, MemoryStats, Snapshot};
use crate::sales::Product;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared state for assistant handlers.
///
/// The conversation memory is the only mutable session state and lives
/// here, behind a lock, rather than in the assistant.
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<DataBot>,
    pub memory: Arc<Mutex<ConversationMemory>>,
    /// Snapshot written after every change, when set
    pub snapshot_path: Option<PathBuf>,
    /// Exchanges returned by the history endpoint when `last` is absent
    pub recent_pairs: usize,
}

impl AppState {
    pub fn new(bot: DataBot, memory: ConversationMemory) -> Self {
        Self {
            bot: Arc::new(bot),
            memory: Arc::new(Mutex::new(memory)),
            snapshot_path: None,
            recent_pairs: 3,
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_recent_pairs(mut self, pairs: usize) -> Self {
        self.recent_pairs = pairs.max(1);
        self
    }

    /// Write `snapshot` to the configured path off the memory lock.
    pub(crate) async fn persist(&self, snapshot: Option<Snapshot>) {
        let (Some(path), Some(snapshot)) = (&self.snapshot_path, snapshot) else {
            return;
        };
        match snapshot.write_async(path).await {
            Ok(()) => tracing::debug!(
                path = %path.display(),
                entries = snapshot.history.len(),
                "Conversation memory saved"
            ),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to save conversation memory")
            }
        }
    }

    /// Snapshot to persist, when persistence is configured.
    pub(crate) fn snapshot_of(&self, memory: &ConversationMemory) -> Option<Snapshot> {
        self.snapshot_path.as_ref().map(|_| memory.snapshot())
    }
}

/// Create the assistant router with all REST endpoints
pub fn assistant_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/ask", post(ask))
        .route("/api/v1/history", get(get_history).delete(clear_history))
        .route("/api/v1/history/search", get(search_history))
        .route("/api/v1/history/stats", get(get_stats))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/report", get(get_report))
        .with_state(state)
}

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AskResponse {
    answer: String,
    source: AnswerSource,
    stats: MemoryStats,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    last: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    window: String,
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductView {
    name: String,
    category: String,
    sales_q1: u32,
    sales_q2: u32,
    total_units: u64,
    price: f64,
    revenue: f64,
    stock: u32,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            category: p.category.clone(),
            sales_q1: p.sales_q1,
            sales_q2: p.sales_q2,
            total_units: p.total_units(),
            price: p.price,
            revenue: p.revenue(),
            stock: p.stock,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    product_count: usize,
    total_units: u64,
    total_revenue: f64,
    total_stock: u64,
    best_seller: Option<String>,
    low_stock: Vec<String>,
    series: Vec<SeriesPoint>,
}

#[derive(Debug, Serialize)]
struct SeriesPoint {
    product: String,
    units: u64,
    revenue: f64,
}

fn error_body(code: &str, message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message.into()}})
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/v1/ask
async fn ask(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Response {
    let question = request.question.trim();
    if question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body("BAD_REQUEST", "question must not be empty")),
        )
            .into_response();
    }

    // The lock is not held across the model call.
    let pending = {
        let memory = state.memory.lock().await;
        state.bot.prepare(&memory, question)
    };
    let answer = state.bot.respond(pending).await;

    let (stats, snapshot) = {
        let mut memory = state.memory.lock().await;
        memory.append_turn(question, answer.text.clone());
        (memory.stats(), state.snapshot_of(&memory))
    };
    state.persist(snapshot).await;

    let body = AskResponse {
        answer: answer.text,
        source: answer.source,
        stats,
    };
    Json(body).into_response()
}

/// GET /api/v1/history
async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let pairs = params.last.unwrap_or(state.recent_pairs).max(1);
    let memory = state.memory.lock().await;

    let skip = memory.len().saturating_sub(pairs.saturating_mul(2));
    Json(HistoryResponse {
        window: memory.recent_window(pairs),
        entries: memory.entries().skip(skip).cloned().collect(),
    })
}

/// GET /api/v1/history/search
async fn search_history(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let memory = state.memory.lock().await;
    let results: Vec<Entry> = memory.search(&params.q).into_iter().cloned().collect();
    Json(results)
}

/// GET /api/v1/history/stats
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.memory.lock().await.stats())
}

/// DELETE /api/v1/history
async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    let (removed, snapshot) = {
        let mut memory = state.memory.lock().await;
        let removed = memory.len();
        memory.clear();
        (removed, state.snapshot_of(&memory))
    };
    state.persist(snapshot).await;
    tracing::info!(removed, "History cleared via API");
    Json(serde_json::json!({"removed": removed}))
}

/// GET /api/v1/products
async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<ProductView> = state.bot.table().products().iter().map(Into::into).collect();
    Json(products)
}

/// GET /api/v1/dashboard
async fn get_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let table = state.bot.table();
    Json(DashboardResponse {
        product_count: table.len(),
        total_units: table.total_units(),
        total_revenue: table.total_revenue(),
        total_stock: table.total_stock(),
        best_seller: table.best_seller().map(|p| p.name.clone()),
        low_stock: table
            .low_stock(state.bot.low_stock_threshold())
            .into_iter()
            .map(|p| p.name.clone())
            .collect(),
        series: table
            .products()
            .iter()
            .map(|p| SeriesPoint {
                product: p.name.clone(),
                units: p.total_units(),
                revenue: p.revenue(),
            })
            .collect(),
    })
}

/// GET /api/v1/report
async fn get_report(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"report": state.bot.report()}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TextGenerator;
    use crate::sales::SalesTable;
    use async_trait::async_trait;
    use axum::body::Body;
    use tokio::sync::Notify;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Generator that waits for the test to release it.
    #[derive(Default)]
    struct GatedGenerator {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TextGenerator for GatedGenerator {
        fn name(&self) -> &str {
            "gated"
        }

        async fn generate(&self, _prompt: &str) -> crate::Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("Réponse du modèle".to_string())
        }
    }

    fn make_state() -> AppState {
        AppState::new(DataBot::new(SalesTable::demo()), ConversationMemory::new(10))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ask_records_turn() {
        let state = make_state();
        let app = assistant_router(state.clone());

        let resp = app
            .oneshot(post_json(
                "/api/v1/ask",
                serde_json::json!({"question": "Quel est le produit le plus vendu ?"}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["answer"], "Produit le plus vendu : Souris Pro (709 unités)");
        assert_eq!(json["source"], "local");
        assert_eq!(json["stats"]["total"], 2);
        assert_eq!(json["stats"]["humanCount"], 1);
        assert_eq!(json["stats"]["assistantCount"], 1);
        assert!(json["stats"]["fillRatio"].is_number());
        assert_eq!(state.memory.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_ask_empty_question() {
        let app = assistant_router(make_state());
        let resp = app
            .oneshot(post_json("/api/v1/ask", serde_json::json!({"question": "   "})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_ask_persists_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let app = assistant_router(make_state().with_snapshot(&path));

        let resp = app
            .oneshot(post_json("/api/v1/ask", serde_json::json!({"question": "liste"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let mut restored = ConversationMemory::new(2);
        assert!(restored.load(&path));
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.capacity(), 10);
    }

    #[tokio::test]
    async fn test_history_window() {
        let state = make_state();
        {
            let mut memory = state.memory.lock().await;
            memory.append_turn("Q1", "A1");
            memory.append_turn("Q2", "A2");
            memory.append_turn("Q3", "A3");
        }
        let app = assistant_router(state);

        let resp = app.oneshot(get_request("/api/v1/history?last=2")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["content"], "Q2");
        assert_eq!(entries[3]["role"], "ai");
        assert!(!json["window"].as_str().unwrap().contains("Q1"));
    }

    #[tokio::test]
    async fn test_history_huge_last_is_clamped() {
        let state = make_state();
        state.memory.lock().await.append_turn("Q1", "A1");
        let app = assistant_router(state);

        let uri = format!("/api/v1/history?last={}", usize::MAX);
        let resp = app.oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert!(json["window"].as_str().unwrap().contains("Q1"));
    }

    #[tokio::test]
    async fn test_memory_available_during_model_call() {
        let generator = Arc::new(GatedGenerator::default());
        let bot = DataBot::new(SalesTable::demo()).with_generator(generator.clone());
        let state = AppState::new(bot, ConversationMemory::new(10));
        let app = assistant_router(state.clone());

        let pending = tokio::spawn(
            app.clone()
                .oneshot(post_json("/api/v1/ask", serde_json::json!({"question": "liste"}))),
        );
        generator.started.notified().await;

        let resp = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            app.oneshot(get_request("/api/v1/history/stats")),
        )
        .await
        .expect("stats blocked by the model call")
        .unwrap();
        assert_eq!(body_json(resp).await["total"], 0);

        generator.release.notify_one();
        let resp = pending.await.unwrap().unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["source"], "model");
        assert_eq!(json["answer"], "Réponse du modèle");
        assert_eq!(state.memory.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_history_empty_sentinel() {
        let app = assistant_router(make_state());
        let resp = app.oneshot(get_request("/api/v1/history")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["window"], crate::memory::NO_HISTORY);
        assert_eq!(json["entries"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_search_and_stats() {
        let state = make_state();
        {
            let mut memory = state.memory.lock().await;
            memory.append_entry("human", "CA total");
            memory.append_entry("human", "stock faible");
        }
        let app = assistant_router(state);

        let resp = app.clone().oneshot(get_request("/api/v1/history/search?q=ca")).await.unwrap();
        let json = body_json(resp).await;
        let found = json.as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["content"], "CA total");

        let resp = app.oneshot(get_request("/api/v1/history/stats")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["humanCount"], 2);
        assert_eq!(json["pairedCount"], 0);
        assert!(json.get("human_count").is_none());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let state = make_state();
        state.memory.lock().await.append_turn("Q", "A");
        let app = assistant_router(state.clone());

        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["removed"], 2);
        assert!(state.memory.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_products_and_dashboard() {
        let app = assistant_router(make_state());

        let resp = app.clone().oneshot(get_request("/api/v1/products")).await.unwrap();
        let json = body_json(resp).await;
        let products = json.as_array().unwrap();
        assert_eq!(products.len(), 4);
        assert_eq!(products[1]["name"], "Souris Pro");
        assert_eq!(products[1]["totalUnits"], 709);

        let resp = app.oneshot(get_request("/api/v1/dashboard")).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["productCount"], 4);
        assert_eq!(json["totalUnits"], 1597);
        assert_eq!(json["bestSeller"], "Souris Pro");
        assert_eq!(json["lowStock"], serde_json::json!(["Laptop Elite", "Écran 4K"]));
        assert_eq!(json["series"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_report() {
        let app = assistant_router(make_state());
        let resp = app.oneshot(get_request("/api/v1/report")).await.unwrap();
        let json = body_json(resp).await;
        assert!(json["report"].as_str().unwrap().contains("RAPPORT COMMERCIAL"));
    }
}

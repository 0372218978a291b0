//! REST API Server for the NairaSense assistant
//!
//! Exposes the chat session, settlement receipts and the advisor via HTTP
//! endpoints for the frontend.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::advisor::FinancialAdvisor;
use crate::error::AssistantError;
use crate::flow::TransactionPreviewFlow;
use crate::models::{InsightScope, ProposalStatus, Transaction, UserProfile};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    pub scope: InsightScope,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
pub struct InsuranceRequest {
    pub profile: UserProfile,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn failure(e: AssistantError) -> ApiResult {
    let status = match &e {
        AssistantError::EmptyMessage => StatusCode::BAD_REQUEST,
        AssistantError::EntryNotFound(_) | AssistantError::UnknownEntry(_) => StatusCode::NOT_FOUND,
        AssistantError::NoProposal(_) | AssistantError::ProposalResolved { .. } => {
            StatusCode::CONFLICT
        }
        _ => {
            error!("Request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::error(e.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub flow: Arc<TransactionPreviewFlow>,
    pub advisor: Arc<FinancialAdvisor>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn list_entries(State(state): State<ApiState>) -> ApiResult {
    let entries = state.flow.entries().await;
    (StatusCode::OK, Json(ApiResponse::success(entries)))
}

async fn submit_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> ApiResult {
    info!("Received chat message ({} chars)", req.text.len());

    // Run the turn on its own task so a dropped connection can't leave the
    // user entry without a reply
    let flow = Arc::clone(&state.flow);
    let turn = tokio::spawn(async move { flow.submit_user_message(&req.text).await });

    match turn.await {
        Ok(Ok(entry)) => (StatusCode::OK, Json(ApiResponse::success(entry))),
        Ok(Err(e)) => failure(e),
        Err(e) => failure(AssistantError::from(e)),
    }
}

async fn confirm_entry(State(state): State<ApiState>, Path(index): Path<usize>) -> ApiResult {
    match state.flow.confirm_proposal(index).await {
        Ok(settlement) => accepted(&state, index, settlement.status).await,
        Err(e) => failure(e),
    }
}

async fn cancel_entry(State(state): State<ApiState>, Path(index): Path<usize>) -> ApiResult {
    match state.flow.cancel_proposal(index).await {
        Ok(settlement) => accepted(&state, index, settlement.status).await,
        Err(e) => failure(e),
    }
}

async fn accepted(state: &ApiState, index: usize, status: ProposalStatus) -> ApiResult {
    let entry = state.flow.entry(index).await;
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(serde_json::json!({
            "index": index,
            "status": status,
            "entry": entry,
        }))),
    )
}

/// =============================
/// Receipts
/// =============================

async fn get_receipt(State(state): State<ApiState>, Path(reference): Path<String>) -> ApiResult {
    match state.flow.receipts().get(&reference).await {
        Some(receipt) => (StatusCode::OK, Json(ApiResponse::success(receipt))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No receipt with reference {}", reference))),
        ),
    }
}

/// =============================
/// Advisor Endpoints
/// =============================

async fn advice(State(state): State<ApiState>, Json(req): Json<AdviceRequest>) -> ApiResult {
    let advice = state.advisor.advice(&req.transactions, req.scope).await;
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "scope": req.scope,
            "advice": advice,
        }))),
    )
}

async fn insurance(State(state): State<ApiState>, Json(req): Json<InsuranceRequest>) -> ApiResult {
    let recommendation = state
        .advisor
        .recommend_insurance(&req.transactions, &req.profile)
        .await;
    (StatusCode::OK, Json(ApiResponse::success(recommendation)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(flow: Arc<TransactionPreviewFlow>, advisor: Arc<FinancialAdvisor>) -> Router {
    let state = ApiState { flow, advisor };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat/entries", get(list_entries))
        .route("/api/chat/messages", post(submit_message))
        .route("/api/chat/entries/:index/confirm", post(confirm_entry))
        .route("/api/chat/entries/:index/cancel", post(cancel_entry))
        .route("/api/receipts/:reference", get(get_receipt))
        .route("/api/advice", post(advice))
        .route("/api/insurance/recommendation", post(insurance))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    flow: Arc<TransactionPreviewFlow>,
    advisor: Arc<FinancialAdvisor>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(flow, advisor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::ScriptedAssistant;
    use crate::config::FlowConfig;
    use crate::llm::ScriptedModel;
    use crate::models::{AssistantReply, ProposalDraft, ProposalKind};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(
        replies: Vec<crate::Result<AssistantReply>>,
    ) -> (Arc<TransactionPreviewFlow>, Router) {
        let config = FlowConfig {
            greeting: None,
            confirm_delay: Duration::ZERO,
            cancel_delay: Duration::ZERO,
            ..FlowConfig::default()
        };
        let flow = Arc::new(TransactionPreviewFlow::new(
            Arc::new(ScriptedAssistant::new(replies)),
            config,
        ));
        let advisor = Arc::new(FinancialAdvisor::new(Arc::new(ScriptedModel::text(
            "- Spend less on takeout",
        ))));
        (flow.clone(), create_router(flow, advisor))
    }

    fn transfer() -> crate::Result<AssistantReply> {
        Ok(AssistantReply {
            text: "I've set up a transfer of ₦5000 to Mom.".to_string(),
            draft: Some(ProposalDraft {
                kind: ProposalKind::Transfer,
                amount: 5000.0,
                counterparty: "Mom".to_string(),
                note: None,
            }),
        })
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = router(vec![]);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let (flow, router) = router(vec![]);
        let (status, body) = call(
            &router,
            "POST",
            "/api/chat/messages",
            Some(serde_json::json!({ "text": " " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(flow.len().await, 0);
    }

    #[tokio::test]
    async fn test_message_confirm_and_receipt() {
        let (flow, router) = router(vec![transfer()]);

        let (status, body) = call(
            &router,
            "POST",
            "/api/chat/messages",
            Some(serde_json::json!({ "text": "Send 5k to Mom" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["proposal"]["status"], "pending");
        assert_eq!(data["proposal"]["amount"], 5000.0);

        let (status, body) = call(&router, "POST", "/api/chat/entries/1/confirm", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body.data.unwrap()["status"], "confirmed");

        let (status, _) = call(&router, "POST", "/api/chat/entries/1/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&router, "POST", "/api/chat/entries/9/confirm", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Wait for the zero-delay settlement to land
        let mut receipts = flow.receipts().list().await;
        for _ in 0..100 {
            if !receipts.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            receipts = flow.receipts().list().await;
        }
        assert_eq!(receipts.len(), 1);

        let uri = format!("/api/receipts/{}", receipts[0].reference);
        let (status, body) = call(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["proposal"]["counterparty"], "Mom");

        let (status, _) = call(&router, "GET", "/api/receipts/REF-NOPE00", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_confirm_without_proposal_conflicts() {
        let (_, router) = router(vec![Ok(AssistantReply::text("Hello!"))]);
        let hello = Some(serde_json::json!({ "text": "hi" }));
        call(&router, "POST", "/api/chat/messages", hello).await;

        let (status, body) = call(&router, "POST", "/api/chat/entries/0/confirm", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.unwrap().contains("no proposal"));

        let (status, body) = call(&router, "GET", "/api/chat/entries", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn test_advice_endpoint() {
        let (_, router) = router(vec![]);
        let (status, body) = call(
            &router,
            "POST",
            "/api/advice",
            Some(serde_json::json!({
                "scope": "individual",
                "transactions": [{
                    "id": "t1",
                    "date": "2024-05-01",
                    "merchant": "Shoprite",
                    "amount": 12000,
                    "type": "debit",
                    "category": "Groceries"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["advice"], "- Spend less on takeout");
    }
}

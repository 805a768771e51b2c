//! HTTP 服务层
//!
//! /chat 聊天入口、/health 健康检查（含网关探测）、/agents 智能体清单、
//! /tools 当前 Schema 快照、/tools/refresh 手动刷新。

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::agents::DomainAgent;
use crate::config::AppConfig;
use crate::gateway::{HttpGateway, SchemaCache};
use crate::orchestrator::{ChatRequest, Orchestrator};

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub gateway: Arc<HttpGateway>,
    pub schema: Arc<SchemaCache>,
    pub config: AppConfig,
}

/// /chat 响应体
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub agent_used: String,
    pub tools_called: Vec<String>,
    pub session_id: String,
    pub timestamp: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/tools", get(list_tools))
        .route("/tools/refresh", post(refresh_tools))
        .with_state(state)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if request.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty".to_string()));
    }

    let result = state.orchestrator.process_request(&request).await;
    Ok(Json(ChatResponse {
        response: result.response,
        agent_used: result.agent_used,
        tools_called: result.tools_called,
        session_id: result.session_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let gateway_connection = if state.gateway.probe().await {
        "healthy"
    } else {
        "unreachable"
    };
    Json(json!({
        "status": "healthy",
        "service": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "gateway_connection": gateway_connection,
    }))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut agents = vec![json!({
        "name": "Orchestrator Agent",
        "domain": "orchestrator",
        "description": "Coordinates complex shopping workflows across multiple domain agents",
    })];
    for agent in state.orchestrator.agents().values() {
        agents.push(json!({
            "name": agent.name(),
            "domain": agent.domain(),
            "description": agent.description(),
            "tools": agent.domain_tools(),
        }));
    }
    Json(json!({ "agents": agents }))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = state.schema.snapshot().await;
    Json(json!({
        "tools": snapshot.as_slice(),
        "count": snapshot.len(),
    }))
}

async fn refresh_tools(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.schema.refresh().await {
        Ok(count) => Ok(Json(json!({
            "status": "success",
            "message": format!("Refreshed {} tools", count),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))),
        Err(e) => {
            tracing::error!("schema refresh failed: {}", e);
            Err((StatusCode::BAD_GATEWAY, format!("schema refresh failed: {}", e)))
        }
    }
}

//! 服务入口：加载配置、发现工具、组装智能体并启动 HTTP 服务

use std::sync::Arc;

use anyhow::Context;
use boutique_agents::agents::build_registry;
use boutique_agents::config::load_config;
use boutique_agents::core::AgentContext;
use boutique_agents::gateway::{CapabilityGateway, HttpGateway, SchemaCache};
use boutique_agents::llm::create_oracle_from_config;
use boutique_agents::observability;
use boutique_agents::orchestrator::Orchestrator;
use boutique_agents::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("config load failed: {}, using defaults", e);
        Default::default()
    });

    let gateway = Arc::new(HttpGateway::new(
        &config.gateway.base_url,
        config.gateway.timeout_secs,
    ));
    let schema = Arc::new(SchemaCache::new(
        gateway.clone() as Arc<dyn CapabilityGateway>,
    ));
    let count = schema
        .refresh()
        .await
        .context("initial tool discovery failed")?;
    tracing::info!("discovered {} tools from {}", count, gateway.base_url());

    let oracle = create_oracle_from_config(&config);
    let ctx = Arc::new(AgentContext::new(
        oracle,
        gateway.clone() as Arc<dyn CapabilityGateway>,
        schema.clone(),
    ));
    let registry = build_registry(ctx.clone());
    tracing::info!("registered {} domain agents", registry.len());

    let orchestrator = Orchestrator::new(ctx, registry);
    let state = Arc::new(AppState {
        orchestrator,
        gateway,
        schema,
        config: config.clone(),
    });
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("{} listening on {}", config.app.name, addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind listen address")?;
    axum::serve(listener, router).await.context("Server failed")?;

    Ok(())
}

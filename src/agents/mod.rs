//! 域智能体层
//!
//! DomainAgent 是能力接口：各域实现名称、能力集与若干钩子
//! （规划指引、降级计划、响应渲染、计划修补），通用的
//! 规划 → 执行 → 响应生命周期由 trait 的默认 process 提供。
//! 编排器通过显式的注册表（domain -> agent）做委派。

pub mod base;
pub mod cart;
pub mod currency;
pub mod image;
pub mod product;
pub mod sentiment;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::AgentContext;
use crate::plan::{recover, validate_tool_plan, ToolPlan};

pub use base::AgentCore;
pub use cart::CartAgent;
pub use currency::CurrencyAgent;
pub use image::ImageAgent;
pub use product::ProductAgent;
pub use sentiment::SentimentAgent;

/// 单次工具调用的结果（成功携带网关返回的 JSON，失败携带错误描述）
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolOutcome {
    Success { tool: String, result: Value },
    Failure { tool: String, error: String },
}

impl ToolOutcome {
    pub fn tool(&self) -> &str {
        match self {
            ToolOutcome::Success { tool, .. } | ToolOutcome::Failure { tool, .. } => tool,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success { .. })
    }
}

/// 智能体处理结果（/chat 响应的主体）
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub response: String,
    pub agent_used: String,
    pub tools_called: Vec<String>,
    pub session_id: String,
    pub error: bool,
}

/// 域智能体能力接口
///
/// process 的默认实现覆盖完整生命周期：会话 ID 补齐、规划（含恢复与
/// 校验）、按序执行、渲染与会话更新。各域只需提供钩子。
#[async_trait]
pub trait DomainAgent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 注册表键（product / cart / currency / sentiment / image）
    fn domain(&self) -> &str;

    /// 该域的能力集（允许调用的工具名）
    fn domain_tools(&self) -> &[&str];

    fn core(&self) -> &AgentCore;

    /// 附加在通用工具选择 prompt 之后的域内指引
    fn planning_guidance(
        &self,
        message: &str,
        user_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> String;

    /// 模型不可用时的确定性降级计划
    fn fallback_plan(
        &self,
        message: &str,
        user_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> ToolPlan;

    /// 根据执行结果渲染最终响应
    async fn render_response(
        &self,
        message: &str,
        outcomes: &[ToolOutcome],
        plan: &ToolPlan,
    ) -> String;

    /// 校验后的计划修补钩子（如图像智能体补 URL 参数），默认原样返回
    fn repair_plan(
        &self,
        plan: ToolPlan,
        _message: &str,
        _context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        plan
    }

    /// 是否强制要求 user_id（购物车操作需要）
    fn requires_user_id(&self) -> bool {
        false
    }

    /// 缺 user_id 时的拒绝话术
    fn missing_user_id_response(&self) -> String {
        "I need a user ID to continue. Please provide your user identifier.".to_string()
    }

    /// 通用生命周期：规划 → 执行 → 渲染 → 会话更新
    async fn process(
        &self,
        message: &str,
        user_id: Option<&str>,
        session_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> AgentResult {
        let session_id = session_id
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(crate::session::new_session_id);

        if self.requires_user_id() && user_id.map_or(true, str::is_empty) {
            return AgentResult {
                response: self.missing_user_id_response(),
                agent_used: self.domain().to_string(),
                tools_called: Vec::new(),
                session_id,
                error: false,
            };
        }

        let core = self.core();
        let tools = core.available_tools(self.domain_tools()).await;

        let mut prompt = base::tool_calling_prompt(message, &tools);
        prompt.push_str(&self.planning_guidance(message, user_id, context));

        let plan = match core.oracle().generate(&prompt).await {
            Ok(text) => validate_tool_plan(&recover(&text, None)),
            Err(e) => {
                tracing::warn!("{} planning failed: {}, using fallback plan", self.name(), e);
                self.fallback_plan(message, user_id, context)
            }
        };
        let plan = self.repair_plan(plan, message, context);

        let (outcomes, tools_called) = core
            .execute_plan(self.name(), &plan, user_id, &tools)
            .await;

        let response = self.render_response(message, &outcomes, &plan).await;

        core.sessions()
            .append_exchange(&session_id, message, &response, tools_called.clone())
            .await;

        AgentResult {
            response,
            agent_used: self.domain().to_string(),
            tools_called,
            session_id,
            error: false,
        }
    }
}

/// 域名 -> 智能体的注册表
pub type AgentRegistry = HashMap<String, Arc<dyn DomainAgent>>;

/// 构建全部内置域智能体
pub fn build_registry(ctx: Arc<AgentContext>) -> AgentRegistry {
    let agents: Vec<Arc<dyn DomainAgent>> = vec![
        Arc::new(ProductAgent::new(ctx.clone())),
        Arc::new(CartAgent::new(ctx.clone())),
        Arc::new(CurrencyAgent::new(ctx.clone())),
        Arc::new(SentimentAgent::new(ctx.clone())),
        Arc::new(ImageAgent::new(ctx)),
    ];
    agents
        .into_iter()
        .map(|a| (a.domain().to_string(), a))
        .collect()
}

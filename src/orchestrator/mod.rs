//! 编排器
//!
//! 三阶段处理用户请求：分析（生成工作流）→ 执行（逐步委派域智能体，
//! 或对未注册域直接调工具）→ 合成（模型汇总各步结果）。
//! 步骤严格按计划顺序串行执行；depends_on 仅记录，不用于重排。

pub mod analyzer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::agents::{AgentRegistry, AgentResult, DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::{extract_parameters, RequestAnalysis, WorkflowStep};
use crate::session::SessionStore;

pub use analyzer::analyze_request;

/// /chat 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Partial,
    Failed,
}

/// 单个工作流步骤的执行记录
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: u32,
    pub domain: String,
    pub action: String,
    pub agent_used: Option<String>,
    pub tools_used: Vec<String>,
    pub results: Vec<ToolOutcome>,
    pub status: StepStatus,
}

pub struct Orchestrator {
    ctx: Arc<AgentContext>,
    agents: AgentRegistry,
    sessions: SessionStore,
}

impl Orchestrator {
    pub fn new(ctx: Arc<AgentContext>, agents: AgentRegistry) -> Self {
        Self {
            ctx,
            agents,
            sessions: SessionStore::new(),
        }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// 完整的请求处理入口
    pub async fn process_request(&self, request: &ChatRequest) -> AgentResult {
        let session_id = request
            .session_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(crate::session::new_session_id);
        let user_id = request.user_id.as_deref().filter(|u| !u.is_empty());

        tracing::info!("orchestrator analyzing request, session: {}", session_id);
        let analysis = analyze_request(
            self.ctx.oracle.as_ref(),
            &request.message,
            request.context.as_ref(),
        )
        .await;

        tracing::info!(
            "orchestrator executing {} workflow steps",
            analysis.workflow_steps.len()
        );
        let (step_results, tools_called) = self
            .execute_workflow(&analysis, &request.message, user_id, &session_id, request.context.as_ref())
            .await;

        tracing::info!("orchestrator synthesizing response");
        let response = self
            .synthesize_response(&analysis, &step_results, &request.message)
            .await;

        self.sessions
            .append_exchange(&session_id, &request.message, &response, tools_called.clone())
            .await;

        AgentResult {
            response,
            agent_used: "orchestrator".to_string(),
            tools_called,
            session_id,
            error: false,
        }
    }

    /// 串行执行工作流步骤，在步骤间传递累积上下文
    async fn execute_workflow(
        &self,
        analysis: &RequestAnalysis,
        message: &str,
        user_id: Option<&str>,
        session_id: &str,
        context: Option<&Map<String, Value>>,
    ) -> (Vec<StepResult>, Vec<String>) {
        let mut step_results = Vec::new();
        let mut tools_called: Vec<String> = Vec::new();
        let mut accumulated: Map<String, Value> = context.cloned().unwrap_or_default();

        for step in &analysis.workflow_steps {
            let delegate = step.agent_delegation && self.agents.contains_key(&step.domain);
            let result = if delegate {
                tracing::debug!("delegating step {} to {} agent", step.step, step.domain);
                self.delegate_step(step, message, user_id, session_id, &accumulated)
                    .await
            } else {
                tracing::warn!(
                    "executing step {} directly, no delegation for domain '{}'",
                    step.step,
                    step.domain
                );
                self.execute_step_directly(step, message, user_id).await
            };

            for tool in &result.tools_used {
                if !tools_called.contains(tool) {
                    tools_called.push(tool.clone());
                }
            }

            if result.status == StepStatus::Completed {
                for outcome in &result.results {
                    if let ToolOutcome::Success { result: value, .. } = outcome {
                        if let Some(response) = value.get("agent_response") {
                            accumulated.insert(
                                format!("{}_response", step.domain),
                                response.clone(),
                            );
                            if !result.tools_used.is_empty() {
                                accumulated.insert(
                                    format!("{}_tools_used", step.domain),
                                    json!(result.tools_used),
                                );
                            }
                        }
                    }
                }
            }

            step_results.push(result);
        }

        (step_results, tools_called)
    }

    /// 委派一个步骤给域智能体
    async fn delegate_step(
        &self,
        step: &WorkflowStep,
        message: &str,
        user_id: Option<&str>,
        session_id: &str,
        accumulated: &Map<String, Value>,
    ) -> StepResult {
        let agent = &self.agents[&step.domain];

        let mut delegation_context = Map::new();
        delegation_context.insert(
            "orchestrator_action".to_string(),
            Value::String(step.action.clone()),
        );
        delegation_context.insert("step".to_string(), json!(step.step));
        delegation_context.insert("user_id".to_string(), json!(user_id));
        delegation_context.insert("session_id".to_string(), json!(session_id));
        delegation_context.insert(
            "delegation_source".to_string(),
            Value::String("orchestrator".to_string()),
        );
        for (key, value) in accumulated {
            delegation_context.insert(key.clone(), value.clone());
        }

        let agent_result = agent
            .process(message, user_id, Some(session_id), Some(&delegation_context))
            .await;

        let status = if agent_result.error {
            StepStatus::Failed
        } else {
            StepStatus::Completed
        };

        StepResult {
            step: step.step,
            domain: step.domain.clone(),
            action: step.action.clone(),
            agent_used: Some(agent_result.agent_used.clone()),
            tools_used: agent_result.tools_called,
            results: vec![ToolOutcome::Success {
                tool: format!("{}_agent", step.domain),
                result: json!({"agent_response": agent_result.response}),
            }],
            status,
        }
    }

    /// 无委派的直接执行：逐工具抽参并经网关调用
    async fn execute_step_directly(
        &self,
        step: &WorkflowStep,
        message: &str,
        user_id: Option<&str>,
    ) -> StepResult {
        let mut tools_used = Vec::new();
        let mut results = Vec::new();
        let mut status = StepStatus::Completed;

        let snapshot = self.ctx.schema.snapshot().await;
        for tool_name in &step.tools {
            let Some(schema) = snapshot.iter().find(|t| &t.name == tool_name) else {
                tracing::error!("tool not found in schema: {}", tool_name);
                results.push(ToolOutcome::Failure {
                    tool: tool_name.clone(),
                    error: format!("Tool '{}' not found in available tools", tool_name),
                });
                status = StepStatus::Partial;
                continue;
            };

            let mut params = self
                .determine_tool_parameters(schema, message, user_id)
                .await;
            if let Some(uid) = user_id {
                if schema.has_parameter("user_id") {
                    params.insert("user_id".to_string(), Value::String(uid.to_string()));
                }
            }

            match self.ctx.gateway.invoke(schema, &params).await {
                Ok(value) => {
                    tools_used.push(schema.name.clone());
                    results.push(ToolOutcome::Success {
                        tool: schema.name.clone(),
                        result: value,
                    });
                }
                Err(e) => {
                    tracing::error!("direct tool execution failed: {} - {}", schema.name, e);
                    results.push(ToolOutcome::Failure {
                        tool: schema.name.clone(),
                        error: e.to_string(),
                    });
                    status = StepStatus::Partial;
                }
            }
        }

        StepResult {
            step: step.step,
            domain: step.domain.clone(),
            action: step.action.clone(),
            agent_used: None,
            tools_used,
            results,
            status,
        }
    }

    /// 用模型从消息中抽取工具参数；失败时给最小参数集
    async fn determine_tool_parameters(
        &self,
        schema: &crate::gateway::ToolSchema,
        message: &str,
        user_id: Option<&str>,
    ) -> Map<String, Value> {
        let prompt = format!(
            r#"Extract parameters for the tool '{}' from this user message.

User message: {}
User ID: {}

Tool schema:
{}

Important guidelines:
- Extract exact URLs without modification
- For product searches, extract product names, categories, or search terms
- For cart operations, extract product IDs and quantities

Respond with only a JSON object containing the parameters:"#,
            schema.name,
            message,
            user_id.unwrap_or("unknown"),
            serde_json::to_string_pretty(schema).unwrap_or_default()
        );

        match self.ctx.oracle.generate(&prompt).await {
            Ok(text) => extract_parameters(&text, schema),
            Err(e) => {
                tracing::warn!("parameter extraction failed for {}: {}", schema.name, e);
                let mut params = Map::new();
                if let Some(uid) = user_id {
                    if schema.has_parameter("user_id") {
                        params.insert("user_id".to_string(), Value::String(uid.to_string()));
                    }
                }
                if schema.has_parameter("query") {
                    params.insert("query".to_string(), Value::String(message.to_string()));
                }
                params
            }
        }
    }

    /// 用模型把各步结果合成为最终回复
    async fn synthesize_response(
        &self,
        analysis: &RequestAnalysis,
        step_results: &[StepResult],
        message: &str,
    ) -> String {
        let results_json = serde_json::to_string_pretty(step_results)
            .unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            r#"Synthesize a helpful response for the user based on the workflow execution results.

Original user request: {}
Intent: {}
Expected outcome: {}

Workflow results:
{}

Create a natural, helpful response that:
1. Directly addresses the user's request
2. Uses the data from the tool results
3. Is conversational and friendly
4. Provides actionable information when possible

Response:"#,
            message, analysis.intent, analysis.expected_outcome, results_json
        );

        match self.ctx.oracle.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::error!("Response synthesis failed: {}", e);
                "I've processed your request, but encountered an issue generating the response. \
                 Please try again."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::base::AgentCore;
    use crate::agents::{build_registry, AgentResult, DomainAgent};
    use crate::gateway::{SchemaCache, ToolSchema};
    use crate::llm::MockOracle;
    use crate::plan::{Complexity, ToolPlan};
    use async_trait::async_trait;

    struct OkGateway {
        tools: Vec<ToolSchema>,
    }

    #[async_trait]
    impl crate::gateway::CapabilityGateway for OkGateway {
        async fn fetch_schema(&self) -> Result<Vec<ToolSchema>, crate::core::GatewayError> {
            Ok(self.tools.clone())
        }

        async fn invoke(
            &self,
            _tool: &ToolSchema,
            _params: &Map<String, Value>,
        ) -> Result<Value, crate::core::GatewayError> {
            Ok(json!({"status": "ok"}))
        }
    }

    /// 总是报 error 的智能体，用于验证步骤状态记录
    struct BrokenAgent {
        core: AgentCore,
    }

    #[async_trait]
    impl DomainAgent for BrokenAgent {
        fn name(&self) -> &str {
            "Broken Agent"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn domain(&self) -> &str {
            "broken"
        }
        fn domain_tools(&self) -> &[&str] {
            &[]
        }
        fn core(&self) -> &AgentCore {
            &self.core
        }
        fn planning_guidance(
            &self,
            _message: &str,
            _user_id: Option<&str>,
            _context: Option<&Map<String, Value>>,
        ) -> String {
            String::new()
        }
        fn fallback_plan(
            &self,
            _message: &str,
            _user_id: Option<&str>,
            _context: Option<&Map<String, Value>>,
        ) -> ToolPlan {
            ToolPlan::empty("", "")
        }
        async fn render_response(
            &self,
            _message: &str,
            _outcomes: &[crate::agents::ToolOutcome],
            _plan: &ToolPlan,
        ) -> String {
            String::new()
        }
        async fn process(
            &self,
            _message: &str,
            _user_id: Option<&str>,
            session_id: Option<&str>,
            _context: Option<&Map<String, Value>>,
        ) -> AgentResult {
            AgentResult {
                response: "I apologize, something went wrong.".to_string(),
                agent_used: "broken".to_string(),
                tools_called: Vec::new(),
                session_id: session_id.unwrap_or_default().to_string(),
                error: true,
            }
        }
    }

    fn tool(name: &str) -> ToolSchema {
        serde_json::from_value(json!({
            "name": name,
            "endpoint": format!("/{}", name),
            "method": "POST"
        }))
        .unwrap()
    }

    fn step(n: u32, domain: &str) -> WorkflowStep {
        WorkflowStep {
            step: n,
            domain: domain.to_string(),
            action: format!("step {}", n),
            tools: Vec::new(),
            depends_on: Vec::new(),
            agent_delegation: true,
        }
    }

    #[tokio::test]
    async fn test_failing_middle_step_does_not_stop_workflow() {
        let gateway: Arc<dyn crate::gateway::CapabilityGateway> = Arc::new(OkGateway {
            tools: vec![tool("semantic_search_products"), tool("get_supported_currencies")],
        });
        let cache = Arc::new(SchemaCache::new(gateway.clone()));
        cache.refresh().await.unwrap();

        // 顺序：商品计划、商品渲染、货币计划（broken 不用模型，货币渲染确定性）
        let oracle = MockOracle::with_replies([
            json!({
                "reasoning": "search",
                "tools_to_call": [{"tool_name": "semantic_search_products",
                                   "parameters": {"query": "lamp"}}],
                "response_strategy": "list"
            })
            .to_string(),
            "Found a lamp.".to_string(),
            json!({
                "reasoning": "currencies",
                "tools_to_call": [{"tool_name": "get_supported_currencies",
                                   "parameters": {}}],
                "response_strategy": "show"
            })
            .to_string(),
        ]);
        let ctx = Arc::new(AgentContext::new(Arc::new(oracle), gateway, cache));
        let mut registry = build_registry(ctx.clone());
        registry.insert(
            "broken".to_string(),
            Arc::new(BrokenAgent {
                core: AgentCore::new(ctx.clone()),
            }),
        );
        let orchestrator = Orchestrator::new(ctx, registry);

        let analysis = RequestAnalysis {
            intent: "test".to_string(),
            complexity: Complexity::Moderate,
            domains_needed: vec![
                "product".to_string(),
                "broken".to_string(),
                "currency".to_string(),
            ],
            workflow_steps: vec![step(1, "product"), step(2, "broken"), step(3, "currency")],
            expected_outcome: "test".to_string(),
        };

        let (results, tools) = orchestrator
            .execute_workflow(&analysis, "find a lamp", None, "session_t", None)
            .await;

        let statuses: Vec<StepStatus> = results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Completed, StepStatus::Failed, StepStatus::Completed]
        );
        assert_eq!(
            tools,
            vec!["semantic_search_products", "get_supported_currencies"]
        );
    }
}

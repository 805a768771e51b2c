//! 智能体公共核心
//!
//! AgentCore 持有共享依赖与本智能体的会话存储，提供能力集过滤与
//! 计划执行；每次工具调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::agents::ToolOutcome;
use crate::core::AgentContext;
use crate::gateway::ToolSchema;
use crate::llm::GenerationOracle;
use crate::plan::ToolPlan;
use crate::session::SessionStore;

/// 每个域智能体内嵌一个 AgentCore
pub struct AgentCore {
    ctx: Arc<AgentContext>,
    sessions: SessionStore,
}

impl AgentCore {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            ctx,
            sessions: SessionStore::new(),
        }
    }

    pub fn oracle(&self) -> &dyn GenerationOracle {
        self.ctx.oracle.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// 从当前 Schema 快照中过滤出能力集内的工具，保持快照顺序
    pub async fn available_tools(&self, domain_tools: &[&str]) -> Vec<ToolSchema> {
        self.ctx
            .schema
            .snapshot()
            .await
            .iter()
            .filter(|t| domain_tools.contains(&t.name.as_str()))
            .cloned()
            .collect()
    }

    /// 按计划顺序执行工具调用
    ///
    /// 能力集外的工具与网关错误都记为失败结果并继续，不中断整个计划；
    /// 工具 Schema 声明了 user_id 参数且调用方提供时自动注入。
    pub async fn execute_plan(
        &self,
        agent_name: &str,
        plan: &ToolPlan,
        user_id: Option<&str>,
        allowed: &[ToolSchema],
    ) -> (Vec<ToolOutcome>, Vec<String>) {
        let mut outcomes = Vec::new();
        let mut tools_called = Vec::new();

        for call in &plan.tools_to_call {
            let Some(schema) = allowed.iter().find(|t| t.name == call.tool_name) else {
                tracing::warn!(
                    "{} planned unavailable tool: {}",
                    agent_name,
                    call.tool_name
                );
                outcomes.push(ToolOutcome::Failure {
                    tool: call.tool_name.clone(),
                    error: format!("Tool '{}' not found in available tools", call.tool_name),
                });
                continue;
            };

            let mut params = call.parameters.clone();
            if let Some(uid) = user_id.filter(|u| !u.is_empty()) {
                if schema.has_parameter("user_id") {
                    params.insert("user_id".to_string(), Value::String(uid.to_string()));
                }
            }

            let start = Instant::now();
            let result = self.ctx.gateway.invoke(schema, &params).await;
            let audit = serde_json::json!({
                "event": "tool_audit",
                "agent": agent_name,
                "tool": schema.name,
                "ok": result.is_ok(),
                "duration_ms": start.elapsed().as_millis() as u64,
                "params_preview": params_preview(&params),
            });
            tracing::info!(audit = %audit.to_string(), "tool");

            match result {
                Ok(value) => {
                    outcomes.push(ToolOutcome::Success {
                        tool: schema.name.clone(),
                        result: value,
                    });
                    tools_called.push(schema.name.clone());
                }
                Err(e) => {
                    tracing::error!("{} tool call failed: {} - {}", agent_name, schema.name, e);
                    outcomes.push(ToolOutcome::Failure {
                        tool: schema.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        (outcomes, tools_called)
    }
}

/// 通用的工具选择 prompt：枚举可用工具及参数，要求输出计划 JSON
pub fn tool_calling_prompt(message: &str, tools: &[ToolSchema]) -> String {
    let mut descriptions = Vec::new();
    for tool in tools {
        let mut params = Vec::new();
        for (name, info) in &tool.parameters {
            params.push(format!("  - {}: {}", name, info.description));
        }
        let params_block = if params.is_empty() {
            "  (no parameters)".to_string()
        } else {
            params.join("\n")
        };
        descriptions.push(format!(
            "\nTool: {}\nDescription: {}\nParameters:\n{}",
            tool.name, tool.description, params_block
        ));
    }

    format!(
        r#"You are an AI agent that needs to decide which tools to call to help the user.

User request: {}

Available tools:
{}

Analyze the user's request and respond with a JSON object containing:
1. "reasoning": Brief explanation of your analysis
2. "tools_to_call": Array of tools to call with their parameters
3. "response_strategy": How you plan to present the results

Format for tools_to_call:
[
  {{
    "tool_name": "exact_tool_name",
    "parameters": {{
      "param1": "value1",
      "param2": "value2"
    }},
    "reasoning": "why this tool is needed"
  }}
]

Return only the JSON object, no additional text."#,
        message,
        descriptions.join("\n")
    )
}

fn params_preview(params: &serde_json::Map<String, Value>) -> String {
    let s = Value::Object(params.clone()).to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

/// 序列化上下文，供各域的规划指引嵌入 prompt
pub fn context_json(context: Option<&serde_json::Map<String, Value>>) -> String {
    context
        .map(|c| Value::Object(c.clone()).to_string())
        .unwrap_or_else(|| "No context".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{HttpMethod, SchemaCache, ToolParameter};
    use crate::llm::MockOracle;
    use async_trait::async_trait;
    use serde_json::json;

    fn schema(name: &str) -> ToolSchema {
        ToolSchema {
            name: name.to_string(),
            description: format!("{} tool", name),
            parameters: Default::default(),
            endpoint: format!("/{}", name),
            method: HttpMethod::Post,
        }
    }

    struct SeededGateway {
        tools: Vec<ToolSchema>,
    }

    #[async_trait]
    impl crate::gateway::CapabilityGateway for SeededGateway {
        async fn fetch_schema(&self) -> Result<Vec<ToolSchema>, crate::core::GatewayError> {
            Ok(self.tools.clone())
        }

        async fn invoke(
            &self,
            _tool: &ToolSchema,
            _params: &serde_json::Map<String, Value>,
        ) -> Result<Value, crate::core::GatewayError> {
            Ok(json!({"status": "ok"}))
        }
    }

    #[tokio::test]
    async fn test_available_tools_filters_and_preserves_order() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let gateway: Arc<dyn crate::gateway::CapabilityGateway> = Arc::new(SeededGateway {
            tools: names.iter().map(|n| schema(n)).collect(),
        });
        let cache = Arc::new(SchemaCache::new(gateway.clone()));
        cache.refresh().await.unwrap();
        let ctx = Arc::new(AgentContext::new(
            Arc::new(MockOracle::failing()),
            gateway,
            cache,
        ));
        let core = AgentCore::new(ctx);

        let available = core.available_tools(&["h", "b", "e"]).await;
        let got: Vec<&str> = available.iter().map(|t| t.name.as_str()).collect();
        // 快照顺序优先于能力集声明顺序
        assert_eq!(got, vec!["b", "e", "h"]);
    }

    #[test]
    fn test_prompt_lists_tools() {
        let tools = vec![ToolSchema {
            name: "search_products".to_string(),
            description: "Search the catalog".to_string(),
            parameters: [(
                "query".to_string(),
                ToolParameter {
                    kind: "string".to_string(),
                    description: "Search terms".to_string(),
                    required: true,
                },
            )]
            .into_iter()
            .collect(),
            endpoint: "/products/search".to_string(),
            method: HttpMethod::Get,
        }];
        let prompt = tool_calling_prompt("find a couch", &tools);
        assert!(prompt.contains("Tool: search_products"));
        assert!(prompt.contains("- query: Search terms"));
        assert!(prompt.contains("find a couch"));
    }
}

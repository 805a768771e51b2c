//! 货币智能体
//!
//! 汇率查询、币种转换与金额格式化；响应为确定性的结构化输出。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::agents::base::AgentCore;
use crate::agents::{DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::{ToolCall, ToolPlan};

const CURRENCY_TOOLS: &[&str] = &[
    "get_supported_currencies",
    "convert_currency",
    "get_exchange_rates",
    "format_money",
];

pub struct CurrencyAgent {
    core: AgentCore,
}

impl CurrencyAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            core: AgentCore::new(ctx),
        }
    }
}

#[async_trait]
impl DomainAgent for CurrencyAgent {
    fn name(&self) -> &str {
        "Currency Agent"
    }

    fn description(&self) -> &str {
        "Specialized in currency conversion, exchange rates, and price formatting"
    }

    fn domain(&self) -> &str {
        "currency"
    }

    fn domain_tools(&self) -> &[&str] {
        CURRENCY_TOOLS
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
        r#"
Currency-specific guidelines:
- Use convert_currency when user wants to convert between currencies (need from_currency, to_currency, amount)
- Use get_supported_currencies when user asks what currencies are available
- Use get_exchange_rates when user wants current exchange rates
- Use format_money when user wants to format an amount with currency symbol

Examples:
- "Convert $100 to EUR" -> convert_currency with from_currency="USD", to_currency="EUR", amount=100
- "What currencies do you support?" -> get_supported_currencies
- "Show me exchange rates" -> get_exchange_rates
- "Format 50.99 as USD" -> format_money with amount=50.99, currency_code="USD"
"#
        .to_string()
    }

    fn fallback_plan(
        &self,
        _message: &str,
        _user_id: Option<&str>,
        _context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        ToolPlan {
            reasoning: "Fallback to showing supported currencies".to_string(),
            tools_to_call: vec![ToolCall {
                tool_name: "get_supported_currencies".to_string(),
                parameters: Map::new(),
                reasoning: "Default to showing available currencies".to_string(),
            }],
            response_strategy: "Show available currencies".to_string(),
        }
    }

    async fn render_response(
        &self,
        _message: &str,
        outcomes: &[ToolOutcome],
        _plan: &ToolPlan,
    ) -> String {
        let mut parts = Vec::new();

        for outcome in outcomes {
            match outcome {
                ToolOutcome::Success { tool, result } => {
                    parts.push(format!("**{}:**", tool));
                    parts.push(
                        serde_json::to_string_pretty(result)
                            .unwrap_or_else(|_| result.to_string()),
                    );
                }
                ToolOutcome::Failure { tool, error } => {
                    parts.push(format!("Error with {}: {}", tool, error));
                }
            }
        }

        if parts.is_empty() {
            "No currency data available.".to_string()
        } else {
            let mut out = vec!["**Currency Results:**".to_string()];
            out.extend(parts);
            out.join("\n")
        }
    }
}

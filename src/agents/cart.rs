//! 购物车智能体
//!
//! 购物车的增查清操作；必须提供 user_id，否则直接拒绝。
//! 响应为确定性的结构化输出，不经模型合成。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::agents::base::{context_json, AgentCore};
use crate::agents::{DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::{ToolCall, ToolPlan};

const CART_TOOLS: &[&str] = &["add_to_cart", "get_cart_contents", "clear_cart"];

pub struct CartAgent {
    core: AgentCore,
}

impl CartAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            core: AgentCore::new(ctx),
        }
    }
}

#[async_trait]
impl DomainAgent for CartAgent {
    fn name(&self) -> &str {
        "Cart Agent"
    }

    fn description(&self) -> &str {
        "Specialized in shopping cart management and operations"
    }

    fn domain(&self) -> &str {
        "cart"
    }

    fn domain_tools(&self) -> &[&str] {
        CART_TOOLS
    }

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn requires_user_id(&self) -> bool {
        true
    }

    fn missing_user_id_response(&self) -> String {
        "I need a user ID to manage your shopping cart. Please provide your user identifier."
            .to_string()
    }

    fn planning_guidance(
        &self,
        _message: &str,
        user_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> String {
        format!(
            r#"
Context for previous steps: {}

User ID: {}

Cart-specific guidelines:
- Use add_to_cart when user wants to add items (need product_id and quantity)
- Use get_cart_contents when user wants to see what's in their cart
- Use clear_cart when user wants to empty their cart
- Always include user_id in parameters

IMPORTANT: If context contains responses from other agents, use that information to identify products to work with the cart.
- If context has product_agent_response with product IDs, use those IDs

Examples:
- "Add this item to my cart" -> add_to_cart (need to identify product_id from context)
- "What's in my cart?" -> get_cart_contents
- "Clear my cart" -> clear_cart
- "Remove everything" -> clear_cart
"#,
            context_json(context),
            user_id.unwrap_or("Not provided")
        )
    }

    fn fallback_plan(
        &self,
        _message: &str,
        user_id: Option<&str>,
        _context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        ToolPlan {
            reasoning: "Fallback to showing cart contents".to_string(),
            tools_to_call: vec![ToolCall {
                tool_name: "get_cart_contents".to_string(),
                parameters: json!({"user_id": user_id.unwrap_or_default()})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                reasoning: "Default to showing current cart".to_string(),
            }],
            response_strategy: "Show current cart contents".to_string(),
        }
    }

    async fn render_response(
        &self,
        _message: &str,
        outcomes: &[ToolOutcome],
        _plan: &ToolPlan,
    ) -> String {
        let mut cart_sections = Vec::new();
        let mut operation_sections = Vec::new();
        let mut error_sections = Vec::new();

        for outcome in outcomes {
            match outcome {
                ToolOutcome::Success { tool, result } => {
                    if result.get("items").is_some() {
                        cart_sections.push(render_cart_contents(result));
                    } else {
                        operation_sections.push(format!(
                            "Operation: {}\nStatus: {}\nMessage: {}",
                            tool,
                            result.get("status").and_then(Value::as_str).unwrap_or(""),
                            result.get("message").and_then(Value::as_str).unwrap_or("")
                        ));
                    }
                }
                ToolOutcome::Failure { tool, error } => {
                    error_sections.push(format!("Error with {}: {}", tool, error));
                }
            }
        }

        let mut parts = Vec::new();
        if !cart_sections.is_empty() {
            parts.push("**Cart Contents:**".to_string());
            parts.extend(cart_sections);
        }
        if !operation_sections.is_empty() {
            parts.push("**Cart Operations:**".to_string());
            parts.extend(operation_sections);
        }
        if !error_sections.is_empty() {
            parts.push("**Cart Errors:**".to_string());
            parts.extend(error_sections);
        }

        if parts.is_empty() {
            "No cart data available.".to_string()
        } else {
            parts.join("\n")
        }
    }
}

fn render_cart_contents(result: &Value) -> String {
    let mut lines = vec![
        format!(
            "User ID: {}",
            result.get("user_id").and_then(Value::as_str).unwrap_or("")
        ),
        format!(
            "Total Items: {}",
            result.get("total_items").and_then(Value::as_u64).unwrap_or(0)
        ),
    ];

    match result.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {
            lines.push("\n**Items in Cart:**".to_string());
            for (i, item) in items.iter().enumerate() {
                lines.push(format!(
                    "  {}. Product ID: {}",
                    i + 1,
                    item.get("product_id").and_then(Value::as_str).unwrap_or("N/A")
                ));
                lines.push(format!(
                    "     Quantity: {}",
                    item.get("quantity").and_then(Value::as_u64).unwrap_or(0)
                ));
            }
        }
        _ => lines.push("Cart is empty".to_string()),
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_cart_contents_with_items() {
        let result = json!({
            "status": "ok",
            "user_id": "u1",
            "total_items": 2,
            "items": [
                {"product_id": "OLJCESPC7Z", "quantity": 2}
            ]
        });
        let text = render_cart_contents(&result);
        assert!(text.contains("User ID: u1"));
        assert!(text.contains("Product ID: OLJCESPC7Z"));
        assert!(text.contains("Quantity: 2"));
    }

    #[test]
    fn test_render_empty_cart() {
        let result = json!({"status": "ok", "user_id": "u1", "total_items": 0, "items": []});
        assert!(render_cart_contents(&result).contains("Cart is empty"));
    }

    #[tokio::test]
    async fn test_render_gateway_error_keeps_cart_heading() {
        use crate::gateway::SchemaCache;
        use crate::llm::MockOracle;
        use async_trait::async_trait;

        struct DeadGateway;

        #[async_trait]
        impl crate::gateway::CapabilityGateway for DeadGateway {
            async fn fetch_schema(
                &self,
            ) -> Result<Vec<crate::gateway::ToolSchema>, crate::core::GatewayError> {
                Ok(Vec::new())
            }
            async fn invoke(
                &self,
                _tool: &crate::gateway::ToolSchema,
                _params: &Map<String, Value>,
            ) -> Result<Value, crate::core::GatewayError> {
                Ok(Value::Null)
            }
        }

        let gateway: Arc<dyn crate::gateway::CapabilityGateway> = Arc::new(DeadGateway);
        let cache = Arc::new(SchemaCache::new(gateway.clone()));
        let ctx = Arc::new(AgentContext::new(
            Arc::new(MockOracle::failing()),
            gateway,
            cache,
        ));
        let agent = CartAgent::new(ctx);

        let outcomes = vec![ToolOutcome::Failure {
            tool: "get_cart_contents".to_string(),
            error: "Gateway returned status 503: unavailable".to_string(),
        }];
        let plan = ToolPlan::empty("", "");
        let response = agent.render_response("show my cart", &outcomes, &plan).await;

        // 纯错误结果也要保留购物车上下文，而不是裸错误行
        assert!(response.contains("Cart"));
        assert!(response.contains("Error with get_cart_contents"));
    }
}

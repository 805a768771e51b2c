//! 商品智能体
//!
//! 负责商品目录检索：关键词 / 语义搜索、分类浏览、按 ID 查询。
//! 响应由模型合成（模型失败时退化为固定文案）。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::agents::base::{context_json, AgentCore};
use crate::agents::{DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::{ToolCall, ToolPlan};

const PRODUCT_TOOLS: &[&str] = &[
    "list_all_products",
    "get_product_by_id",
    "search_products",
    "get_products_by_category",
    "semantic_search_products",
];

pub struct ProductAgent {
    core: AgentCore,
}

impl ProductAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            core: AgentCore::new(ctx),
        }
    }
}

#[async_trait]
impl DomainAgent for ProductAgent {
    fn name(&self) -> &str {
        "Product Agent"
    }

    fn description(&self) -> &str {
        "Specialized in product search, recommendations, and catalog browsing"
    }

    fn domain(&self) -> &str {
        "product"
    }

    fn domain_tools(&self) -> &[&str] {
        PRODUCT_TOOLS
    }

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn planning_guidance(
        &self,
        _message: &str,
        _user_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> String {
        format!(
            r#"
Context for previous steps: {}

Product-specific guidelines:
- Use semantic_search_products for natural language queries about product features or style
- Use search_products for keyword-based searches (most of the time, semantic_search_products is preferred unless user explicitly asks for a specific product)
- Use get_products_by_category when user mentions specific categories
- Use list_all_products only when user wants to browse everything
- Use get_product_by_id when user mentions a specific product ID

IMPORTANT: If context contains responses from other agents, use that information to search for relevant products.
- If context has image_agent_response with analysis results (objects, styles, colors, tags), use those to search for matching products
- If context contains room analysis, search for products that match those characteristics
- If context has product IDs from other agents, get details for those products

Examples:
- "Find me a red couch" -> semantic_search_products with query "red couch"
- "Show me kitchen items" -> get_products_by_category with category "kitchen"
- "What products do you have?" -> list_all_products
"#,
            context_json(context)
        )
    }

    fn fallback_plan(
        &self,
        message: &str,
        _user_id: Option<&str>,
        _context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        ToolPlan {
            reasoning: "Fallback to semantic search".to_string(),
            tools_to_call: vec![ToolCall {
                tool_name: "semantic_search_products".to_string(),
                parameters: json!({"query": message, "limit": 10})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                reasoning: "Using semantic search as fallback".to_string(),
            }],
            response_strategy: "Present search results to user".to_string(),
        }
    }

    async fn render_response(
        &self,
        message: &str,
        outcomes: &[ToolOutcome],
        plan: &ToolPlan,
    ) -> String {
        let results =
            serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            r#"Generate a helpful response for a product search request.

Original request: {}
Strategy: {}

Product search results:
{}

Create a response that:
1. Presents the matching products with their names, prices, and ids
2. Highlights the most relevant results first
3. Is conversational and helpful

If errors occurred, explain what went wrong and suggest alternatives.

Response:"#,
            message, plan.response_strategy, results
        );

        match self.core.oracle().generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::error!("Product response generation failed: {}", e);
                if outcomes.iter().any(ToolOutcome::is_success) {
                    "I found some products matching your request. Take a look at the results!"
                        .to_string()
                } else {
                    "I wasn't able to find products matching your search. Please try a different query."
                        .to_string()
                }
            }
        }
    }
}

//! 请求分析器
//!
//! 把用户消息变成结构化的执行计划（意图、复杂度、域、步骤序列）。
//! 模型输出经恢复与校验；模型不可用时退化为单步商品计划。

use serde_json::{json, Map, Value};

use crate::agents::base::context_json;
use crate::llm::GenerationOracle;
use crate::plan::{recover, validate_analysis, RequestAnalysis};

/// 域 -> 工具清单，嵌入分析 prompt 供模型参考
fn tools_by_domain() -> Value {
    json!({
        "product": [
            "list_all_products", "get_product_by_id", "search_products",
            "get_products_by_category", "semantic_search_products"
        ],
        "cart": ["add_to_cart", "get_cart_contents", "clear_cart"],
        "currency": [
            "get_supported_currencies", "convert_currency",
            "get_exchange_rates", "format_money"
        ],
        "sentiment": [
            "create_review", "get_product_reviews", "get_user_reviews",
            "update_review", "delete_review", "get_product_review_summary"
        ],
        "image": ["analyze_image", "visualize_product"]
    })
}

fn fallback_analysis() -> Value {
    json!({
        "intent": "General shopping assistance",
        "complexity": "simple",
        "domains_needed": ["product"],
        "workflow_steps": [
            {
                "step": 1,
                "domain": "product",
                "action": "Handle user request",
                "agent_delegation": true,
                "depends_on": []
            }
        ],
        "expected_outcome": "Provide helpful shopping assistance"
    })
}

fn analysis_prompt(message: &str, context: Option<&Map<String, Value>>) -> String {
    format!(
        r#"You are an AI shopping assistant orchestrator. Analyze this user request and create an execution plan.

User request: {}
Context: {}

Available tool domains:
{}

Analyze the request and respond in JSON format:
{{
    "intent": "What the user wants to accomplish",
    "complexity": "simple|moderate|complex",
    "domains_needed": ["list", "of", "domain", "agents", "needed"],
    "workflow_steps": [
        {{
            "step": 1,
            "domain": "domain_name",
            "action": "what to do",
            "agent_delegation": true,
            "depends_on": []
        }}
    ],
    "expected_outcome": "What the final response should contain"
}}

Domain agents available:
- product: Product search, recommendations, catalog browsing
- image: Image analysis, product visualization, room analysis
- cart: Shopping cart management, add/remove items
- currency: Currency conversion, pricing, formatting
- sentiment: Review analysis, sentiment evaluation, product ratings

Workflow guidelines:
- For product visualization: First use product agent to find the product, then image agent to create visualization
- For image analysis: Use image agent directly
- For product search: Use product agent directly"#,
        message,
        context_json(context),
        serde_json::to_string_pretty(&tools_by_domain()).unwrap_or_default()
    )
}

/// 分析一条用户请求，总是返回可执行的分析结果
pub async fn analyze_request(
    oracle: &dyn GenerationOracle,
    message: &str,
    context: Option<&Map<String, Value>>,
) -> RequestAnalysis {
    let prompt = analysis_prompt(message, context);
    let raw = match oracle.generate(&prompt).await {
        Ok(text) => recover(&text, Some(fallback_analysis())),
        Err(e) => {
            tracing::warn!("Request analysis failed: {}, using fallback", e);
            fallback_analysis()
        }
    };
    let analysis = validate_analysis(&raw);
    tracing::debug!(
        "Request analysis: {} - Complexity: {:?}",
        analysis.intent,
        analysis.complexity
    );
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockOracle;
    use crate::plan::Complexity;

    #[tokio::test]
    async fn test_analyze_parses_model_plan() {
        let oracle = MockOracle::with_replies([r#"{
            "intent": "Find and visualize a couch",
            "complexity": "complex",
            "domains_needed": ["product", "image"],
            "workflow_steps": [
                {"step": 1, "domain": "product", "action": "Find the couch", "agent_delegation": true, "depends_on": []},
                {"step": 2, "domain": "image", "action": "Visualize it", "agent_delegation": true, "depends_on": [1]}
            ],
            "expected_outcome": "A rendered visualization"
        }"#]);
        let analysis = analyze_request(&oracle, "show me a couch in my room", None).await;
        assert_eq!(analysis.complexity, Complexity::Complex);
        assert_eq!(analysis.workflow_steps.len(), 2);
        assert_eq!(analysis.workflow_steps[1].domain, "image");
        assert_eq!(analysis.workflow_steps[1].depends_on, vec![1]);
    }

    #[tokio::test]
    async fn test_analyze_oracle_failure_falls_back() {
        let oracle = MockOracle::failing();
        let analysis = analyze_request(&oracle, "hello", None).await;
        assert_eq!(analysis.intent, "General shopping assistance");
        assert_eq!(analysis.domains_needed, vec!["product"]);
        assert_eq!(analysis.workflow_steps.len(), 1);
        assert!(analysis.workflow_steps[0].agent_delegation);
    }

    #[tokio::test]
    async fn test_analyze_empty_reply_validates_empty_object() {
        // 空回复按空对象校验，走通用默认值而不是 fallback 分析
        let oracle = MockOracle::with_replies([""]);
        let analysis = analyze_request(&oracle, "hello", None).await;
        assert_eq!(analysis.intent, "General assistance");
        assert_eq!(analysis.expected_outcome, "Provide helpful assistance");
        assert_eq!(analysis.workflow_steps.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_garbage_output_falls_back() {
        let oracle = MockOracle::with_replies(["I cannot produce JSON today"]);
        let analysis = analyze_request(&oracle, "hello", None).await;
        assert_eq!(analysis.intent, "General shopping assistance");
        assert_eq!(analysis.workflow_steps[0].domain, "product");
        assert!(analysis.workflow_steps[0].tools.is_empty());
    }
}

//! 评价智能体
//!
//! 商品评价的增删改查与情感摘要；响应为确定性的结构化输出。
//! 模型不可用时不猜测商品，返回空计划并请用户指明商品。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::agents::base::AgentCore;
use crate::agents::{DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::ToolPlan;

const SENTIMENT_TOOLS: &[&str] = &[
    "create_review",
    "get_product_reviews",
    "get_user_reviews",
    "update_review",
    "delete_review",
    "get_product_review_summary",
];

pub struct SentimentAgent {
    core: AgentCore,
}

impl SentimentAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            core: AgentCore::new(ctx),
        }
    }
}

#[async_trait]
impl DomainAgent for SentimentAgent {
    fn name(&self) -> &str {
        "Sentiment Agent"
    }

    fn description(&self) -> &str {
        "Specialized in review analysis, sentiment evaluation, and product ratings"
    }

    fn domain(&self) -> &str {
        "sentiment"
    }

    fn domain_tools(&self) -> &[&str] {
        SENTIMENT_TOOLS
    }

    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn planning_guidance(
        &self,
        _message: &str,
        user_id: Option<&str>,
        _context: Option<&Map<String, Value>>,
    ) -> String {
        format!(
            r#"
User ID: {}

Review/Sentiment-specific guidelines:
- Use get_product_reviews when user asks about reviews for a specific product
- Use get_user_reviews when user wants to see their own reviews (needs user_id)
- Use create_review when user wants to write a review (needs user_id, product_id, rating)
- Use get_product_review_summary for overall sentiment analysis of a product
- Use update_review when user wants to modify an existing review
- Use delete_review when user wants to remove a review

Examples:
- "What do people think about this product?" -> get_product_reviews or get_product_review_summary
- "Show me my reviews" -> get_user_reviews (needs user_id)
- "I want to review this product" -> create_review (needs user_id, product_id, rating, review_text)
- "How is this product rated overall?" -> get_product_review_summary
"#,
            user_id.unwrap_or("Not provided")
        )
    }

    fn fallback_plan(
        &self,
        _message: &str,
        _user_id: Option<&str>,
        _context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        ToolPlan::empty(
            "Fallback to general review information",
            "Ask user to specify product or provide more context",
        )
    }

    async fn render_response(
        &self,
        _message: &str,
        outcomes: &[ToolOutcome],
        plan: &ToolPlan,
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
            // 空计划：把策略（通常是请用户补充信息）直接作为回复
            format!(
                "I couldn't find review data for that request. {}.",
                plan.response_strategy.trim_end_matches('.')
            )
        } else {
            let mut out = vec!["**Review Results:**".to_string()];
            out.extend(parts);
            out.join("\n")
        }
    }
}

//! 图像智能体
//!
//! 图像分析与商品可视化。模型时常在参数里丢 URL，因此计划经过一道
//! 修补：从消息与上下文中抽取 URL，按位置补进缺失的参数
//! （第一个是场景图，第二个是商品图）。响应由模型合成，生成的
//! 可视化 URL 绕过模型、在渲染后直接拼接。

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::agents::base::{context_json, AgentCore};
use crate::agents::{DomainAgent, ToolOutcome};
use crate::core::AgentContext;
use crate::plan::{ToolCall, ToolPlan};

const IMAGE_TOOLS: &[&str] = &["analyze_image", "visualize_product"];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "svg", "tiff",
];
const NON_IMAGE_EXTENSIONS: &[&str] = &[
    "pdf", "txt", "json", "xml", "html", "zip", "csv", "doc", "docx",
];
const IMAGE_KEYWORDS: &[&str] = &["image", "img", "photo", "picture", "render"];

static URL_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn url_patterns() -> &'static [Regex] {
    URL_PATTERNS.get_or_init(|| {
        [
            r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)gs://[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)s3://[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)https://storage\.googleapis\.com/[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)https://storage\.cloud\.google\.com/[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)https://firebasestorage\.googleapis\.com/[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)https://[^.\s]+\.s3\.amazonaws\.com/[^\s<>"{}|\\^`\[\]]+"#,
            r#"(?i)https://[^.\s]+\.blob\.core\.windows\.net/[^\s<>"{}|\\^`\[\]]+"#,
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// 从文本中抽取 URL（含云存储协议），去重并保持首现顺序
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for pattern in url_patterns() {
        for m in pattern.find_iter(text) {
            let url = m.as_str().to_string();
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

fn is_cloud_storage_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.starts_with("gs://")
        || lower.starts_with("s3://")
        || lower.contains("storage.googleapis.com")
        || lower.contains("storage.cloud.google.com")
        || lower.contains("firebasestorage.googleapis.com")
        || lower.contains(".s3.amazonaws.com")
        || lower.contains(".blob.core.windows.net")
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let filename = path.rsplit('/').next()?;
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// URL 是否像一张图片：已知图片扩展名、文件名关键词，
/// 或云存储 URL 且扩展名不属于已知的非图片类型
pub fn looks_like_image_url(url: &str) -> bool {
    let ext = url_extension(url);
    if let Some(ref e) = ext {
        if IMAGE_EXTENSIONS.contains(&e.as_str()) {
            return true;
        }
    }

    let lower = url.to_lowercase();
    let filename = lower
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .rsplit('/')
        .next()
        .unwrap_or("");
    if IMAGE_KEYWORDS.iter().any(|k| filename.contains(k)) {
        return true;
    }

    if is_cloud_storage_url(url) {
        return match ext {
            Some(e) => !NON_IMAGE_EXTENSIONS.contains(&e.as_str()),
            None => true,
        };
    }

    false
}

pub struct ImageAgent {
    core: AgentCore,
}

impl ImageAgent {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self {
            core: AgentCore::new(ctx),
        }
    }

    /// 候选图片 URL：消息优先，再补上下文里字符串值中的 URL
    fn candidate_urls(message: &str, context: Option<&Map<String, Value>>) -> Vec<String> {
        let mut text = message.to_string();
        if let Some(ctx) = context {
            for value in ctx.values() {
                if let Some(s) = value.as_str() {
                    text.push('\n');
                    text.push_str(s);
                }
            }
        }
        extract_urls(&text)
            .into_iter()
            .filter(|u| looks_like_image_url(u))
            .collect()
    }
}

#[async_trait]
impl DomainAgent for ImageAgent {
    fn name(&self) -> &str {
        "Image Agent"
    }

    fn description(&self) -> &str {
        "Specialized in image analysis and product visualization using AI"
    }

    fn domain(&self) -> &str {
        "image"
    }

    fn domain_tools(&self) -> &[&str] {
        IMAGE_TOOLS
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
Context: {}

Image-specific guidelines:
- Use analyze_image when user wants to understand what's in an image (objects, style, colors)
- Use visualize_product when user wants to see how a product would look in their space
- For visualization, you need both a base image (room/scene) and product image URLs
- Analysis can help understand room style before making product recommendations

Examples:
- "What's in this image?" -> analyze_image
- "Show me how this couch would look in my room" -> visualize_product
- "Analyze my living room" -> analyze_image
"#,
            context_json(context)
        )
    }

    fn fallback_plan(
        &self,
        message: &str,
        _user_id: Option<&str>,
        context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        let base = context
            .and_then(|c| c.get("base_image_url"))
            .and_then(Value::as_str);
        let product = context
            .and_then(|c| c.get("product_image_url"))
            .and_then(Value::as_str);

        match (base, product) {
            (Some(base), Some(product)) => ToolPlan {
                reasoning: "Fallback to product visualization".to_string(),
                tools_to_call: vec![ToolCall {
                    tool_name: "visualize_product".to_string(),
                    parameters: json!({
                        "base_image_url": base,
                        "product_image_url": product,
                        "prompt": message
                    })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                    reasoning: "Using visualization as fallback".to_string(),
                }],
                response_strategy: "Show visualization result".to_string(),
            },
            _ => ToolPlan::empty(
                "Need more information for image processing",
                "Ask for image URLs or clarification",
            ),
        }
    }

    fn repair_plan(
        &self,
        mut plan: ToolPlan,
        message: &str,
        context: Option<&Map<String, Value>>,
    ) -> ToolPlan {
        let urls = Self::candidate_urls(message, context);
        if urls.is_empty() {
            return plan;
        }

        for call in &mut plan.tools_to_call {
            match call.tool_name.as_str() {
                "analyze_image" => {
                    if !call.parameters.contains_key("image_url") {
                        call.parameters
                            .insert("image_url".to_string(), Value::String(urls[0].clone()));
                    }
                }
                "visualize_product" => {
                    if !call.parameters.contains_key("base_image_url") {
                        call.parameters.insert(
                            "base_image_url".to_string(),
                            Value::String(urls[0].clone()),
                        );
                    }
                    if !call.parameters.contains_key("product_image_url") {
                        if let Some(second) = urls.get(1) {
                            call.parameters.insert(
                                "product_image_url".to_string(),
                                Value::String(second.clone()),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        plan
    }

    async fn render_response(
        &self,
        message: &str,
        outcomes: &[ToolOutcome],
        plan: &ToolPlan,
    ) -> String {
        // 可视化 URL 直接从结果中取出，不进入模型 prompt
        let mut visualization_urls = Vec::new();
        let mut summary = Vec::new();

        for outcome in outcomes {
            match outcome {
                ToolOutcome::Success { tool, result } => match tool.as_str() {
                    "analyze_image" => {
                        summary.push("Image analysis completed successfully".to_string())
                    }
                    "visualize_product" => {
                        let render_url = result
                            .get("visualization")
                            .and_then(|v| v.get("render_url"))
                            .and_then(Value::as_str);
                        match render_url {
                            Some(url) => {
                                visualization_urls.push(url.to_string());
                                summary.push(
                                    "Product visualization completed successfully".to_string(),
                                );
                            }
                            None => summary.push("Product visualization failed".to_string()),
                        }
                    }
                    _ => {}
                },
                ToolOutcome::Failure { tool, error } => {
                    summary.push(format!("Error with {}: {}", tool, error));
                }
            }
        }

        let prompt = format!(
            r#"Generate a helpful response for an image processing request.

Original request: {}
Strategy: {}

Results summary: {}

Create a response that:
1. Acknowledges what the user requested
2. Describes what was found or created clearly
3. For visualizations, mentions that an image was generated
4. Is conversational and helpful

Do not include any URLs in your response - they will be added separately.

Response:"#,
            message,
            plan.response_strategy,
            summary.join("; ")
        );

        match self.core.oracle().generate(&prompt).await {
            Ok(text) => {
                let mut response = text.trim().to_string();
                if !visualization_urls.is_empty() {
                    response.push_str("\n\n");
                    for (i, url) in visualization_urls.iter().enumerate() {
                        response.push_str(&format!("[Generated Image {}]({})\n\n", i + 1, url));
                    }
                    response.push_str(
                        "Take a look and see how it fits with your decor. Would you like to try \
                         visualizing it in another spot, or perhaps with a different product?",
                    );
                }
                response
            }
            Err(e) => {
                tracing::error!("Image response generation failed: {}", e);
                if let Some(url) = visualization_urls.first() {
                    format!("I've generated a visualization for you! You can view it here: {}", url)
                } else if outcomes.iter().any(ToolOutcome::is_success) {
                    "I've processed your image request. The results are ready for you to view!"
                        .to_string()
                } else {
                    "I wasn't able to process your image request. Please make sure you've provided \
                     valid image URLs and try again."
                        .to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls_dedup_preserves_order() {
        let text = "see https://example.com/a.png and gs://bucket/room.jpg \
                    again https://example.com/a.png";
        let urls = extract_urls(text);
        assert_eq!(
            urls,
            vec!["https://example.com/a.png", "gs://bucket/room.jpg"]
        );
    }

    #[test]
    fn test_extract_urls_cloud_storage_schemes() {
        let text = "s3://bucket/key https://acct.blob.core.windows.net/c/photo";
        let urls = extract_urls(text);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_image_url_classification() {
        assert!(looks_like_image_url("https://example.com/couch.jpg"));
        assert!(looks_like_image_url("https://example.com/files/room-photo-1"));
        // 云存储且扩展名未知：按图片处理
        assert!(looks_like_image_url("gs://bucket/upload/abc123"));
        // 云存储但已知非图片扩展名
        assert!(!looks_like_image_url("gs://bucket/report.pdf"));
        assert!(!looks_like_image_url("https://example.com/data.json"));
    }

    #[test]
    fn test_url_extension_ignores_query() {
        assert_eq!(
            url_extension("https://x.com/a.PNG?size=big#frag"),
            Some("png".to_string())
        );
    }

    #[test]
    fn test_repair_fills_positional_urls() {
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
        let agent = ImageAgent::new(ctx);

        let plan = ToolPlan {
            reasoning: String::new(),
            tools_to_call: vec![ToolCall {
                tool_name: "visualize_product".to_string(),
                parameters: Map::new(),
                reasoning: String::new(),
            }],
            response_strategy: String::new(),
        };
        let message = "Put https://cdn.shop.com/product.png into my room \
                       https://storage.googleapis.com/uploads/room1";
        let repaired = agent.repair_plan(plan, message, None);

        let params = &repaired.tools_to_call[0].parameters;
        assert_eq!(
            params["base_image_url"],
            Value::String("https://cdn.shop.com/product.png".to_string())
        );
        assert_eq!(
            params["product_image_url"],
            Value::String("https://storage.googleapis.com/uploads/room1".to_string())
        );
    }
}

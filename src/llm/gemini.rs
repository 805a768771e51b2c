//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；默认指向
//! Gemini 的 OpenAI 兼容层，也可指向自建代理。

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::GenerationOracle;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// OpenAI 兼容客户端：持有 Client 与 model 名，generate 时取首条 choice 的 content
pub struct GeminiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl GeminiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        request_timeout_secs: u64,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = OpenAIConfig::new()
            .with_api_base(base_url.unwrap_or(DEFAULT_BASE_URL))
            .with_api_key(api_key);

        // 单次生成请求的整体超时挂在 http client 上
        let http_client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("http client build failed: {}, using default client", e);
                reqwest::Client::new()
            }
        };

        Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl GenerationOracle for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let message = ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| e.to_string())?,
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message])
            .build()
            .map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

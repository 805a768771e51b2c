//! 生成模型层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod gemini;
pub mod mock;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use gemini::GeminiClient;
pub use mock::MockOracle;
pub use traits::GenerationOracle;

/// 根据配置创建生成模型客户端；API Key 缺失时退化为 Mock 并告警
pub fn create_oracle_from_config(config: &AppConfig) -> Arc<dyn GenerationOracle> {
    match std::env::var(&config.llm.api_key_env) {
        Ok(key) if !key.is_empty() => Arc::new(GeminiClient::new(
            config.llm.base_url.as_deref(),
            &config.llm.model,
            Some(&key),
            config.llm.request_timeout_secs,
        )),
        _ => {
            tracing::warn!(
                "{} not set, falling back to mock oracle",
                config.llm.api_key_env
            );
            Arc::new(MockOracle::failing())
        }
    }
}

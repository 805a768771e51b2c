//! 生成模型客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 GenerationOracle：单轮 prompt 补全。
//! 规划、参数抽取与响应合成都走这一个窄接口。

use async_trait::async_trait;

/// 生成模型 trait：单轮补全
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// 对 prompt 做一次补全，返回原始文本（可能含 Markdown 围栏）
    async fn generate(&self, prompt: &str) -> Result<String, String>;
}

//! 服务错误类型
//!
//! 计划解析与工具执行的失败不会中断请求（由调用方降级处理），需要沿 `?`
//! 向上传播的只有网关交互错误。

use thiserror::Error;

/// 能力网关交互错误
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gateway response is not valid JSON: {0}")]
    Decode(String),
}

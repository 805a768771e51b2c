//! Mock 生成模型客户端（用于测试，无需 API）
//!
//! 按入队顺序回放预设回复；failing 模式下每次调用都返回错误，
//! 用于验证各级 fallback 路径。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::GenerationOracle;

/// Mock 客户端：回放脚本化回复或恒定失败
#[derive(Debug, Default)]
pub struct MockOracle {
    replies: Mutex<VecDeque<String>>,
    fail_all: bool,
}

impl MockOracle {
    /// 依次返回给定回复，耗尽后返回错误
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fail_all: false,
        }
    }

    /// 每次调用都失败（模拟模型不可用）
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail_all: true,
        }
    }
}

#[async_trait]
impl GenerationOracle for MockOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, String> {
        if self.fail_all {
            return Err("mock oracle unavailable".to_string());
        }
        self.replies
            .lock()
            .expect("mock replies lock poisoned")
            .pop_front()
            .ok_or_else(|| "mock oracle exhausted".to_string())
    }
}

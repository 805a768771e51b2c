//! 会话存储
//!
//! 每个智能体持有自己的 SessionStore：session_id -> 追加式轮次历史。
//! 会话懒创建、不过期、仅驻内存；所有追加经写锁串行，单个会话内的
//! 轮次不会交错。

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

/// 轮次角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 单轮对话
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_used: Option<Vec<String>>,
}

/// 生成新会话 ID
pub fn new_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4())
}

/// 会话存储：session_id -> 轮次列表
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一轮交互（用户消息 + 助手响应）；会话不存在则创建
    pub async fn append_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        agent_response: &str,
        tools_used: Vec<String>,
    ) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn {
            role: Role::User,
            content: user_message.to_string(),
            tools_used: None,
        });
        turns.push(Turn {
            role: Role::Assistant,
            content: agent_response.to_string(),
            tools_used: Some(tools_used),
        });
    }

    /// 会话历史快照
    pub async fn history(&self, session_id: &str) -> Option<Vec<Turn>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

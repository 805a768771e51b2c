//! 工具 Schema 与缓存
//!
//! Schema 由网关的 /tools/schema 端点提供；缓存采用指针交换刷新：
//! 读方持有的旧快照不受刷新影响，刷新期间的请求继续使用旧 Schema。

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::GatewayError;
use crate::gateway::CapabilityGateway;

/// 工具调用方式：GET 发查询串，POST 发 JSON 体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

fn default_method() -> HttpMethod {
    HttpMethod::Post
}

/// 单个参数的描述
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolParameter {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// 工具 Schema：名称、描述、参数表与调用端点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: HashMap<String, ToolParameter>,
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
}

impl ToolSchema {
    /// 该工具是否声明了某个参数
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }
}

/// 工具 Schema 缓存（RwLock<Arc<Vec<_>>>，刷新时整体换指针）
pub struct SchemaCache {
    gateway: Arc<dyn CapabilityGateway>,
    tools: RwLock<Arc<Vec<ToolSchema>>>,
}

impl SchemaCache {
    pub fn new(gateway: Arc<dyn CapabilityGateway>) -> Self {
        Self {
            gateway,
            tools: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// 从网关重新拉取 Schema 并整体替换，返回工具数
    pub async fn refresh(&self) -> Result<usize, GatewayError> {
        let fresh = self.gateway.fetch_schema().await?;
        let count = fresh.len();
        *self.tools.write().await = Arc::new(fresh);
        tracing::info!("schema cache refreshed: {} tools", count);
        Ok(count)
    }

    /// 当前快照（廉价的 Arc clone）
    pub async fn snapshot(&self) -> Arc<Vec<ToolSchema>> {
        self.tools.read().await.clone()
    }

    /// 按名称查找工具
    pub async fn find(&self, name: &str) -> Option<ToolSchema> {
        self.tools
            .read()
            .await
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_deserialization_defaults_to_post() {
        let raw = json!({
            "name": "add_to_cart",
            "description": "Add an item to the cart",
            "parameters": {
                "user_id": {"type": "string", "description": "User identifier", "required": true},
                "product_id": {"type": "string", "description": "Product identifier"}
            },
            "endpoint": "/cart/add"
        });
        let schema: ToolSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.method, HttpMethod::Post);
        assert!(schema.has_parameter("user_id"));
        assert!(schema.parameters["user_id"].required);
        assert!(!schema.parameters["product_id"].required);
    }

    #[test]
    fn test_schema_get_method() {
        let raw = json!({
            "name": "list_all_products",
            "endpoint": "/products",
            "method": "GET"
        });
        let schema: ToolSchema = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.method, HttpMethod::Get);
        assert!(schema.parameters.is_empty());
    }
}

//! 能力网关客户端
//!
//! Schema 发现走 GET /tools/schema；工具执行按 Schema 的 method 决定
//! GET（参数进查询串）或 POST（参数作 JSON 体）。非 2xx 一律报错，
//! 响应体按 JSON 解析后原样返回。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::GatewayError;
use crate::gateway::{HttpMethod, ToolSchema};

/// 能力网关抽象：Schema 发现 + 工具执行
#[async_trait]
pub trait CapabilityGateway: Send + Sync {
    async fn fetch_schema(&self) -> Result<Vec<ToolSchema>, GatewayError>;

    async fn invoke(
        &self,
        tool: &ToolSchema,
        params: &Map<String, Value>,
    ) -> Result<Value, GatewayError>;
}

#[derive(Deserialize)]
struct SchemaEnvelope {
    #[serde(default)]
    tools: Vec<ToolSchema>,
}

/// HTTP 网关实现
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 网关可达性探测（/health）
    pub async fn probe(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// 查询串里标量的渲染：字符串取原值，其余用 JSON 文本
    fn query_value(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl CapabilityGateway for HttpGateway {
    async fn fetch_schema(&self) -> Result<Vec<ToolSchema>, GatewayError> {
        let url = format!("{}/tools/schema", self.base_url);
        let resp = self.client.get(&url).timeout(self.timeout).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: SchemaEnvelope = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(envelope.tools)
    }

    async fn invoke(
        &self,
        tool: &ToolSchema,
        params: &Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, tool.endpoint);

        let request = match tool.method {
            HttpMethod::Get => {
                let query: Vec<(String, String)> = params
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::query_value(v)))
                    .collect();
                self.client.get(&url).query(&query)
            }
            HttpMethod::Post => self.client.post(&url).json(params),
        };

        let resp = request.timeout(self.timeout).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

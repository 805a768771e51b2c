//! 共享依赖上下文
//!
//! 所有智能体与编排器通过 AgentContext 获取生成模型、能力网关与 Schema 缓存，
//! 构造时注入，不依赖全局状态。

use std::sync::Arc;

use crate::gateway::{CapabilityGateway, SchemaCache};
use crate::llm::GenerationOracle;

/// 注入到每个智能体的共享依赖
#[derive(Clone)]
pub struct AgentContext {
    pub oracle: Arc<dyn GenerationOracle>,
    pub gateway: Arc<dyn CapabilityGateway>,
    pub schema: Arc<SchemaCache>,
}

impl AgentContext {
    pub fn new(
        oracle: Arc<dyn GenerationOracle>,
        gateway: Arc<dyn CapabilityGateway>,
        schema: Arc<SchemaCache>,
    ) -> Self {
        Self {
            oracle,
            gateway,
            schema,
        }
    }
}

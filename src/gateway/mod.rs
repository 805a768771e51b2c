//! 能力网关层
//!
//! 工具的发现与执行都通过外部能力网关完成：
//! - **client**: CapabilityGateway trait 与 HTTP 实现（GET 查询串 / POST JSON 体）
//! - **schema**: 工具 Schema 类型与指针交换式缓存
//!
//! 工具结果对本层透明，原样作为 JSON 向上传递。

pub mod client;
pub mod schema;

pub use client::{CapabilityGateway, HttpGateway};
pub use schema::{HttpMethod, SchemaCache, ToolParameter, ToolSchema};

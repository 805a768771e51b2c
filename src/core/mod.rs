//! 核心类型：错误与共享依赖上下文

pub mod context;
pub mod error;

pub use context::AgentContext;
pub use error::GatewayError;

//! Boutique Agents - 多智能体购物助手编排服务
//!
//! 模块划分：
//! - **agents**: 域智能体（product / cart / currency / sentiment / image）与通用生命周期
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与共享依赖上下文
//! - **gateway**: 能力网关客户端与工具 Schema 缓存
//! - **llm**: 生成模型客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: tracing 日志初始化
//! - **orchestrator**: 请求分析、工作流执行与响应合成
//! - **plan**: 工具计划的 JSON 恢复与校验
//! - **server**: HTTP 服务（/chat /health /agents /tools /tools/refresh）
//! - **session**: 会话存储（追加式轮次历史）

pub mod agents;
pub mod config;
pub mod core;
pub mod gateway;
pub mod llm;
pub mod observability;
pub mod orchestrator;
pub mod plan;
pub mod server;
pub mod session;

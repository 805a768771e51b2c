//! 工具计划层：模型输出的 JSON 恢复、计划 / 分析校验、参数抽取

pub mod recover;
pub mod types;
pub mod validate;

pub use recover::{minimal_plan_fallback, recover};
pub use types::{Complexity, RequestAnalysis, ToolCall, ToolPlan, WorkflowStep};
pub use validate::{extract_parameters, validate_analysis, validate_tool_plan};

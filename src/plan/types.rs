//! 计划与分析的类型定义
//!
//! 模型输出经 recover + validate 之后落到这些结构上，下游不再接触裸 JSON。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 单次工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "default_call_reasoning")]
    pub reasoning: String,
}

pub(crate) fn default_call_reasoning() -> String {
    "No reasoning provided".to_string()
}

/// 工具计划：规划阶段的产物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPlan {
    #[serde(default = "default_plan_reasoning")]
    pub reasoning: String,
    #[serde(default)]
    pub tools_to_call: Vec<ToolCall>,
    #[serde(default = "default_response_strategy")]
    pub response_strategy: String,
}

pub(crate) fn default_plan_reasoning() -> String {
    "No reasoning provided".to_string()
}

pub(crate) fn default_response_strategy() -> String {
    "Provide assistance".to_string()
}

impl ToolPlan {
    /// 空计划（不调用任何工具）
    pub fn empty(reasoning: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            tools_to_call: Vec::new(),
            response_strategy: strategy.into(),
        }
    }
}

/// 请求复杂度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// 工作流单步
///
/// depends_on 从分析结果中保留，但执行始终按列表顺序，不做依赖调度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step: u32,
    pub domain: String,
    pub action: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<u32>,
    #[serde(default = "default_agent_delegation")]
    pub agent_delegation: bool,
}

pub(crate) fn default_agent_delegation() -> bool {
    true
}

/// 请求分析结果：workflow_steps 保证非空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAnalysis {
    pub intent: String,
    pub complexity: Complexity,
    pub domains_needed: Vec<String>,
    pub workflow_steps: Vec<WorkflowStep>,
    pub expected_outcome: String,
}

//! 计划与分析结果的校验
//!
//! 对任意形状的 JSON（null、数组、字符串都算）补默认值、丢弃无效条目，
//! 产出类型化结构。纯函数且幂等：validate(validate(x)) == validate(x)。

use serde_json::{Map, Value};

use crate::gateway::ToolSchema;
use crate::plan::recover::recover;
use crate::plan::types::{
    default_agent_delegation, default_call_reasoning, default_plan_reasoning,
    default_response_strategy, Complexity, RequestAnalysis, ToolCall, ToolPlan, WorkflowStep,
};

/// 校验工具计划：缺字段补默认值，无 tool_name 的条目丢弃（仅 debug 日志）
///
/// 同时接受 `tool_name` 与 `toolName` 两种键名。
pub fn validate_tool_plan(raw: &Value) -> ToolPlan {
    let obj = raw.as_object();

    let reasoning = str_field(obj, "reasoning").unwrap_or_else(default_plan_reasoning);
    let response_strategy =
        str_field(obj, "response_strategy").unwrap_or_else(default_response_strategy);

    let mut tools_to_call = Vec::new();
    if let Some(entries) = obj.and_then(|o| o.get("tools_to_call")).and_then(Value::as_array) {
        for entry in entries {
            match validate_tool_call(entry) {
                Some(call) => tools_to_call.push(call),
                None => tracing::debug!("dropping tool call without tool_name: {}", entry),
            }
        }
    }

    ToolPlan {
        reasoning,
        tools_to_call,
        response_strategy,
    }
}

fn validate_tool_call(entry: &Value) -> Option<ToolCall> {
    let obj = entry.as_object()?;
    let tool_name = obj
        .get("tool_name")
        .or_else(|| obj.get("toolName"))
        .and_then(Value::as_str)?
        .to_string();

    let parameters = obj
        .get("parameters")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(default_call_reasoning);

    Some(ToolCall {
        tool_name,
        parameters,
        reasoning,
    })
}

/// 校验请求分析：缺字段补默认值，保证至少一个工作流步骤
pub fn validate_analysis(raw: &Value) -> RequestAnalysis {
    let obj = raw.as_object();

    let intent = str_field(obj, "intent").unwrap_or_else(|| "General assistance".to_string());

    let complexity = match str_field(obj, "complexity").as_deref() {
        Some("moderate") => Complexity::Moderate,
        Some("complex") => Complexity::Complex,
        _ => Complexity::Simple,
    };

    let domains_needed: Vec<String> = obj
        .and_then(|o| o.get("domains_needed"))
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .filter(|v: &Vec<String>| !v.is_empty())
        .unwrap_or_else(|| vec!["product".to_string()]);

    let expected_outcome = str_field(obj, "expected_outcome")
        .unwrap_or_else(|| "Provide helpful assistance".to_string());

    let mut workflow_steps: Vec<WorkflowStep> = obj
        .and_then(|o| o.get("workflow_steps"))
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .enumerate()
                .filter_map(|(i, s)| validate_step(s, i as u32 + 1))
                .collect()
        })
        .unwrap_or_default();

    if workflow_steps.is_empty() {
        workflow_steps.push(WorkflowStep {
            step: 1,
            domain: "product".to_string(),
            action: "Handle user request".to_string(),
            tools: vec!["list_all_products".to_string()],
            depends_on: Vec::new(),
            agent_delegation: true,
        });
    }

    RequestAnalysis {
        intent,
        complexity,
        domains_needed,
        workflow_steps,
        expected_outcome,
    }
}

fn validate_step(entry: &Value, position: u32) -> Option<WorkflowStep> {
    let obj = entry.as_object()?;

    let step = obj
        .get("step")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(position);

    let domain = obj
        .get("domain")
        .and_then(Value::as_str)
        .unwrap_or("product")
        .to_string();

    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or("Handle user request")
        .to_string();

    let tools = obj
        .get("tools")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let depends_on = obj
        .get("depends_on")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_u64).map(|n| n as u32).collect())
        .unwrap_or_default();

    let agent_delegation = obj
        .get("agent_delegation")
        .and_then(Value::as_bool)
        .unwrap_or_else(default_agent_delegation);

    Some(WorkflowStep {
        step,
        domain,
        action,
        tools,
        depends_on,
        agent_delegation,
    })
}

/// 从模型的参数抽取回复中取出参数对象
///
/// recover 包裹解析；非对象结果视为空；不在工具 Schema 里的键丢弃。
pub fn extract_parameters(raw: &str, schema: &ToolSchema) -> Map<String, Value> {
    let value = recover(raw, Some(Value::Object(Map::new())));
    let mut parameters = match value {
        Value::Object(map) => map,
        _ => return Map::new(),
    };

    parameters.retain(|key, _| {
        let known = schema.parameters.contains_key(key);
        if !known {
            tracing::debug!("dropping parameter '{}' not in schema of {}", key, schema.name);
        }
        known
    });
    parameters
}

fn str_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

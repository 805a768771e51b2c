//! 模型输出的 JSON 恢复管线
//!
//! 模型经常返回带 Markdown 围栏、单引号、尾逗号或漏逗号的"准 JSON"。
//! recover 先严格解析，失败后按固定顺序做正则修补再解析，仍失败则返回
//! 调用方提供的 fallback。整条管线是全函数，永不报错。
//!
//! 修补顺序敏感：引号归一必须先于未引号键名的修补，调整顺序会改变行为。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

static REPAIRS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

fn repairs() -> &'static [(Regex, &'static str)] {
    REPAIRS.get_or_init(|| {
        vec![
            // 相邻引号值之间缺逗号（跨行）
            (Regex::new(r#""\s*\n\s*""#).unwrap(), "\",\n    \""),
            // 相邻对象之间缺逗号（跨行）
            (Regex::new(r"\}\s*\n\s*\{").unwrap(), "},\n    {"),
            // 尾逗号
            (Regex::new(r",\s*([}\]])").unwrap(), "${1}"),
            // 单引号键
            (Regex::new(r"'([^']*)':").unwrap(), "\"${1}\":"),
            // 单引号值
            (Regex::new(r":\s*'([^']*)'").unwrap(), ": \"${1}\""),
            // 未加引号的键名
            (Regex::new(r"([\{\s,])(\w+):").unwrap(), "${1}\"${2}\":"),
        ]
    })
}

/// 恢复失败时的最小可用计划
pub fn minimal_plan_fallback() -> Value {
    json!({
        "reasoning": "JSON parsing failed",
        "tools_to_call": [],
        "response_strategy": "Provide general assistance"
    })
}

/// 从模型原始输出中恢复一个 JSON 值
///
/// 1. 去除首尾空白与 ```json / ``` 围栏；剩余为空则视为空对象 `{}`
/// 2. 严格解析，成功即返回
/// 3. 按固定顺序应用修补正则后重试
/// 4. 仍失败返回 fallback（缺省为最小可用计划）
pub fn recover(raw: &str, fallback: Option<Value>) -> Value {
    let cleaned = strip_fences(raw);

    if cleaned.is_empty() {
        return Value::Object(Map::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return value;
    }

    let mut repaired = cleaned.to_string();
    for (pattern, replacement) in repairs() {
        repaired = pattern.replace_all(&repaired, *replacement).into_owned();
    }
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        tracing::debug!("recovered malformed JSON after textual repair");
        return value;
    }

    tracing::debug!("JSON recovery failed, using fallback");
    fallback.unwrap_or_else(minimal_plan_fallback)
}

fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_well_formed() {
        let value = recover(r#"{"reasoning": "ok", "tools_to_call": []}"#, None);
        assert_eq!(value["reasoning"], "ok");
    }

    #[test]
    fn test_recover_fenced_block() {
        let raw = "```json\n{\"tools_to_call\": [{\"tool_name\": \"search_products\"}]}\n```";
        let value = recover(raw, None);
        assert_eq!(value["tools_to_call"][0]["tool_name"], "search_products");
    }

    #[test]
    fn test_recover_bare_fence() {
        let value = recover("```\n{\"a\": 1}\n```", None);
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_recover_single_quotes() {
        let value = recover("{'tool_name': 'x'}", None);
        assert_eq!(value["tool_name"], "x");
    }

    #[test]
    fn test_recover_fenced_single_quotes() {
        // 围栏 + 单引号同时出现也能恢复
        let value = recover("```json\n{'tool_name': 'x'}\n```", None);
        assert_eq!(value["tool_name"], "x");
    }

    #[test]
    fn test_recover_unquoted_keys() {
        let value = recover(r#"{reasoning: "a", response_strategy: "b"}"#, None);
        assert_eq!(value["reasoning"], "a");
        assert_eq!(value["response_strategy"], "b");
    }

    #[test]
    fn test_recover_trailing_comma() {
        let value = recover(r#"{"tools_to_call": [{"tool_name": "x",}],}"#, None);
        assert_eq!(value["tools_to_call"][0]["tool_name"], "x");
    }

    #[test]
    fn test_recover_missing_comma_between_objects() {
        let raw = "{\"tools_to_call\": [{\"tool_name\": \"a\"}\n{\"tool_name\": \"b\"}]}";
        let value = recover(raw, None);
        assert_eq!(value["tools_to_call"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_recover_empty_input_yields_empty_object() {
        // 空回复不是解析失败：按空对象处理，不走 fallback
        let value = recover("", None);
        assert_eq!(value, Value::Object(Map::new()));
    }

    #[test]
    fn test_recover_garbage_uses_caller_fallback() {
        let fallback = serde_json::json!({"intent": "fallback"});
        let value = recover("this is not json at all {{{", Some(fallback));
        assert_eq!(value["intent"], "fallback");
    }

    #[test]
    fn test_recover_whitespace_only_yields_empty_object() {
        assert_eq!(recover("   \n\t  ", None), Value::Object(Map::new()));
    }

    #[test]
    fn test_recover_empty_fence_yields_empty_object() {
        assert_eq!(recover("```json\n```", None), Value::Object(Map::new()));
    }
}

//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BOUTIQUE__*` 覆盖（双下划线表示嵌套，如 `BOUTIQUE__LLM__MODEL=gemini-2.5-flash`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

/// [app] 段：服务名与监听端口
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_service_name() -> String {
    "boutique-agent-service".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
        }
    }
}

/// [llm] 段：生成模型后端（OpenAI 兼容端点）与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点；默认指向 Gemini 的 OpenAI 兼容层
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// [gateway] 段：能力网关（工具发现与执行）
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    /// 单次工具调用超时（秒）
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    30
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_secs: default_gateway_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            gateway: GatewaySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 BOUTIQUE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BOUTIQUE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BOUTIQUE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_no_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.port, 8080);
        assert_eq!(cfg.llm.model, "gemini-2.5-flash");
        assert_eq!(cfg.gateway.base_url, "http://localhost:8081");
        assert_eq!(cfg.gateway.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[app]\nport = 9090\n\n[gateway]\nbase_url = \"http://mcp:8080\"\ntimeout_secs = 5\n"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.port, 9090);
        assert_eq!(cfg.gateway.base_url, "http://mcp:8080");
        assert_eq!(cfg.gateway.timeout_secs, 5);
        // 未覆盖的段保持默认
        assert_eq!(cfg.llm.request_timeout_secs, 60);
    }
}

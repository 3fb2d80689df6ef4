use std::env;
use std::fs;
use std::path::Path;

use facturador_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
}

fn render(config: &AppConfig, doc: Option<&Value>, path: Option<&Path>) -> String {
    let api_key = if config.emission.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields: [(&str, &str, String); 13] = [
        ("database.url", "FACTURADOR_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "FACTURADOR_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "FACTURADOR_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("server.bind_address", "FACTURADOR_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "FACTURADOR_SERVER_PORT", config.server.port.to_string()),
        (
            "server.graceful_shutdown_secs",
            "FACTURADOR_SERVER_GRACEFUL_SHUTDOWN_SECS",
            config.server.graceful_shutdown_secs.to_string(),
        ),
        (
            "emission.base_url",
            "FACTURADOR_EMISSION_BASE_URL",
            config.emission.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ("emission.api_key", "FACTURADOR_EMISSION_API_KEY", api_key.to_string()),
        (
            "emission.timeout_secs",
            "FACTURADOR_EMISSION_TIMEOUT_SECS",
            config.emission.timeout_secs.to_string(),
        ),
        (
            "emission.ambiente",
            "FACTURADOR_EMISSION_AMBIENTE",
            config.emission.ambiente.code().to_string(),
        ),
        ("logging.level", "FACTURADOR_LOGGING_LEVEL", config.logging.level.clone()),
        (
            "logging.format",
            "FACTURADOR_LOGGING_FORMAT",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
        ("config.file", "", path.map(|p| p.display().to_string()).unwrap_or_else(|| "<none>".to_string())),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, env_key, value) in fields {
        if key == "config.file" {
            lines.push(format!("- {key} = {value}"));
            continue;
        }
        lines.push(render_line(key, &value, field_source(key, env_key, doc, path)));
    }
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }
    // Legacy short aliases for the logging section.
    let alias = match env_key {
        "FACTURADOR_LOGGING_LEVEL" => Some("FACTURADOR_LOG_LEVEL"),
        "FACTURADOR_LOGGING_FORMAT" => Some("FACTURADOR_LOG_FORMAT"),
        _ => None,
    };
    if let Some(alias) = alias.filter(|alias| env::var_os(alias).is_some()) {
        return format!("env ({alias})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use facturador_core::config::AppConfig;
    use secrecy::SecretString;

    use super::{contains_path, render};

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: toml::Value = "[emission]\nbase_url = \"http://dte\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "emission.base_url"));
        assert!(!contains_path(&doc, "emission.api_key"));
        assert!(!contains_path(&doc, "database.url"));
    }

    #[test]
    fn api_key_is_never_rendered() {
        let mut config = AppConfig::default();
        config.emission.api_key = Some(SecretString::from("very-secret-key".to_string()));

        let doc: toml::Value = "[emission]\napi_key = \"very-secret-key\"\n".parse().expect("toml");
        let output = render(&config, Some(&doc), Some(Path::new("facturador.toml")));

        assert!(!output.contains("very-secret-key"));
        assert!(output.contains("- emission.api_key = <redacted>"));
        assert!(output.contains("- emission.ambiente = 00"));
        assert!(output.contains("- config.file = facturador.toml"));
    }
}

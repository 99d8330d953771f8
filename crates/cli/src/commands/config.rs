use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cotador_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let payback_variants = if config.quoting.payback_variants.is_empty() {
        "<family defaults>".to_string()
    } else {
        config
            .quoting
            .payback_variants
            .iter()
            .map(|(family, variant)| format!("{family}={}", variant.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    };

    let entries = [
        ("database.url", config.database.url.clone(), "COTADOR_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "COTADOR_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "COTADOR_DATABASE_TIMEOUT_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "COTADOR_LOGGING_LEVEL"),
        ("logging.format", config.logging.format.as_str().to_string(), "COTADOR_LOGGING_FORMAT"),
        ("quoting.markup_pct", config.quoting.markup_pct.to_string(), "COTADOR_QUOTING_MARKUP_PCT"),
        (
            "quoting.commission_pct",
            config.quoting.commission_pct.to_string(),
            "COTADOR_QUOTING_COMMISSION_PCT",
        ),
        (
            "quoting.default_family",
            config.quoting.default_family.as_str().to_string(),
            "COTADOR_QUOTING_DEFAULT_FAMILY",
        ),
        ("quoting.payback_variants", payback_variants, "COTADOR_QUOTING_PAYBACK_VARIANTS"),
        ("session.user_id", config.session.user_id.clone(), "COTADOR_USER"),
        ("session.role", config.session.role.as_str().to_string(), "COTADOR_ROLE"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_key) in entries {
        lines.push(render_line(key_path, &value, source(key_path, env_key)));
    }
    lines.join("\n")
}

fn detect_config_path(explicit_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("cotador.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cotador.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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

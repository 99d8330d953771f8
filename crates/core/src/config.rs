use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::payback::PaybackVariant;
use crate::domain::actor::Role;
use crate::domain::family::ProductFamily;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub quoting: QuotingConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Commercial parameters of the DRE projection and per-family overrides.
#[derive(Clone, Debug)]
pub struct QuotingConfig {
    pub markup_pct: Decimal,
    pub commission_pct: Decimal,
    pub default_family: ProductFamily,
    pub payback_variants: BTreeMap<ProductFamily, PaybackVariant>,
}

/// Identity handed to the engine by whoever runs it. Not authenticated here.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub user_id: String,
    pub role: Role,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<Role>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://cotador.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            quoting: QuotingConfig {
                markup_pct: Decimal::new(30, 0),
                commission_pct: Decimal::new(5, 0),
                default_family: ProductFamily::Radio,
                payback_variants: BTreeMap::new(),
            },
            session: SessionConfig { user_id: "local".to_string(), role: Role::Usuario },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cotador.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(quoting) = patch.quoting {
            if let Some(markup_pct) = quoting.markup_pct {
                self.quoting.markup_pct = markup_pct;
            }
            if let Some(commission_pct) = quoting.commission_pct {
                self.quoting.commission_pct = commission_pct;
            }
            if let Some(default_family) = quoting.default_family {
                self.quoting.default_family = default_family;
            }
            if let Some(variants) = quoting.payback_variants {
                for (family, variant) in variants {
                    let (family, variant) = parse_payback_entry(&family, &variant)
                        .map_err(|reason| {
                            ConfigError::Validation(format!("quoting.payback_variants: {reason}"))
                        })?;
                    self.quoting.payback_variants.insert(family, variant);
                }
            }
        }

        if let Some(session) = patch.session {
            if let Some(user_id) = session.user_id {
                self.session.user_id = user_id;
            }
            if let Some(role) = session.role {
                self.session.role = role;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COTADOR_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COTADOR_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("COTADOR_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COTADOR_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COTADOR_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("COTADOR_LOGGING_LEVEL").or_else(|| read_env("COTADOR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COTADOR_LOGGING_FORMAT").or_else(|| read_env("COTADOR_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("COTADOR_QUOTING_MARKUP_PCT") {
            self.quoting.markup_pct = parse_decimal("COTADOR_QUOTING_MARKUP_PCT", &value)?;
        }
        if let Some(value) = read_env("COTADOR_QUOTING_COMMISSION_PCT") {
            self.quoting.commission_pct = parse_decimal("COTADOR_QUOTING_COMMISSION_PCT", &value)?;
        }
        if let Some(value) = read_env("COTADOR_QUOTING_DEFAULT_FAMILY") {
            self.quoting.default_family =
                parse_with("COTADOR_QUOTING_DEFAULT_FAMILY", &value, ProductFamily::from_str)?;
        }
        if let Some(value) = read_env("COTADOR_QUOTING_PAYBACK_VARIANTS") {
            for entry in value.split(',').filter(|entry| !entry.trim().is_empty()) {
                let parsed = entry
                    .split_once('=')
                    .ok_or_else(|| entry.to_string())
                    .and_then(|(family, variant)| parse_payback_entry(family, variant));
                let (family, variant) = parsed.map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "COTADOR_QUOTING_PAYBACK_VARIANTS".to_string(),
                    value: value.clone(),
                })?;
                self.quoting.payback_variants.insert(family, variant);
            }
        }

        if let Some(value) = read_env("COTADOR_USER") {
            self.session.user_id = value;
        }
        if let Some(value) = read_env("COTADOR_ROLE") {
            self.session.role = parse_with("COTADOR_ROLE", &value, Role::from_str)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(user_id) = overrides.user_id {
            self.session.user_id = user_id;
        }
        if let Some(role) = overrides.role {
            self.session.role = role;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_quoting(&self.quoting)?;
        validate_session(&self.session)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cotador.toml"), PathBuf::from("config/cotador.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_quoting(quoting: &QuotingConfig) -> Result<(), ConfigError> {
    if quoting.markup_pct < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "quoting.markup_pct must not be negative".to_string(),
        ));
    }
    if quoting.commission_pct < Decimal::ZERO || quoting.commission_pct > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "quoting.commission_pct must be in range 0..=100".to_string(),
        ));
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.user_id.trim().is_empty() {
        return Err(ConfigError::Validation("session.user_id must not be empty".to_string()));
    }
    Ok(())
}

fn parse_payback_entry(
    family: &str,
    variant: &str,
) -> Result<(ProductFamily, PaybackVariant), String> {
    Ok((family.parse()?, variant.parse()?))
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_with<T, E>(
    key: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(value).map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    quoting: Option<QuotingPatch>,
    session: Option<SessionPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotingPatch {
    markup_pct: Option<Decimal>,
    commission_pct: Option<Decimal>,
    default_family: Option<ProductFamily>,
    payback_variants: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    user_id: Option<String>,
    role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::cpq::payback::PaybackVariant;
    use crate::domain::actor::Role;
    use crate::domain::family::ProductFamily;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_a_config_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let config = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.quoting.markup_pct == Decimal::new(30, 0), "default markup is 30%")?;
        ensure(config.quoting.commission_pct == Decimal::new(5, 0), "default commission is 5%")?;
        ensure(config.quoting.payback_variants.is_empty(), "no payback overrides by default")?;
        ensure(config.session.role == Role::Usuario, "default role is usuario")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COTADOR_DB_PATH", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cotador.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_COTADOR_DB_PATH}"

[quoting]
markup_pct = "42.5"
default_family = "man"

[quoting.payback_variants]
fiber = "extended"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.quoting.markup_pct == Decimal::new(425, 1), "markup read from file")?;
            ensure(config.quoting.default_family == ProductFamily::Man, "family read from file")?;
            ensure(
                config.quoting.payback_variants.get(&ProductFamily::Fiber)
                    == Some(&PaybackVariant::Extended),
                "payback variant read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_COTADOR_DB_PATH"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTADOR_LOG_LEVEL", "warn");
        env::set_var("COTADOR_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["COTADOR_LOG_LEVEL", "COTADOR_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTADOR_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("COTADOR_QUOTING_COMMISSION_PCT", "7.5");
        env::set_var("COTADOR_ROLE", "diretor");
        env::set_var("COTADOR_QUOTING_PAYBACK_VARIANTS", "radio=extended, vm=standard");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cotador.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[quoting]
commission_pct = 4

[session]
user_id = "maria"
role = "admin"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.quoting.commission_pct == Decimal::new(75, 1),
                "env commission should win over file",
            )?;
            ensure(config.session.user_id == "maria", "file user id should win over default")?;
            ensure(config.session.role == Role::Diretor, "env role should win over file")?;
            ensure(
                config.quoting.payback_variants.len() == 2
                    && config.quoting.payback_variants.get(&ProductFamily::Radio)
                        == Some(&PaybackVariant::Extended),
                "payback variants should be parsed from env",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "COTADOR_DATABASE_URL",
            "COTADOR_QUOTING_COMMISSION_PCT",
            "COTADOR_ROLE",
            "COTADOR_QUOTING_PAYBACK_VARIANTS",
        ]);
        result
    }

    #[test]
    fn invalid_env_overrides_are_reported_with_their_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTADOR_QUOTING_PAYBACK_VARIANTS", "radio=sideways");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "COTADOR_QUOTING_PAYBACK_VARIANTS"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["COTADOR_QUOTING_PAYBACK_VARIANTS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTADOR_QUOTING_COMMISSION_PCT", "150");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("quoting.commission_pct")
            );
            ensure(has_message, "validation failure should mention quoting.commission_pct")
        })();

        clear_vars(&["COTADOR_QUOTING_COMMISSION_PCT"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let result = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }
}

pub mod catalog;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod proposal;
pub mod quote;
pub mod settings;

use std::future::Future;

use cotador_core::config::{AppConfig, LoadOptions};
use cotador_core::domain::actor::Actor;
use cotador_core::errors::ApplicationError;
use cotador_db::{connect_with_settings, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error onto the interface error classes and exit codes.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let interface = error.into_interface(command);
        let exit_code = match interface.error_class() {
            "validation" => 6,
            "permission" => 7,
            "persistence" => 8,
            _ => 9,
        };
        CommandResult::failure(
            command,
            interface.error_class(),
            format!("{} ({interface})", interface.user_message()),
            exit_code,
        )
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn session_actor(config: &AppConfig) -> Actor {
    Actor::new(config.session.user_id.clone(), config.session.role)
}

/// Runs `task` on a fresh current-thread runtime.
pub(crate) fn block_on<F, T>(command: &str, task: F) -> Result<T, CommandResult>
where
    F: Future<Output = Result<T, CommandResult>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        },
    )?;
    runtime.block_on(task)
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_store(command: &str, config: &AppConfig) -> Result<DbPool, CommandResult> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| CommandResult::failure(command, "db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandResult::failure(command, "migration", error.to_string(), 5))?;
    Ok(pool)
}

pub(crate) fn to_data<T: Serialize>(command: &str, value: &T) -> Result<Value, CommandResult> {
    serde_json::to_value(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), 9)
    })
}

pub(crate) fn finish(result: Result<CommandResult, CommandResult>) -> CommandResult {
    match result {
        Ok(result) | Err(result) => result,
    }
}

use std::env;
use std::sync::{Mutex, OnceLock};

use cotador_cli::commands::proposal::{ProposalCommand, SaveArgs};
use cotador_cli::commands::quote::DraftArgs;
use cotador_cli::commands::settings::{SettingsCommand, TaxArgs};
use cotador_cli::commands::{catalog, config, doctor, migrate, proposal, quote, settings};
use cotador_core::config::LoadOptions;
use cotador_core::domain::family::ProductFamily;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

fn radio_20(installation: bool) -> DraftArgs {
    DraftArgs {
        family: Some(ProductFamily::Radio),
        plans: vec![20],
        installation,
        ..DraftArgs::default()
    }
}

fn save_args(client: &str, base_id: Option<&str>, draft: DraftArgs) -> SaveArgs {
    SaveArgs {
        client: client.to_string(),
        document: None,
        contact: None,
        account_manager: "Ana".to_string(),
        base_id: base_id.map(str::to_string),
        draft,
    }
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("COTADOR_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("COTADOR_DATABASE_URL", "postgres://localhost/cotador")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn quote_prices_reference_radio_offer() {
    with_file_db(&[], || {
        let result = quote::run(LoadOptions::default(), radio_20(true));
        assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("mensalidade: R$ 720,00"), "{message}");
        assert!(message.contains("instalação: R$ 998,00"), "{message}");
        assert!(message.contains("payback: 2 de 8 meses (aprovado)"), "{message}");
        assert_eq!(payload["data"]["evaluation"]["payback"]["is_valid"], true);
    });
}

#[test]
fn director_discount_requires_director_role() {
    let mut args = radio_20(false);
    args.director_discount = Decimal::new(20, 0);

    with_file_db(&[("COTADOR_ROLE", "usuario")], || {
        let result = quote::run(LoadOptions::default(), args.clone());
        assert_eq!(result.exit_code, 7, "expected permission failure: {}", result.output);
        assert_eq!(parse_payload(&result.output)["error_class"], "permission");
    });

    with_file_db(&[("COTADOR_ROLE", "diretor")], || {
        let result = quote::run(LoadOptions::default(), args.clone());
        assert_eq!(result.exit_code, 0, "quote failed: {}", result.output);
        let message = parse_payload(&result.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("mensalidade: R$ 576,00"), "{message}");
    });
}

#[test]
fn unavailable_term_is_a_validation_failure() {
    with_file_db(&[], || {
        let args = DraftArgs {
            family: Some(ProductFamily::Radio),
            plans: vec![100],
            ..DraftArgs::default()
        };
        let result = quote::run(LoadOptions::default(), args);
        assert_eq!(result.exit_code, 6, "expected validation failure: {}", result.output);
        assert_eq!(parse_payload(&result.output)["error_class"], "validation");
    });
}

#[test]
fn proposals_are_saved_versioned_and_listed() {
    with_file_db(&[], || {
        let first = proposal::run(
            LoadOptions::default(),
            ProposalCommand::Save(save_args("Mercado Boa Vista", None, radio_20(true))),
        );
        assert_eq!(first.exit_code, 0, "save failed: {}", first.output);
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["data"]["proposal"]["id"], "RAD0001_v1");

        let mut referral = radio_20(true);
        referral.referral = true;
        let second = proposal::run(
            LoadOptions::default(),
            ProposalCommand::Save(save_args("Mercado Boa Vista", Some("RAD0001"), referral)),
        );
        assert_eq!(second.exit_code, 0, "save failed: {}", second.output);
        assert_eq!(parse_payload(&second.output)["data"]["proposal"]["id"], "RAD0001_v2");

        let history = proposal::run(
            LoadOptions::default(),
            ProposalCommand::History { base_id: "RAD0001".to_string() },
        );
        let versions = parse_payload(&history.output)["data"]["versions"].clone();
        assert_eq!(versions.as_array().map(Vec::len), Some(2));

        let shown = proposal::run(
            LoadOptions::default(),
            ProposalCommand::Show { id: "RAD0001_v1".to_string() },
        );
        assert_eq!(parse_payload(&shown.output)["data"]["proposal"], first_payload["data"]["proposal"]);

        let listed = proposal::run(LoadOptions::default(), ProposalCommand::List);
        let proposals = parse_payload(&listed.output)["data"]["proposals"].clone();
        assert_eq!(proposals.as_array().map(Vec::len), Some(1));
        assert_eq!(proposals[0]["id"], "RAD0001_v2");
    });
}

#[test]
fn saving_without_client_name_is_rejected() {
    with_file_db(&[], || {
        let result = proposal::run(
            LoadOptions::default(),
            ProposalCommand::Save(save_args("   ", None, radio_20(false))),
        );
        assert_eq!(result.exit_code, 6, "expected validation failure: {}", result.output);

        let listed = proposal::run(LoadOptions::default(), ProposalCommand::List);
        assert_eq!(parse_payload(&listed.output)["message"], "no proposals saved yet");
    });
}

#[test]
fn missing_proposal_is_reported() {
    with_file_db(&[], || {
        let result = proposal::run(
            LoadOptions::default(),
            ProposalCommand::Show { id: "FIB0042_v1".to_string() },
        );
        assert_eq!(result.exit_code, 6);
        let payload = parse_payload(&result.output);
        assert!(payload["message"].as_str().unwrap_or_default().contains("FIB0042_v1"));
    });
}

#[test]
fn tax_settings_are_role_gated_and_persisted() {
    with_file_db(&[("COTADOR_USER", "maria"), ("COTADOR_ROLE", "usuario")], || {
        let update = TaxArgs { iss: Some(Decimal::new(2, 0)), ..TaxArgs::default() };
        let denied = settings::run(LoadOptions::default(), SettingsCommand::SetTaxes(update));
        assert_eq!(denied.exit_code, 7, "expected permission failure: {}", denied.output);

        env::set_var("COTADOR_ROLE", "admin");
        let update = TaxArgs { iss: Some(Decimal::new(2, 0)), ..TaxArgs::default() };
        let saved = settings::run(LoadOptions::default(), SettingsCommand::SetTaxes(update));
        assert_eq!(saved.exit_code, 0, "set-taxes failed: {}", saved.output);

        let shown = settings::run(LoadOptions::default(), SettingsCommand::Taxes);
        let message = parse_payload(&shown.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("iss: 2,00%"), "{message}");
        assert!(message.contains("pis: 0,65%"), "{message}");
    });
}

#[test]
fn catalog_lists_effective_plans() {
    with_file_db(&[], || {
        let result = catalog::run(LoadOptions::default(), Some(ProductFamily::Man));
        assert_eq!(result.exit_code, 0, "catalog failed: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["plans"].as_array().map(Vec::len), Some(3));
        assert!(payload["message"].as_str().unwrap_or_default().contains("12m -"));
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("COTADOR_ROLE", "diretor")], || {
        let output = config::run(LoadOptions::default());
        assert!(output.contains("session.role = diretor (source: env (COTADOR_ROLE))"), "{output}");
        assert!(output.contains("quoting.markup_pct = 30 (source: default)"), "{output}");
    });
}

#[test]
fn doctor_reports_pass_and_fail() {
    with_file_db(&[], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "doctor failed: {}", result.output);
        assert_eq!(parse_payload(&result.output)["overall_status"], "pass");
    });

    with_env(&[("COTADOR_QUOTING_COMMISSION_PCT", "250")], || {
        let result = doctor::run(LoadOptions::default(), false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] database_connectivity"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a fresh on-disk database so state survives between
/// command invocations.
fn with_file_db(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("cotador.db").display());
    let mut all_vars = vec![("COTADOR_DATABASE_URL", url.as_str())];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "COTADOR_DATABASE_URL",
        "COTADOR_DATABASE_MAX_CONNECTIONS",
        "COTADOR_DATABASE_TIMEOUT_SECS",
        "COTADOR_LOGGING_LEVEL",
        "COTADOR_LOGGING_FORMAT",
        "COTADOR_LOG_LEVEL",
        "COTADOR_LOG_FORMAT",
        "COTADOR_QUOTING_MARKUP_PCT",
        "COTADOR_QUOTING_COMMISSION_PCT",
        "COTADOR_QUOTING_DEFAULT_FAMILY",
        "COTADOR_QUOTING_PAYBACK_VARIANTS",
        "COTADOR_USER",
        "COTADOR_ROLE",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

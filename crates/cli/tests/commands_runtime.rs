use std::env;
use std::sync::{Mutex, OnceLock};

use facturador_cli::commands::{doctor, issue_token, migrate, next_number, seed, start};
use serde_json::Value;

#[test]
fn start_returns_success_with_valid_env() {
    with_database(&[], || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("emission not configured"), "{message}");
    });
}

#[test]
fn start_returns_config_failure_for_invalid_override() {
    with_env(&[("FACTURADOR_SERVER_PORT", "not-a-port")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_database(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");

        let again = migrate::run();
        assert_eq!(again.exit_code, 0, "re-running migrations is a no-op");
    });
}

#[test]
fn migrate_rejects_non_sqlite_database_url() {
    with_env(&[("FACTURADOR_DATABASE_URL", "postgres://db.example.test/facturas")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_database(&[], || {
        let first = seed::run(false);
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_message =
            parse_payload(&first.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(first_message.contains("2 clients created, 0 already present"), "{first_message}");
        assert!(first_message.contains("fct_"), "first run prints the demo token");

        let second = seed::run(true);
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_message =
            parse_payload(&second.output)["message"].as_str().unwrap_or_default().to_string();
        assert_eq!(
            second_message,
            "demo tenant `tenant-demo` ready: 0 clients created, 2 already present"
        );
    });
}

#[test]
fn issue_token_prints_raw_token_once() {
    with_database(&[], || {
        let unknown = issue_token::run("ana", Some("tenant-demo"), None);
        assert_eq!(unknown.exit_code, 6);
        assert_eq!(parse_payload(&unknown.output)["error_class"], "unknown_tenant");

        assert_eq!(seed::run(true).exit_code, 0);
        let result = issue_token::run("ana", Some("tenant-demo"), Some("ops"));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "issue-token");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(
            message.starts_with("token for `ana` with tenant `tenant-demo`: fct_"),
            "{message}"
        );

        let blank = issue_token::run("  ", None, None);
        assert_eq!(blank.exit_code, 2);
        assert_eq!(parse_payload(&blank.output)["error_class"], "invalid_argument");
    });
}

#[test]
fn next_number_previews_first_sequence_for_empty_tenant() {
    with_database(&[], || {
        let result = next_number::run("tenant-empty");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let number = payload["message"].as_str().unwrap_or_default();
        assert!(number.starts_with("COT-"), "{number}");
        assert!(number.ends_with("-0001"), "{number}");

        let again = next_number::run("tenant-empty");
        assert_eq!(parse_payload(&again.output)["message"], number, "preview reserves nothing");
    });
}

#[test]
fn doctor_flags_unmigrated_database() {
    with_database(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 7, "{}", result.output);

        let report: Value = serde_json::from_str(&result.output).expect("doctor json");
        assert_eq!(report["overall_status"], "fail");
        let statuses: Vec<(&str, &str)> = report["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .map(|check| {
                (
                    check["name"].as_str().unwrap_or_default(),
                    check["status"].as_str().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("config_validation", "pass"),
                ("database_connectivity", "pass"),
                ("migrations", "fail"),
                ("emission_configuration", "skipped"),
            ]
        );
    });
}

#[test]
fn doctor_passes_after_migrate_with_emission_configured() {
    with_database(&[("FACTURADOR_EMISSION_BASE_URL", "https://dte.example.test/api")], || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = doctor::run(false);
        assert_eq!(result.exit_code, 0, "{}", result.output);
        assert!(result.output.starts_with("doctor: all readiness checks passed"));
        assert!(result.output.contains("- [ok] migrations"));
        assert!(result.output.contains("- [ok] emission_configuration"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_database(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("facturador.db").display());

    let mut all_vars = vec![("FACTURADOR_DATABASE_URL", url.as_str())];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FACTURADOR_DATABASE_URL",
        "FACTURADOR_DATABASE_MAX_CONNECTIONS",
        "FACTURADOR_DATABASE_TIMEOUT_SECS",
        "FACTURADOR_SERVER_BIND_ADDRESS",
        "FACTURADOR_SERVER_PORT",
        "FACTURADOR_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "FACTURADOR_EMISSION_BASE_URL",
        "FACTURADOR_EMISSION_API_KEY",
        "FACTURADOR_EMISSION_TIMEOUT_SECS",
        "FACTURADOR_EMISSION_AMBIENTE",
        "FACTURADOR_LOGGING_LEVEL",
        "FACTURADOR_LOGGING_FORMAT",
        "FACTURADOR_LOG_LEVEL",
        "FACTURADOR_LOG_FORMAT",
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

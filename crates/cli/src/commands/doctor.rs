use facturador_core::config::{AppConfig, LoadOptions};
use facturador_db::{connect_with_settings, migrations};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exits non-zero when any check failed. Skipped checks do not count.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 7 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let mut checks = vec![DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            }];
            checks.extend(check_database(&config));
            checks.push(check_emission(&config));
            checks
        }
        Err(error) => {
            let mut checks = vec![DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }];
            for name in ["database_connectivity", "migrations", "emission_configuration"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
            checks
        }
    };

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Emission is optional for running the service, so an unset endpoint is
/// reported as skipped rather than failed.
fn check_emission(config: &AppConfig) -> DoctorCheck {
    match config.emission.base_url.as_deref() {
        Some(base_url) => DoctorCheck {
            name: "emission_configuration",
            status: CheckStatus::Pass,
            details: format!(
                "emitting to `{base_url}` (ambiente {}, api key {})",
                config.emission.ambiente.code(),
                if config.emission.api_key.is_some() { "set" } else { "unset" }
            ),
        },
        None => DoctorCheck {
            name: "emission_configuration",
            status: CheckStatus::Skipped,
            details: "emission.base_url is unset; quote conversions will fail".to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                DoctorCheck {
                    name: "migrations",
                    status: CheckStatus::Skipped,
                    details: "skipped because the runtime did not start".to_string(),
                },
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    DoctorCheck {
                        name: "migrations",
                        status: CheckStatus::Skipped,
                        details: "skipped because the database is unreachable".to_string(),
                    },
                ];
            }
        };

        let connectivity = DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        };
        let expected = migrations::MIGRATOR
            .iter()
            .filter(|migration| migration.migration_type.is_up_migration())
            .count();
        let migration_check = match migrations::applied_versions(&pool).await {
            Ok(applied) if applied.len() >= expected => DoctorCheck {
                name: "migrations",
                status: CheckStatus::Pass,
                details: format!("{} of {expected} migrations applied", applied.len()),
            },
            Ok(applied) => DoctorCheck {
                name: "migrations",
                status: CheckStatus::Fail,
                details: format!(
                    "{} of {expected} migrations applied; run `facturador migrate`",
                    applied.len()
                ),
            },
            Err(error) => DoctorCheck {
                name: "migrations",
                status: CheckStatus::Fail,
                details: format!("could not read migration history: {error}"),
            },
        };

        pool.close().await;
        vec![connectivity, migration_check]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, summarize, CheckStatus, DoctorCheck};

    fn check(name: &'static str, status: CheckStatus) -> DoctorCheck {
        DoctorCheck { name, status, details: format!("{name} details") }
    }

    #[test]
    fn only_failed_checks_fail_the_report() {
        let report = summarize(vec![
            check("config_validation", CheckStatus::Pass),
            check("emission_configuration", CheckStatus::Skipped),
        ]);
        assert_eq!(report.overall_status, CheckStatus::Pass);

        let report = summarize(vec![
            check("config_validation", CheckStatus::Pass),
            check("migrations", CheckStatus::Fail),
        ]);
        assert_eq!(report.overall_status, CheckStatus::Fail);
    }

    #[test]
    fn human_rendering_marks_each_check() {
        let report = summarize(vec![
            check("config_validation", CheckStatus::Pass),
            check("database_connectivity", CheckStatus::Fail),
            check("migrations", CheckStatus::Skipped),
        ]);
        let rendered = render_human(&report);

        assert!(rendered.starts_with("doctor: one or more readiness checks failed"));
        assert!(rendered.contains("- [ok] config_validation: config_validation details"));
        assert!(rendered.contains("- [fail] database_connectivity"));
        assert!(rendered.contains("- [skip] migrations"));
    }
}

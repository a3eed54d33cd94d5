//! Section validation tests for vet-clinic-config.
// crates/vet-clinic-config/tests/section_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Validate server, store, coordinator, cipher, and audit sections.
// Purpose: Ensure each section rejects out-of-range values and resolves secrets.
// =============================================================================

use std::time::Duration;

use vet_clinic_config::AuditSinkKind;
use vet_clinic_config::ConfigError;
use vet_clinic_config::VetClinicConfig;
use vet_clinic_store_sqlite::SqliteTarget;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<VetClinicConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |name| pairs.iter().find(|(key, _)| *key == name).map(|(_, value)| (*value).to_string())
}

#[test]
fn server_rejects_unparseable_bind() -> TestResult {
    assert_invalid(VetClinicConfig::parse("[server]\nbind = \"localhost\"\n"), "invalid bind address")
}

#[test]
fn server_rejects_zero_body_limit() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[server]\nmax_body_bytes = 0\n"),
        "max_body_bytes must be greater than zero",
    )
}

#[test]
fn relational_rejects_path_and_uri_together() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[relational]\npath = \"a.db\"\nuri = \"file:b.db\"\n"),
        "relational:",
    )
}

#[test]
fn relational_and_document_must_differ() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[relational]\npath = \"clinic.db\"\n[document]\nuri = \"file:clinic.db\"\n"),
        "must use different databases",
    )
}

#[test]
fn document_placeholder_requires_password_env() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[document]\nuri = \"file:docs.db?key=<PASSWORD>\"\n"),
        "password_env is unset",
    )
}

#[test]
fn document_password_env_requires_placeholder() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[document]\nuri = \"file:docs.db\"\npassword_env = \"DOC_SECRET\"\n"),
        "must contain <PASSWORD>",
    )
}

#[test]
fn document_secret_is_percent_encoded() -> TestResult {
    let config = VetClinicConfig::parse(
        "[document]\nuri = \"file:docs.db?key=<PASSWORD>\"\npassword_env = \"DOC_SECRET\"\n",
    )
    .map_err(|err| err.to_string())?;
    let uri = config
        .document
        .resolved_uri_with(lookup_from(&[("DOC_SECRET", "p@ss word/1")]))
        .map_err(|err| err.to_string())?;
    if uri != "file:docs.db?key=p%40ss%20word%2F1" {
        return Err(format!("unexpected resolved uri {uri}"));
    }
    Ok(())
}

#[test]
fn document_missing_secret_is_rejected() -> TestResult {
    let config = VetClinicConfig::parse(
        "[document]\nuri = \"file:docs.db?key=<PASSWORD>\"\npassword_env = \"DOC_SECRET\"\n",
    )
    .map_err(|err| err.to_string())?;
    match config.document.resolved_uri_with(lookup_from(&[("DOC_SECRET", "")])) {
        Err(err) if err.to_string().contains("DOC_SECRET is unset") => Ok(()),
        other => Err(format!("expected unset secret error, got {other:?}")),
    }
}

#[test]
fn document_pool_config_maps_timeouts() -> TestResult {
    let config = VetClinicConfig::parse(
        "[document]\nuri = \"file:docs.db\"\nmax_connections = 4\nconnect_timeout_ms = 1200\nsocket_timeout_ms = 3400\n",
    )
    .map_err(|err| err.to_string())?;
    let pool = config.document.pool_config().map_err(|err| err.to_string())?;
    if pool.max_connections != 4 || pool.acquire_timeout_ms != 1200 || pool.busy_timeout_ms != 3400 {
        return Err(format!("unexpected pool config {pool:?}"));
    }
    match pool.target().map_err(|err| err.to_string())? {
        SqliteTarget::Uri(uri) if uri == "file:docs.db" => Ok(()),
        other => Err(format!("unexpected target {other:?}")),
    }
}

#[test]
fn coordinator_rejects_zero_attempts() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[coordinator]\nretry_attempts = 0\n"),
        "coordinator.retry_attempts out of range",
    )
}

#[test]
fn coordinator_rejects_zero_deadline() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[coordinator]\ncreate_deadline_ms = 0\n"),
        "coordinator.create_deadline_ms out of range",
    )
}

#[test]
fn coordinator_settings_map_to_runtime_config() -> TestResult {
    let config = VetClinicConfig::parse(
        "[coordinator]\nretry_attempts = 5\nretry_delay_ms = 10\ncreate_deadline_ms = 900\nverify_connection = false\n",
    )
    .map_err(|err| err.to_string())?;
    let runtime = config.coordinator.coordinator_config();
    if runtime.create_deadline != Duration::from_millis(900) || runtime.verify_connection {
        return Err(format!("unexpected runtime config {runtime:?}"));
    }
    Ok(())
}

#[test]
fn cipher_rejects_malformed_env_name() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[cipher]\npassphrase_env = \"KEY-NAME\"\n"),
        "cipher.passphrase_env must be [A-Za-z0-9_]",
    )
}

#[test]
fn cipher_passphrase_requires_non_empty_value() -> TestResult {
    let config = VetClinicConfig::default();
    if config.cipher.passphrase_with(lookup_from(&[])).is_ok() {
        return Err("expected missing passphrase to fail".to_string());
    }
    let passphrase = config
        .cipher
        .passphrase_with(lookup_from(&[("VET_CLINIC_CIPHER_KEY", "secret")]))
        .map_err(|err| err.to_string())?;
    if passphrase != "secret" {
        return Err("unexpected passphrase".to_string());
    }
    Ok(())
}

#[test]
fn audit_file_sink_requires_path() -> TestResult {
    assert_invalid(
        VetClinicConfig::parse("[audit]\nsink = \"file\"\n"),
        "audit.path is required for the file sink",
    )
}

#[test]
fn audit_file_sink_accepts_path() -> TestResult {
    let config = VetClinicConfig::parse("[audit]\nsink = \"file\"\npath = \"audit.jsonl\"\n")
        .map_err(|err| err.to_string())?;
    if config.audit.sink != AuditSinkKind::File {
        return Err("expected file sink".to_string());
    }
    Ok(())
}

#[test]
fn logging_rejects_blank_level() -> TestResult {
    assert_invalid(VetClinicConfig::parse("[logging]\nlevel = \"  \"\n"), "logging.level must be non-empty")
}

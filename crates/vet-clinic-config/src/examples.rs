// crates/vet-clinic-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for vet-clinic.toml.
// Purpose: Keep the documented example in sync with the validated model.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example is parsed by the test suite, so it always validates.

/// Returns a complete example `vet-clinic.toml`.
#[must_use]
pub fn config_toml_example() -> String {
    r#"# Vet Clinic backend configuration.

[server]
bind = "127.0.0.1:8080"
max_body_bytes = 1048576

[relational]
path = "vet-clinic.db"
max_connections = 10
min_connections = 1
acquire_timeout_ms = 5000
idle_timeout_ms = 600000
busy_timeout_ms = 5000
connect_retries = 3
journal_mode = "wal"
sync_mode = "full"

[document]
# "<PASSWORD>" is replaced with the percent-encoded value of password_env.
uri = "file:vet-clinic-documents.db"
max_connections = 10
connect_timeout_ms = 10000
socket_timeout_ms = 45000

[coordinator]
retry_attempts = 3
retry_delay_ms = 2000
create_deadline_ms = 15000
verify_connection = true

[cipher]
passphrase_env = "VET_CLINIC_CIPHER_KEY"

[audit]
sink = "stderr"

[logging]
level = "info"
"#
    .to_string()
}

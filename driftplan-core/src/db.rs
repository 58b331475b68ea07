//! Database connection with TLS support, retries and keepalive.

use std::time::Duration;

use tokio_postgres::Client;

use crate::config::{DatabaseConfig, SslMode};
use crate::error::{format_db_error, DriftplanError, Result, Side};

/// Validate that a SQL identifier contains only safe characters.
///
/// Returns an error for names with characters outside `[a-zA-Z0-9_]`.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DriftplanError::ConfigError(
            "Identifier cannot be empty".to_string(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DriftplanError::ConfigError(format!(
            "Identifier '{}' contains invalid characters. Only [a-zA-Z0-9_] are allowed.",
            name
        )));
    }
    Ok(())
}

/// Build a rustls ClientConfig using the Mozilla CA bundle and ring crypto provider.
fn make_rustls_config() -> std::result::Result<rustls::ClientConfig, rustls::Error> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Ok(rustls::ClientConfig::builder_with_provider(std::sync::Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth())
}

/// Check if a postgres error is a permanent authentication failure that should not be retried.
fn is_permanent_error(e: &tokio_postgres::Error) -> bool {
    if let Some(db_err) = e.as_db_error() {
        let code = db_err.code().code();
        // 28P01 = invalid_password, 28000 = invalid_authorization_specification,
        // 3D000 = invalid_catalog_name
        return matches!(code, "28P01" | "28000" | "3D000");
    }
    false
}

/// Inject TCP keepalive parameters into a connection string if not already present.
///
/// For URL-style strings (`postgres://...`), appends `?keepalives=1&keepalives_idle=N`
/// (or `&` if `?` already exists). For key=value style, appends ` keepalives=1 keepalives_idle=N`.
/// Returns the string unchanged if `keepalive_secs == 0` or keepalive params already exist.
pub fn inject_keepalive(conn_string: &str, keepalive_secs: u32) -> String {
    if keepalive_secs == 0 {
        return conn_string.to_string();
    }
    let lower = conn_string.to_lowercase();
    if lower.contains("keepalives") {
        return conn_string.to_string();
    }
    let params = format!("keepalives=1&keepalives_idle={}", keepalive_secs);
    if conn_string.starts_with("postgres://") || conn_string.starts_with("postgresql://") {
        if conn_string.contains('?') {
            format!("{}&{}", conn_string, params)
        } else {
            format!("{}?{}", conn_string, params)
        }
    } else {
        format!(
            "{} keepalives=1 keepalives_idle={}",
            conn_string, keepalive_secs
        )
    }
}

/// Spawn the background connection driver task.
fn spawn_connection_task<F>(connection: F)
where
    F: std::future::Future<Output = std::result::Result<(), tokio_postgres::Error>>
        + Send
        + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("Database connection error: {}", e);
        }
    });
}

/// Why one connection attempt failed.
enum AttemptError {
    Postgres(tokio_postgres::Error),
    Tls(rustls::Error),
    TimedOut(u32),
}

impl AttemptError {
    fn permanent(&self) -> bool {
        match self {
            AttemptError::Postgres(e) => is_permanent_error(e),
            AttemptError::Tls(_) => true,
            AttemptError::TimedOut(_) => false,
        }
    }

    fn reason(&self) -> String {
        match self {
            AttemptError::Postgres(e) => format_db_error(e),
            AttemptError::Tls(e) => format!("TLS setup failed: {}", e),
            AttemptError::TimedOut(secs) => format!("connection timed out after {}s", secs),
        }
    }
}

impl From<tokio_postgres::Error> for AttemptError {
    fn from(e: tokio_postgres::Error) -> Self {
        AttemptError::Postgres(e)
    }
}

async fn connect_once(
    conn_string: &str,
    ssl_mode: &SslMode,
    connect_timeout_secs: u32,
) -> std::result::Result<Client, AttemptError> {
    let connect_fut = async {
        match ssl_mode {
            SslMode::Disable => {
                let (client, connection) =
                    tokio_postgres::connect(conn_string, tokio_postgres::NoTls).await?;
                spawn_connection_task(connection);
                Ok(client)
            }
            SslMode::Require => {
                let tls_config = make_rustls_config().map_err(AttemptError::Tls)?;
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
                let (client, connection) = tokio_postgres::connect(conn_string, tls).await?;
                spawn_connection_task(connection);
                Ok(client)
            }
            SslMode::Prefer => {
                let tls_config = make_rustls_config().map_err(AttemptError::Tls)?;
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
                match tokio_postgres::connect(conn_string, tls).await {
                    Ok((client, connection)) => {
                        spawn_connection_task(connection);
                        Ok(client)
                    }
                    Err(_) => {
                        log::debug!("TLS connection failed, falling back to plaintext");
                        let (client, connection) =
                            tokio_postgres::connect(conn_string, tokio_postgres::NoTls).await?;
                        spawn_connection_task(connection);
                        Ok(client)
                    }
                }
            }
        }
    };

    if connect_timeout_secs > 0 {
        match tokio::time::timeout(
            Duration::from_secs(connect_timeout_secs as u64),
            connect_fut,
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AttemptError::TimedOut(connect_timeout_secs)),
        }
    } else {
        connect_fut.await
    }
}

/// Connect to the database for one side of a comparison.
///
/// Retries up to `connect_retries` times with exponential backoff + jitter:
/// each retry waits `min(2^attempt, 30)s + rand(0..1000ms)`. Authentication
/// failures are not retried. Every failure to connect is a
/// [`DriftplanError::ConnectionError`] naming `side`.
pub async fn connect(conn_string: &str, config: &DatabaseConfig, side: Side) -> Result<Client> {
    let conn_string = inject_keepalive(conn_string, config.keepalive_secs);
    let retries = config.connect_retries;
    let mut last_err = None;

    for attempt in 0..=retries {
        if attempt > 0 {
            let base_delay = std::cmp::min(1u64 << attempt, 30);
            let jitter_ms = fastrand::u64(0..1000);
            let delay = Duration::from_secs(base_delay) + Duration::from_millis(jitter_ms);
            log::info!(
                "Connection attempt failed, retrying; side={}, attempt={}, max_attempts={}, delay_ms={}",
                side,
                attempt + 1,
                retries + 1,
                delay.as_millis() as u64
            );
            tokio::time::sleep(delay).await;
        }

        match connect_once(&conn_string, &config.ssl_mode, config.connect_timeout_secs).await {
            Ok(client) => {
                if attempt > 0 {
                    log::info!(
                        "Connected successfully after retry; side={}, attempt={}, max_attempts={}",
                        side,
                        attempt + 1,
                        retries + 1
                    );
                }

                if config.statement_timeout_secs > 0 {
                    let timeout_sql =
                        format!("SET statement_timeout = '{}s'", config.statement_timeout_secs);
                    client.batch_execute(&timeout_sql).await?;
                }

                return Ok(client);
            }
            Err(e) => {
                if e.permanent() {
                    log::error!("Permanent connection error, not retrying; side={}, reason={}", side, e.reason());
                    return Err(DriftplanError::ConnectionError {
                        side,
                        reason: e.reason(),
                    });
                }
                last_err = Some(e);
            }
        }
    }

    Err(DriftplanError::ConnectionError {
        side,
        reason: last_err
            .map(|e| e.reason())
            .unwrap_or_else(|| "no connection attempt was made".to_string()),
    })
}

/// Get the current database name.
pub async fn get_current_database(client: &Client) -> Result<String> {
    let row = client.query_one("SELECT current_database()", &[]).await?;
    Ok(row.get::<_, String>(0))
}

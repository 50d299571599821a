//! PostgreSQL target: connection pool, schema preparation, DDL generation,
//! COPY encoding, and the post-load installer.

pub mod copy;
pub mod ddl;
pub mod post;

use std::str::FromStr;
use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::config::SslMode;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::OnSchemaExists;
use crate::core::ident::quote;
use crate::error::{MigrateError, Result};

/// Shared PostgreSQL connection pool for DDL, post-load statements, and the
/// per-table COPY streams.
pub struct PgPool {
    pool: Pool,
}

impl PgPool {
    /// Connect and verify the target is reachable.
    ///
    /// `max_size` should cover the streaming workers plus a little headroom
    /// for the sequential phases.
    pub async fn connect(dsn: &str, max_size: usize) -> Result<Self> {
        let pg_config = PgConfig::from_str(dsn)
            .map_err(|e| MigrateError::Dsn(format!("parse postgres dsn: {}", e)))?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match pg_config.get_ssl_mode() {
            SslMode::Disable => {
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_size)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
            _ => {
                warn!("TLS enabled without server certificate verification");
                let tls_config = ClientConfig::builder()
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier))
                    .with_no_client_auth();
                let tls = MakeRustlsConnect::new(tls_config);
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_size)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL target pool"))?
            }
        };

        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "testing PostgreSQL target connection"))?;
        client.simple_query("SELECT 1").await?;
        info!("connected to PostgreSQL target");

        Ok(Self { pool })
    }

    /// Acquire a pooled connection.
    pub async fn get(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting PostgreSQL connection"))
    }

    /// Execute a single statement, returning the affected row count.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let client = self.get().await?;
        Ok(client.execute(sql, &[]).await?)
    }

    /// Create the target schema according to `on_schema_exists`.
    pub async fn prepare_schema(&self, schema: &str, mode: OnSchemaExists) -> Result<()> {
        let client = self.get().await?;
        match mode {
            OnSchemaExists::Recreate => {
                client
                    .execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", quote(schema)), &[])
                    .await?;
                client
                    .execute(&format!("CREATE SCHEMA {}", quote(schema)), &[])
                    .await?;
            }
            OnSchemaExists::Error => {
                let row = client
                    .query_one(
                        "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)",
                        &[&schema],
                    )
                    .await?;
                if row.get::<_, bool>(0) {
                    return Err(MigrateError::SchemaConflict(schema.to_string()));
                }
                client
                    .execute(&format!("CREATE SCHEMA {}", quote(schema)), &[])
                    .await?;
            }
        }
        debug!("prepared schema {:?}", schema);
        Ok(())
    }

    /// Install the citext extension (needed before any citext column is created).
    pub async fn install_citext(&self) -> Result<()> {
        self.execute("CREATE EXTENSION IF NOT EXISTS citext").await?;
        Ok(())
    }
}

/// Certificate verifier that accepts any server certificate.
///
/// Connections with sslmode beyond `disable` get transport encryption but no
/// authentication of the server identity.
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

impl std::fmt::Debug for NoVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoVerifier")
    }
}

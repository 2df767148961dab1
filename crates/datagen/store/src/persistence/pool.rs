mod error;

pub use self::error::PoolError;

use core::num::NonZeroUsize;

use diesel::ConnectionError;
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{
        AsyncDieselConnectionManager, ManagerConfig,
        deadpool::{Object, Pool},
    },
};
use rustls::{ClientConfig, RootCertStore};
use rustls_native_certs::CertificateResult;
use tokio::task;
use tokio_postgres_rustls::MakeRustlsConnect;

/// A connection pool for managing PostgreSQL database connections.
///
/// This is a type alias for a deadpool-managed connection pool that handles
/// asynchronous PostgreSQL connections through Diesel.
pub type DbPool = Pool<AsyncPgConnection>;

/// A connection from the database pool.
///
/// When dropped, the connection is returned to the pool for reuse.
pub type DbConn = Object<AsyncPgConnection>;

/// How pooled connections talk to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Plain TCP, as used against a local development database.
    #[default]
    Disabled,

    /// TLS verified against the platform's native root certificates.
    NativeRoots,
}

/// Establishes a connection pool to the PostgreSQL database.
///
/// Connections are opened lazily by the pool, at most `max_size` at a time.
///
/// # Errors
///
/// This function will return an error if:
/// - The native root certificates cannot be loaded (with [`TlsMode::NativeRoots`])
/// - The pool configuration is invalid
#[tracing::instrument(skip(url))]
pub async fn establish_pool<U>(
    url: U,
    max_size: NonZeroUsize,
    tls_mode: TlsMode,
) -> Result<DbPool, PoolError>
where
    String: From<U>,
{
    let manager = match tls_mode {
        TlsMode::Disabled => AsyncDieselConnectionManager::<AsyncPgConnection>::new(url),
        TlsMode::NativeRoots => {
            let tls = task::spawn_blocking(make_rustls_config).await??;

            let mut manager_config = ManagerConfig::default();
            manager_config.custom_setup = Box::new(move |url: &str| {
                let tls = tls.clone();
                let url = url.to_string();
                Box::pin(async move {
                    let (client, conn) = tokio_postgres::connect(&url, tls)
                        .await
                        .map_err(|e| e.to_string())
                        .map_err(ConnectionError::BadConnection)?;

                    tokio::spawn(conn);

                    AsyncPgConnection::try_from(client).await
                })
            });

            AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(url, manager_config)
        },
    };

    Pool::builder(manager).max_size(max_size.get()).build().map_err(From::from)
}

fn make_rustls_config() -> Result<MakeRustlsConnect, rustls::Error> {
    let mut cert_store = RootCertStore::empty();
    let CertificateResult { certs, errors, .. } = rustls_native_certs::load_native_certs();

    if !errors.is_empty() {
        tracing::warn!(count = errors.len(), "some native root certificates could not be loaded");
    }

    for cert in certs {
        cert_store.add(cert)?;
    }

    let config = ClientConfig::builder().with_root_certificates(cert_store).with_no_client_auth();

    Ok(MakeRustlsConnect::new(config))
}

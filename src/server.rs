//! Server runtime
//!
//! [`ServerHandle`] owns the full lifecycle: metrics recorder, database and
//! migrations, repositories, the country upstream client, the REST API, and
//! graceful shutdown. The binaries only parse arguments and wait.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::domain::{CountryDirectory, CountryLookupError, RepositoryProvider};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    init_database, DatabaseConfig, InMemoryStorage, RestCountriesClient, SeaOrmRepositoryProvider,
};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Country client setup failed: {0}")]
    Countries(#[from] CountryLookupError),
}

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup.
    pub auto_migrate: bool,
    /// Keep everything in memory instead of opening the database.
    pub ephemeral: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            ephemeral: false,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running API server.
///
/// ```rust,no_run
/// use countries_gateway::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub config: AppConfig,
    /// Address the API actually listens on (useful with port 0).
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let app_cfg = opts.config;

        info!("Starting Countries API gateway...");

        if app_cfg.uses_dev_secret() {
            warn!("Using the built-in development JWT secret; set JWT_SECRET in production");
        }

        let prometheus_handle = prometheus_handle();
        let jwt_config = JwtConfig::from(&app_cfg.security);
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            if opts.ephemeral {
                warn!("Ephemeral mode: users, keys and usage are kept in memory only");
                (Arc::new(InMemoryStorage::new()), None)
            } else {
                let db_config = DatabaseConfig::from(&app_cfg.database);
                info!("Database: {}", db_config.url);
                let db = init_database(&db_config).await?;

                if opts.auto_migrate {
                    info!("Running database migrations...");
                    Migrator::up(&db, None).await?;
                    info!("Migrations completed");
                }

                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            };

        // ── Upstream ───────────────────────────────────────────
        let directory: Arc<dyn CountryDirectory> =
            Arc::new(RestCountriesClient::new(&app_cfg.countries)?);
        info!("Country data upstream: {}", app_cfg.countries.base_url);

        // ── REST API ───────────────────────────────────────────
        let state = AppState::new(
            repos.clone(),
            directory,
            jwt_config,
            &app_cfg.gateway,
            prometheus_handle,
        );
        let api_router = create_api_router(state);

        let address = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let api_shutdown = shutdown.signal();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    ///
    /// In-flight requests get `server.shutdown_timeout` seconds to finish.
    pub async fn wait(self) {
        info!("Waiting for in-flight requests to complete...");

        match tokio::time::timeout(self.shutdown.timeout(), self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => warn!(
                "REST API did not stop within {}s, abandoning open connections",
                self.shutdown.timeout().as_secs()
            ),
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("Shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can be installed once per process; later starts
/// (tests, restarts) reuse it. `None` when another recorder got there first.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                None
            }
        })
        .clone()
}

/// Initialize tracing from the application config. Call once at startup.
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::Instrument;

use depot_store::SledStore;

use crate::config::DepotConfig;
use crate::connection;
use crate::error::ServerResult;

/// The broker process: owns the store handle for its lifetime and serves
/// it to every accepted connection.
pub struct Broker {
    config: DepotConfig,
    store: Arc<SledStore>,
}

impl Broker {
    /// Open the store named by `config` and build a broker around it.
    ///
    /// Taking the handle here is what gives the broker exclusive ownership;
    /// it is released only when the process exits.
    pub fn open(config: DepotConfig) -> ServerResult<Self> {
        let store = Arc::new(SledStore::open(&config.store_path)?);
        Ok(Self { config, store })
    }

    /// Build a broker around an already-open store handle. Used by tests
    /// to serve a temporary store.
    pub fn with_store(config: DepotConfig, store: Arc<SledStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    /// A second handle to the shared store.
    pub fn store(&self) -> Arc<SledStore> {
        Arc::clone(&self.store)
    }

    /// Bind the configured address and serve until the process dies.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn run(self, listener: TcpListener) -> ServerResult<()> {
        tracing::info!(
            addr = %listener.local_addr()?,
            store = %self.config.store_path.display(),
            "broker listening"
        );

        loop {
            let (stream, peer) = listener.accept().await?;
            let store = Arc::clone(&self.store);
            let idle = self.config.idle_timeout();
            let span = tracing::info_span!("conn", %peer);
            tokio::spawn(connection::handle(stream, store, idle).instrument(span));
        }
    }
}

//! Mode composition.
//!
//! The mode picks, once, how item operations are fulfilled: against the local
//! store through the instrumented gateway, or by forwarding to the peer.
//! Nothing here changes after startup.

use std::sync::Arc;

use taskboard_config::Settings;
use taskboard_metrics::Metrics;
use taskboard_proxy::RemoteClient;
use taskboard_store::{InstrumentedStore, Store};
use taskboard_types::{Error, ItemId, Mode, NOT_APPLICABLE, Record, Result, Status};

use crate::routes::RouteTable;

/// How item operations are fulfilled.
pub enum ItemsCapability {
    Local(InstrumentedStore),
    Delegated(RemoteClient),
}

impl ItemsCapability {
    pub async fn list(&self) -> Result<Vec<Record>> {
        match self {
            ItemsCapability::Local(store) => {
                let records = store.list().await?;
                store
                    .metrics()
                    .set_gauge("taskboard_items", &[], records.len() as f64);
                Ok(records)
            }
            ItemsCapability::Delegated(peer) => peer.list().await,
        }
    }

    /// New record id. A delegated create yields whatever id the peer reported.
    pub async fn create(&self, title: &str, description: &str) -> Result<Option<ItemId>> {
        match self {
            ItemsCapability::Local(store) => store.create(title, description).await.map(Some),
            ItemsCapability::Delegated(peer) => peer.create(title, description).await,
        }
    }

    pub async fn delete(&self, id: ItemId) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.delete(id).await.map(drop),
            ItemsCapability::Delegated(peer) => peer.delete(id).await,
        }
    }

    pub async fn set_status(&self, id: ItemId, status: &Status) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.set_status(id, status).await.map(drop),
            ItemsCapability::Delegated(peer) => peer.set_status(id, status.as_str()).await,
        }
    }

    pub async fn resolve(&self, id: ItemId) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.resolve(id).await.map(drop),
            ItemsCapability::Delegated(peer) => peer.resolve(id).await,
        }
    }

    pub async fn unresolve(&self, id: ItemId) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.unresolve(id).await.map(drop),
            ItemsCapability::Delegated(peer) => peer.unresolve(id).await,
        }
    }

    pub async fn set_position(&self, id: ItemId, position: i64) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.set_position(id, position).await.map(drop),
            ItemsCapability::Delegated(peer) => peer.set_position(id, position).await,
        }
    }

    pub async fn reorder(&self, moved: ItemId, target: ItemId) -> Result<()> {
        match self {
            ItemsCapability::Local(store) => store.reorder(moved, target).await,
            ItemsCapability::Delegated(peer) => peer.reorder(moved, target).await,
        }
    }

    /// Backend name for health output, `N/A` when delegated.
    #[must_use]
    pub fn database_type(&self) -> &'static str {
        match self {
            ItemsCapability::Local(store) => store.backend().as_str(),
            ItemsCapability::Delegated(_) => NOT_APPLICABLE,
        }
    }

    /// Peer address for health output, `N/A` when local.
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        match self {
            ItemsCapability::Local(_) => NOT_APPLICABLE,
            ItemsCapability::Delegated(peer) => peer.base_url(),
        }
    }

    #[must_use]
    pub fn peer(&self) -> Option<&RemoteClient> {
        match self {
            ItemsCapability::Local(_) => None,
            ItemsCapability::Delegated(peer) => Some(peer),
        }
    }

    pub async fn close(&self) {
        if let ItemsCapability::Local(store) = self {
            store.close().await;
        }
    }
}

/// Everything a mode decides at startup.
pub struct Composition {
    pub mode: Mode,
    pub items: ItemsCapability,
    pub routes: RouteTable,
    /// Present when `/metrics` has a listener of its own.
    pub metrics_routes: Option<RouteTable>,
}

impl Composition {
    /// Local-data composition over an already initialized store.
    pub fn local(
        mode: Mode,
        store: Arc<dyn Store>,
        metrics: Arc<Metrics>,
        separate_metrics_port: bool,
    ) -> Result<Self> {
        if !mode.serves_local_data() {
            return Err(Error::Configuration(format!(
                "mode {mode} does not serve local data"
            )));
        }
        Ok(Self::assemble(
            mode,
            ItemsCapability::Local(InstrumentedStore::new(store, metrics)),
            separate_metrics_port,
        ))
    }

    /// Forwarding composition for ui-proxy.
    #[must_use]
    pub fn delegated(peer: RemoteClient, separate_metrics_port: bool) -> Self {
        Self::assemble(
            Mode::UiProxy,
            ItemsCapability::Delegated(peer),
            separate_metrics_port,
        )
    }

    fn assemble(mode: Mode, items: ItemsCapability, separate_metrics_port: bool) -> Self {
        Self {
            mode,
            items,
            routes: RouteTable::for_mode(mode, !separate_metrics_port),
            metrics_routes: separate_metrics_port.then(RouteTable::metrics_only),
        }
    }
}

/// Build the composition for `settings`.
///
/// Local modes open and initialize the store; ui-proxy validates the peer
/// address. Any failure here is fatal to startup.
pub async fn compose(settings: &Settings, metrics: Arc<Metrics>) -> Result<Composition> {
    let separate_metrics_port = settings.metrics_port.is_some();
    if settings.mode.serves_local_data() {
        let store = taskboard_store::open(&settings.store)?;
        store.init().await?;
        tracing::info!(
            mode = %settings.mode,
            backend = %store.backend(),
            "Store initialized"
        );
        Composition::local(settings.mode, store, metrics, separate_metrics_port)
    } else {
        let address = settings.proxy.api_base_url.as_deref().ok_or_else(|| {
            Error::Configuration("ui-proxy mode requires API_BASE_URL".to_string())
        })?;
        let peer = RemoteClient::new(address, settings.proxy.timeout)?;
        tracing::info!(peer = peer.base_url(), "Forwarding item operations to peer");
        Ok(Composition::delegated(peer, separate_metrics_port))
    }
}

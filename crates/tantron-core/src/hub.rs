// ── Hub ──
//
// Lifecycle of one household: authentication, full refreshes, the state
// subscription that follows each refresh, and the periodic refresh task.
// Consumers read devices through the registry and write through entities.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tantron_api::{CloudClient, RawStateWrite, TokenCache, TransportConfig};

use crate::cloud::CloudApi;
use crate::config::{Credentials, HubConfig, SyncConfig};
use crate::convert::area_names;
use crate::diagnostics;
use crate::entity::{DeviceEntity, Entity, WeatherEntity, build_entities};
use crate::error::CoreError;
use crate::model::{Device, Gateway};
use crate::store::{DeviceRegistry, Record};
use crate::stream::DeviceStream;
use crate::sync::{SyncLoop, SyncPhase};

// ── UpdateStatus ────────────────────────────────────────────────────

/// Outcome of the most recent full refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// The last refresh failed because the cloud rejected our credentials.
    pub reauth_required: bool,
}

// ── Hub ─────────────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<HubInner>`. Does nothing until
/// [`initialize()`](Self::initialize) is called.
pub struct Hub<C: CloudApi = CloudClient> {
    inner: Arc<HubInner<C>>,
}

impl<C: CloudApi> Clone for Hub<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct HubInner<C> {
    cloud: Arc<C>,
    registry: Arc<DeviceRegistry>,
    household_id: String,
    refresh_interval: Duration,
    sync: SyncConfig,
    status: watch::Sender<UpdateStatus>,
    phase: Arc<watch::Sender<SyncPhase>>,
    cancel: CancellationToken,
    /// The running subscription. Locked for the whole of a refresh so that
    /// refreshes never interleave.
    subscription: Mutex<Option<Subscription>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    areas_loaded: AtomicBool,
    initialized: AtomicBool,
    weather: WeatherEntity<C>,
}

struct Subscription {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Hub<CloudClient> {
    /// Build a cloud client from `config` and authenticate it.
    pub async fn connect(config: HubConfig) -> Result<Self, CoreError> {
        Self::connect_with_cache(config, &TokenCache::new()).await
    }

    /// Like [`connect`](Self::connect), reusing tokens from `cache`.
    pub async fn connect_with_cache(config: HubConfig, cache: &TokenCache) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_request_timeout(config.timeout);
        let client = match config.base_url {
            Some(ref url) => CloudClient::new(url.clone(), &transport)?,
            None => CloudClient::production(&transport)?,
        }
        .with_household(config.household_id.clone());

        let client = match config.credentials {
            Credentials::Token(ref token) => client.with_token(token.clone()),
            Credentials::Password {
                ref phone,
                ref password,
            } => {
                client.login(phone, password, cache).await?;
                client
            }
        };
        info!(household = %config.household_id, "authenticated with Tantron cloud");
        Ok(Self::new(client, &config))
    }
}

impl<C: CloudApi> Hub<C> {
    /// Create a hub over an already-authenticated cloud.
    pub fn new(cloud: C, config: &HubConfig) -> Self {
        let cloud = Arc::new(cloud);
        let (status, _) = watch::channel(UpdateStatus::default());
        let (phase, _) = watch::channel(SyncPhase::Stopped);

        Self {
            inner: Arc::new(HubInner {
                weather: WeatherEntity::new(Arc::clone(&cloud)),
                cloud,
                registry: Arc::new(DeviceRegistry::new()),
                household_id: config.household_id.clone(),
                refresh_interval: config.refresh_interval,
                sync: config.sync,
                status,
                phase: Arc::new(phase),
                cancel: CancellationToken::new(),
                subscription: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
                areas_loaded: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn cloud(&self) -> &C {
        &self.inner.cloud
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.inner.registry
    }

    pub fn weather(&self) -> &WeatherEntity<C> {
        &self.inner.weather
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load the household and start synchronizing.
    ///
    /// Performs the first full refresh (which starts the state
    /// subscription) and spawns the periodic refresh task.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        self.refresh().await?;

        if !self.inner.initialized.swap(true, Ordering::SeqCst)
            && !self.inner.refresh_interval.is_zero()
        {
            let hub = self.clone();
            let interval = self.inner.refresh_interval;
            let cancel = self.inner.cancel.child_token();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(hub, interval, cancel)));
        }
        info!(
            devices = self.inner.registry.snapshot().devices.len(),
            "hub initialized"
        );
        Ok(())
    }

    /// Reload gateway, areas and devices, then restart the subscription.
    ///
    /// On failure the registry and the running subscription are left as
    /// they were and the error is recorded in [`update_status`](Self::update_status).
    pub async fn refresh(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        let mut subscription = self.inner.subscription.lock().await;

        // A fetch stuck on the network must not hold the subscription past shutdown.
        let fetched = tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => return Err(CoreError::ShutDown),
            fetched = self.fetch_household() => fetched,
        };
        let (gateway, areas, devices) = match fetched {
            Ok(loaded) => loaded,
            Err(e) => {
                self.inner.status.send_modify(|s| {
                    s.last_error = Some(e.to_string());
                    s.reauth_required = e.requires_reauth();
                });
                return Err(e);
            }
        };
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        // The old loop must be gone before the registry changes generation.
        if let Some(old) = subscription.take() {
            old.cancel.cancel();
            let _ = old.handle.await;
        }

        let areas_reloaded = areas.is_some();
        let count = devices.len();
        let generation = self.inner.registry.replace_all(devices, areas, gateway);
        if areas_reloaded {
            self.inner.areas_loaded.store(true, Ordering::SeqCst);
        }

        let cancel = self.inner.cancel.child_token();
        let sync = SyncLoop::new(
            Arc::clone(&self.inner.cloud),
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.phase),
            self.inner.sync,
        );
        let handle = tokio::spawn(sync.run(generation, cancel.clone()));
        *subscription = Some(Subscription { cancel, handle });

        self.inner.status.send_replace(UpdateStatus {
            last_success: Some(Utc::now()),
            last_error: None,
            reauth_required: false,
        });
        debug!(generation, devices = count, "full refresh applied");
        Ok(())
    }

    async fn fetch_household(
        &self,
    ) -> Result<(Gateway, Option<crate::model::AreaMap>, Vec<Device>), CoreError> {
        let cloud = &self.inner.cloud;
        let gateway = Gateway::from(cloud.fetch_gateway().await?);
        let areas = if self.inner.areas_loaded.load(Ordering::SeqCst) {
            None
        } else {
            Some(area_names(&cloud.fetch_areas().await?))
        };
        let devices = cloud
            .fetch_devices()
            .await?
            .into_iter()
            .map(Device::from)
            .collect();
        Ok((gateway, areas, devices))
    }

    /// Stop every background task and drop all state.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        if let Some(sub) = self.inner.subscription.lock().await.take() {
            let _ = sub.handle.await;
        }
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.registry.clear();
        self.inner.phase.send_replace(SyncPhase::Stopped);
        info!("hub shut down");
    }

    // ── Observation ─────────────────────────────────────────────────

    /// A device by id, or the gateway by its id.
    pub fn get_device(&self, id: &str) -> Option<Record> {
        self.inner.registry.lookup(id)
    }

    pub fn list_devices(&self) -> Vec<Arc<Device>> {
        self.inner
            .registry
            .snapshot()
            .devices
            .values()
            .cloned()
            .collect()
    }

    pub fn subscribe(&self) -> DeviceStream {
        self.inner.registry.subscribe()
    }

    pub fn update_status(&self) -> UpdateStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_update_status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.status.subscribe()
    }

    pub fn sync_phase(&self) -> SyncPhase {
        *self.inner.phase.borrow()
    }

    /// Entity adapters for the current registry contents.
    pub fn entities(&self) -> Vec<Entity> {
        build_entities(&self.inner.registry.snapshot())
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Write `values` to a device through the function codec.
    pub async fn write<K, V>(
        &self,
        id: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Result<usize, CoreError>
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let device = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_owned(),
            })?;
        DeviceEntity::new(device, None)
            .send(self.inner.cloud.as_ref(), values)
            .await
    }

    /// Relay a raw state write (`deviceConfigId`, `configVersion`,
    /// `masterId`, `cmd`) to the cloud without consulting the registry.
    pub async fn inject_command(&self, payload: Value) -> Result<(), CoreError> {
        if !payload.get("cmd").is_some_and(Value::is_array) {
            return Err(CoreError::ValidationFailed {
                message: "command payload needs a `cmd` array".into(),
            });
        }
        let write: RawStateWrite =
            serde_json::from_value(payload).map_err(|e| CoreError::ValidationFailed {
                message: e.to_string(),
            })?;
        debug!(connection = ?write.connection, commands = write.cmd.len(), "relaying raw state write");
        self.inner.cloud.send_raw_state(&write).await?;
        Ok(())
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Redacted dump of the hub for bug reports.
    pub fn diagnostics(&self) -> Value {
        let context = json!({
            "household": self.inner.household_id,
            "refresh_interval_secs": self.inner.refresh_interval.as_secs(),
            "sync_phase": self.sync_phase().to_string(),
            "update_status": self.update_status(),
        });
        diagnostics::registry_diagnostics(&self.inner.registry.snapshot(), context)
    }

    pub fn device_diagnostics(&self, id: &str) -> Option<Value> {
        self.inner
            .registry
            .get(id)
            .map(|d| diagnostics::device_diagnostics(&d))
    }
}

// ── Background tasks ────────────────────────────────────────────────

/// Full refresh every `interval`, until cancelled.
async fn refresh_task<C: CloudApi>(hub: Hub<C>, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = hub.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

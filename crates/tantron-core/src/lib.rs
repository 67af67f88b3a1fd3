//! Device-state synchronization between the Tantron cloud and local consumers.
//!
//! - **[`Hub`]**: Lifecycle of one household:
//!   [`initialize()`](Hub::initialize) runs the first full refresh, starts the
//!   state subscription and the periodic refresh task;
//!   [`shutdown()`](Hub::shutdown) stops everything and clears the registry.
//!
//! - **[`DeviceRegistry`]**: Copy-on-write snapshot of gateway, areas and
//!   devices behind a `tokio::sync::watch` channel. Full refreshes replace the
//!   device set; state deltas from the long-poll merge into it.
//!
//! - **[`DeviceStream`]**: Subscription handle vended by the registry.
//!
//! - **[`codec`]**: Reads typed function values and encodes writes into bus
//!   commands from each function's send metadata.
//!
//! - **[`entity`]**: Typed adapters (lights, curtains, climate, sensors,
//!   weather) over registry devices.

pub mod cloud;
pub mod codec;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod hub;
pub mod model;
pub mod store;
pub mod stream;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cloud::CloudApi;
pub use codec::{FunctionKey, FunctionState};
pub use config::{Credentials, HubConfig, SyncConfig};
pub use entity::{Entity, EntitySummary, build_entities};
pub use error::CoreError;
pub use hub::{Hub, UpdateStatus};
pub use model::{AreaMap, Device, DeviceId, Gateway, OnlineState};
pub use store::{DeviceRegistry, Record, RegistrySnapshot};
pub use stream::DeviceStream;
pub use sync::SyncPhase;

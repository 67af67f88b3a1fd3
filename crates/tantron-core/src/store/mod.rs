// ── Registry storage ──

mod registry;

pub use registry::{DeviceRegistry, Record, RegistrySnapshot};

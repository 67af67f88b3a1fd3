// Device and state endpoints
//
// Gateway, area and device listings are household-scoped queries. State is
// read through a blocking long-poll and written one device at a time.

use serde::de::IgnoredAny;
use serde_json::Value;
use tracing::{debug, trace};

use crate::client::{CloudClient, Deadline};
use crate::error::Error;
use crate::models::{
    Command, Connection, DeviceListPayload, Floor, Gateway, LocationPayload, RawDevice,
    RawStateWrite, StateDelta, StateWrite,
};

/// Page size for the device listing. Households never get near it.
const DEVICE_PAGE_SIZE: u32 = 1000;

/// Decode long-poll entries, dropping the ones that do not fit `StateDelta`.
pub(crate) fn decode_deltas(entries: Vec<Value>) -> Vec<StateDelta> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<StateDelta>(entry) {
            Ok(delta) => Some(delta),
            Err(e) => {
                trace!(error = %e, "skipping undecodable state delta");
                None
            }
        })
        .collect()
}

/// Optional filters for [`CloudClient::get_devices`].
#[derive(Debug, Clone, Default)]
pub struct DeviceQuery {
    pub device_type: Option<String>,
    pub area: Option<String>,
}

impl CloudClient {
    fn household_query(&self) -> Vec<(&'static str, String)> {
        vec![(
            "householdId",
            self.household_id().unwrap_or_default().to_owned(),
        )]
    }

    /// Fetch the household's gateway.
    pub async fn get_gateway(&self) -> Result<Gateway, Error> {
        self.get("device-service/normal/gateway", &self.household_query())
            .await
    }

    /// Fetch the household's floors and their areas.
    pub async fn get_areas(&self) -> Result<Vec<Floor>, Error> {
        let payload: Option<LocationPayload> = self
            .get("device-service/normal/device/location", &self.household_query())
            .await?;
        Ok(payload.unwrap_or_default().floor_list)
    }

    /// List devices, optionally filtered by type and area.
    pub async fn get_devices(&self, filter: &DeviceQuery) -> Result<Vec<RawDevice>, Error> {
        let mut query = self.household_query();
        query.push(("pageNum", "1".to_owned()));
        query.push(("pageSize", DEVICE_PAGE_SIZE.to_string()));
        if let Some(ref device_type) = filter.device_type {
            query.push(("type", device_type.clone()));
        }
        if let Some(ref area) = filter.area {
            query.push(("area", area.clone()));
        }

        let data: Value = self.get("device-service/normal/device/list", &query).await?;
        if !data.is_object() {
            return Ok(Vec::new());
        }
        let payload: DeviceListPayload =
            serde_json::from_value(data).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            })?;
        Ok(payload.list)
    }

    /// Block until the cloud reports state for any of `connections`.
    ///
    /// No client-side timeout is applied: the server holds the request open
    /// until something changes or its own deadline passes.
    ///
    /// Entries are decoded one by one; an entry that does not decode is
    /// skipped without affecting the rest of the batch.
    pub async fn get_state(&self, connections: &[Connection]) -> Result<Vec<StateDelta>, Error> {
        let entries: Option<Vec<Value>> = self
            .post(
                "state-service/shadow/device/state/block",
                &connections,
                Deadline::Unbounded,
            )
            .await?;
        Ok(decode_deltas(entries.unwrap_or_default()))
    }

    /// Write encoded commands to one device.
    pub async fn put_state(&self, connection: &Connection, commands: &[Command]) -> Result<(), Error> {
        debug!(
            device = %connection.device_config_id,
            commands = commands.len(),
            "writing device state"
        );
        let _: Option<IgnoredAny> = self
            .put(
                "device-service/normal/device/state",
                &StateWrite {
                    cmd: commands,
                    connection,
                },
            )
            .await?;
        Ok(())
    }

    /// Relay a state write exactly as supplied.
    pub async fn put_raw_state(&self, write: &RawStateWrite) -> Result<(), Error> {
        let _: Option<IgnoredAny> = self
            .put("device-service/normal/device/state", write)
            .await?;
        Ok(())
    }
}

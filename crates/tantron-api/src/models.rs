// Tantron cloud wire types
//
// Every endpoint wraps its payload in `{ code, message, data }`. The cloud is
// loose about scalar types: ids arrive as strings or numbers depending on the
// service, and function values may be numbers or booleans. The `lenient`
// helpers normalise those at the boundary so the rest of the workspace only
// ever sees strings for ids and values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function type key → current value, as reported by the cloud.
pub type FunctionValues = BTreeMap<String, String>;

// ── Household ────────────────────────────────────────────────────────

/// One entry from `user-service/normal/household/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdInfo {
    #[serde(deserialize_with = "lenient::string")]
    pub household_id: String,
    #[serde(default)]
    pub household_name: Option<String>,
    #[serde(default)]
    pub gateway_bound: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Household location from `hinge-service/normal/court/household/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat", deserialize_with = "lenient::float")]
    pub latitude: f64,
    #[serde(rename = "lon", deserialize_with = "lenient::float")]
    pub longitude: f64,
}

// ── Gateway ──────────────────────────────────────────────────────────

/// The household's gateway from `device-service/normal/gateway`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_no: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
    /// 0 = offline, 1 = online, anything else is unknown.
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub online_state: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Areas ────────────────────────────────────────────────────────────

/// A floor from the `floorList` of `device-service/normal/device/location`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub area_list: Vec<Area>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Area {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LocationPayload {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub floor_list: Vec<Floor>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// A device from `device-service/normal/device/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub master_id: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub config_version: i64,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub area: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub function_list: Vec<FunctionDescriptor>,
    #[serde(default, deserialize_with = "lenient::values")]
    pub function_values: Option<FunctionValues>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeviceListPayload {
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub list: Vec<RawDevice>,
}

/// Describes one readable/writable function of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    /// The function type key, e.g. `switch` or `targetTemp`.
    #[serde(rename = "type")]
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Bus encodings for writes. Only the first entry is ever used.
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub send_list: Vec<SendInfo>,
}

/// Bus-level encoding for a function write. Fields are relayed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInfo {
    #[serde(default)]
    pub data_type: Value,
    #[serde(default)]
    pub data_length: Value,
    #[serde(default)]
    pub addr: Value,
    #[serde(default)]
    pub protocol_type: Value,
    #[serde(default)]
    pub sleep: Value,
}

// ── State ────────────────────────────────────────────────────────────

/// Identifies a device in state reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(deserialize_with = "lenient::string")]
    pub device_config_id: String,
    #[serde(deserialize_with = "lenient::int")]
    pub config_version: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub master_id: String,
    /// Last state version seen for this device. Unknown until the first delta.
    #[serde(default, deserialize_with = "lenient::int")]
    pub version: i64,
}

/// One entry returned by the state long-poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub device_config_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub version: Option<i64>,
    /// `None` means the device became unavailable.
    #[serde(default, deserialize_with = "lenient::values")]
    pub function: Option<FunctionValues>,
}

/// A single encoded write command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub data_type: Value,
    pub data_length: Value,
    pub addr: Value,
    pub protocol_type: Value,
    pub value: String,
    pub sleep: Value,
    #[serde(rename = "type")]
    pub key: String,
}

impl Command {
    /// Encode `value` for function `key` using its bus encoding.
    pub fn new(key: impl Into<String>, value: impl Into<String>, send: &SendInfo) -> Self {
        Self {
            data_type: send.data_type.clone(),
            data_length: send.data_length.clone(),
            addr: send.addr.clone(),
            protocol_type: send.protocol_type.clone(),
            value: value.into(),
            sleep: send.sleep.clone(),
            key: key.into(),
        }
    }
}

/// Body of `PUT device-service/normal/device/state`.
#[derive(Debug, Serialize)]
pub(crate) struct StateWrite<'a> {
    pub cmd: &'a [Command],
    #[serde(flatten)]
    pub connection: &'a Connection,
}

/// An unvalidated state write: arbitrary connection fields plus `cmd`.
///
/// Used to relay commands the function model can't express (scene triggers
/// and similar) exactly as supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStateWrite {
    pub cmd: Vec<Value>,
    #[serde(flatten)]
    pub connection: Map<String, Value>,
}

// ── Weather ──────────────────────────────────────────────────────────

/// Weather endpoint selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherPeriod {
    Now,
    Hourly,
    Daily,
}

impl WeatherPeriod {
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Hourly => "24hour",
            Self::Daily => "7day",
        }
    }
}

/// Payload of `common-service/external/weather/{period}`.
///
/// Exactly one of `now`, `hourly`, `daily` is populated depending on period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    #[serde(default)]
    pub now: Option<WeatherNow>,
    #[serde(default)]
    pub hourly: Option<Vec<HourlyForecast>>,
    #[serde(default)]
    pub daily: Option<Vec<DailyForecast>>,
    /// Seconds the forecast stays valid.
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub expire_time: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherNow {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub feels_like: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind360: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind_speed: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub humidity: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pressure: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub vis: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cloud: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dew: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    #[serde(default)]
    pub fx_time: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind360: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind_speed: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub humidity: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub precip: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pop: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pressure: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cloud: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub dew: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    #[serde(default)]
    pub fx_date: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temp_max: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temp_min: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub icon_day: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind360_day: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub wind_speed_day: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub precip: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub uv_index: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub humidity: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pressure: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cloud: Option<String>,
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginPayload {
    pub access_token: String,
}

// ── Lenient scalar decoding ──────────────────────────────────────────

mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::FunctionValues;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    impl Scalar {
        fn into_string(self) -> String {
            match self {
                Self::Str(s) => s,
                Self::Int(i) => i.to_string(),
                Self::Float(f) => f.to_string(),
                Self::Bool(b) => b.to_string(),
            }
        }

        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        fn as_i64(&self) -> Option<i64> {
            match self {
                Self::Str(s) => s.trim().parse().ok(),
                Self::Int(i) => Some(*i),
                Self::Float(f) if f.fract().abs() < f64::EPSILON => Some(*f as i64),
                Self::Float(_) | Self::Bool(_) => None,
            }
        }

        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        fn as_f64(&self) -> Option<f64> {
            match self {
                Self::Str(s) => s.trim().parse().ok(),
                Self::Int(i) => Some(*i as f64),
                Self::Float(f) => Some(*f),
                Self::Bool(_) => None,
            }
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Scalar::deserialize(d).map(Scalar::into_string)
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_string))
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let scalar = Option::<Scalar>::deserialize(d)?;
        match scalar {
            None => Ok(0),
            Some(s) => s
                .as_i64()
                .ok_or_else(|| D::Error::custom("expected an integer")),
        }
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Option::<Scalar>::deserialize(d)?.and_then(|s| s.as_i64()))
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Scalar::deserialize(d)?
            .as_f64()
            .ok_or_else(|| D::Error::custom("expected a number"))
    }

    /// A function value map; entries with `null` values are dropped.
    pub fn values<'de, D: Deserializer<'de>>(d: D) -> Result<Option<FunctionValues>, D::Error> {
        let raw = Option::<std::collections::BTreeMap<String, Option<Scalar>>>::deserialize(d)?;
        Ok(raw.map(|map| {
            map.into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v.into_string())))
                .collect()
        }))
    }

    pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }
}

// tantron-api: Async Rust client for the Tantron smart-home cloud API

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod household;
pub mod models;
pub mod transport;

pub use auth::{TokenCache, password_digest};
pub use client::{BASE_URL, CloudClient, HEADER_TOKEN, USER_AGENT};
pub use devices::DeviceQuery;
pub use error::Error;
pub use models::{
    Area, Command, Connection, Coordinates, DailyForecast, Floor, FunctionDescriptor,
    FunctionValues, Gateway, HourlyForecast, HouseholdInfo, RawDevice, RawStateWrite, SendInfo,
    StateDelta, WeatherNow, WeatherPeriod, WeatherReport,
};
pub use transport::TransportConfig;

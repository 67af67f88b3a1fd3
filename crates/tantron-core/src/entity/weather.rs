// ── Weather ──
//
// Household weather from the cloud's weather proxy. Current conditions are
// fetched on demand; hourly and daily forecasts are cached until the
// `expireTime` the cloud attaches to them. Household coordinates are looked
// up once, on first use.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error};

use tantron_api::{Coordinates, DailyForecast, HourlyForecast, WeatherNow, WeatherPeriod};

use crate::cloud::CloudApi;
use crate::codec::parse;
use crate::error::CoreError;

// ── Conditions ──────────────────────────────────────────────────────

/// Weather condition derived from a forecast icon code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Condition {
    #[strum(serialize = "sunny")]
    #[serde(rename = "sunny")]
    Sunny,
    #[strum(serialize = "clear-night")]
    #[serde(rename = "clear-night")]
    ClearNight,
    #[strum(serialize = "partlycloudy")]
    #[serde(rename = "partlycloudy")]
    PartlyCloudy,
    #[strum(serialize = "cloudy")]
    #[serde(rename = "cloudy")]
    Cloudy,
    #[strum(serialize = "rainy")]
    #[serde(rename = "rainy")]
    Rainy,
    #[strum(serialize = "pouring")]
    #[serde(rename = "pouring")]
    Pouring,
    #[strum(serialize = "lightning-rainy")]
    #[serde(rename = "lightning-rainy")]
    LightningRainy,
    #[strum(serialize = "hail")]
    #[serde(rename = "hail")]
    Hail,
    #[strum(serialize = "snowy")]
    #[serde(rename = "snowy")]
    Snowy,
    #[strum(serialize = "snowy-rainy")]
    #[serde(rename = "snowy-rainy")]
    SnowyRainy,
    #[strum(serialize = "fog")]
    #[serde(rename = "fog")]
    Fog,
    #[strum(serialize = "exceptional")]
    #[serde(rename = "exceptional")]
    Exceptional,
}

impl Condition {
    /// Map an icon code; unknown or missing codes are `Exceptional`.
    pub fn from_icon(icon: Option<&str>) -> Self {
        let Some(code) = icon.and_then(parse::<u16>) else {
            return Self::Exceptional;
        };
        match code {
            100 => Self::Sunny,
            101..=103 | 151..=153 => Self::PartlyCloudy,
            104 => Self::Cloudy,
            150 => Self::ClearNight,
            302 | 303 => Self::LightningRainy,
            304 => Self::Hail,
            307 | 308 | 310..=312 | 316..=318 | 351 => Self::Pouring,
            300 | 301 | 305 | 306 | 309 | 313..=315 | 350 | 399 | 407..=409 | 457 | 499 => {
                Self::Rainy
            }
            400..=403 | 410 => Self::Snowy,
            404..=406 | 456 => Self::SnowyRainy,
            500..=504 | 507..=515 => Self::Fog,
            _ => Self::Exceptional,
        }
    }
}

// ── Readings ────────────────────────────────────────────────────────

/// Current conditions. Units: °C, km/h, hPa, km.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub condition: Condition,
    pub wind_bearing: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub cloud_coverage: Option<i64>,
    pub dew_point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyEntry {
    pub datetime: String,
    pub temperature: Option<f64>,
    pub condition: Condition,
    pub wind_bearing: Option<f64>,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub precipitation_probability: Option<i64>,
    pub pressure: Option<f64>,
    pub cloud_coverage: Option<i64>,
    pub dew_point: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyEntry {
    pub datetime: String,
    pub temperature: Option<f64>,
    pub templow: Option<f64>,
    pub condition: Condition,
    pub wind_bearing: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub uv_index: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_coverage: Option<i64>,
}

fn num<T: std::str::FromStr>(raw: Option<&String>) -> Option<T> {
    raw.and_then(|s| parse(s))
}

impl From<&WeatherNow> for WeatherSnapshot {
    fn from(now: &WeatherNow) -> Self {
        Self {
            temperature: num(now.temp.as_ref()),
            apparent_temperature: num(now.feels_like.as_ref()),
            condition: Condition::from_icon(now.icon.as_deref()),
            wind_bearing: num(now.wind360.as_ref()),
            wind_speed: num(now.wind_speed.as_ref()),
            humidity: num(now.humidity.as_ref()),
            pressure: num(now.pressure.as_ref()),
            visibility: num(now.vis.as_ref()),
            cloud_coverage: num(now.cloud.as_ref()),
            dew_point: num(now.dew.as_ref()),
        }
    }
}

impl From<&HourlyForecast> for HourlyEntry {
    fn from(item: &HourlyForecast) -> Self {
        Self {
            datetime: item.fx_time.clone(),
            temperature: num(item.temp.as_ref()),
            condition: Condition::from_icon(item.icon.as_deref()),
            wind_bearing: num(item.wind360.as_ref()),
            wind_speed: num(item.wind_speed.as_ref()),
            humidity: num(item.humidity.as_ref()),
            precipitation: num(item.precip.as_ref()),
            precipitation_probability: num(item.pop.as_ref()),
            pressure: num(item.pressure.as_ref()),
            cloud_coverage: num(item.cloud.as_ref()),
            dew_point: num(item.dew.as_ref()),
        }
    }
}

impl From<&DailyForecast> for DailyEntry {
    fn from(item: &DailyForecast) -> Self {
        Self {
            datetime: item.fx_date.clone(),
            temperature: num(item.temp_max.as_ref()),
            templow: num(item.temp_min.as_ref()),
            condition: Condition::from_icon(item.icon_day.as_deref()),
            wind_bearing: num(item.wind360_day.as_ref()),
            wind_speed: num(item.wind_speed_day.as_ref()),
            precipitation: num(item.precip.as_ref()),
            uv_index: num(item.uv_index.as_ref()),
            humidity: num(item.humidity.as_ref()),
            pressure: num(item.pressure.as_ref()),
            cloud_coverage: num(item.cloud.as_ref()),
        }
    }
}

// ── Entity ──────────────────────────────────────────────────────────

struct Cached<T> {
    entries: Vec<T>,
    expires_at: Option<Instant>,
}

impl<T: Clone> Cached<T> {
    fn fresh(&self, now: Instant) -> Option<Vec<T>> {
        self.expires_at
            .filter(|at| *at > now)
            .map(|_| self.entries.clone())
    }

    fn store(&mut self, entries: Vec<T>, expire_secs: Option<i64>, now: Instant) {
        let ttl = Duration::from_secs(expire_secs.and_then(|s| u64::try_from(s).ok()).unwrap_or(0));
        self.entries = entries;
        self.expires_at = Some(now + ttl);
    }

    fn invalidate(&mut self) {
        self.expires_at = None;
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            expires_at: None,
        }
    }
}

#[derive(Default)]
struct WeatherCache {
    coordinates: Option<Coordinates>,
    hourly: Cached<HourlyEntry>,
    daily: Cached<DailyEntry>,
}

/// Weather for the household the cloud client is bound to.
pub struct WeatherEntity<C> {
    cloud: Arc<C>,
    cache: Mutex<WeatherCache>,
}

impl<C: CloudApi> WeatherEntity<C> {
    pub const UNIQUE_ID: &'static str = "weather";
    /// How often hosts should poll current conditions.
    pub const SCAN_INTERVAL: Duration = Duration::from_secs(20 * 60);

    pub fn new(cloud: Arc<C>) -> Self {
        Self {
            cloud,
            cache: Mutex::new(WeatherCache::default()),
        }
    }

    /// Use fixed coordinates instead of the household's.
    pub fn with_coordinates(cloud: Arc<C>, at: Coordinates) -> Self {
        Self {
            cloud,
            cache: Mutex::new(WeatherCache {
                coordinates: Some(at),
                ..WeatherCache::default()
            }),
        }
    }

    async fn coordinates(&self, cache: &mut WeatherCache) -> Result<Coordinates, CoreError> {
        if let Some(at) = cache.coordinates {
            return Ok(at);
        }
        let at = self.cloud.fetch_coordinates().await?;
        debug!(latitude = at.latitude, longitude = at.longitude, "household coordinates resolved");
        cache.coordinates = Some(at);
        cache.hourly.invalidate();
        cache.daily.invalidate();
        Ok(at)
    }

    /// Current conditions. `None` when the cloud returned no reading.
    pub async fn current(&self) -> Result<Option<WeatherSnapshot>, CoreError> {
        let mut cache = self.cache.lock().await;
        let at = self.coordinates(&mut cache).await?;
        drop(cache);

        let report = self.cloud.fetch_weather(WeatherPeriod::Now, at).await?;
        let Some(now) = report.now else {
            error!("weather response has no current conditions");
            return Ok(None);
        };
        Ok(Some(WeatherSnapshot::from(&now)))
    }

    pub async fn forecast_hourly(&self) -> Result<Vec<HourlyEntry>, CoreError> {
        let mut cache = self.cache.lock().await;
        let at = self.coordinates(&mut cache).await?;
        if let Some(entries) = cache.hourly.fresh(Instant::now()) {
            return Ok(entries);
        }

        let report = self.cloud.fetch_weather(WeatherPeriod::Hourly, at).await?;
        let Some(items) = report.hourly else {
            error!("weather response has no hourly forecast");
            return Ok(Vec::new());
        };
        let entries: Vec<HourlyEntry> = items.iter().map(HourlyEntry::from).collect();
        cache.hourly.store(entries.clone(), report.expire_time, Instant::now());
        Ok(entries)
    }

    pub async fn forecast_daily(&self) -> Result<Vec<DailyEntry>, CoreError> {
        let mut cache = self.cache.lock().await;
        let at = self.coordinates(&mut cache).await?;
        if let Some(entries) = cache.daily.fresh(Instant::now()) {
            return Ok(entries);
        }

        let report = self.cloud.fetch_weather(WeatherPeriod::Daily, at).await?;
        let Some(items) = report.daily else {
            error!("weather response has no daily forecast");
            return Ok(Vec::new());
        };
        let entries: Vec<DailyEntry> = items.iter().map(DailyEntry::from).collect();
        cache.daily.store(entries.clone(), report.expire_time, Instant::now());
        Ok(entries)
    }
}

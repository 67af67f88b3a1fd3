//! Weather at the household location.

use tabled::Tabled;
use tantron_core::Hub;
use tantron_core::entity::{DailyEntry, HourlyEntry, WeatherSnapshot};

use crate::cli::{GlobalOpts, WeatherArgs, WeatherPeriodArg};
use crate::error::CliError;
use crate::output::{self, or_dash};

#[derive(Tabled)]
struct HourlyRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "Temp °C")]
    temperature: String,
    #[tabled(rename = "Humidity %")]
    humidity: String,
    #[tabled(rename = "Wind km/h")]
    wind: String,
    #[tabled(rename = "Rain %")]
    precipitation_probability: String,
}

impl From<&HourlyEntry> for HourlyRow {
    fn from(h: &HourlyEntry) -> Self {
        Self {
            time: h.datetime.clone(),
            condition: h.condition.to_string(),
            temperature: or_dash(h.temperature),
            humidity: or_dash(h.humidity),
            wind: or_dash(h.wind_speed),
            precipitation_probability: or_dash(h.precipitation_probability),
        }
    }
}

#[derive(Tabled)]
struct DailyRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "High °C")]
    high: String,
    #[tabled(rename = "Low °C")]
    low: String,
    #[tabled(rename = "Rain mm")]
    precipitation: String,
    #[tabled(rename = "UV")]
    uv_index: String,
}

impl From<&DailyEntry> for DailyRow {
    fn from(d: &DailyEntry) -> Self {
        Self {
            date: d.datetime.clone(),
            condition: d.condition.to_string(),
            high: or_dash(d.temperature),
            low: or_dash(d.templow),
            precipitation: or_dash(d.precipitation),
            uv_index: or_dash(d.uv_index),
        }
    }
}

fn now_detail(w: &WeatherSnapshot) -> String {
    [
        format!("Condition:   {}", w.condition),
        format!("Temperature: {} °C", or_dash(w.temperature)),
        format!("Feels like:  {} °C", or_dash(w.apparent_temperature)),
        format!("Humidity:    {} %", or_dash(w.humidity)),
        format!("Wind:        {} km/h at {}°", or_dash(w.wind_speed), or_dash(w.wind_bearing)),
        format!("Pressure:    {} hPa", or_dash(w.pressure)),
        format!("Visibility:  {} km", or_dash(w.visibility)),
        format!("Clouds:      {} %", or_dash(w.cloud_coverage)),
        format!("Dew point:   {} °C", or_dash(w.dew_point)),
    ]
    .join("\n")
}

pub async fn handle(hub: &Hub, args: &WeatherArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let weather = hub.weather();
    let out = match args.period {
        WeatherPeriodArg::Now => {
            let Some(now) = weather.current().await? else {
                return Err(CliError::NotFound {
                    resource_type: "weather report".into(),
                    identifier: "now".into(),
                    list_command: "weather hourly".into(),
                });
            };
            output::render_single(&global.output, &now, now_detail, |w| w.condition.to_string())?
        }
        WeatherPeriodArg::Hourly => {
            let entries = weather.forecast_hourly().await?;
            output::render_list(
                &global.output,
                &entries,
                |h| HourlyRow::from(h),
                |h| h.datetime.clone(),
            )?
        }
        WeatherPeriodArg::Daily => {
            let entries = weather.forecast_daily().await?;
            output::render_list(
                &global.output,
                &entries,
                |d| DailyRow::from(d),
                |d| d.datetime.clone(),
            )?
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

// Household endpoints
//
// Household listing and details, plus the location and weather services
// that hang off a household.

use serde_json::Value;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::{Coordinates, HouseholdInfo, WeatherPeriod, WeatherReport};

impl CloudClient {
    /// List the households that have a gateway bound, in cloud order.
    pub async fn list_households(&self) -> Result<Vec<HouseholdInfo>, Error> {
        let data: Value = self.get("user-service/normal/household/list", &[]).await?;
        let Value::Array(items) = data else {
            return Ok(Vec::new());
        };

        let households = items
            .into_iter()
            .map(serde_json::from_value::<HouseholdInfo>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            })?;

        Ok(households
            .into_iter()
            .filter(|h| h.gateway_bound == Some(true))
            .collect())
    }

    /// Fetch the selected household's record.
    ///
    /// `detailed` switches to the detail endpoint, which includes rooms and
    /// members.
    pub async fn get_household(&self, detailed: bool) -> Result<Value, Error> {
        let id = self.require_household()?;
        let path = if detailed {
            format!("user-service/normal/household/detail/{id}")
        } else {
            format!("user-service/normal/household/change/household/{id}")
        };
        self.get(&path, &[]).await
    }

    /// The selected household's latitude and longitude.
    pub async fn get_household_coordinates(&self) -> Result<Coordinates, Error> {
        let id = self.require_household()?;
        self.get(&format!("hinge-service/normal/court/household/{id}"), &[])
            .await
    }

    /// Current conditions or forecast for a location.
    pub async fn get_weather(
        &self,
        period: WeatherPeriod,
        at: Coordinates,
    ) -> Result<WeatherReport, Error> {
        let report: Option<WeatherReport> = self
            .get(
                &format!("common-service/external/weather/{}", period.path_segment()),
                &[
                    ("lat", at.latitude.to_string()),
                    ("lon", at.longitude.to_string()),
                ],
            )
            .await?;
        Ok(report.unwrap_or_default())
    }
}

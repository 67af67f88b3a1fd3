// ── Cloud seam ──
//
// The hub, the subscription loop and the entity adapters talk to the cloud
// through `CloudApi` so they can run against a scripted fake in tests.

use std::future::Future;

use tantron_api::{
    CloudClient, Command, Connection, Coordinates, DeviceQuery, Error, Floor, Gateway, RawDevice,
    RawStateWrite, StateDelta, WeatherPeriod, WeatherReport,
};

/// Household-scoped cloud operations used by the core.
pub trait CloudApi: Send + Sync + 'static {
    fn fetch_gateway(&self) -> impl Future<Output = Result<Gateway, Error>> + Send;

    fn fetch_areas(&self) -> impl Future<Output = Result<Vec<Floor>, Error>> + Send;

    fn fetch_devices(&self) -> impl Future<Output = Result<Vec<RawDevice>, Error>> + Send;

    /// Long-poll for state changes of `connections`.
    fn fetch_state_block(
        &self,
        connections: &[Connection],
    ) -> impl Future<Output = Result<Vec<StateDelta>, Error>> + Send;

    fn send_state(
        &self,
        connection: &Connection,
        commands: &[Command],
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn send_raw_state(&self, write: &RawStateWrite)
    -> impl Future<Output = Result<(), Error>> + Send;

    fn fetch_coordinates(&self) -> impl Future<Output = Result<Coordinates, Error>> + Send;

    fn fetch_weather(
        &self,
        period: WeatherPeriod,
        at: Coordinates,
    ) -> impl Future<Output = Result<WeatherReport, Error>> + Send;
}

impl CloudApi for CloudClient {
    async fn fetch_gateway(&self) -> Result<Gateway, Error> {
        self.get_gateway().await
    }

    async fn fetch_areas(&self) -> Result<Vec<Floor>, Error> {
        self.get_areas().await
    }

    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, Error> {
        self.get_devices(&DeviceQuery::default()).await
    }

    async fn fetch_state_block(&self, connections: &[Connection]) -> Result<Vec<StateDelta>, Error> {
        self.get_state(connections).await
    }

    async fn send_state(&self, connection: &Connection, commands: &[Command]) -> Result<(), Error> {
        self.put_state(connection, commands).await
    }

    async fn send_raw_state(&self, write: &RawStateWrite) -> Result<(), Error> {
        self.put_raw_state(write).await
    }

    async fn fetch_coordinates(&self) -> Result<Coordinates, Error> {
        self.get_household_coordinates().await
    }

    async fn fetch_weather(
        &self,
        period: WeatherPeriod,
        at: Coordinates,
    ) -> Result<WeatherReport, Error> {
        self.get_weather(period, at).await
    }
}

mod clock;
mod eeprom;
mod heater;
mod host;
mod sensor;
mod web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}

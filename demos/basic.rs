use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wormly_http::{CallContext, HostApi, ScheduledDowntimeApi, SensorHttpApi, WormlyClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wormly_http=debug")),
        )
        .init();

    let host_id: i64 = std::env::var("WORMLY_HOST_ID")?.parse()?;
    let client = WormlyClient::from_env()?;
    let ctx = CallContext::new().with_timeout(Duration::from_secs(60));

    let Some(host) = client.find_host(&ctx, host_id).await? else {
        println!("host {host_id} does not exist");
        return Ok(());
    };
    println!("{} (enabled: {})", host.name, host.enabled);

    for sensor in client.list_sensor_http(&ctx, host.id).await? {
        println!("  sensor {} {} -> {}", sensor.id, sensor.nice_name, sensor.url);
    }

    for period in client.get_scheduled_downtime_periods(&ctx, host.id).await? {
        println!(
            "  downtime {} {}-{} {} {} {}",
            period.id, period.start, period.end, period.timezone, period.recurrence, period.on
        );
    }

    Ok(())
}

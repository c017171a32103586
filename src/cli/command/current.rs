//! Print the station's current conditions.

use anyhow::{anyhow, Result};

use crate::{
    api::WundergroundClient, cli::create_spinner, config::Config, model::CurrentConditions,
};

pub async fn current(config: &Config) -> Result<CurrentConditions> {
    let client = WundergroundClient::new(config)?;

    let bar = create_spinner("Fetching current conditions...".to_string());
    let conditions = client.fetch_current().await;
    bar.finish_and_clear();

    let conditions =
        conditions.ok_or_else(|| anyhow!("No current conditions for {}", client.station_id()))?;
    println!("{}", render(&conditions));

    Ok(conditions)
}

fn render(c: &CurrentConditions) -> String {
    let rows = [
        ("Temperature", c.temperature, "°C"),
        ("Humidity", c.humidity, "%"),
        ("Pressure", c.pressure, "hPa"),
        ("Wind speed", c.wind_speed, "km/h"),
        ("Wind direction", c.wind_direction, "°"),
        ("Precipitation", c.precipitation, "mm/h"),
        ("Solar radiation", c.solar_radiation, "W/m²"),
        ("UV index", c.uv_index, ""),
    ];

    let mut out = format!("{} at {}", c.station_id, c.timestamp.to_rfc3339());
    for (label, value, unit) in rows {
        let value = match value {
            Some(v) => format!("{v} {unit}").trim_end().to_string(),
            None => "-".to_string(),
        };
        out.push_str(&format!("\n  {label:<16} {value}"));
    }

    out
}

// -- Tests -------------------------------------------------------------------

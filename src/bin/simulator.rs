use clap::Parser;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::Duration;
use tokio::time;

/// Publishes synthetic UNS telemetry to exercise the connector.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MQTT Broker Host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// MQTT Broker Port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Delay between publish rounds in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Duration of run in seconds (0 for infinite)
    #[arg(long, default_value_t = 0)]
    duration: u64,
}

const TOPICS: &[&str] = &[
    "uns/man/munich/line1/cell2/press01/temperature",
    "uns/man/munich/line1/cell2/press01/vibration",
    "uns/man/munich/line1/cell2/press01/state",
];

#[derive(Serialize)]
struct TelemetryPayload {
    ts: String, // ISO 8601, whole seconds
    value: serde_json::Value,
    quality: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("Starting simulator with config: {:?}", args);

    // 1. Setup MQTT Client
    let client_id = format!("uns_simulator_{}", uuid::Uuid::new_v4());
    let mut mqttoptions = MqttOptions::new(client_id, &args.host, args.port);
    mqttoptions.set_keep_alive(Duration::from_secs(5));
    mqttoptions.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);

    // Spawn Event Loop in background to handle network traffic
    tokio::spawn(async move {
        while let Ok(_) = eventloop.poll().await {
            // Just drain the event loop
        }
    });

    // 2. Publish Loop
    let start_time = std::time::Instant::now();
    let mut interval = time::interval(Duration::from_millis(args.interval_ms));
    let mut total_sent: u64 = 0;

    loop {
        interval.tick().await;

        if args.duration > 0 && start_time.elapsed().as_secs() >= args.duration {
            println!("Configured duration {}s elapsed. Stopping.", args.duration);
            break;
        }

        let ts = now_rfc3339();

        for topic in TOPICS {
            let value = if topic.ends_with("/state") {
                // Enumerated machine state code
                serde_json::json!(rand::random::<u8>() % 4)
            } else {
                let v: f64 = 10.0 + rand::random::<f64>() * 80.0;
                serde_json::json!((v * 100.0).round() / 100.0)
            };

            let payload = TelemetryPayload {
                ts: ts.clone(),
                value,
                quality: "good",
            };
            let payload_json = serde_json::to_vec(&payload)?;

            if let Err(e) = client.publish(*topic, QoS::AtLeastOnce, false, payload_json).await {
                eprintln!("Failed to publish: {:?}", e);
            }
            total_sent += 1;
        }

        if total_sent % 60 == 0 {
            println!("Sent {} messages...", total_sent);
        }
    }

    println!("Simulator done. Total messages sent: {}", total_sent);
    Ok(())
}

fn now_rfc3339() -> String {
    let now = ::time::OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    now.format(&::time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

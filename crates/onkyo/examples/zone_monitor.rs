//! Watch zone state change against a simulated receiver.
//!
//! Builds a receiver on top of the scripted mock transport, then plays the
//! part of the receiver: answers queries, pushes a few unsolicited
//! updates, and prints every state change the main zone publishes.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=onkyo_eiscp=debug cargo run -p onkyo --example zone_monitor
//! ```

use std::sync::Arc;
use std::time::Duration;

use onkyo::{ReceiverBuilder, Response, Zone};
use onkyo_test_harness::{MockConnector, MockTransport};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mock = MockTransport::new();
    mock.set_model_name("TX-NR609(Ether)");
    mock.stub("system-power=query", Response::pair("system-power", "on"));
    mock.stub("zone2.power=query", Response::pair("power", "standby"));
    mock.stub("zone3.power=query", "");
    mock.stub("master-volume=query", Response::pair("master-volume", 32_i64));
    mock.stub("input-selector=query", Response::pair("input-selector", Response::pair("dvd", "BD/DVD")));
    mock.stub("audio-muting=query", Response::pair("audio-muting", "off"));
    mock.stub(
        "SLIQSTN",
        Response::Table(vec![
            ("dvd".into(), "BD/DVD".into()),
            ("fm".into(), "FM".into()),
            ("net".into(), "NET".into()),
        ]),
    );
    mock.stub("LMQSTN", Response::Tuple(vec!["stereo".into(), "direct".into()]));
    mock.stub("master-volume=20", Response::pair("master-volume", 20_i64));
    let connector = MockConnector::new(mock.clone());

    let receiver = ReceiverBuilder::new("192.168.1.40")
        .name("Living Room")
        .connector(Arc::new(connector.clone()))
        .build()
        .await?;
    println!(
        "{} ({}) zones: {:?}",
        receiver.name(),
        receiver.model_name().unwrap_or("unknown model"),
        receiver.zones().iter().map(|z| z.zone()).collect::<Vec<_>>()
    );

    let main = receiver
        .zone(Zone::Main)
        .ok_or_else(|| anyhow::anyhow!("receiver has no main zone"))?
        .clone();
    let mut changes = main.watch();
    let printer = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            println!(
                "main: power={} volume={:?} muted={:?} source={:?} sources={:?}",
                state.power, state.volume, state.muted, state.source, state.source_list
            );
        }
    });

    main.refresh_all().await;
    main.set_volume(0.25).await?;

    // What the receiver would push after its front panel is used.
    connector.push(Zone::Main, "audio-muting", "on");
    connector.push(Zone::Main, "input-selector", Response::pair("fm", "FM"));
    connector.push(Zone::Zone2, "power", "on");
    tokio::time::sleep(Duration::from_millis(200)).await;

    receiver.shutdown().await;
    printer.abort();
    println!("sent: {:?}", mock.sent_commands());
    Ok(())
}

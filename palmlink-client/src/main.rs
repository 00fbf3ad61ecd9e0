//! Headless reference client.
//!
//! Connects with a pairing code, starts screen sharing, and logs frame
//! statistics until interrupted. Exists to exercise the full pipeline
//! without a device UI: `palmlink-client <ip:port:token | wss://host:token>`.

use std::time::Duration;

use palmlink_core::{ConnectionInfo, SessionClient, StubDecoder, VideoFrame};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(code) = std::env::args().nth(1) else {
        eprintln!("usage: palmlink-client <pairing-code>");
        std::process::exit(2);
    };

    let info = match ConnectionInfo::parse(&code) {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "bad pairing code");
            std::process::exit(2);
        }
    };

    let device_name = format!("palmlink-cli/{}", env!("CARGO_PKG_VERSION"));
    let client = match SessionClient::connect(&info, &device_name, StubDecoder::new()).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "connection failed");
            std::process::exit(1);
        }
    };
    info!(phase = %client.phase(), "connected");

    if let Err(e) = client.start_screen_share().await {
        error!(error = %e, "could not start screen share");
    }

    let mut frames = client.frame_receiver();
    let stats = client.stats_receiver();
    let mut report = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    info!("session ended");
                    break;
                }
                match frames.borrow_and_update().clone() {
                    Some(VideoFrame::Jpeg(payload)) => {
                        info!(bytes = payload.len(), "jpeg frame");
                    }
                    Some(VideoFrame::Raster(image)) => {
                        info!(bytes = image.data.len(), width = image.width, height = image.height, "decoded frame");
                    }
                    None => {
                        info!("display cleared, session torn down");
                        break;
                    }
                }
            }
            _ = report.tick() => {
                let s = stats.borrow().clone();
                info!(fps = format!("{:.1}", s.fps), frames = s.total_frames, bytes = s.total_bytes, "stats");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, disconnecting");
                break;
            }
        }
    }

    client.disconnect().await;
}

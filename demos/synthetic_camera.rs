//! Synthetic camera feeding the relay
//!
//! Run with: cargo run --example synthetic_camera [PORT]
//!
//! Then open in a browser:
//!   http://localhost:8080/index.html                       channel list
//!   http://localhost:8080/?channel=rgb&quality=70&delay=40 color test pattern
//!   http://localhost:8080/?channel=thermal&delay=200       16-bit gray ramp, 5 fps
//!
//! Set RUST_LOG=mjpeg_relay=debug to watch clients come and go.

use std::time::{Duration, Instant};

use image::{DynamicImage, ImageBuffer, Luma};
use mjpeg_relay::{Frame, MjpegRelay, PixelFormat, RawFrame, RelayConfig};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAME_INTERVAL: Duration = Duration::from_millis(40);

fn rgb_pattern(tick: u32) -> Frame {
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            pixels.push((x.wrapping_add(tick) % 256) as u8);
            pixels.push((y.wrapping_add(tick / 2) % 256) as u8);
            pixels.push(((x + y) % 256) as u8);
        }
    }
    Frame::from(RawFrame::new(WIDTH, HEIGHT, PixelFormat::Rgb8, pixels))
}

fn thermal_ramp(tick: u32) -> Frame {
    let ramp = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, _| {
        Luma([((x * 200).wrapping_add(tick.wrapping_mul(64)) % u32::from(u16::MAX)) as u16])
    });
    Frame::from(DynamicImage::ImageLuma16(ramp))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mjpeg_relay=info")),
        )
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(8080);

    let relay = MjpegRelay::new();
    let config = RelayConfig::default()
        .default_channel("rgb")
        .max_quality(90)
        .header("X-Source", "synthetic");

    println!("Serving on http://localhost:{}/index.html (Ctrl+C to stop)", port);

    let started = Instant::now();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut tick: u32 = 0;
    let mut last_report = Instant::now();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let rgb = relay
            .broadcast(Some(&rgb_pattern(tick)), "rgb", "", port, &config)
            .await?;
        relay
            .broadcast(Some(&thermal_ramp(tick)), "thermal", "", port, &config)
            .await?;

        if last_report.elapsed() >= Duration::from_secs(5) {
            if let Some(stats) = relay.endpoint_stats("", port).await {
                println!(
                    "[{:>5.1}s] clients={} frames={} encodes={} sent={}B ({} bps)",
                    started.elapsed().as_secs_f64(),
                    rgb.clients.len(),
                    stats.frames_broadcast,
                    stats.encodes,
                    stats.bytes_sent,
                    stats.bitrate(),
                );
            }
            last_report = Instant::now();
        }
        tick = tick.wrapping_add(1);
    }

    relay.broadcast(None, "rgb", "", port, &config).await?;
    println!("Stopped");
    Ok(())
}

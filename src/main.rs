/*
 *  main.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

#[cfg(not(feature = "driver-sh1106"))]
compile_error!("moled requires the 'driver-sh1106' feature. Use --features driver-sh1106");

use anyhow::Context;
use env_logger::Env;
use log::info;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

use moled::config;
use moled::constants::DEFAULT_ROTATE_DEG;
use moled::currentsong::StatusArbiter;
use moled::display::Scroller;
use moled::display::drivers::sh1106::Sh1106Driver;
use moled::shairport::MetadataPipe;
use moled::state::{LineBuffer, TrackStore};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM, or SIGHUP and logs which one arrived.
async fn signal_handler() -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(
        Env::default().default_filter_or(cfg.log_level.as_deref().unwrap_or("info")),
    )
    .format_timestamp_secs()
    .init();

    info!(
        "{} v.{} built {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        BUILD_DATE
    );

    let mut display_cfg = cfg.display.clone().unwrap_or_default();
    if display_cfg.rotate_deg.is_none() {
        display_cfg.rotate_deg = Some(DEFAULT_ROTATE_DEG);
    }
    let (bus, address) = cfg.i2c();
    let driver = Sh1106Driver::new_i2c(&bus, address, &display_cfg)
        .with_context(|| format!("failed to bring up display on {bus}"))?;

    let tracks = TrackStore::new();
    let lines = LineBuffer::new();

    let (meta_stop_tx, meta_stop_rx) = mpsc::channel(1);
    let (status_stop_tx, status_stop_rx) = mpsc::channel(1);
    let (render_stop_tx, render_stop_rx) = mpsc::channel(1);

    let pipe = MetadataPipe::new(cfg.metadata_pipe(), tracks.clone());
    let meta_handle = tokio::spawn(pipe.ingest(meta_stop_rx));

    let arbiter = StatusArbiter::new(cfg.currentsong(), tracks.clone(), lines.clone());
    let status_handle = tokio::spawn(arbiter.run(status_stop_rx));

    let (step, frame, hold) = cfg.scroll_timing();
    let scroller = Scroller::new(driver, lines.clone()).with_timing(step, frame, hold);
    let render_handle = tokio::spawn(scroller.run(render_stop_rx));

    signal_handler().await?;

    info!("Main application exiting. Stopping worker loops.");
    let _ = meta_stop_tx.send(()).await;
    let _ = status_stop_tx.send(()).await;
    let _ = render_stop_tx.send(()).await;

    let _ = meta_handle.await;
    let _ = status_handle.await;
    // The renderer blanks the panel before it returns.
    let _ = render_handle.await;

    Ok(())
}

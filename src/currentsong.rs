/*
 *  currentsong.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Samples moOde's currentsong status file, decides which source is
 *  authoritative, and resolves the two display lines.
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

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::constants::{IDLE_PRIMARY, IDLE_SECONDARY, STATUS_TICK_MS};
use crate::state::{DisplayLines, LineBuffer, TrackStore};

/// Marker value of the `file` key while shairport-sync owns the output.
const AIRPLAY_MARKER: &str = "Airplay Active";

/// Which information source is authoritative this tick. Derived fresh
/// every tick, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    StreamActive,
    LocalActive,
}

/// Parse the line-oriented `key=value` status file into a map. Lines
/// without an `=` are skipped; later duplicates win.
pub fn parse_status(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Classify the active source. Rules are checked in order: a zero output
/// rate always means the player is asleep, regardless of other keys.
pub fn classify(status: &HashMap<String, String>) -> PlayerStatus {
    if status.get("outrate").is_some_and(|v| v.starts_with("0 bps")) {
        return PlayerStatus::Idle;
    }
    if status.get("file").is_some_and(|v| v == AIRPLAY_MARKER) {
        return PlayerStatus::StreamActive;
    }
    PlayerStatus::LocalActive
}

/// The source-arbitration loop.
pub struct StatusArbiter {
    path: PathBuf,
    tracks: TrackStore,
    lines: LineBuffer,
}

impl StatusArbiter {
    pub fn new(path: impl Into<PathBuf>, tracks: TrackStore, lines: LineBuffer) -> Self {
        StatusArbiter {
            path: path.into(),
            tracks,
            lines,
        }
    }

    /// Resolve the display lines for a parsed status map, or `None` when
    /// the local source is active but the file lacks artist/title keys
    /// (the tick is skipped and prior lines retained).
    ///
    /// Line convention: artist on the primary line, title on the
    /// secondary, for both the stream and local sources.
    pub async fn resolve(&self, status: &HashMap<String, String>) -> Option<DisplayLines> {
        match classify(status) {
            PlayerStatus::Idle => Some(DisplayLines::new(IDLE_PRIMARY, IDLE_SECONDARY)),
            PlayerStatus::StreamActive => {
                let track = self.tracks.get().await;
                Some(DisplayLines::new(track.artist, track.title))
            }
            PlayerStatus::LocalActive => {
                match (status.get("artist"), status.get("title")) {
                    (Some(artist), Some(title)) => {
                        Some(DisplayLines::new(artist.clone(), title.clone()))
                    }
                    _ => {
                        warn!("currentsong missing artist/title keys, skipping tick");
                        None
                    }
                }
            }
        }
    }

    /// One arbiter tick: read, classify, resolve, and publish. Any
    /// failure skips the tick; the line buffer keeps its prior value.
    pub async fn tick(&self) {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Cannot read {}: {e}", self.path.display());
                return;
            }
        };
        let status = parse_status(&text);
        if let Some(resolved) = self.resolve(&status).await {
            if self.lines.replace(resolved).await {
                debug!("Display lines updated");
            }
        }
    }

    /// Run the fixed-period arbiter until the stop channel fires.
    pub async fn run(self, mut stop: mpsc::Receiver<()>) {
        info!("Status arbiter starting on {}", self.path.display());
        let mut ticker = interval(Duration::from_millis(STATUS_TICK_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = stop.recv() => break,
            }
        }
        info!("Status arbiter stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TrackInfo;

    const LOCAL_STATUS: &str = "file=NAS/music/track.flac\n\
        artist=Artist X\n\
        album=Album Z\n\
        title=Track Y\n\
        outrate=44100 bps\n";

    fn make_arbiter() -> StatusArbiter {
        StatusArbiter::new("/nonexistent", TrackStore::new(), LineBuffer::new())
    }

    #[test]
    fn zero_outrate_is_idle_regardless_of_other_keys() {
        let status = parse_status(
            "file=Airplay Active\nartist=Artist X\ntitle=Track Y\noutrate=0 bps\n",
        );
        assert_eq!(classify(&status), PlayerStatus::Idle);
    }

    #[test]
    fn airplay_marker_with_nonzero_rate_is_stream_active() {
        let status = parse_status("file=Airplay Active\noutrate=44100 bps\n");
        assert_eq!(classify(&status), PlayerStatus::StreamActive);
    }

    #[test]
    fn anything_else_is_local() {
        let status = parse_status(LOCAL_STATUS);
        assert_eq!(classify(&status), PlayerStatus::LocalActive);
    }

    #[test]
    fn parse_status_is_key_based_not_positional() {
        // Same keys, shuffled line order; offsets must not matter.
        let status = parse_status("title=Track Y\noutrate=44100 bps\nartist=Artist X\n");
        assert_eq!(status.get("artist").map(String::as_str), Some("Artist X"));
        assert_eq!(status.get("title").map(String::as_str), Some("Track Y"));
    }

    #[tokio::test]
    async fn idle_resolves_to_fixed_pair() {
        let arbiter = make_arbiter();
        let status = parse_status("outrate=0 bps\n");
        let lines = arbiter.resolve(&status).await.unwrap();
        assert_eq!(lines, DisplayLines::new("moOde", "sleeping..."));
    }

    #[tokio::test]
    async fn stream_active_resolves_from_track_store() {
        let tracks = TrackStore::new();
        tracks
            .set(TrackInfo {
                artist: "Stream Artist".into(),
                title: "Stream Title".into(),
            })
            .await;
        let arbiter = StatusArbiter::new("/nonexistent", tracks, LineBuffer::new());

        let status = parse_status("file=Airplay Active\noutrate=44100 bps\n");
        let lines = arbiter.resolve(&status).await.unwrap();
        assert_eq!(lines, DisplayLines::new("Stream Artist", "Stream Title"));
    }

    #[tokio::test]
    async fn local_resolves_from_status_keys() {
        let arbiter = make_arbiter();
        let status = parse_status(LOCAL_STATUS);
        let lines = arbiter.resolve(&status).await.unwrap();
        assert_eq!(lines, DisplayLines::new("Artist X", "Track Y"));
    }

    #[tokio::test]
    async fn local_without_track_keys_skips_the_tick() {
        let arbiter = make_arbiter();
        let status = parse_status("file=NAS/music/track.flac\noutrate=44100 bps\n");
        assert!(arbiter.resolve(&status).await.is_none());
    }

    #[tokio::test]
    async fn unreadable_file_retains_prior_lines() {
        let lines = LineBuffer::new();
        let before = lines.snapshot().await;
        let arbiter = StatusArbiter::new("/definitely/not/here", TrackStore::new(), lines.clone());
        arbiter.tick().await;
        assert_eq!(lines.snapshot().await, before);
    }
}

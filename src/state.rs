/*
 *  state.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Shared state cells between the parser, arbiter, and renderer loops.
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

use std::sync::Arc;
use tokio::sync::Mutex as TokMutex;

use crate::constants::{IDLE_PRIMARY, LOADING_SECONDARY};

/// The most recent complete (artist, title) pair extracted from the
/// metadata stream. Replaced wholesale; readers always see a consistent
/// pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
}

impl Default for TrackInfo {
    fn default() -> Self {
        // Startup placeholder so the display proves it is alive before
        // any source has reported.
        TrackInfo {
            artist: IDLE_PRIMARY.to_string(),
            title: LOADING_SECONDARY.to_string(),
        }
    }
}

/// Hand-off cell between the metadata parser (writer) and the status
/// arbiter (reader). Last write wins; no partial state is observable.
#[derive(Debug, Clone)]
pub struct TrackStore {
    inner: Arc<TokMutex<TrackInfo>>,
}

impl TrackStore {
    pub fn new() -> Self {
        TrackStore {
            inner: Arc::new(TokMutex::new(TrackInfo::default())),
        }
    }

    /// Atomic snapshot of the latest complete record.
    pub async fn get(&self) -> TrackInfo {
        self.inner.lock().await.clone()
    }

    /// Atomic replace of the whole record.
    pub async fn set(&self, info: TrackInfo) {
        *self.inner.lock().await = info;
    }

    /// Replace the artist field under a single lock acquisition.
    pub async fn set_artist(&self, artist: String) {
        self.inner.lock().await.artist = artist;
    }

    /// Replace the title field under a single lock acquisition.
    pub async fn set_title(&self, title: String) {
        self.inner.lock().await.title = title;
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The two lines currently intended for display. The renderer snapshots
/// this at the start of each scroll pass; a snapshot is never mutated
/// mid-pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLines {
    pub primary: String,
    pub secondary: String,
}

impl DisplayLines {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        DisplayLines {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }
}

impl Default for DisplayLines {
    fn default() -> Self {
        DisplayLines::new(IDLE_PRIMARY, LOADING_SECONDARY)
    }
}

/// Hand-off cell between the status arbiter (writer) and the renderer
/// (reader).
#[derive(Debug, Clone)]
pub struct LineBuffer {
    inner: Arc<TokMutex<DisplayLines>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        LineBuffer {
            inner: Arc::new(TokMutex::new(DisplayLines::default())),
        }
    }

    /// Copy-on-read snapshot for the renderer.
    pub async fn snapshot(&self) -> DisplayLines {
        self.inner.lock().await.clone()
    }

    /// Replace the buffered lines, suppressing writes of an identical
    /// pair. Returns whether the buffer actually changed.
    pub async fn replace(&self, lines: DisplayLines) -> bool {
        let mut guard = self.inner.lock().await;
        if *guard == lines {
            return false;
        }
        *guard = lines;
        true
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn track_store_whole_record_replace() {
        let store = TrackStore::new();
        assert_eq!(store.get().await.artist, "moOde");

        store
            .set(TrackInfo {
                artist: "Artist X".into(),
                title: "Track Y".into(),
            })
            .await;

        let snap = store.get().await;
        assert_eq!(snap.artist, "Artist X");
        assert_eq!(snap.title, "Track Y");
    }

    #[tokio::test]
    async fn track_store_field_updates_are_independent() {
        let store = TrackStore::new();
        store.set_title("Test Song".into()).await;
        store.set_artist("Test Artist".into()).await;

        let snap = store.get().await;
        assert_eq!(snap.title, "Test Song");
        assert_eq!(snap.artist, "Test Artist");
    }

    #[tokio::test]
    async fn line_buffer_suppresses_identical_writes() {
        let buffer = LineBuffer::new();
        let lines = DisplayLines::new("Artist X", "Track Y");

        assert!(buffer.replace(lines.clone()).await);
        assert!(!buffer.replace(lines.clone()).await);

        assert!(buffer.replace(DisplayLines::new("Artist X", "Track Z")).await);
        assert_eq!(buffer.snapshot().await.secondary, "Track Z");
    }

    #[tokio::test]
    async fn line_buffer_starts_with_loading_placeholder() {
        let buffer = LineBuffer::new();
        let snap = buffer.snapshot().await;
        assert_eq!(snap.primary, "moOde");
        assert_eq!(snap.secondary, "Loading...");
    }
}

/*
 *  shairport.rs
 *
 *  moled - moOde OLED now-playing monitor
 *
 *  Tails the shairport-sync metadata FIFO, reassembles framed records,
 *  and publishes decoded (artist, title) fields to the track store.
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

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::constants::{FRAME_CLOSE, FRAME_START, PIPE_REOPEN_MS};
use crate::state::TrackStore;

/// Metadata tags we recognize. Only `minm` (song name) and `asar`
/// (song artist) feed the track store; the rest are decoded and dropped.
const ALLOWED_CODES: [&str; 5] = ["minm", "asar", "ascp", "asaa", "assl"];

const DATA_OPEN: &str = "<data encoding=\"base64\">";
const DATA_CLOSE: &str = "</data>";
const CODE_OPEN: &str = "<code>";
const CODE_CLOSE: &str = "</code>";

/// Per-field decode failures. These never abort the ingest loop; the
/// offending field update is skipped and the stream continues.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("malformed hex code tag: {0:?}")]
    BadCode(String),
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reassembles framed records from the line-oriented metadata stream.
///
/// A frame-start marker unconditionally resets the accumulator, which is
/// the corruption-recovery mechanism: lines arriving between frames, or a
/// frame whose close marker never came, are simply dropped.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    acc: String,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (newline-stripped by the caller). Returns the full
    /// frame body once the close marker has been accumulated; the frame
    /// is consumed and the accumulator cleared.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.contains(FRAME_START) {
            self.acc.clear();
        }
        self.acc.push_str(line);
        if self.acc.contains(FRAME_CLOSE) {
            return Some(std::mem::take(&mut self.acc));
        }
        None
    }
}

fn extract_between<'a>(haystack: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = haystack.find(open)? + open.len();
    let end = haystack[start..].find(close)? + start;
    Some(&haystack[start..end])
}

/// Decode an 8-hex-digit code tag (e.g. "6d696e6d") into its 4-char
/// ASCII form ("minm").
pub fn code_from_hex(hex: &str) -> Result<String, MetadataError> {
    if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MetadataError::BadCode(hex.to_string()));
    }
    let mut code = String::with_capacity(4);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| MetadataError::BadCode(hex.to_string()))?;
        if !byte.is_ascii() {
            return Err(MetadataError::BadCode(hex.to_string()));
        }
        code.push(byte as char);
    }
    Ok(code)
}

fn decode_payload(frame: &str) -> Result<Option<String>, MetadataError> {
    let Some(b64) = extract_between(frame, DATA_OPEN, DATA_CLOSE) else {
        return Ok(None);
    };
    let raw = BASE64.decode(b64.trim())?;
    Ok(Some(String::from_utf8(raw)?))
}

/// One decoded record from the stream. Ephemeral: built from a completed
/// accumulator frame and consumed immediately.
#[derive(Debug, PartialEq, Eq)]
pub struct MetadataFrame {
    pub code: String,
    pub payload: Option<String>,
}

impl MetadataFrame {
    /// Decode a completed frame body. `None` when the frame carries no
    /// code tag at all; decode failures surface as errors so the caller
    /// can skip just this record.
    pub fn parse(frame: &str) -> Result<Option<MetadataFrame>, MetadataError> {
        let Some(hex) = extract_between(frame, CODE_OPEN, CODE_CLOSE) else {
            return Ok(None);
        };
        let code = code_from_hex(hex)?;
        let payload = decode_payload(frame)?;
        Ok(Some(MetadataFrame { code, payload }))
    }
}

/// Apply one complete frame to the track store. Unknown tags and frames
/// without a payload are no-ops; decode failures skip the single field.
pub async fn apply_frame(frame: &str, store: &TrackStore) {
    let record = match MetadataFrame::parse(frame) {
        Ok(Some(record)) => record,
        Ok(None) => return,
        Err(e) => {
            debug!("Skipping undecodable frame: {e}");
            return;
        }
    };
    if !ALLOWED_CODES.contains(&record.code.as_str()) {
        return;
    }
    let MetadataFrame {
        code,
        payload: Some(payload),
    } = record
    else {
        return;
    };
    match code.as_str() {
        "minm" => {
            debug!("Metadata title: {payload}");
            store.set_title(payload).await;
        }
        "asar" => {
            debug!("Metadata artist: {payload}");
            store.set_artist(payload).await;
        }
        // Composer, album artist, and sort tags are recognized but have
        // no place on a two-line display.
        _ => debug!("Ignoring tag '{code}'"),
    }
}

/// Open the metadata source without ever sitting in open(2). A blocking
/// FIFO open with no writer attached never returns and would pin a
/// blocking-pool task past shutdown, so FIFOs get a non-blocking pipe
/// receiver (writer-gone shows up as EOF). Anything that is not a FIFO,
/// such as a plain file in tests, falls back to a regular async file.
async fn open_source(path: &Path) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
    match pipe::OpenOptions::new().open_receiver(path) {
        Ok(rx) => Ok(Box::new(rx)),
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
            Ok(Box::new(tokio::fs::File::open(path).await?))
        }
        Err(e) => Err(e),
    }
}

/// The metadata stream parser loop.
pub struct MetadataPipe {
    path: PathBuf,
    store: TrackStore,
}

impl MetadataPipe {
    pub fn new(path: impl Into<PathBuf>, store: TrackStore) -> Self {
        MetadataPipe {
            path: path.into(),
            store,
        }
    }

    /// Ingest the stream until the stop channel fires. Fails soft: the
    /// FIFO may not exist yet or may be recreated by shairport-sync, so
    /// every open/read error logs and retries rather than terminating.
    pub async fn ingest(self, mut stop: mpsc::Receiver<()>) {
        let mut assembler = FrameAssembler::new();
        info!("Metadata reader starting on {}", self.path.display());

        loop {
            let reader = match open_source(&self.path).await {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("Cannot open metadata pipe {}: {e}", self.path.display());
                    tokio::select! {
                        _ = sleep(Duration::from_millis(PIPE_REOPEN_MS)) => continue,
                        _ = stop.recv() => break,
                    }
                }
            };

            let mut lines = BufReader::new(reader).lines();
            let stopped = loop {
                tokio::select! {
                    result = lines.next_line() => match result {
                        Ok(Some(line)) => {
                            if let Some(frame) = assembler.push_line(line.trim_end()) {
                                apply_frame(&frame, &self.store).await;
                            }
                        }
                        Ok(None) => {
                            debug!("Metadata pipe EOF, reopening");
                            break false;
                        }
                        Err(e) => {
                            warn!("Metadata pipe read error: {e}");
                            break false;
                        }
                    },
                    _ = stop.recv() => break true,
                }
            };
            if stopped {
                break;
            }

            tokio::select! {
                _ = sleep(Duration::from_millis(PIPE_REOPEN_MS)) => {}
                _ = stop.recv() => break,
            }
        }

        info!("Metadata reader stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "minm" / "asar" as hex, "Test Song" / "Test Artist" as base64.
    const TITLE_FRAME: &str = "<item><type>636f7265</type><code>6d696e6d</code>\
        <length>9</length><data encoding=\"base64\">VGVzdCBTb25n</data></item>";
    const ARTIST_FRAME: &str = "<item><type>636f7265</type><code>61736172</code>\
        <length>11</length><data encoding=\"base64\">VGVzdCBBcnRpc3Q=</data></item>";

    #[test]
    fn code_from_hex_decodes_ascii_tags() {
        assert_eq!(code_from_hex("6d696e6d").unwrap(), "minm");
        assert_eq!(code_from_hex("61736172").unwrap(), "asar");
    }

    #[test]
    fn code_from_hex_rejects_garbage() {
        assert!(code_from_hex("zzzz").is_err());
        assert!(code_from_hex("6d696e").is_err());
        assert!(code_from_hex("6d696e6d6d").is_err());
    }

    #[test]
    fn parse_extracts_code_and_payload() {
        let record = MetadataFrame::parse(TITLE_FRAME).unwrap().unwrap();
        assert_eq!(record.code, "minm");
        assert_eq!(record.payload.as_deref(), Some("Test Song"));
    }

    #[test]
    fn parse_without_code_tag_is_none() {
        assert!(MetadataFrame::parse("<item></data>").unwrap().is_none());
    }

    #[test]
    fn assembler_completes_single_line_frame() {
        let mut assembler = FrameAssembler::new();
        let frame = assembler.push_line(TITLE_FRAME).expect("complete frame");
        assert!(frame.contains("6d696e6d"));
    }

    #[test]
    fn assembler_reassembles_multi_line_frame() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push_line("<item><code>6d696e6d</code>").is_none());
        let frame = assembler
            .push_line("<data encoding=\"base64\">VGVzdCBTb25n</data></item>")
            .expect("complete frame");
        assert!(frame.contains("VGVzdCBTb25n"));
    }

    #[test]
    fn frame_start_resets_partial_frame() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push_line("<item><code>61736172</code>").is_none());
        // New frame start before the previous close: partial data dropped.
        let frame = assembler.push_line(TITLE_FRAME).expect("complete frame");
        assert!(!frame.contains("61736172"));
    }

    #[test]
    fn stray_lines_between_frames_are_dropped() {
        let mut assembler = FrameAssembler::new();
        // Torn tail of an older frame, no start marker before it.
        assert!(assembler.push_line("aXJyZWxldmFudA==").is_none());
        let frame = assembler.push_line(TITLE_FRAME).expect("complete frame");
        assert!(!frame.contains("aXJyZWxldmFudA=="));
    }

    #[tokio::test]
    async fn title_frame_updates_store() {
        let store = TrackStore::new();
        apply_frame(TITLE_FRAME, &store).await;
        assert_eq!(store.get().await.title, "Test Song");
    }

    #[tokio::test]
    async fn fields_from_separate_frames_apply_independently() {
        let store = TrackStore::new();
        apply_frame(TITLE_FRAME, &store).await;
        apply_frame(ARTIST_FRAME, &store).await;

        let snap = store.get().await;
        assert_eq!(snap.title, "Test Song");
        assert_eq!(snap.artist, "Test Artist");
    }

    #[tokio::test]
    async fn reingesting_identical_frame_is_idempotent() {
        let store = TrackStore::new();
        apply_frame(TITLE_FRAME, &store).await;
        let once = store.get().await;
        apply_frame(TITLE_FRAME, &store).await;
        assert_eq!(store.get().await, once);
    }

    #[tokio::test]
    async fn malformed_base64_leaves_store_unchanged() {
        let store = TrackStore::new();
        let before = store.get().await;
        let frame = "<item><code>6d696e6d</code>\
            <data encoding=\"base64\">!!!not-base64!!!</data></item>";
        apply_frame(frame, &store).await;
        assert_eq!(store.get().await, before);
    }

    #[tokio::test]
    async fn unknown_tag_is_ignored() {
        let store = TrackStore::new();
        let before = store.get().await;
        // "pvol" (volume) carries a payload but is not allow-listed.
        let frame = "<item><code>70766f6c</code>\
            <data encoding=\"base64\">VGVzdCBTb25n</data></item>";
        apply_frame(frame, &store).await;
        assert_eq!(store.get().await, before);
    }

    #[tokio::test]
    async fn tag_without_payload_is_a_noop() {
        let store = TrackStore::new();
        let before = store.get().await;
        let frame = "<item><code>6d696e6d</code><data encoding=\"text\"></data></item>";
        apply_frame(frame, &store).await;
        assert_eq!(store.get().await, before);
    }
}

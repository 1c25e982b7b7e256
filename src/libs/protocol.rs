//! Native-messaging wire protocol between the extension shim and the engine.
//!
//! Each frame is a 32-bit native-endian length followed by that many bytes of
//! UTF-8 JSON. Inbound and outbound frames are tagged by `kind`:
//!
//! ```json
//! {"kind":"event","event":{"type":"tabActivated","tab":{"id":7,"url":"https://example.com/"}}}
//! {"kind":"request","id":1,"request":{"action":"getCurrentStats"}}
//! {"kind":"response","id":1,"body":{"status":"success","totalTime":65,"tabUsage":[]}}
//! {"kind":"badge","text":"●","color":"#10b981","title":"Tracking: example.com"}
//! ```
//!
//! After a badge with `clearAfterMs` expires, the shim restores the last badge
//! it received without one.

use super::dwell::TabUsage;
use super::focus::FocusEvent;
use super::notify::Badge;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames above this size are rejected.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the 1 MiB limit")]
    Oversize(usize),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// Errors after which the stream is still in sync and reading can go on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Oversize(_) | FrameError::Json(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Inbound {
    Event { event: FocusEvent },
    Request { id: Value, request: Request },
    Startup,
    Installed,
    Suspend,
    SuspendCanceled,
}

/// UI actions answered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    Ping,
    GetCurrentStats,
    GetTrackingStatus,
    /// Stats and tracking status in one answer.
    GetScreenTime,
    SyncData,
    ResetData,
    #[serde(rename_all = "camelCase")]
    AuthUpdated {
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        refresh_token: Option<String>,
    },
    Logout,
    OpenWebApp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Status {
        status: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Stats {
        status: &'static str,
        total_time: u64,
        tab_usage: Vec<TabUsage>,
    },
    #[serde(rename_all = "camelCase")]
    TrackingStatus {
        status: &'static str,
        is_tracking: bool,
        current_tab_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ScreenTime {
        total_time: u64,
        tab_usage: Vec<TabUsage>,
        is_tracking: bool,
        current_tab_url: Option<String>,
    },
    Success {
        success: bool,
    },
    #[serde(rename_all = "camelCase")]
    Auth {
        success: bool,
        is_authenticated: bool,
    },
    Error {
        status: &'static str,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outbound {
    Response { id: Value, body: Response },
    Badge(Badge),
    OpenUrl { url: String },
}

/// Reads one frame payload. `Ok(None)` when the stream ends at a frame boundary.
///
/// An oversized frame is skipped in full before [`FrameError::Oversize`] is
/// returned, so the next read starts on a frame boundary again.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        tokio::io::copy(&mut (&mut *reader).take(len as u64), &mut tokio::io::sink()).await?;
        return Err(FrameError::Oversize(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub fn decode_inbound(payload: &[u8]) -> Result<Inbound, FrameError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Error reply for a `request` frame that failed to decode but still carries
/// an `id`, so the caller is not left waiting.
pub fn reject_request(payload: &[u8], error: &FrameError) -> Option<Outbound> {
    let frame: Value = serde_json::from_slice(payload).ok()?;
    if frame.get("kind").and_then(Value::as_str) != Some("request") {
        return None;
    }
    let id = frame.get("id")?.clone();
    Some(Outbound::Response {
        id,
        body: Response::Error {
            status: "error",
            error: error.to_string(),
        },
    })
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Outbound) -> Result<(), FrameError> {
    let payload = serde_json::to_vec(frame)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::Oversize(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_ne_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

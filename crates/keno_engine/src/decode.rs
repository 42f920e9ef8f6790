//! Line framing and event decoding for the job's progress stream.
//!
//! The body is a sequence of `\n`-terminated lines. Lines starting with
//! [`DATA_MARKER`] carry a JSON object; every other line is noise. Noise is
//! tolerated on purpose: it is logged and dropped, and it never ends the stream,
//! so upstream may add line kinds or fields without breaking older clients.

use keno_core::{DrawResult, StreamEvent};
use keno_logging::{keno_debug, keno_trace};
use serde::Deserialize;
use serde_json::Value;

/// Prefix of every line that carries an event.
pub const DATA_MARKER: &str = "data: ";

/// Why a complete line produced no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseReason {
    Blank,
    MissingMarker,
    InvalidJson,
    /// Valid JSON without a usable `progress`, `result` or truthy `complete`.
    UnrecognizedShape,
}

/// Incremental decoder. Holds only the unterminated tail of the last chunk.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and decodes every line it completes, in order.
    ///
    /// Buffering is byte-based, so a line (or a multi-byte character) split
    /// across chunks decodes exactly as if it had arrived in one piece.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            decode_into(&self.buf[start..end], &mut events);
            start = end + 1;
        }
        self.buf.drain(..start);
        events
    }

    /// Best-effort decode of a trailing line left unterminated at end of input.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        if !rest.is_empty() {
            decode_into(&rest, &mut events);
        }
        events
    }

    /// Bytes held back waiting for a line break.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

/// Decodes one line (without its terminating `\n`).
///
/// A single line may carry several fields; events come out in the order
/// progress, result, complete.
pub fn decode_line(line: &[u8]) -> Result<Vec<StreamEvent>, NoiseReason> {
    let decoded = String::from_utf8_lossy(line);
    let text = decoded.strip_suffix('\r').unwrap_or(decoded.as_ref());
    if text.trim().is_empty() {
        return Err(NoiseReason::Blank);
    }
    let payload = text
        .strip_prefix(DATA_MARKER)
        .ok_or(NoiseReason::MissingMarker)?;
    let message: WireMessage =
        serde_json::from_str(payload).map_err(|_| NoiseReason::InvalidJson)?;

    let events = message.into_events();
    if events.is_empty() {
        return Err(NoiseReason::UnrecognizedShape);
    }
    Ok(events)
}

fn decode_into(line: &[u8], events: &mut Vec<StreamEvent>) {
    match decode_line(line) {
        Ok(decoded) => {
            keno_trace!("decoded {} event(s) from {} byte line", decoded.len(), line.len());
            events.extend(decoded);
        }
        Err(NoiseReason::Blank) => {}
        Err(reason) => {
            keno_debug!("dropping stream line ({:?}), {} bytes", reason, line.len());
        }
    }
}

/// Fields are kept as raw JSON so that one field of the wrong type only drops
/// that field; the rest of the line still counts.
#[derive(Debug, Deserialize)]
struct WireMessage {
    progress: Option<Value>,
    result: Option<Value>,
    complete: Option<Value>,
    total: Option<Value>,
}

impl WireMessage {
    fn into_events(self) -> Vec<StreamEvent> {
        let completion = self.completion();
        let mut events = Vec::with_capacity(3);
        if let Some(percent) = self.progress() {
            events.push(StreamEvent::Progress { percent });
        }
        if let Some(value) = self.result.and_then(draw_result) {
            events.push(StreamEvent::Result { value });
        }
        if let Some(total) = completion {
            events.push(StreamEvent::Complete { total });
        }
        events
    }

    fn progress(&self) -> Option<u32> {
        let percent = self.progress.as_ref().and_then(whole_number);
        if percent.is_none() && self.progress.is_some() {
            keno_debug!("ignoring non-integer progress {:?}", self.progress);
        }
        percent.and_then(|p| u32::try_from(p).ok())
    }

    /// `complete` counts when it is `true` or an object. The total comes from
    /// `complete.total` or, failing that, the top-level `total`.
    fn completion(&self) -> Option<Option<u64>> {
        let top_level = self.total.as_ref().and_then(whole_number);
        match &self.complete {
            Some(Value::Bool(true)) => Some(top_level),
            Some(Value::Object(fields)) => {
                Some(fields.get("total").and_then(whole_number).or(top_level))
            }
            _ => None,
        }
    }
}

fn draw_result(raw: Value) -> Option<DrawResult> {
    serde_json::from_value(raw)
        .map_err(|err| keno_debug!("ignoring malformed result: {}", err))
        .ok()
}

/// Accepts `42`, `42.0` and `"42"`.
fn whole_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Server-sent-event wire format helpers.
//!
//! Both sides of the relay speak the same `data: <json>\n\n` framing: the
//! provider clients decode upstream completion streams with [`SseParser`],
//! and the arena handlers encode outbound [`crate::arena::StreamEvent`]s
//! through `axum`'s SSE support (encode-then-write, never a partial frame).

/// Incremental SSE frame decoder.
///
/// Buffers raw bytes and yields the payload of each complete `data:` frame.
/// Frame boundaries may arrive mid-chunk across network reads; partial
/// frames are retained in a carry-over buffer until a later feed completes
/// them. Multiple `data:` lines within one frame are joined with `\n` as the
/// SSE specification requires.
///
/// # Examples
///
/// ```
/// use promptpit::sse::SseParser;
///
/// let mut parser = SseParser::new();
/// assert!(parser.feed(b"data: {\"a\":").is_empty());
/// let frames = parser.feed(b"1}\n\n");
/// assert_eq!(frames, vec!["{\"a\":1}".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    /// Raw carry-over. Kept as bytes so a read that splits a multibyte
    /// character mid-sequence is reassembled before any UTF-8 decoding.
    buffer: Vec<u8>,
}

impl SseParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the payloads of all frames completed so far.
    ///
    /// Non-`data:` lines (comments, `event:`, `id:`) are ignored; the
    /// providers we decode carry their discriminator inside the JSON payload.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();

        // Frames are delimited by a blank line, tolerating \r\n line endings.
        while let Some(pos) = find_frame_boundary(&self.buffer) {
            let frame = String::from_utf8_lossy(&self.buffer[..pos.start]).into_owned();
            self.buffer.drain(..pos.end);

            if let Some(payload) = parse_frame(&frame) {
                payloads.push(payload);
            }
        }

        payloads
    }

    /// Bytes currently held waiting for a frame boundary.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

struct Boundary {
    /// Length of the frame content (excluding the delimiter).
    start: usize,
    /// Length of frame content plus delimiter, i.e. how much to drain.
    end: usize,
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Locate the first blank-line frame delimiter, tolerating `\r\n\r\n`.
fn find_frame_boundary(buffer: &[u8]) -> Option<Boundary> {
    let lf = find_subslice(buffer, b"\n\n");
    let crlf = find_subslice(buffer, b"\r\n\r\n");

    match (lf, crlf) {
        (Some(l), Some(c)) if c < l => Some(Boundary { start: c, end: c + 4 }),
        (Some(l), _) => Some(Boundary { start: l, end: l + 2 }),
        (None, Some(c)) => Some(Boundary { start: c, end: c + 4 }),
        (None, None) => None,
    }
}

/// Extract the joined `data:` payload from one frame, if any.
fn parse_frame(frame: &str) -> Option<String> {
    let mut data_lines = frame
        .lines()
        .filter_map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            line.strip_prefix("data:")
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        })
        .peekable();

    data_lines.peek()?;
    Some(data_lines.collect::<Vec<_>>().join("\n"))
}

//! Incremental parser for the blank-line-delimited event stream the chat
//! backend pushes. Feed it raw response chunks as they arrive; it yields one
//! `SseFrame` per terminated frame and keeps everything else buffered.

/// One discrete `(event, data)` unit extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Stateful frame splitter.
///
/// Framing rules: frames end at a blank line; `event:` lines set the event
/// type (last one wins); multiple `data:` lines are joined with a newline.
/// Lines with an unrecognized prefix (keep-alives, comments) are skipped.
/// Chunk boundaries may fall anywhere, including inside a multi-byte
/// character, so undecoded bytes stay buffered until their completion arrives.
#[derive(Debug, Default)]
pub struct SseParser {
    /// Raw bytes whose UTF-8 decoding is still incomplete.
    pending_bytes: Vec<u8>,
    /// Decoded text not yet consumed into complete lines.
    text: String,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of the response body and return every frame whose
    /// blank-line terminator is now visible.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.decode(chunk);
        self.drain_frames()
    }

    /// True when buffered input holds a partially received frame.
    pub fn has_partial(&self) -> bool {
        !self.pending_bytes.is_empty()
            || !self.text.is_empty()
            || self.event.is_some()
            || !self.data_lines.is_empty()
    }

    /// Stateful UTF-8 decode: an incomplete trailing sequence stays in
    /// `pending_bytes`; definitely invalid bytes become U+FFFD.
    fn decode(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(s) => {
                    self.text.push_str(s);
                    self.pending_bytes.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // Infallible: the range was just validated.
                    let prefix = std::str::from_utf8(&self.pending_bytes[..valid])
                        .expect("validated UTF-8 prefix");
                    self.text.push_str(prefix);
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push('\u{FFFD}');
                            self.pending_bytes.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence at the tail; wait for more bytes.
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_frames(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        while let Some(pos) = self.text.find('\n') {
            let mut line: String = self.text.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
            } else {
                self.accept_line(&line);
            }
        }
        frames
    }

    fn accept_line(&mut self, line: &str) {
        if let Some(value) = field_value(line, "event") {
            self.event = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            self.data_lines.push(value.to_string());
        } else {
            // Comment or unknown prefix; upstream emits these as keep-alives.
            tracing::trace!(line, "ignoring unrecognized stream line");
        }
    }

    /// Dispatch the frame under assembly, if any. A blank line with no
    /// accumulated fields is a keep-alive and yields nothing.
    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.event.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(SseFrame { event, data })
    }
}

/// Extract the value of a `name:` field line, stripping at most one leading
/// space after the colon.
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

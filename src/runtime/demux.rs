//! Decoding of the daemon's multiplexed stdout/stderr log stream.
//!
//! Each frame is an 8 byte header followed by its payload:
//!
//! ```text
//! [stream type: u8][0u8; 3][payload length: u32 big-endian][payload]
//! ```
//!
//! Containers started without a TTY usually answer with framed output, but
//! daemons sometimes hand back plain text. Anything that does not look like a
//! frame is passed through as raw text instead of being rejected.

use bytes::BytesMut;
use futures::stream::{self, AbortHandle, Abortable, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::ByteStream;

pub(crate) const HEADER_LEN: usize = 8;
pub(crate) const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamType {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamType {
    pub(crate) fn from_byte(byte: u8) -> Option<StreamType> {
        match byte {
            0 => Some(StreamType::Stdin),
            1 => Some(StreamType::Stdout),
            2 => Some(StreamType::Stderr),
            _ => None,
        }
    }
}

fn frame_len(header: &[u8]) -> usize {
    u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize
}

/// Decodes a complete buffer into the concatenated payload text.
pub(crate) fn decode_batch(buffer: &[u8]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(buffer.len());
    let mut rest = buffer;

    while !rest.is_empty() {
        if rest.len() < HEADER_LEN || StreamType::from_byte(rest[0]).is_none() {
            debug!("Unframed log output ({} bytes), passing through as text", rest.len());
            payload.extend_from_slice(rest);
            break;
        }

        let len = frame_len(rest);
        if len > MAX_FRAME_LEN {
            debug!("Log frame declares {} bytes, passing remainder through as text", len);
            payload.extend_from_slice(rest);
            break;
        }

        // A truncated final frame still yields what was received.
        let end = (HEADER_LEN + len).min(rest.len());
        payload.extend_from_slice(&rest[HEADER_LEN..end]);
        rest = &rest[end..];
    }

    String::from_utf8_lossy(&payload).into_owned()
}

fn push_lines(payload: &[u8], lines: &mut Vec<String>) {
    for line in String::from_utf8_lossy(payload).split('\n') {
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
}

/// Incremental decoder fed with chunks as they arrive on the wire.
#[derive(Debug, Default)]
pub(crate) struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        while !self.buffer.is_empty() {
            if StreamType::from_byte(self.buffer[0]).is_none() {
                let raw = self.buffer.split();
                push_lines(&raw, &mut lines);
                break;
            }

            if self.buffer.len() < HEADER_LEN {
                break;
            }

            let len = frame_len(&self.buffer);
            if len > MAX_FRAME_LEN {
                let raw = self.buffer.split();
                push_lines(&raw, &mut lines);
                break;
            }

            if self.buffer.len() < HEADER_LEN + len {
                break;
            }

            let frame = self.buffer.split_to(HEADER_LEN + len);
            push_lines(&frame[HEADER_LEN..], &mut lines);
        }

        lines
    }

    /// Flushes whatever is left once the source has ended.
    pub(crate) fn finish(&mut self) -> Vec<String> {
        let rest = self.buffer.split();
        let mut lines = Vec::new();
        push_lines(decode_batch(&rest).as_bytes(), &mut lines);
        lines
    }
}

struct DecodeState {
    source: ByteStream,
    decoder: FrameDecoder,
    pending: VecDeque<Result<String, RuntimeError>>,
    finished: bool,
}

type LineStream = Pin<Box<dyn Stream<Item = Result<String, RuntimeError>> + Send>>;

fn decode_lines(source: ByteStream) -> LineStream {
    let state = DecodeState {
        source,
        decoder: FrameDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    let lines = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }

            if state.finished {
                return None;
            }

            match state.source.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(&chunk);
                    state.pending.extend(lines.into_iter().map(Ok));
                }
                Some(Err(e)) => state.pending.push_back(Err(e)),
                None => {
                    state.finished = true;
                    let lines = state.decoder.finish();
                    state.pending.extend(lines.into_iter().map(Ok));
                }
            }
        }
    });

    Box::pin(lines)
}

/// Live log lines of one container.
///
/// Errors are yielded as `Err` items and the end of the daemon stream ends
/// the sequence. There is no idle timeout: the caller cancels through
/// [`LogStream::cancel`] (or a handle from [`LogStream::cancel_handle`]) or
/// drops the stream, either of which releases the daemon connection.
pub(crate) struct LogStream {
    inner: Abortable<LineStream>,
    handle: AbortHandle,
}

impl LogStream {
    pub(crate) fn new(source: ByteStream) -> LogStream {
        let (handle, registration) = AbortHandle::new_pair();

        LogStream {
            inner: Abortable::new(decode_lines(source), registration),
            handle,
        }
    }

    pub(crate) fn cancel_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub(crate) fn cancel(&self) {
        self.handle.abort();
    }
}

impl Stream for LogStream {
    type Item = Result<String, RuntimeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
pub(crate) fn encode_frame(stream_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![stream_type, 0, 0, 0];
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

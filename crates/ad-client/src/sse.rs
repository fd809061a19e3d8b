//! Minimal server-sent-events decoder.
//!
//! Only `data:` fields matter for the log feed. Multiple `data:` lines in one
//! event are joined with `\n`; comments and other fields are ignored. An
//! event still incomplete when the connection ends is discarded.

use std::collections::VecDeque;

use futures_util::{Stream, StreamExt};

use crate::error::ClientError;

/// Incremental decoder fed with raw body chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every event it completed.
    /// Chunks may split lines and UTF-8 sequences anywhere.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let pending = std::mem::take(&mut self.pending);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut line = &pending[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
            start = end + 1;
        }

        self.pending = pending;
        self.pending.drain(..start);
        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            }
        }
        None
    }
}

/// Turn a body byte stream into a stream of event payloads.
///
/// A transport error is yielded once and ends the stream.
pub fn data_events<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, ClientError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
{
    let state = (bytes, SseDecoder::new(), VecDeque::<String>::new(), false);

    futures_util::stream::unfold(state, |(mut bytes, mut decoder, mut ready, done)| async move {
        loop {
            if let Some(event) = ready.pop_front() {
                return Some((Ok(event), (bytes, decoder, ready, done)));
            }
            if done {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => ready.extend(decoder.feed(chunk.as_ref())),
                Some(Err(e)) => return Some((Err(e.into()), (bytes, decoder, ready, true))),
                None => return None,
            }
        }
    })
}

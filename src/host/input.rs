use crate::host::HostEvent;
use crate::shipper::batch::BatchLimits;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::warn;

/// Room for the JSON envelope around a message: keys, source ID, timestamp
const LINE_ENVELOPE_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("malformed host message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to read host input: {0}")]
    Read(#[from] std::io::Error),
}

/// Longest host line worth reading for the given limits.
///
/// A message that can fit a batch is at most `max_bytes` long, and JSON
/// escaping grows a byte to at most six (`\u00XX`). Longer lines can only
/// carry events that would be dropped as oversized.
pub fn max_line_bytes(limits: &BatchLimits) -> usize {
    limits.max_bytes * 6 + LINE_ENVELOPE_BYTES
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &[u8]) -> Result<Option<HostEvent>, HostError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(line)?))
}

#[derive(Debug, PartialEq, Eq)]
enum HostLine {
    Line(Vec<u8>),
    /// Line longer than the limit; its bytes were discarded as they arrived
    TooLong(usize),
}

/// Newline-framed reader that never buffers more than `max_len` bytes of a
/// single line
struct LineReader<R> {
    reader: BufReader<R>,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(reader: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_len,
        }
    }

    /// Next line without its newline; `Ok(None)` at EOF
    async fn next_line(&mut self) -> std::io::Result<Option<HostLine>> {
        let mut line = Vec::new();
        let mut discarded = 0usize;

        loop {
            let (used, complete) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(match (discarded, line.is_empty()) {
                        (0, true) => None,
                        (0, false) => Some(HostLine::Line(line)),
                        (n, _) => Some(HostLine::TooLong(n)),
                    });
                }

                let newline = available.iter().position(|b| *b == b'\n');
                let chunk = match newline {
                    Some(i) => &available[..i],
                    None => available,
                };

                if discarded == 0 && line.len() + chunk.len() <= self.max_len {
                    line.extend_from_slice(chunk);
                } else {
                    discarded += line.len() + chunk.len();
                    line = Vec::new();
                }

                match newline {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(used);

            if complete {
                return Ok(Some(if discarded > 0 {
                    HostLine::TooLong(discarded)
                } else {
                    HostLine::Line(line)
                }));
            }
        }
    }
}

/// Turns newline-delimited JSON from `reader` into host events.
///
/// Malformed lines (bad JSON, invalid UTF-8, longer than `max_line_bytes`)
/// are logged and skipped. The stream ends at EOF or on an I/O error.
pub fn read_host_events<R>(reader: R, max_line_bytes: usize) -> impl Stream<Item = HostEvent>
where
    R: AsyncRead + Unpin,
{
    futures::stream::unfold(LineReader::new(reader, max_line_bytes), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(e) => Some((Err(HostError::from(e)), lines)),
        }
    })
    .take_while(|line| {
        let keep = match line {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Stopping host input");
                false
            }
        };
        futures::future::ready(keep)
    })
    .filter_map(|line| async move {
        match line.ok()? {
            HostLine::Line(line) => match parse_line(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        error = %e,
                        line = %String::from_utf8_lossy(&line),
                        "Skipping malformed host message"
                    );
                    None
                }
            },
            HostLine::TooLong(len) => {
                warn!(len = len, "Skipping host message over the line limit");
                None
            }
        }
    })
}

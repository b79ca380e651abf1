use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chunks(err) => err.fmt(f),
            Error::InvalidUtf8 => f.write_str("event stream is not UTF-8"),
        }
    }
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Comments and fields other than `data` are skipped. Multiple `data` lines
/// of one event are joined with line feeds.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(block) = self.take_block() {
                if let Some(data) = parse_block(&block)? {
                    return Ok(Some(data));
                }
            }

            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                // A trailing partial event is dropped.
                None => return Ok(None),
            }
        }
    }

    /// Removes the next complete event block (without its blank line) from
    /// the buffer.
    fn take_block(&mut self) -> Option<Vec<u8>> {
        let (end, sep_len) = find_blank_line(&self.buf)?;
        let block = self.buf[..end].to_vec();
        self.buf.drain(..end + sep_len);
        Some(block)
    }
}

fn find_blank_line(buf: &[u8]) -> Option<(usize, usize)> {
    const SEPARATORS: [&[u8]; 2] = [b"\r\n\r\n", b"\n\n"];
    SEPARATORS
        .iter()
        .filter_map(|sep| {
            buf.windows(sep.len())
                .position(|w| w == *sep)
                .map(|pos| (pos, sep.len()))
        })
        .min_by_key(|(pos, _)| *pos)
}

fn parse_block(block: &[u8]) -> Result<Option<String>, Error> {
    let block = str::from_utf8(block).map_err(|_| Error::InvalidUtf8)?;
    let mut data: Option<String> = None;
    for line in block.lines() {
        // Comment lines start with a colon.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };
        if field != "data" {
            trace!("skipping sse field `{field}`");
            continue;
        }
        match &mut data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_owned()),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::from_static(&[b"data: hello\n\n", b"data: bye\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_chunks() {
        let chunks = Chunks::from_static(&[b"data:", b" hello\n", b"\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_and_comments() {
        let chunks = Chunks::from_static(&[
            b": keep-alive\r\n\r\n",
            b"event: message\r\ndata: {\"a\":1}\r",
            b"\n\r\n",
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multiline_data() {
        let chunks = Chunks::from_static(&[b"data: one\ndata: two\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "one\ntwo");
    }

    #[tokio::test]
    async fn test_incomplete_events() {
        let chunks = Chunks::from_static(&[b"data: hello\n", b"data: bye\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::from_static(&[b"data: \xff\xfe\n\n"]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidUtf8);
    }
}

#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// The body stream broke off.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read the response body: {}", self.0)
    }
}

/// Source of raw body chunks.
pub enum Chunks {
    Response(Response),
    #[cfg(test)]
    Preset(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Response(response)
    }

    #[cfg(test)]
    pub fn from_static(chunks: &[&'static [u8]]) -> Self {
        Chunks::Preset(chunks.iter().copied().map(Bytes::from_static).collect())
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Response(response) => {
                response.chunk().await.map_err(|err| Error(err.to_string()))
            }
            #[cfg(test)]
            Chunks::Preset(chunks) => Ok(chunks.pop_front()),
        }
    }
}

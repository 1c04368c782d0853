use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the Tenko API.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, TLS or non-2xx status.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The response body is not the JSON we expect.
    #[error("unexpected response from {endpoint}: {body}")]
    Decode {
        endpoint: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Error::Transport { endpoint, .. } | Error::Decode { endpoint, .. } => endpoint,
        }
    }
}

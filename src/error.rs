#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Non-success response from the Moneybird token endpoint or REST API.
    #[error("{operation} failed with status {status}: {detail}")]
    Provider {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

use thiserror::Error;

/// Failure taxonomy shared by the query client, the store and the
/// refresh coordinator.
///
/// `NoData` is a well-formed empty result, not an upstream fault; callers
/// that require the data branch on it separately from the two upstream
/// failure kinds.
#[derive(Debug, Error)]
pub enum TariffError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream returned malformed data: {0}")]
    UpstreamFormat(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TariffError>;

impl From<reqwest::Error> for TariffError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::UpstreamFormat(err.to_string())
        } else {
            Self::UpstreamUnavailable(err.to_string())
        }
    }
}

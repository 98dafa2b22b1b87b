use thiserror::Error;

/// Transport failure. Returned as a value, never raised as a panic.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("timeout fetching {0}")]
    Timeout(String),
    #[error("connection error fetching {0}")]
    Connect(String),
    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },
    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == 429 || (500..600).contains(status))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no title found for tender {0}")]
    MissingTitle(String),
    #[error("listing card has no title")]
    CardWithoutTitle,
    #[error("listing card has no detail link")]
    CardWithoutLink,
    #[error("cannot derive tender id from {0:?}")]
    Unidentifiable(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid tender type: {0}")]
    InvalidTenderType(String),
}

/// Statistics key for each way a record can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Fetch,
    DetailFetch,
    Parse,
    ListingParse,
    Validation,
    Fatal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch_error",
            FailureKind::DetailFetch => "detail_fetch_error",
            FailureKind::Parse => "parse_error",
            FailureKind::ListingParse => "listing_parse_error",
            FailureKind::Validation => "validation_error",
            FailureKind::Fatal => "fatal_error",
        }
    }
}

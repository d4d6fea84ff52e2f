#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `message` is the server's `detail`/`message` or raw body.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Missing quote provider API key (set FINNHUB_API_KEY)")]
    MissingApiKey,

    #[error("A ranking run is already in progress")]
    RunInProgress,

    /// The run was stopped or replaced before the start request returned.
    #[error("Run trigger was superseded before the server answered")]
    RunSuperseded,

    #[error("Unrecognized run status: {0}")]
    UnknownRunStatus(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, RankingError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("raw query is empty; enter a query or switch back to basic mode")]
    BlankRawQuery,

    #[error("control '{0}' is not registered")]
    UnknownControl(String),

    #[error("control '{0}' is not a {1} control")]
    WrongControlKind(String, &'static str),

    #[error("control '{child}' already depends on '{existing}'; cannot also depend on '{parent}'")]
    DuplicateDependency {
        child: String,
        existing: String,
        parent: String,
    },

    #[error("invalid date '{0}': {1}")]
    InvalidDate(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("query rejected by remote: {0}")]
    QueryRejected(String),

    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("remote operation timed out after {seconds} seconds")]
    RemoteTimeout { seconds: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search scheduler has shut down")]
    SchedulerClosed,

    #[error("{0}")]
    Other(String),
}

impl DeckError {
    /// Short machine-readable category used when a failure is reported to observers
    pub fn kind(&self) -> &'static str {
        match self {
            DeckError::BlankRawQuery => "ValidationError",
            DeckError::UnknownControl(_)
            | DeckError::WrongControlKind(..)
            | DeckError::DuplicateDependency { .. }
            | DeckError::Config(_) => "ConfigError",
            DeckError::InvalidDate(..) => "InvalidDate",
            DeckError::Auth(_) => "AuthError",
            DeckError::QueryRejected(_) => "QueryError",
            DeckError::RateLimited(_) => "RateLimited",
            DeckError::RemoteTimeout { .. } => "TimeoutError",
            DeckError::Api(_) | DeckError::Http(_) => "FetchError",
            DeckError::SchedulerClosed => "SchedulerClosed",
            DeckError::Io(_) | DeckError::YamlParse(_) | DeckError::Json(_) | DeckError::Other(_) => {
                "Error"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;

use {slack_morphism::errors::SlackClientError, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    /// A Web API call made through the Slack client failed.
    #[error("{method} failed: {source}")]
    Client {
        method: &'static str,
        #[source]
        source: SlackClientError,
    },

    /// Slack answered with `ok: false` to a call made over plain HTTP.
    #[error("{method} failed: {code}")]
    Api { method: &'static str, code: String },

    /// Non-2xx HTTP status from the Web API.
    #[error("{method} returned HTTP {status}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("failed to create Slack client: {0}")]
    Connector(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn api(method: &'static str, code: impl Into<String>) -> Self {
        Self::Api {
            method,
            code: code.into(),
        }
    }

    #[must_use]
    pub fn client(method: &'static str, source: SlackClientError) -> Self {
        Self::Client { method, source }
    }

    /// Slack error code, if Slack reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Client {
                source: SlackClientError::ApiError(api),
                ..
            } => Some(&api.code),
            _ => None,
        }
    }

    /// Short reason used when mapping onto platform errors.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Status { status, .. } => format!("http_{}", status.as_u16()),
            other => other.code().map_or_else(|| other.to_string(), str::to_string),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

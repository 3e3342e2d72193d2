//! Domain-specific error types for shardlag

use thiserror::Error;

/// Structured coordination store error domain
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("request for {key} failed: {detail}")]
    Request { key: String, detail: String },
    #[error("unexpected status {status} for {key}: {detail}")]
    Status {
        key: String,
        status: u16,
        detail: String,
    },
    #[error("malformed response for {key}: {detail}")]
    Decode { key: String, detail: String },
}

impl StoreError {
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound(key.into())
    }

    pub fn request(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Request {
            key: key.into(),
            detail: detail.into(),
        }
    }

    pub fn status(key: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            key: key.into(),
            status,
            detail: detail.into(),
        }
    }

    pub fn decode(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            detail: detail.into(),
        }
    }

    /// Whether the key is simply absent, as opposed to the store failing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}

/// Failure of a single write-head or read-head fetch.
///
/// Cloneable so it can be carried inside a task's result record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {detail}")]
    Request { url: String, detail: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("malformed payload from {url}: {detail}")]
    Decode { url: String, detail: String },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl FetchError {
    pub fn request(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            detail: detail.into(),
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub fn decode(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map a reqwest error onto the fetch domain
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(url)
        } else if err.is_decode() {
            Self::decode(url, err.to_string())
        } else if let Some(status) = err.status() {
            Self::status(url, status.as_u16())
        } else {
            Self::request(url, err.to_string())
        }
    }
}

/// Structured configuration error domain
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("{setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },
    #[error("missing {0}")]
    Missing(String),
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    pub fn invalid_setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(setting: impl Into<String>) -> Self {
        Self::Missing(setting.into())
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for ConfigError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

//! Broker write-head client
//!
//! A non-blocking `HEAD <broker>/<journal>?block=false&offset=-1` asks the
//! broker for journal metadata without reading any content. The current write
//! offset comes back in the `X-Write-Head` header.

use async_trait::async_trait;
use tracing::trace;

use super::WriteHeadSource;
use crate::error::FetchError;

/// Response header carrying the journal write offset
pub const WRITE_HEAD_HEADER: &str = "X-Write-Head";

/// HTTP client for the broker's journal HEAD endpoint
#[derive(Clone)]
pub struct BrokerClient {
    endpoint: String,
    client: reqwest::Client,
}

impl BrokerClient {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.contains("://") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn journal_url(&self, journal: &str) -> String {
        format!("{}/{}", self.endpoint, journal.trim_start_matches('/'))
    }
}

/// Parse the value of the write-head header
pub(crate) fn parse_write_head(value: Option<&str>) -> Result<i64, FetchError> {
    let value = value.ok_or_else(|| FetchError::invalid_field(WRITE_HEAD_HEADER, "missing header"))?;
    let head = value
        .trim()
        .parse::<i64>()
        .map_err(|e| FetchError::invalid_field(WRITE_HEAD_HEADER, format!("{:?}: {}", value, e)))?;
    if head < 0 {
        return Err(FetchError::invalid_field(
            WRITE_HEAD_HEADER,
            format!("negative offset {}", head),
        ));
    }
    Ok(head)
}

#[async_trait]
impl WriteHeadSource for BrokerClient {
    async fn write_head(&self, journal: &str) -> Result<i64, FetchError> {
        let url = self.journal_url(journal);
        let response = self
            .client
            .head(&url)
            .query(&[("block", "false"), ("offset", "-1")])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(&url, status.as_u16()));
        }

        let header = response
            .headers()
            .get(WRITE_HEAD_HEADER)
            .and_then(|v| v.to_str().ok());
        let head = parse_write_head(header)?;
        trace!(journal = %journal, write_head = head, "Fetched write head");
        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_head() {
        assert_eq!(parse_write_head(Some("1024")).unwrap(), 1024);
        assert_eq!(parse_write_head(Some(" 7 ")).unwrap(), 7);
    }

    #[test]
    fn test_parse_write_head_rejects_bad_values() {
        assert!(matches!(
            parse_write_head(None),
            Err(FetchError::InvalidField { .. })
        ));
        assert!(parse_write_head(Some("abc")).is_err());
        assert!(parse_write_head(Some("-5")).is_err());
    }

    #[test]
    fn test_journal_url() {
        let client = BrokerClient::new("broker:8081/", reqwest::Client::new());
        assert_eq!(
            client.journal_url("/pippio-journals/t/part-000"),
            "http://broker:8081/pippio-journals/t/part-000"
        );
    }
}

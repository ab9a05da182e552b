use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

use crate::error::PublishError;
use crate::publish::publisher::{PresenceBroadcast, StatusLog, StatusRecord};

/**
 * Status log backed by a JSON REST store. Each append POSTs the record to
 * `<base_url>/<path>.json`, which creates a new entry under that path with a
 * store-generated key.
 */
pub struct HttpStatusLog {
    client: Client,
    base_url: String,
}

impl HttpStatusLog {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpStatusLog {
            client: Client::new(),
            base_url: trim_trailing_slashes(base_url.into()),
        }
    }

    fn append_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }
}

#[async_trait]
impl StatusLog for HttpStatusLog {
    async fn append(&self, path: &str, record: &StatusRecord) -> Result<(), PublishError> {
        let url = self.append_url(path);
        debug!("Appending status record to {}", url);

        let response = self.client.post(&url).json(record).send().await?;
        check_status(response.status())
    }
}

/**
 * Presence endpoint taking a form-encoded message and icon tag. Fire and
 * forget; the caller only learns whether the endpoint acknowledged.
 */
pub struct HttpPresenceBroadcast {
    client: Client,
    url: String,
}

impl HttpPresenceBroadcast {
    pub fn new(url: impl Into<String>) -> Self {
        HttpPresenceBroadcast {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl PresenceBroadcast for HttpPresenceBroadcast {
    async fn send(&self, message: &str, icon: &str) -> Result<(), PublishError> {
        debug!("Broadcasting presence {:?} to {}", message, self.url);

        let response = self
            .client
            .post(&self.url)
            .form(&[("message", message), ("icon", icon)])
            .send()
            .await?;
        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> Result<(), PublishError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PublishError::BadStatus {
            status: status.as_u16(),
        })
    }
}

fn trim_trailing_slashes(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_url_joins_base_path_and_extension() {
        let log = HttpStatusLog::new("https://example.test/db");
        assert_eq!(
            log.append_url("user-status/42"),
            "https://example.test/db/user-status/42.json"
        );
    }

    #[test]
    fn trailing_slashes_on_the_base_are_ignored() {
        let log = HttpStatusLog::new("https://example.test/db///");
        assert_eq!(
            log.append_url("user-status/42"),
            "https://example.test/db/user-status/42.json"
        );
    }

    #[test]
    fn non_success_statuses_are_rejected() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert!(check_status(StatusCode::NO_CONTENT).is_ok());

        let err = check_status(StatusCode::UNAUTHORIZED).unwrap_err();
        match err {
            PublishError::BadStatus { status } => assert_eq!(status, 401),
            other => panic!("unexpected error: {}", other),
        }
    }
}

pub mod models;

use std::time::Duration;

use tracing::debug;

use crate::error::{DashError, Result};
use models::Performance;

pub const DEFAULT_BASE_URL: &str = "https://fdaaa.trialstracker.net";

/// How the dashboard reaches the API. The HTTP implementation is used by
/// the binary; tests script responses in memory.
pub trait Transport {
    /// GET `path?query` and parse the body as JSON.
    fn get_json(&self, path: &str, query: &str) -> Result<serde_json::Value>;

    /// GET `path?query` and return the body as text (CSV exports).
    fn get_text(&self, path: &str, query: &str) -> Result<String>;
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(DashError::InvalidUrl(base_url));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { base_url, client })
    }

    pub fn url(&self, path: &str, query: &str) -> String {
        join_url(&self.base_url, path, query)
    }

    fn get(&self, path: &str, query: &str) -> Result<reqwest::blocking::Response> {
        let url = self.url(path, query);
        debug!("GET {url}");
        let resp = self.client.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(resp)
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, path: &str, query: &str) -> Result<serde_json::Value> {
        let body = self.get(path, query)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn get_text(&self, path: &str, query: &str) -> Result<String> {
        Ok(self.get(path, query)?.text()?)
    }
}

/// `base` + `path`, with `?query` appended only when there is one.
pub fn join_url(base: &str, path: &str, query: &str) -> String {
    if query.is_empty() {
        format!("{base}{path}")
    } else {
        format!("{base}{path}?{query}")
    }
}

/// Fetch the numbers behind the performance card.
pub fn fetch_performance(transport: &dyn Transport, query: &str) -> Result<Performance> {
    let json = transport.get_json("/api/performance/", query)?;
    Ok(serde_json::from_value(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_base_without_scheme() {
        let err = HttpTransport::new("localhost:8000", Duration::from_secs(1));
        assert!(matches!(err, Err(DashError::InvalidUrl(_))));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let t = HttpTransport::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            t.url("/api/trials/", "status=overdue"),
            "http://localhost:8000/api/trials/?status=overdue"
        );
        assert_eq!(t.url("/api/trials/", ""), "http://localhost:8000/api/trials/");
    }
}

use reqwest::{Client, Url};

use crate::app_config::HttpConfig;
use crate::errors::SourceError;
use crate::types::Page;

use super::{EventTransport, PageQuery};

/// Event API transport over reqwest.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SourceError::InvalidEndpoint(format!("{}: {e}", config.base_url)))?;
        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Resolve an endpoint path (or absolute URL) against the base URL.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(endpoint)
            .map_err(|e| SourceError::InvalidEndpoint(format!("{endpoint}: {e}")))
    }
}

#[async_trait::async_trait]
impl EventTransport for HttpTransport {
    async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Page, SourceError> {
        let url = self.resolve(endpoint)?;
        let mut request = self.client.get(url).query(&query.to_pairs());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> Result<HttpTransport, SourceError> {
        HttpTransport::new(&HttpConfig {
            base_url: base_url.to_string(),
            ..HttpConfig::default()
        })
    }

    #[test]
    fn resolves_relative_endpoint_against_base() {
        let t = transport("https://tower.example.com").unwrap();
        let url = t.resolve("/api/v2/jobs/42/job_events/").unwrap();
        assert_eq!(url.as_str(), "https://tower.example.com/api/v2/jobs/42/job_events/");
    }

    #[test]
    fn absolute_endpoint_wins_over_base() {
        let t = transport("https://tower.example.com").unwrap();
        let url = t.resolve("https://other.example.com/api/v2/jobs/1/job_events/").unwrap();
        assert_eq!(url.host_str(), Some("other.example.com"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = transport("not a url").err().unwrap();
        assert!(matches!(err, SourceError::InvalidEndpoint(_)));
    }
}

// JSON sensor source over HTTP(S) or the local filesystem
use crate::application::sensor_source::{RetrievalError, SensorSource};
use crate::infrastructure::config::{prepare_source, ChartSettings};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(String),
    File(PathBuf),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            SourceLocation::Http(location.to_string())
        } else {
            SourceLocation::File(PathBuf::from(location))
        }
    }

    fn is_http(location: &str) -> bool {
        matches!(Self::parse(location), SourceLocation::Http(_))
    }
}

#[derive(Debug, Clone)]
pub struct JsonSensorSource {
    location: SourceLocation,
    client: reqwest::Client,
}

impl JsonSensorSource {
    pub fn new(location: SourceLocation) -> Self {
        Self {
            location,
            client: reqwest::Client::new(),
        }
    }

    /// Source for a chart, with `${hours}` and `${chart_id}` substituted.
    pub fn from_settings(settings: &ChartSettings) -> Self {
        let template = &settings.data_source;
        let resolved = prepare_source(
            template,
            &settings.source_vars(),
            SourceLocation::is_http(template),
        );
        Self::new(SourceLocation::parse(&resolved))
    }

    async fn fetch_http(&self, url: &str) -> Result<Value, RetrievalError> {
        tracing::debug!("Fetching data from URL: {}", url);
        let network = |e: reqwest::Error| RetrievalError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(network)?;

        if !response.status().is_success() {
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(network)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_file(&self, path: &Path) -> Result<Value, RetrievalError> {
        tracing::debug!("Reading data from local file: {}", path.display());
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| RetrievalError::File {
                path: path.display().to_string(),
                source,
            })?;
        Ok(serde_json::from_slice(&content)?)
    }
}

#[async_trait]
impl SensorSource for JsonSensorSource {
    fn describe(&self) -> String {
        match &self.location {
            SourceLocation::Http(url) => url.clone(),
            SourceLocation::File(path) => path.display().to_string(),
        }
    }

    async fn fetch(&self) -> Result<Value, RetrievalError> {
        match &self.location {
            SourceLocation::Http(url) => self.fetch_http(url).await,
            SourceLocation::File(path) => self.fetch_file(path).await,
        }
    }
}

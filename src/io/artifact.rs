//! HTTP client for the model artifact service.
//!
//! The service stores trained models under `/models` and user-edited models
//! under `/saved-models`. Every failure is reported as an `AppError` and never
//! touches in-memory edit state.

use log::{debug, info};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ModelResult;
use crate::error::AppError;
use crate::io::model::{model_from_value, model_to_value};

pub const ARTIFACT_URL_ENV: &str = "SHAPES_ARTIFACT_URL";

/// Which collection an artifact lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Trained,
    Saved,
}

impl ArtifactKind {
    fn path(self) -> &'static str {
        match self {
            ArtifactKind::Trained => "models",
            ArtifactKind::Saved => "saved-models",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    models: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    name: &'a str,
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    saved: String,
}

pub struct ArtifactClient {
    client: Client,
    base_url: String,
}

impl ArtifactClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(ARTIFACT_URL_ENV)
            .map_err(|_| AppError::new(2, format!("Missing {ARTIFACT_URL_ENV} in environment (.env).")))?;
        Ok(Self::new(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<String>, AppError> {
        let url = format!("{}/{}", self.base_url, kind.path());
        let body: ModelList = self.get_json(&url)?;
        Ok(body.models)
    }

    pub fn fetch(&self, kind: ArtifactKind, name: &str) -> Result<ModelResult, AppError> {
        let url = format!("{}/{}/{}", self.base_url, kind.path(), artifact_file_name(name)?);
        let value: Value = self.get_json(&url)?;
        let model = model_from_value(value)?;
        info!("fetched artifact '{name}' ({} features)", model.partials.len());
        Ok(model)
    }

    /// Store an edited model; returns the file name the service saved it under.
    pub fn save(&self, name: &str, model: &ModelResult) -> Result<String, AppError> {
        let file_name = artifact_file_name(name)?;
        let url = format!("{}/{}", self.base_url, ArtifactKind::Saved.path());
        let request = SaveRequest {
            name: &file_name,
            payload: model_to_value(model)?,
        };
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| AppError::new(4, format!("Artifact save failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Artifact save failed with status {}.", resp.status()),
            ));
        }
        let body: SaveResponse = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse save response: {e}")))?;
        info!("saved artifact as '{}'", body.saved);
        Ok(body.saved)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::new(4, format!("Artifact request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Artifact request failed with status {}.", resp.status()),
            ));
        }
        resp.json()
            .map_err(|e| AppError::new(4, format!("Failed to parse artifact response: {e}")))
    }
}

/// Reduce a user-supplied name to a bare `.json` file name.
pub fn artifact_file_name(name: &str) -> Result<String, AppError> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::new(2, format!("Invalid artifact name '{name}'.")));
    }
    if base.ends_with(".json") {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sanitised() {
        assert_eq!(artifact_file_name("bike").unwrap(), "bike.json");
        assert_eq!(artifact_file_name("../../etc/bike.json").unwrap(), "bike.json");
        assert_eq!(artifact_file_name("dir\\adult").unwrap(), "adult.json");
        assert!(artifact_file_name("models/").is_err());
        assert!(artifact_file_name("..").is_err());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        assert_eq!(ArtifactClient::new("http://localhost:8000/").base_url(), "http://localhost:8000");
    }
}

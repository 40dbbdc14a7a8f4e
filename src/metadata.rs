//! Metadata upload gateway
//!
//! Before a market is created its image and descriptive fields are pinned on
//! a content-addressed storage gateway, which answers with the metadata URI
//! that goes into the `create` instruction. The engine only depends on
//! [`MetadataGateway`]; [`HttpMetadataGateway`] talks to the pump.fun IPFS
//! endpoint over `multipart/form-data`.

use crate::errors::{EngineError, GatewayErrorKind};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_METADATA_URL: &str = "https://pump.fun/api/ipfs";

/// Token description and image to pin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpload {
    pub name: String,
    pub symbol: String,
    pub description: String,
    #[serde(skip)]
    pub image: Vec<u8>,
    pub image_file_name: String,
    /// e.g. `image/png`
    pub image_mime: String,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

impl MetadataUpload {
    /// Reject uploads the gateway would refuse, before any I/O
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.image.is_empty() {
            return Err(EngineError::validation("metadata image is empty"));
        }
        if !self.image_mime.starts_with("image/") {
            return Err(EngineError::validation(format!(
                "metadata image mime type {:?} is not an image",
                self.image_mime
            )));
        }
        if self.name.trim().is_empty() || self.symbol.trim().is_empty() {
            return Err(EngineError::validation("metadata name and symbol must not be empty"));
        }
        Ok(())
    }

    fn into_form(self) -> Result<Form, EngineError> {
        let file = Part::bytes(self.image)
            .file_name(self.image_file_name)
            .mime_str(&self.image_mime)
            .map_err(|e| EngineError::validation(format!("invalid image mime type: {}", e)))?;

        Ok(Form::new()
            .part("file", file)
            .text("name", self.name)
            .text("symbol", self.symbol)
            .text("description", self.description)
            .text("twitter", self.twitter.unwrap_or_default())
            .text("telegram", self.telegram.unwrap_or_default())
            .text("website", self.website.unwrap_or_default())
            .text("showName", "true"))
    }
}

/// Gateway answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMetadata {
    #[serde(rename = "metadataUri")]
    pub metadata_uri: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(rename = "metadataUri")]
    metadata_uri: Option<String>,
    #[serde(default)]
    metadata: Option<GatewayMetadata>,
}

#[derive(Debug, Deserialize)]
struct GatewayMetadata {
    name: Option<String>,
    symbol: Option<String>,
    image: Option<String>,
}

#[async_trait]
pub trait MetadataGateway: Send + Sync {
    async fn upload(&self, upload: &MetadataUpload) -> Result<UploadedMetadata, EngineError>;
}

pub struct HttpMetadataGateway {
    http: reqwest::Client,
    url: String,
}

impl HttpMetadataGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::External(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_response(status: reqwest::StatusCode, body: &str) -> Result<UploadedMetadata, EngineError> {
        if !status.is_success() {
            return Err(EngineError::gateway(
                GatewayErrorKind::Status(status.as_u16()),
                body.chars().take(200).collect::<String>(),
            ));
        }
        if body.trim().is_empty() {
            return Err(EngineError::gateway(GatewayErrorKind::EmptyBody, "gateway answered with an empty body"));
        }

        let parsed: GatewayResponse = serde_json::from_str(body)
            .map_err(|e| EngineError::gateway(GatewayErrorKind::MalformedJson, e.to_string()))?;
        let metadata_uri = parsed
            .metadata_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| EngineError::gateway(GatewayErrorKind::MalformedJson, "response has no metadataUri"))?;

        let (name, symbol, image) = match parsed.metadata {
            Some(m) => (m.name, m.symbol, m.image),
            None => (None, None, None),
        };
        Ok(UploadedMetadata {
            metadata_uri,
            name,
            symbol,
            image,
        })
    }
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn upload(&self, upload: &MetadataUpload) -> Result<UploadedMetadata, EngineError> {
        upload.validate()?;
        let symbol = upload.symbol.clone();
        let form = upload.clone().into_form()?;

        debug!(url = %self.url, symbol = %symbol, bytes = upload.image.len(), "Uploading token metadata");

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineError::gateway(GatewayErrorKind::Transport, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::gateway(GatewayErrorKind::Transport, e.to_string()))?;

        match Self::parse_response(status, &body) {
            Ok(uploaded) => {
                info!(symbol = %symbol, uri = %uploaded.metadata_uri, "Metadata pinned");
                Ok(uploaded)
            }
            Err(e) => {
                warn!(symbol = %symbol, status = %status, error = %e, "Metadata upload failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn upload() -> MetadataUpload {
        MetadataUpload {
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            description: "a token".to_string(),
            image: vec![0x89, 0x50, 0x4e, 0x47],
            image_file_name: "logo.png".to_string(),
            image_mime: "image/png".to_string(),
            twitter: None,
            telegram: None,
            website: Some("https://example.org".to_string()),
        }
    }

    #[test]
    fn test_validate() {
        assert!(upload().validate().is_ok());

        let mut empty = upload();
        empty.image.clear();
        assert!(matches!(empty.validate(), Err(EngineError::Validation(_))));

        let mut not_image = upload();
        not_image.image_mime = "text/plain".to_string();
        assert!(matches!(not_image.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"metadataUri":"https://ipfs.io/ipfs/Qm123","metadata":{"name":"Test","symbol":"TST"}}"#;
        let uploaded = HttpMetadataGateway::parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(uploaded.metadata_uri, "https://ipfs.io/ipfs/Qm123");
        assert_eq!(uploaded.symbol.as_deref(), Some("TST"));
        assert!(uploaded.image.is_none());
    }

    #[test]
    fn test_parse_failures() {
        let err = HttpMetadataGateway::parse_response(StatusCode::INTERNAL_SERVER_ERROR, "boom").unwrap_err();
        assert!(matches!(err, EngineError::Gateway { kind: GatewayErrorKind::Status(500), .. }));

        let err = HttpMetadataGateway::parse_response(StatusCode::OK, "  ").unwrap_err();
        assert!(matches!(err, EngineError::Gateway { kind: GatewayErrorKind::EmptyBody, .. }));

        let err = HttpMetadataGateway::parse_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, EngineError::Gateway { kind: GatewayErrorKind::MalformedJson, .. }));

        let err = HttpMetadataGateway::parse_response(StatusCode::OK, r#"{"metadata":{}}"#).unwrap_err();
        assert!(matches!(err, EngineError::Gateway { kind: GatewayErrorKind::MalformedJson, .. }));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP client for the external text recognition service.
//
// Wire format: `POST <endpoint>` with `{"image": "data:<mime>;base64,<...>"}`.
// Success answers `{"text": "..."}`; failures answer `{"error": "..."}`,
// usually with a non-2xx status.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lipika_core::config::RecognitionConfig;
use lipika_core::error::{LipikaError, Result};
use lipika_core::types::PageImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::gateway::{FailureClassifier, Recognizer};

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RecognizeResponse {
    text: Option<String>,
    error: Option<String>,
}

/// [`Recognizer`] backed by the HTTP recognition endpoint.
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    classifier: FailureClassifier,
}

impl HttpRecognizer {
    /// Build a client from the recognition section of the configuration.
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LipikaError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            classifier: FailureClassifier::from_config(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `data:<mime>;base64,<payload>` for a page image.
pub fn data_url(page: &PageImage) -> String {
    format!(
        "data:{};base64,{}",
        page.encoding.mime_type(),
        STANDARD.encode(&page.data)
    )
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, bytes_len = page.data.len()))]
    async fn recognize(&self, page: &PageImage) -> Result<String> {
        let image = data_url(page);
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&RecognizeRequest { image: &image });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LipikaError::Recognition(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LipikaError::Recognition(format!("reading response: {e}")))?;

        let parsed = serde_json::from_str::<RecognizeResponse>(&body);
        if !status.is_success() {
            let message = match parsed {
                Ok(RecognizeResponse { error: Some(error), .. }) => error,
                _ => format!("{status}: {}", body.trim()),
            };
            warn!(status = status.as_u16(), %message, "Recognition call failed");
            return Err(self.classifier.to_error(Some(status.as_u16()), message));
        }

        match parsed {
            Ok(RecognizeResponse { error: Some(error), .. }) => {
                warn!(%error, "Recognition service reported an error");
                Err(self.classifier.to_error(None, error))
            }
            Ok(RecognizeResponse { text, .. }) => {
                let text = text.unwrap_or_default();
                debug!(chars = text.chars().count(), "Page recognised");
                Ok(text)
            }
            Err(e) => Err(LipikaError::Recognition(format!("malformed response: {e}"))),
        }
    }
}

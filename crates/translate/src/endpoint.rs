use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid endpoint url `{0}`")]
    InvalidUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// 翻譯請求，每次送出時重新建立。 / Body of one translation submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub code: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 格式正確的回應所代表的結果。 / Meaning of a well-formed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointReply {
    Translated(String),
    /// Logical failure with the server's message, if it sent one.
    Rejected(Option<String>),
}

impl TranslationResponse {
    pub fn translated(code: impl Into<String>) -> Self {
        Self {
            success: true,
            translated_code: Some(code.into()),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            translated_code: None,
            message: Some(message.into()),
        }
    }

    pub fn into_reply(self) -> Result<EndpointReply, EndpointError> {
        match (self.success, self.translated_code) {
            (true, Some(code)) => Ok(EndpointReply::Translated(code)),
            (true, None) => Err(EndpointError::Malformed(
                "success without translated_code".to_string(),
            )),
            (false, _) => Ok(EndpointReply::Rejected(
                self.message.filter(|message| !message.trim().is_empty()),
            )),
        }
    }
}

/// 遠端翻譯服務。 / Remote translation service seam.
#[async_trait(?Send)]
pub trait TranslationEndpoint {
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse, EndpointError>;
}

/// 以 HTTP JSON 呼叫翻譯服務。 / JSON-over-HTTP client for the translation service.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EndpointError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(EndpointError::InvalidUrl(base_url));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EndpointError::Client)?;
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    /// 使用既有的 client，例如自訂代理設定。 / Wraps a preconfigured client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `GET /api/languages`
    pub async fn fetch_languages(&self) -> Result<Vec<String>, EndpointError> {
        let url = self.url("api/languages");
        self.get_list(&url, &[]).await
    }

    /// `GET /api/search_languages?q=...`; the service returns every language when nothing matches.
    pub async fn search_languages(&self, query: &str) -> Result<Vec<String>, EndpointError> {
        let url = self.url("api/search_languages");
        self.get_list(&url, &[("q", query)]).await
    }

    async fn get_list(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<String>, EndpointError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| EndpointError::Transport {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(EndpointError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response
            .json::<Vec<String>>()
            .await
            .map_err(|source| EndpointError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

#[async_trait(?Send)]
impl TranslationEndpoint for HttpEndpoint {
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse, EndpointError> {
        let url = self.url("api/translate");
        info!(
            url = %url,
            source_lang = %request.source_lang,
            target_lang = %request.target_lang,
            "sending translation request"
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| EndpointError::Transport {
                url: url.clone(),
                source,
            })?;

        // Validation failures come back as 4xx with a regular JSON body.
        let status = response.status();
        let body = response
            .json::<TranslationResponse>()
            .await
            .map_err(|source| EndpointError::Decode {
                url: url.clone(),
                source,
            })?;
        debug!(status = status.as_u16(), success = body.success, "translation response");
        Ok(body)
    }
}

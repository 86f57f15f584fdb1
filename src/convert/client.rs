//! HTTP client for the conversion API

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ConvertError, GENERIC_FAILURE_MESSAGE};
use crate::config::ConverterConfig;

const KEY_HEADER: &str = "x-rapidapi-key";
const HOST_HEADER: &str = "x-rapidapi-host";

/// A finished conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub title: String,
    pub link: String,
}

/// Reply body of `GET /dl`
#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default)]
    status: String,
    title: Option<String>,
    link: Option<String>,
    msg: Option<String>,
}

/// Client for the conversion API, built once at startup
#[derive(Debug, Clone)]
pub struct Converter {
    client: Client,
    endpoint: String,
}

impl Converter {
    pub fn new(config: &ConverterConfig) -> Result<Self, ConvertError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().and_then(header_value) {
            headers.insert(KEY_HEADER, key);
        }
        if let Some(host) = config.api_host.as_deref().and_then(header_value) {
            headers.insert(HOST_HEADER, host);
        }
        if headers.is_empty() {
            tracing::warn!("Conversion API credentials are not configured");
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the upstream service for an MP3 of `video_id`. Attempted once.
    pub async fn convert(&self, video_id: &str) -> Result<Conversion, ConvertError> {
        let url = format!("{}/dl", self.endpoint);
        tracing::debug!("Requesting conversion of {}", video_id);

        let response = self
            .client
            .get(&url)
            .query(&[("id", video_id)])
            .send()
            .await
            .map_err(upstream_failure)?;

        let status = response.status();
        let text = response.text().await.map_err(upstream_failure)?;

        let reply: DownloadResponse = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Unreadable reply from conversion API ({}): {}", status, e);
                return Err(ConvertError::Upstream(status.to_string()));
            }
        };

        match (reply.status.as_str(), reply.title, reply.link) {
            ("ok", Some(title), Some(link)) => Ok(Conversion { title, link }),
            _ => {
                let msg = reply
                    .msg
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("Conversion failed ({})", reply.status));
                tracing::warn!("Conversion of {} failed: {}", video_id, msg);
                Err(ConvertError::Upstream(msg))
            }
        }
    }
}

fn header_value(value: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(value.trim()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Ignoring unusable API header value: {}", e);
            None
        }
    }
}

fn upstream_failure(err: reqwest::Error) -> ConvertError {
    if err.is_timeout() {
        tracing::warn!("Conversion API timed out: {}", err);
        ConvertError::UpstreamTimeout
    } else {
        tracing::error!("Error fetching data: {}", err);
        ConvertError::Upstream(GENERIC_FAILURE_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn dl(Query(q): Query<HashMap<String, String>>, headers: AxumHeaders) -> Json<Value> {
        let id = q.get("id").cloned().unwrap_or_default();
        if headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("test-key") {
            return Json(json!({"status": "fail", "msg": "Invalid API key"}));
        }
        match id.as_str() {
            "good" => Json(json!({
                "status": "ok",
                "title": "Good Song",
                "link": "https://cdn.example.com/good.mp3"
            })),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({"status": "ok", "title": "late", "link": "late"}))
            }
            _ => Json(json!({"status": "fail", "msg": "Video not found"})),
        }
    }

    async fn stub_upstream() -> String {
        let app = Router::new()
            .route("/dl", get(dl))
            .route("/broken/dl", get(|| async { "<html>oops</html>" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn converter(endpoint: &str, key: &str) -> Converter {
        Converter::new(&ConverterConfig {
            endpoint: endpoint.to_string(),
            api_key: Some(key.to_string()),
            api_host: Some("localhost".to_string()),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_conversion() {
        let endpoint = stub_upstream().await;
        let conversion = converter(&endpoint, "test-key").convert("good").await.unwrap();
        assert_eq!(conversion.title, "Good Song");
        assert_eq!(conversion.link, "https://cdn.example.com/good.mp3");
    }

    #[tokio::test]
    async fn test_upstream_message_is_verbatim() {
        let endpoint = stub_upstream().await;
        let err = converter(&endpoint, "test-key").convert("missing").await.unwrap_err();
        assert_eq!(err.user_message(), "Video not found");

        let err = converter(&endpoint, "wrong-key").convert("good").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_non_json_reply() {
        let endpoint = stub_upstream().await;
        let err = converter(&format!("{}/broken", endpoint), "test-key")
            .convert("good")
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let endpoint = stub_upstream().await;
        let err = converter(&endpoint, "test-key").convert("slow").await.unwrap_err();
        assert!(matches!(err, ConvertError::UpstreamTimeout));
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        // Port 9 (discard) is closed on test machines
        let err = converter("http://127.0.0.1:9", "test-key")
            .convert("good")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Upstream(_) | ConvertError::UpstreamTimeout
        ));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, EmbeddingConfig, EmbeddingMode, EmbeddingProvider};

// Process-wide HTTP client with connection pooling. The transport-level
// timeout is a backstop; the real deadline is applied per call by
// `embed_with_timeout`.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

/// Embedding provider backed by an OpenAI-style `/embeddings` endpoint.
///
/// Sends `{"model": ..., "input": [text]}` and expects
/// `{"data": [{"embedding": [...]}]}` back. Transport failures and 429/5xx
/// responses are retried with exponential backoff up to the configured
/// retry budget; 4xx responses are not retried.
pub struct RemoteEmbedder {
    url: String,
    model_name: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
    normalize: bool,
}

impl RemoteEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self, EmbedError> {
        if cfg.mode != EmbeddingMode::Remote {
            return Err(EmbedError::InvalidConfig(
                "RemoteEmbedder requires mode = remote".into(),
            ));
        }
        cfg.validate()?;
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| EmbedError::InvalidConfig("api_url is required for remote mode".into()))?;
        Ok(Self {
            url,
            model_name: cfg.model_name.clone(),
            api_key: cfg.resolve_api_key(),
            max_retries: cfg.max_retries,
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
            normalize: cfg.normalize,
        })
    }

    fn build_payload(&self, text: &str) -> Value {
        json!({
            "model": self.model_name,
            "input": [text],
        })
    }

    async fn send_once(&self, payload: &Value) -> Result<Value, RequestFailure> {
        let mut request = HTTP_CLIENT.post(&self.url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RequestFailure::retryable(format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!("HTTP {status}: {body}");
            return if is_retryable_status(status.as_u16()) {
                Err(RequestFailure::retryable(detail))
            } else {
                Err(RequestFailure::fatal(detail))
            };
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RequestFailure::fatal(format!("invalid JSON body: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let payload = self.build_payload(text);
        let mut backoff = self.retry_backoff;
        let mut last_failure = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!(attempt, error = %last_failure, "retrying embedding call");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            match self.send_once(&payload).await {
                Ok(body) => {
                    let mut vector = parse_embedding_response(&body)?;
                    if self.normalize {
                        l2_normalize_in_place(&mut vector);
                    }
                    return Ok(vector);
                }
                Err(failure) if failure.retryable => last_failure = failure.detail,
                Err(failure) => return Err(EmbedError::Unavailable(failure.detail)),
            }
        }

        Err(EmbedError::Unavailable(format!(
            "exhausted {} retries: {last_failure}",
            self.max_retries
        )))
    }
}

struct RequestFailure {
    detail: String,
    retryable: bool,
}

impl RequestFailure {
    fn retryable(detail: String) -> Self {
        Self {
            detail,
            retryable: true,
        }
    }

    fn fatal(detail: String) -> Self {
        Self {
            detail,
            retryable: false,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Extract the first embedding vector from an OpenAI-style response body.
fn parse_embedding_response(body: &Value) -> Result<Vec<f32>, EmbedError> {
    let entry = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .ok_or_else(|| EmbedError::Malformed("missing data[0] in response".into()))?;

    let values = entry
        .get("embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| EmbedError::Malformed("missing data[0].embedding in response".into()))?;

    if values.is_empty() {
        return Err(EmbedError::Malformed("provider returned an empty vector".into()));
    }

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbedError::Malformed("non-numeric embedding component".into()))
        })
        .collect()
}

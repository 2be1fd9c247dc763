//! Veo (Google) video generation backend.

use crate::credential::{ApiKey, CredentialStore, DEFAULT_KEY_VAR};
use crate::error::{parse_retry_after, sanitize_error_message, BackendError, Result, StudioError};
use crate::video::backend::{BackendResult, VideoBackend};
use crate::video::types::{GenerationRequest, JobHandle, JobOutput, JobStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini Developer API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VeoModel {
    /// Veo 3.1 Fast Preview - lower latency, used by the studio.
    #[default]
    Veo31FastPreview,
    /// Veo 3.1 Preview - full quality.
    Veo31Preview,
}

impl VeoModel {
    /// Returns the Gemini Developer API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo31FastPreview => "veo-3.1-fast-generate-preview",
            Self::Veo31Preview => "veo-3.1-generate-preview",
        }
    }
}

/// Builder for [`VeoBackend`].
#[derive(Debug, Clone, Default)]
pub struct VeoBackendBuilder {
    api_key: Option<String>,
    credentials: Option<CredentialStore>,
    model: VeoModel,
    base_url: Option<String>,
    client: Option<reqwest::Client>,
}

impl VeoBackendBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the key store with `key`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Shares an existing key store.
    ///
    /// Without one, a fresh store is created and seeded from `GOOGLE_API_KEY`
    /// when that variable is set.
    pub fn credentials(mut self, store: CredentialStore) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Sets the Veo model variant.
    pub fn model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Uses a preconfigured HTTP client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the backend.
    pub fn build(self) -> Result<VeoBackend> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(StudioError::InvalidRequest(format!(
                "base URL must be http(s): {base_url}"
            )));
        }

        let explicit_store = self.credentials.is_some();
        let credentials = self.credentials.unwrap_or_default();
        let seed = self.api_key.or_else(|| {
            if explicit_store {
                None
            } else {
                std::env::var(DEFAULT_KEY_VAR).ok()
            }
        });
        if let Some(key) = seed.and_then(ApiKey::new) {
            credentials.set(key);
        }

        Ok(VeoBackend {
            client: self.client.unwrap_or_default(),
            credentials,
            model: self.model,
            base_url,
        })
    }
}

/// Veo video generation over the Gemini Developer API.
///
/// The key is read from the shared [`CredentialStore`] on every request.
pub struct VeoBackend {
    client: reqwest::Client,
    credentials: CredentialStore,
    model: VeoModel,
    base_url: String,
}

impl VeoBackend {
    /// Creates a new `VeoBackendBuilder`.
    pub fn builder() -> VeoBackendBuilder {
        VeoBackendBuilder::new()
    }

    /// Returns the key store this backend reads from.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Checks that the selected key can reach the model.
    pub async fn check_key(&self) -> BackendResult<()> {
        let key = self.key()?;
        let url = format!("{}/models/{}", self.base_url, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", key.expose())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &text, &headers))
    }

    fn key(&self) -> BackendResult<ApiKey> {
        self.credentials.get().ok_or(BackendError::MissingKey)
    }

    async fn read_operation(&self, response: reqwest::Response) -> BackendResult<VeoOperation> {
        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }
        let text = response.text().await?;
        parse_operation(&text)
    }
}

#[async_trait]
impl VideoBackend for VeoBackend {
    async fn submit_job(
        &self,
        request: &GenerationRequest,
    ) -> BackendResult<(JobHandle, JobStatus)> {
        let key = self.key()?;
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url,
            self.model.as_str()
        );
        let body = VeoRequest::from_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key.expose())
            .json(&body)
            .send()
            .await?;

        let operation = self.read_operation(response).await?;
        let handle = JobHandle::new(operation.name.clone());
        Ok((handle, operation.into_status()))
    }

    async fn poll_job(&self, handle: &JobHandle) -> BackendResult<JobStatus> {
        let key = self.key()?;
        let url = format!("{}/{}", self.base_url, handle.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", key.expose())
            .send()
            .await?;

        Ok(self.read_operation(response).await?.into_status())
    }

    async fn fetch_bytes(&self, uri: &str, key: &ApiKey) -> BackendResult<Vec<u8>> {
        let url = download_url(uri, key)?;

        // reqwest errors carry the request URL, which holds the key here.
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", key.expose())
            .send()
            .await
            .map_err(|e| BackendError::Network(e.without_url()))?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response
                .bytes()
                .await
                .map_err(|e| BackendError::Network(e.without_url()))?
                .to_vec()),
            401 | 403 => Err(BackendError::CredentialRejected(
                "video download refused the API key".into(),
            )),
            _ => Err(BackendError::Api {
                status,
                message: "failed to download video".into(),
            }),
        }
    }

    fn model(&self) -> &str {
        self.model.as_str()
    }

    fn name(&self) -> &str {
        "Veo (Google)"
    }
}

impl std::fmt::Debug for VeoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeoBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Appends the key as a `key` query parameter, as the download endpoint
/// requires.
fn download_url(uri: &str, key: &ApiKey) -> BackendResult<String> {
    if uri.starts_with("gs://") {
        return Err(BackendError::UnexpectedResponse(format!(
            "Veo returned a Google Cloud Storage URI ({uri}) which cannot be downloaded directly"
        )));
    }
    let sep = if uri.contains('?') { '&' } else { '?' };
    Ok(format!("{uri}{sep}key={}", key.expose()))
}

/// Decodes an operation body; a malformed body is a `Json` error, not a
/// network one.
fn parse_operation(text: &str) -> BackendResult<VeoOperation> {
    Ok(serde_json::from_str(text)?)
}

/// Maps an HTTP error response onto a failure kind.
fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> BackendError {
    let body: Option<ApiErrorBody> = serde_json::from_str(text).ok();
    let (message, rpc_status) = match body {
        Some(ApiErrorBody { error }) => (error.message.unwrap_or_default(), error.status),
        None => (text.to_string(), None),
    };
    let message = sanitize_error_message(&message);

    if is_rejected_key(Some(status), rpc_status.as_deref(), &message) {
        return BackendError::CredentialRejected(message);
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return BackendError::RateLimited { retry_after };
    }
    if is_blocked(&message) {
        return BackendError::ContentBlocked(message);
    }
    if status == 400 {
        return BackendError::InvalidRequest(message);
    }
    BackendError::Api { status, message }
}

/// True if the backend is telling us the key itself is unusable.
///
/// A 404 on these endpoints means the key's project has no access to the
/// model ("Requested entity was not found").
fn is_rejected_key(http_status: Option<u16>, rpc_status: Option<&str>, message: &str) -> bool {
    if matches!(http_status, Some(401 | 403 | 404)) {
        return true;
    }
    if matches!(
        rpc_status,
        Some("UNAUTHENTICATED" | "PERMISSION_DENIED" | "NOT_FOUND")
    ) {
        return true;
    }
    let lower = message.to_lowercase();
    lower.contains("entity was not found") || lower.contains("api key not valid")
}

fn is_blocked(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
}

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    number_of_videos: u32,
    resolution: String,
    aspect_ratio: String,
}

impl VeoRequest {
    fn from_request(req: &GenerationRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
            }],
            parameters: VeoParameters {
                number_of_videos: req.number_of_videos(),
                resolution: req.resolution.clone(),
                aspect_ratio: req.aspect_ratio.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct VeoOperation {
    name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoRpcStatus>,
}

impl VeoOperation {
    fn into_status(self) -> JobStatus {
        if let Some(err) = self.error {
            return JobStatus::Failed(err.into_error());
        }
        if !self.done.unwrap_or(false) {
            return JobStatus::Pending;
        }

        let Some(gen_resp) = self.response.and_then(|r| r.generate_video_response) else {
            return JobStatus::Done(JobOutput::default());
        };

        let samples = gen_resp.generated_samples.unwrap_or_default();
        if samples.is_empty() && gen_resp.rai_media_filtered_count.unwrap_or(0) > 0 {
            let reason = gen_resp
                .rai_media_filtered_reasons
                .and_then(|r| r.into_iter().next())
                .unwrap_or_else(|| "Video was filtered by Veo safety filters".into());
            return JobStatus::Failed(BackendError::ContentBlocked(reason));
        }

        let video_uri = samples
            .into_iter()
            .next()
            .and_then(|s| s.video)
            .and_then(|v| v.uri);
        JobStatus::Done(JobOutput { video_uri })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}

/// `google.rpc.Status` as embedded in a finished operation.
#[derive(Debug, Deserialize)]
struct VeoRpcStatus {
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: Option<String>,
}

impl VeoRpcStatus {
    fn into_error(self) -> BackendError {
        let message = sanitize_error_message(
            self.message.as_deref().unwrap_or("Unknown error"),
        );
        // 5 NOT_FOUND, 7 PERMISSION_DENIED, 16 UNAUTHENTICATED
        let rpc_status = match self.code {
            Some(5) => Some("NOT_FOUND"),
            Some(7) => Some("PERMISSION_DENIED"),
            Some(16) => Some("UNAUTHENTICATED"),
            _ => None,
        };
        if is_rejected_key(None, rpc_status, &message) {
            BackendError::CredentialRejected(message)
        } else if is_blocked(&message) {
            BackendError::ContentBlocked(message)
        } else {
            BackendError::JobFailed(message)
        }
    }
}

/// Error envelope of a failed HTTP call.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn key(raw: &str) -> ApiKey {
        ApiKey::new(raw).unwrap()
    }

    fn operation(json: &str) -> JobStatus {
        serde_json::from_str::<VeoOperation>(json)
            .unwrap()
            .into_status()
    }

    #[test]
    fn test_veo_model_as_str() {
        assert_eq!(
            VeoModel::default().as_str(),
            "veo-3.1-fast-generate-preview"
        );
        assert_eq!(VeoModel::Veo31Preview.as_str(), "veo-3.1-generate-preview");
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let backend = VeoBackendBuilder::new().api_key("test-key").build().unwrap();
        assert_eq!(backend.credentials().get().unwrap().expose(), "test-key");
        assert_eq!(backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_builder_shares_store() {
        let store = CredentialStore::new();
        let backend = VeoBackendBuilder::new()
            .credentials(store.clone())
            .build()
            .unwrap();
        assert!(!backend.credentials().is_selected());

        store.set(key("late-key"));
        assert_eq!(backend.key().unwrap().expose(), "late-key");
    }

    #[test]
    fn test_builder_base_url() {
        let backend = VeoBackendBuilder::new()
            .api_key("k")
            .base_url("http://localhost:8080/v1beta/")
            .build()
            .unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080/v1beta");

        let result = VeoBackendBuilder::new().base_url("ftp://nope").build();
        assert!(matches!(result, Err(StudioError::InvalidRequest(_))));
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = GenerationRequest::new("Ocean waves").with_resolution("720p");
        let json = serde_json::to_value(VeoRequest::from_request(&req)).unwrap();

        assert_eq!(json["instances"][0]["prompt"], "Ocean waves");
        assert_eq!(json["parameters"]["numberOfVideos"], 1);
        assert_eq!(json["parameters"]["resolution"], "720p");
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
    }

    #[test]
    fn test_operation_not_done_is_pending() {
        let status = operation(r#"{"name": "models/veo/operations/123", "done": false}"#);
        assert!(matches!(status, JobStatus::Pending));

        let status = operation(r#"{"name": "models/veo/operations/123"}"#);
        assert!(matches!(status, JobStatus::Pending));
    }

    #[test]
    fn test_operation_done_with_video() {
        let status = operation(
            r#"{
                "name": "operations/123",
                "done": true,
                "response": {
                    "generateVideoResponse": {
                        "generatedSamples": [{
                            "video": {"uri": "https://example.com/video:download?alt=media"}
                        }]
                    }
                }
            }"#,
        );
        match status {
            JobStatus::Done(output) => assert_eq!(
                output.video_uri.as_deref(),
                Some("https://example.com/video:download?alt=media")
            ),
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_done_without_video() {
        let status = operation(r#"{"name": "operations/123", "done": true, "response": {}}"#);
        match status {
            JobStatus::Done(output) => assert!(output.video_uri.is_none()),
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_filtered() {
        let status = operation(
            r#"{
                "name": "operations/123",
                "done": true,
                "response": {
                    "generateVideoResponse": {
                        "raiMediaFilteredCount": 1,
                        "raiMediaFilteredReasons": ["Prompt mentions a real person"]
                    }
                }
            }"#,
        );
        assert!(matches!(
            status,
            JobStatus::Failed(BackendError::ContentBlocked(ref r)) if r == "Prompt mentions a real person"
        ));
    }

    #[test]
    fn test_operation_error_is_failed() {
        let status = operation(
            r#"{
                "name": "operations/123",
                "done": true,
                "error": {"code": 8, "message": "Quota exceeded"}
            }"#,
        );
        assert!(matches!(
            status,
            JobStatus::Failed(BackendError::JobFailed(ref m)) if m == "Quota exceeded"
        ));
    }

    #[test]
    fn test_operation_not_found_is_rejected_key() {
        let status = operation(
            r#"{
                "name": "operations/123",
                "done": true,
                "error": {"code": 5, "message": "Requested entity was not found."}
            }"#,
        );
        match status {
            JobStatus::Failed(err) => assert!(err.is_credential_rejected()),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_entity_not_found() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        let err = parse_error(404, body, &HeaderMap::new());
        assert!(matches!(
            err,
            BackendError::CredentialRejected(ref m) if m == "Requested entity was not found."
        ));
    }

    #[test]
    fn test_parse_error_invalid_key() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let err = parse_error(400, body, &HeaderMap::new());
        assert!(err.is_credential_rejected());
    }

    #[test]
    fn test_parse_error_bad_request() {
        let body = r#"{"error": {"code": 400, "message": "resolution must be 720p or 1080p", "status": "INVALID_ARGUMENT"}}"#;
        let err = parse_error(400, body, &HeaderMap::new());
        assert!(matches!(err, BackendError::InvalidRequest(_)));
        assert!(!err.is_credential_rejected());
    }

    #[test]
    fn test_parse_error_rate_limited() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        let err = parse_error(429, "slow down", &headers);
        assert!(matches!(
            err,
            BackendError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(30)
        ));
    }

    #[test]
    fn test_parse_error_safety() {
        let err = parse_error(400, "prompt blocked by safety filters", &HeaderMap::new());
        assert!(matches!(err, BackendError::ContentBlocked(_)));
    }

    #[test]
    fn test_parse_error_server_error_keeps_plain_text() {
        let err = parse_error(503, "upstream unavailable", &HeaderMap::new());
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_download_url_appends_key() {
        let k = key("secret");
        assert_eq!(
            download_url("https://x/y?alt=media", &k).unwrap(),
            "https://x/y?alt=media&key=secret"
        );
        assert_eq!(
            download_url("https://x/y", &k).unwrap(),
            "https://x/y?key=secret"
        );
    }

    #[test]
    fn test_gs_url_is_rejected() {
        let err = download_url("gs://my-bucket/video.mp4", &key("k")).unwrap_err();
        assert!(
            err.to_string().contains("Google Cloud Storage"),
            "Expected GCS error, got: {}",
            err
        );
    }

    #[tokio::test]
    async fn test_submit_without_key_is_missing_key() {
        let backend = VeoBackendBuilder::new()
            .credentials(CredentialStore::new())
            .build()
            .unwrap();

        let err = backend
            .submit_job(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingKey));
        assert!(!err.is_credential_rejected());

        let err = backend
            .poll_job(&JobHandle::new("operations/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingKey));
    }

    #[test]
    fn test_parse_operation_malformed_body_is_json_error() {
        let err = parse_operation("<html>gateway hiccup</html>").unwrap_err();
        assert!(matches!(err, BackendError::Json(_)));

        let op = parse_operation(r#"{"name": "operations/7", "done": false}"#).unwrap();
        assert_eq!(op.name, "operations/7");
    }

    /// Reads one request, headers plus `content-length` bytes of body.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Local HTTP server answering every request with the same response.
    async fn stub_server(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/v1beta")
    }

    fn local_backend(base_url: &str, api_key: &str) -> VeoBackend {
        VeoBackendBuilder::new()
            .api_key(api_key)
            .base_url(base_url)
            .client(reqwest::Client::builder().no_proxy().build().unwrap())
            .build()
            .unwrap()
    }

    async fn download_from(status: u16, body: &'static str) -> BackendResult<Vec<u8>> {
        let base = stub_server(status, body).await;
        let backend = local_backend(&base, "k");
        backend
            .fetch_bytes(&format!("{base}/files/abc:download?alt=media"), &key("k"))
            .await
    }

    #[tokio::test]
    async fn test_download_success_returns_body() {
        let bytes = download_from(200, "mp4-bytes").await.unwrap();
        assert_eq!(bytes, b"mp4-bytes");
    }

    #[tokio::test]
    async fn test_download_refused_key_is_rejected() {
        for status in [401, 403] {
            let err = download_from(status, "").await.unwrap_err();
            assert!(
                matches!(err, BackendError::CredentialRejected(_)),
                "status {status} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_download_server_error_is_api_error() {
        let err = download_from(500, "").await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 500, .. }));
        assert!(!err.is_credential_rejected());
    }

    #[tokio::test]
    async fn test_download_network_error_hides_key() {
        let backend = local_backend("http://127.0.0.1:1/v1beta", "AIzaTOPSECRET");
        let err = backend
            .fetch_bytes(
                "http://127.0.0.1:1/v1beta/files/abc:download?alt=media",
                &key("AIzaTOPSECRET"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Network(_)));
        let studio = StudioError::GenerationFailed(err);
        assert!(!studio.to_string().contains("AIzaTOPSECRET"), "{studio}");
        assert!(!format!("{studio:?}").contains("AIzaTOPSECRET"));
    }

    #[tokio::test]
    async fn test_submit_http_error_is_classified() {
        let base = stub_server(
            404,
            r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#,
        )
        .await;
        let err = local_backend(&base, "k")
            .submit_job(&GenerationRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::CredentialRejected(ref m) if m == "Requested entity was not found."
        ));
    }

    #[tokio::test]
    async fn test_poll_http_error_is_classified() {
        let base = stub_server(503, r#"{"error": {"code": 503, "message": "try later"}}"#).await;
        let err = local_backend(&base, "k")
            .poll_job(&JobHandle::new("operations/1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Api { status: 503, ref message } if message == "try later"
        ));
    }

    #[tokio::test]
    async fn test_poll_malformed_body_is_json_error() {
        let base = stub_server(200, "not json").await;
        let err = local_backend(&base, "k")
            .poll_job(&JobHandle::new("operations/1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Json(_)));
    }

    #[tokio::test]
    async fn test_submit_returns_handle_and_status() {
        let base = stub_server(200, r#"{"name": "models/veo/operations/42"}"#).await;
        let (handle, status) = local_backend(&base, "k")
            .submit_job(&GenerationRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "models/veo/operations/42");
        assert!(matches!(status, JobStatus::Pending));
    }
}

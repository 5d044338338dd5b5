use super::error::ApiError;
use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::{
    ConversationDetailsResponse, ConversationListQuery, ConversationListResponse,
    ModelsResponse, PermissionAction, PermissionDecisionRequest, PermissionDecisionResponse,
    PermissionListQuery, PermissionListResponse, ResumeConversationRequest,
    StartConversationRequest, StartConversationResponse, StopConversationResponse,
    SystemStatusResponse,
};
use crate::util::{endpoint_url, is_local_endpoint_url};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Typed client for the backend REST surface.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.base_url)
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        let url = self.url(&["health"])?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    pub async fn list_conversations(
        &self,
        query: &ConversationListQuery,
    ) -> Result<ConversationListResponse, ApiError> {
        let mut url = self.url(&["api", "conversations"])?;
        append_query(&mut url, query);
        self.send::<(), _>(Method::GET, url, None).await
    }

    pub async fn get_conversation(
        &self,
        session_id: &str,
    ) -> Result<ConversationDetailsResponse, ApiError> {
        let url = self.url(&["api", "conversations", session_id])?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    pub async fn start_conversation(
        &self,
        request: &StartConversationRequest,
    ) -> Result<StartConversationResponse, ApiError> {
        let url = self.url(&["api", "conversations", "start"])?;
        self.send(Method::POST, url, Some(request)).await
    }

    pub async fn resume_conversation(
        &self,
        request: &ResumeConversationRequest,
    ) -> Result<StartConversationResponse, ApiError> {
        let url = self.url(&["api", "conversations", "resume"])?;
        self.send(Method::POST, url, Some(request)).await
    }

    pub async fn stop_conversation(
        &self,
        streaming_id: &str,
    ) -> Result<StopConversationResponse, ApiError> {
        let url = self.url(&["api", "conversations", streaming_id, "stop"])?;
        self.send::<(), _>(Method::POST, url, None).await
    }

    pub async fn list_permissions(
        &self,
        query: &PermissionListQuery,
    ) -> Result<PermissionListResponse, ApiError> {
        let mut url = self.url(&["api", "permissions"])?;
        append_query(&mut url, query);
        self.send::<(), _>(Method::GET, url, None).await
    }

    pub async fn decide_permission(
        &self,
        request_id: &str,
        decision: &PermissionDecisionRequest,
    ) -> Result<PermissionDecisionResponse, ApiError> {
        let url = self.url(&["api", "permissions", request_id])?;
        self.send(Method::POST, url, Some(decision)).await
    }

    pub async fn approve_permission(
        &self,
        request_id: &str,
    ) -> Result<PermissionDecisionResponse, ApiError> {
        let decision = PermissionDecisionRequest {
            action: PermissionAction::Approve,
            modified_input: None,
        };
        self.decide_permission(request_id, &decision).await
    }

    pub async fn deny_permission(
        &self,
        request_id: &str,
    ) -> Result<PermissionDecisionResponse, ApiError> {
        let decision = PermissionDecisionRequest {
            action: PermissionAction::Deny,
            modified_input: None,
        };
        self.decide_permission(request_id, &decision).await
    }

    pub async fn system_status(&self) -> Result<SystemStatusResponse, ApiError> {
        let url = self.url(&["api", "system", "status"])?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    pub async fn models(&self) -> Result<ModelsResponse, ApiError> {
        let url = self.url(&["api", "models"])?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        endpoint_url(&self.base_url, segments).map_err(|error| ApiError::InvalidUrl(error.to_string()))
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request_url = url.to_string();
        debug!(%method, url = %request_url, "api request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            if debug_payload_enabled() {
                if let Ok(payload) = serde_json::to_value(body) {
                    emit_debug_payload(&request_url, &payload);
                }
            }
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| ApiError::request(error, &request_url))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ApiError::request(error, &request_url))?;

        if !status.is_success() {
            return Err(ApiError::from_error_body(
                &request_url,
                status.as_u16(),
                &bytes,
            ));
        }

        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            url: request_url,
            source,
        })
    }
}

/// Serializes a flat query struct as `?key=value` pairs (sorted by key),
/// skipping unset fields.
fn append_query<Q: Serialize>(url: &mut Url, query: &Q) {
    let Ok(Value::Object(fields)) = serde_json::to_value(query) else {
        return;
    };
    if fields.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::String(text) => {
                pairs.append_pair(&key, &text);
            }
            other => {
                pairs.append_pair(&key, &other.to_string());
            }
        }
    }
}

// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The authenticated request gateway.
//!
//! Every outgoing REST call gets the stored access token injected as a bearer
//! header. A 401 response triggers the refresh-and-retry protocol exactly
//! once per logical call: exchange the refresh token for a new pair, persist
//! it, and retry with `skip_auth_refresh` set so the retry can never recurse.
//! If the refresh itself fails, the credential store is cleared (forced
//! logout) and the original 401 is handed back untouched.

use std::time::Duration;

use palaver_core::{CredentialPair, PalaverError, UserProfile};
use palaver_session::CredentialStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A REST response with its body already read.
///
/// The gateway reads the body eagerly so a 401 can be replayed to the caller
/// after a failed refresh.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Parse a successful response as JSON; surface any non-2xx verbatim.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, PalaverError> {
        if !self.status.is_success() {
            return Err(PalaverError::Api {
                status: self.status.as_u16(),
                body: self.body,
            });
        }
        serde_json::from_str(&self.body).map_err(|e| PalaverError::Http {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

/// REST client for the operator console API.
///
/// Holds the credential store it authenticates from; construct one per
/// console lifetime and inject it (no process-wide singletons).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: CredentialStore,
}

impl ApiClient {
    /// Creates a new API client against the given base URL.
    pub fn new(base_url: impl Into<String>, session: CredentialStore) -> Result<Self, PalaverError> {
        Self::with_timeout(base_url, session, Duration::from_secs(30))
    }

    /// Creates a new API client with an explicit per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        session: CredentialStore,
        request_timeout: Duration,
    ) -> Result<Self, PalaverError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PalaverError::Http {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The credential store this client reads tokens from.
    pub fn session(&self) -> &CredentialStore {
        &self.session
    }

    /// Issue an authenticated request.
    ///
    /// `path` is relative to the base URL and may carry a query string. With
    /// `skip_auth_refresh` set, a 401 is returned as-is with no refresh
    /// attempt. The gateway never interprets business-level errors: any
    /// status other than a first-attempt 401 goes straight back to the caller.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        skip_auth_refresh: bool,
    ) -> Result<ApiResponse, PalaverError> {
        let response = self.send_once(method.clone(), path, body).await?;

        if response.status != StatusCode::UNAUTHORIZED || skip_auth_refresh {
            return Ok(response);
        }

        debug!(path, "unauthorized, attempting token refresh");
        if self.refresh_credentials().await {
            // Exactly one retry, and the retry itself never refreshes again.
            return self.send_once(method, path, body).await;
        }

        // Refresh failed: the store is already cleared; surface the original 401.
        Ok(response)
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, PalaverError> {
        let mut builder = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(pair) = self.session.read() {
            builder = builder.bearer_auth(pair.access_token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| PalaverError::Http {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| PalaverError::Http {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(status = %status, "response received");
        Ok(ApiResponse { status, body })
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Returns true if a new pair was persisted. On any failure the store is
    /// cleared so the session reads as logged out.
    async fn refresh_credentials(&self) -> bool {
        let Some(pair) = self.session.read() else {
            debug!("no stored credentials to refresh");
            return false;
        };

        let body = serde_json::json!({ "refresh_token": pair.refresh_token });
        let result = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<CredentialPair>().await {
                    Ok(new_pair) => {
                        self.session.replace(&new_pair);
                        debug!("token refresh succeeded");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh returned an unreadable pair, logging out");
                        self.session.clear();
                        false
                    }
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "token refresh rejected, logging out");
                self.session.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "token refresh request failed, logging out");
                self.session.clear();
                false
            }
        }
    }

    // --- Auth endpoints ---

    /// `POST /auth/login`: authenticate and persist the returned pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialPair, PalaverError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let pair: CredentialPair = self
            .request(Method::POST, "/auth/login", Some(&body), true)
            .await?
            .into_json()?;
        self.session.replace(&pair);
        Ok(pair)
    }

    /// `POST /auth/refresh` with an explicit token; persists the new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, PalaverError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let pair: CredentialPair = self
            .request(Method::POST, "/auth/refresh", Some(&body), true)
            .await?
            .into_json()?;
        self.session.replace(&pair);
        Ok(pair)
    }

    /// `GET /auth/me`: the authenticated operator's profile.
    pub async fn me(&self) -> Result<UserProfile, PalaverError> {
        self.request(Method::GET, "/auth/me", None, false)
            .await?
            .into_json()
    }

    /// Forget the stored credential pair (client-side logout).
    pub fn logout(&self) {
        self.session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_with(dir: &tempfile::TempDir, access: &str, refresh: &str) -> CredentialStore {
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.replace(&CredentialPair {
            access_token: access.into(),
            refresh_token: refresh.into(),
        });
        store
    }

    fn profile_json() -> serde_json::Value {
        serde_json::json!({ "id": 1, "email": "op@example.com", "full_name": "Op", "role": "admin" })
    }

    #[tokio::test]
    async fn injects_bearer_token() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "acc-1", "ref-1");

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer acc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let me = client.me().await.unwrap();
        assert_eq!(me.email, "op@example.com");
    }

    // Expired token, refresh succeeds, retry succeeds; the caller never
    // sees the 401.
    #[tokio::test]
    async fn refresh_and_retry_on_401() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "stale", "ref-1");

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(serde_json::json!({ "refresh_token": "ref-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh", "refresh_token": "ref-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let me = client.me().await.unwrap();
        assert_eq!(me.id, 1);

        // The new pair was persisted.
        let stored = client.session().read().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token, "ref-2");
    }

    // Refresh itself fails -- store cleared, original 401 surfaced unmodified.
    #[tokio::test]
    async fn failed_refresh_clears_store_and_surfaces_401() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "stale", "ref-dead");

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("original-401-body"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401).set_body_string("refresh denied"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let err = client.me().await.unwrap_err();
        assert!(err.is_unauthorized());
        match err {
            PalaverError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "original-401-body");
            }
            other => panic!("wrong error: {other:?}"),
        }
        assert!(client.session().read().is_none());
    }

    // Auth retry bound: an endpoint that always 401s gets exactly one refresh
    // and exactly one retry, never a loop.
    #[tokio::test]
    async fn always_401_issues_one_refresh_and_one_retry() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "stale", "ref-1");

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("still expired"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh", "refresh_token": "ref-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let err = client.me().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn skip_auth_refresh_returns_401_without_refreshing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "stale", "ref-1");

        Mock::given(method("GET"))
            .and(path("/guarded"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let response = client
            .request(Method::GET, "/guarded", None, true)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn business_errors_pass_through_verbatim() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, "acc", "ref");

        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string(r#"{"detail":"locked elsewhere"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        match client.me().await.unwrap_err() {
            PalaverError::Api { status, body } => {
                assert_eq!(status, 409);
                assert!(body.contains("locked elsewhere"));
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_persists_pair() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({
                "email": "op@example.com", "password": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "acc", "refresh_token": "ref"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        client.login("op@example.com", "secret").await.unwrap();
        assert_eq!(client.session().read().unwrap().access_token, "acc");
    }

    #[tokio::test]
    async fn anonymous_request_sends_no_authorization_header() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));

        // wiremock matches on absence by asserting the mock with the header
        // never fires; the catch-all returns 200.
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_json()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), store).unwrap();
        let received = client.me().await.unwrap();
        assert_eq!(received.id, 1);
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.headers.contains_key("authorization")));
    }
}

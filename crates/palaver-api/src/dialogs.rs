// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed dialog endpoints over the gateway.
//!
//! These are thin: each builds a path, goes through [`ApiClient::request`]
//! (inheriting bearer injection and refresh-and-retry), and parses the typed
//! response. Merging results into client state is the store's job, not ours.

use palaver_core::{DialogDetail, DialogStatus, DialogSummary, Message, Page, PalaverError};
use reqwest::Method;
use url::form_urlencoded;

use crate::client::ApiClient;

/// Server-side filters for dialog list and search endpoints.
#[derive(Debug, Clone, Default)]
pub struct DialogFilters {
    pub status: Option<DialogStatus>,
    pub channel_type: Option<String>,
    pub closed: Option<bool>,
    /// Full-text query; only meaningful for the search endpoint.
    pub query: Option<String>,
}

impl DialogFilters {
    fn encode(&self, serializer: &mut form_urlencoded::Serializer<'_, String>) {
        if let Some(status) = self.status {
            serializer.append_pair("status", &status.to_string());
        }
        if let Some(channel_type) = &self.channel_type {
            serializer.append_pair("channel_type", channel_type);
        }
        if let Some(closed) = self.closed {
            serializer.append_pair("closed", if closed { "true" } else { "false" });
        }
        if let Some(query) = &self.query {
            serializer.append_pair("query", query);
        }
    }
}

/// Body for `POST .../message`. At least one of `text`/`payload` should be set;
/// the server enforces it.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            payload: None,
        }
    }
}

impl ApiClient {
    /// `GET /bots/{bot_id}/dialogs`: one page of dialog summaries.
    pub async fn list_dialogs(
        &self,
        bot_id: i64,
        filters: &DialogFilters,
        page: u32,
        per_page: u32,
    ) -> Result<Page<DialogSummary>, PalaverError> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        filters.encode(&mut serializer);
        serializer.append_pair("page", &page.to_string());
        serializer.append_pair("per_page", &per_page.to_string());
        let path = format!("/bots/{bot_id}/dialogs?{}", serializer.finish());
        self.request(Method::GET, &path, None, false)
            .await?
            .into_json()
    }

    /// `GET /bots/{bot_id}/search`: filtered full-text search, same page shape.
    pub async fn search_dialogs(
        &self,
        bot_id: i64,
        filters: &DialogFilters,
        page: u32,
        per_page: u32,
    ) -> Result<Page<DialogSummary>, PalaverError> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        filters.encode(&mut serializer);
        serializer.append_pair("page", &page.to_string());
        serializer.append_pair("per_page", &per_page.to_string());
        let path = format!("/bots/{bot_id}/search?{}", serializer.finish());
        self.request(Method::GET, &path, None, false)
            .await?
            .into_json()
    }

    /// `GET /bots/{bot_id}/dialogs/{dialog_id}`: the authoritative detail.
    pub async fn get_dialog(
        &self,
        bot_id: i64,
        dialog_id: i64,
    ) -> Result<DialogDetail, PalaverError> {
        let path = format!("/bots/{bot_id}/dialogs/{dialog_id}");
        self.request(Method::GET, &path, None, false)
            .await?
            .into_json()
    }

    /// `POST .../message`: blocks until the server confirms the created message.
    ///
    /// No optimistic placeholder exists; the returned message is the one the
    /// caller feeds to the store's merge.
    pub async fn send_message(
        &self,
        bot_id: i64,
        dialog_id: i64,
        message: &OutgoingMessage,
    ) -> Result<Message, PalaverError> {
        let path = format!("/bots/{bot_id}/dialogs/{dialog_id}/message");
        let body = serde_json::to_value(message).map_err(|e| PalaverError::Internal(
            format!("failed to serialize outgoing message: {e}"),
        ))?;
        self.request(Method::POST, &path, Some(&body), false)
            .await?
            .into_json()
    }

    /// `POST .../lock`: take the dialog for this operator.
    pub async fn lock_dialog(
        &self,
        bot_id: i64,
        dialog_id: i64,
    ) -> Result<DialogDetail, PalaverError> {
        self.dialog_action(bot_id, dialog_id, "lock").await
    }

    /// `POST .../unlock`: release the dialog.
    pub async fn unlock_dialog(
        &self,
        bot_id: i64,
        dialog_id: i64,
    ) -> Result<DialogDetail, PalaverError> {
        self.dialog_action(bot_id, dialog_id, "unlock").await
    }

    /// `POST .../close`: mark the dialog closed (terminal, monotonic).
    pub async fn close_dialog(
        &self,
        bot_id: i64,
        dialog_id: i64,
    ) -> Result<DialogDetail, PalaverError> {
        self.dialog_action(bot_id, dialog_id, "close").await
    }

    async fn dialog_action(
        &self,
        bot_id: i64,
        dialog_id: i64,
        action: &str,
    ) -> Result<DialogDetail, PalaverError> {
        let path = format!("/bots/{bot_id}/dialogs/{dialog_id}/{action}");
        self.request(Method::POST, &path, None, false)
            .await?
            .into_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_core::CredentialPair;
    use palaver_session::CredentialStore;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, dir: &tempfile::TempDir) -> ApiClient {
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.replace(&CredentialPair {
            access_token: "acc".into(),
            refresh_token: "ref".into(),
        });
        ApiClient::new(server.uri(), store).unwrap()
    }

    fn dialog_json(id: i64, bot_id: i64) -> serde_json::Value {
        serde_json::json!({
            "id": id, "bot_id": bot_id, "channel_type": "telegram",
            "external_chat_id": "chat", "status": "auto",
            "closed": false, "is_locked": false,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn list_dialogs_sends_filters_and_pagination() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/bots/7/dialogs"))
            .and(query_param("status", "wait_operator"))
            .and(query_param("closed", "false"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [dialog_json(42, 7)],
                "page": 2, "per_page": 20, "total": 45, "has_next": true
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let filters = DialogFilters {
            status: Some(DialogStatus::WaitOperator),
            closed: Some(false),
            ..Default::default()
        };
        let page = client.list_dialogs(7, &filters, 2, 20).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].dialog.id, 42);
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn search_dialogs_sends_query() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/bots/7/search"))
            .and(query_param("query", "refund"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [], "page": 1, "per_page": 20, "total": 0, "has_next": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let filters = DialogFilters {
            query: Some("refund".into()),
            ..Default::default()
        };
        let page = client.search_dialogs(7, &filters, 1, 20).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn get_dialog_parses_detail_with_messages() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let mut detail = dialog_json(42, 7);
        detail["messages"] = serde_json::json!([
            {"id": 1, "dialog_id": 42, "sender": "user", "text": "hi",
             "created_at": "2026-01-01T00:00:01Z"}
        ]);
        Mock::given(method("GET"))
            .and(path("/bots/7/dialogs/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let detail = client.get_dialog(7, 42).await.unwrap();
        assert_eq!(detail.dialog.id, 42);
        assert_eq!(detail.messages.len(), 1);
    }

    #[tokio::test]
    async fn send_message_posts_text_body() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/bots/7/dialogs/42/message"))
            .and(body_json(serde_json::json!({ "text": "hello there" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 9, "dialog_id": 42, "sender": "operator", "text": "hello there",
                "created_at": "2026-01-01T00:00:05Z"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let message = client
            .send_message(7, 42, &OutgoingMessage::text("hello there"))
            .await
            .unwrap();
        assert_eq!(message.id, 9);
        assert_eq!(message.sender, palaver_core::MessageSender::Operator);
    }

    #[tokio::test]
    async fn lock_returns_updated_detail() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let mut locked = dialog_json(42, 7);
        locked["is_locked"] = serde_json::json!(true);
        locked["messages"] = serde_json::json!([]);
        Mock::given(method("POST"))
            .and(path("/bots/7/dialogs/42/lock"))
            .respond_with(ResponseTemplate::new(200).set_body_json(locked))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        let detail = client.lock_dialog(7, 42).await.unwrap();
        assert!(detail.dialog.is_locked);
    }

    #[tokio::test]
    async fn lock_conflict_surfaces_as_api_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("POST"))
            .and(path("/bots/7/dialogs/42/lock"))
            .respond_with(ResponseTemplate::new(409).set_body_string(
                r#"{"detail":"Dialog is already locked by another operator"}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server, &dir);
        match client.lock_dialog(7, 42).await.unwrap_err() {
            palaver_core::PalaverError::Api { status, body } => {
                assert_eq!(status, 409);
                assert!(body.contains("another operator"));
            }
            other => panic!("wrong error: {other:?}"),
        }
    }
}

//! REST-backed store speaking the PostgREST wire shape.

use super::record::DebateRecord;
use super::{DebateStore, Outcome, StoreError};
use crate::arena::{ScoreBoard, VerdictSummary};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEBATES_TABLE: &str = "debates";
const PREFERENCES_TABLE: &str = "model_preferences";
const OUTCOME_RPC: &str = "increment_preference";

/// Writes go to `/rest/v1/<table>`; the outcome counter update goes through
/// an RPC so the increment happens server-side in one statement.
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Arc<Client>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PreferenceRow {
    model: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Arc<Client>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
            timeout: Duration::from_secs(10),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DebateStore for RestStore {
    async fn insert_debate(&self, record: &DebateRecord) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, DEBATES_TABLE);
        let response = self
            .request(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check_status(response).await?;
        debug!(id = %record.id, "Persisted debate record");
        Ok(())
    }

    async fn attach_judgement(
        &self,
        debate_id: uuid::Uuid,
        scores: &ScoreBoard,
        verdict: Option<&VerdictSummary>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, DEBATES_TABLE);
        let response = self
            .request(self.client.patch(&url))
            .query(&[("id", format!("eq.{debate_id}"))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "scores": scores, "verdict": verdict }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check_status(response).await?;
        debug!(id = %debate_id, "Attached judgement to debate record");
        Ok(())
    }

    async fn preferred_model(
        &self,
        user: &str,
        category: &str,
    ) -> Result<Option<String>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, PREFERENCES_TABLE);
        let response = self
            .request(self.client.get(&url))
            .query(&[
                ("user_id", format!("eq.{user}")),
                ("category", format!("eq.{category}")),
                ("wins", "gt.0".to_string()),
                ("select", "model".to_string()),
                ("order", "wins.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;
        let rows: Vec<PreferenceRow> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(rows.into_iter().next().map(|row| row.model))
    }

    async fn record_outcome(
        &self,
        user: &str,
        category: &str,
        model: &str,
        outcome: Outcome,
    ) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, OUTCOME_RPC);
        let response = self
            .request(self.client.post(&url))
            .json(&json!({
                "p_user_id": user,
                "p_category": category,
                "p_model": model,
                "p_outcome": outcome.as_str(),
            }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Branch;
    use std::time::Instant;

    fn record() -> DebateRecord {
        let started = Instant::now();
        let mut branch = Branch::new("claude");
        branch.record_chunk("answer", started);
        branch.complete(started);
        DebateRecord::from_branches("prompt", &[branch])
    }

    fn store(server: &mockito::ServerGuard) -> RestStore {
        RestStore::new(server.url(), "service-key", Arc::new(Client::new()))
    }

    #[tokio::test]
    async fn test_insert_posts_record_with_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/debates")
            .match_header("apikey", "service-key")
            .match_header("authorization", "Bearer service-key")
            .match_header("prefer", "return=minimal")
            .with_status(201)
            .create_async()
            .await;

        store(&server).insert_debate(&record()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_insert_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/debates")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let err = store(&server).insert_debate(&record()).await.unwrap_err();
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_attach_judgement_patches_matching_row() {
        let mut server = mockito::Server::new_async().await;
        let id = uuid::Uuid::new_v4();
        let mock = server
            .mock("PATCH", "/rest/v1/debates")
            .match_query(mockito::Matcher::UrlEncoded(
                "id".into(),
                format!("eq.{id}"),
            ))
            .match_header("prefer", "return=minimal")
            .with_status(204)
            .create_async()
            .await;

        let verdict = VerdictSummary {
            winner: "claude".to_string(),
            verdict: "Stronger evidence".to_string(),
            highlight: None,
        };
        store(&server)
            .attach_judgement(id, &ScoreBoard::new(), Some(&verdict))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_preferred_model_reads_top_row() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/model_preferences")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("user_id".into(), "eq.alice".into()),
                mockito::Matcher::UrlEncoded("category".into(), "eq.code".into()),
                mockito::Matcher::UrlEncoded("order".into(), "wins.desc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"model": "claude"}]"#)
            .create_async()
            .await;

        let preferred = store(&server)
            .preferred_model("alice", "code")
            .await
            .unwrap();
        assert_eq!(preferred.as_deref(), Some("claude"));
    }

    #[tokio::test]
    async fn test_preferred_model_empty_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/model_preferences")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let preferred = store(&server).preferred_model("bob", "math").await.unwrap();
        assert_eq!(preferred, None);
    }

    #[tokio::test]
    async fn test_record_outcome_calls_rpc() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/rpc/increment_preference")
            .match_body(mockito::Matcher::Json(json!({
                "p_user_id": "alice",
                "p_category": "code",
                "p_model": "claude",
                "p_outcome": "win",
            })))
            .with_status(204)
            .create_async()
            .await;

        store(&server)
            .record_outcome("alice", "code", "claude", Outcome::Win)
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use urlencoding::encode;

use crate::config::Config;
use crate::error::FetchError;
use crate::message::RawMessage;

/// Where raw message resources come from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn get_message(&self, id: &str) -> Result<RawMessage, FetchError>;

    /// Ids of the most recently received messages, newest first, optionally
    /// narrowed by a Gmail search query.
    async fn list_recent(
        &self,
        max_results: usize,
        query: Option<&str>,
    ) -> Result<Vec<String>, FetchError>;
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

/// Gmail REST client. The access token is supplied from outside; nothing here refreshes it.
pub struct GmailHub {
    client: Client,
    api_base: String,
    user: String,
    token: Option<String>,
}

impl GmailHub {
    pub fn new(
        api_base: impl Into<String>,
        user: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            user: user.into(),
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.gmail.api_base, &cfg.gmail.user, cfg.access_token())
    }

    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.api_base, encode(&self.user))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::MissingToken)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl MessageSource for GmailHub {
    async fn get_message(&self, id: &str) -> Result<RawMessage, FetchError> {
        debug!(user = %self.user, id = %id, "Starting email fetch");
        let url = format!("{}/{}?format=full", self.messages_url(), encode(id));
        let msg: RawMessage = self.get_json(&url).await?;
        debug!(id = %msg.id, "Fetched mail");
        Ok(msg)
    }

    async fn list_recent(
        &self,
        max_results: usize,
        query: Option<&str>,
    ) -> Result<Vec<String>, FetchError> {
        let mut url = format!("{}?maxResults={max_results}", self.messages_url());
        if let Some(q) = query {
            url.push_str(&format!("&q={}", encode(q)));
        }
        let list: MessageList = self.get_json(&url).await?;
        let ids: Vec<String> = list.messages.into_iter().map(|m| m.id).collect();
        info!(matches = ids.len(), "Recent ids listed");
        Ok(ids)
    }
}

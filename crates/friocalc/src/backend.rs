//! HTTP calls to the history service.
//!
//! The session cookie set by `/login` lives in the client's cookie store and
//! is sent with every later request.

use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::types::{
    CreatedResponse, Credentials, EntryId, EntryPayload, ErrorBody, HistoryEntry,
    HistoryResponse, LoginResponse, User,
};

/// Fallback messages used when the server does not send one
mod fallback {
    pub const FETCH: &str = "Failed to load the history.";
    pub const SAVE: &str = "Failed to save the calculation.";
    pub const DUPLICATE: &str = "Failed to create the new history item.";
    pub const UPDATE: &str = "Failed to update the history item.";
    pub const DELETE: &str = "Failed to delete the history item.";
    pub const LOGIN: &str = "Login failed.";
    pub const REGISTER: &str = "Registration failed.";
    pub const LOGOUT: &str = "Failed to log out.";
}

/// Which create call is being made; only changes the fallback message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Save,
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct Backend {
    client: Client,
    base_url: Url,
}

impl Backend {
    pub fn new(base_url: Url) -> AppResult<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL below the base, percent-encoding each segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn entry_url(&self, id: &EntryId) -> Url {
        self.url(&["history", &id.to_string()])
    }

    /// GET /history
    pub async fn fetch_history(&self) -> AppResult<Vec<HistoryEntry>> {
        debug!("Fetching history");
        let response = self.client.get(self.url(&["history"])).send().await?;
        let body: HistoryResponse = check(response, fallback::FETCH).await?.json().await?;
        debug!(count = body.history.len(), "History fetched");
        Ok(body.history)
    }

    /// POST /history, returning the id the server assigned
    pub async fn create_entry(&self, payload: &EntryPayload, kind: CreateKind) -> AppResult<EntryId> {
        let fallback = match kind {
            CreateKind::Save => fallback::SAVE,
            CreateKind::Duplicate => fallback::DUPLICATE,
        };
        let response = self
            .client
            .post(self.url(&["history"]))
            .json(payload)
            .send()
            .await?;
        let body: CreatedResponse = check(response, fallback).await?.json().await?;
        debug!(id = %body.id, "Entry created");
        Ok(body.id)
    }

    /// PUT /history/:id
    pub async fn update_entry(&self, id: &EntryId, payload: &EntryPayload) -> AppResult<()> {
        let response = self
            .client
            .put(self.entry_url(id))
            .json(payload)
            .send()
            .await?;
        check(response, fallback::UPDATE).await?;
        debug!(id = %id, "Entry updated");
        Ok(())
    }

    /// DELETE /history/:id
    pub async fn delete_entry(&self, id: &EntryId) -> AppResult<()> {
        let response = self.client.delete(self.entry_url(id)).send().await?;
        check(response, fallback::DELETE).await?;
        debug!(id = %id, "Entry deleted");
        Ok(())
    }

    /// POST /login. The response must carry at least a username.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let response = self
            .client
            .post(self.url(&["login"]))
            .json(&Credentials { username, password })
            .send()
            .await?;
        let body: LoginResponse = check(response, fallback::LOGIN).await?.json().await?;
        Ok(body.into_user())
    }

    /// POST /register
    pub async fn register(&self, username: &str, password: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.url(&["register"]))
            .json(&Credentials { username, password })
            .send()
            .await?;
        check(response, fallback::REGISTER).await?;
        Ok(())
    }

    /// POST /logout. Any body is accepted.
    pub async fn logout(&self) -> AppResult<()> {
        let response = self.client.post(self.url(&["logout"])).send().await?;
        check(response, fallback::LOGOUT).await?;
        Ok(())
    }
}

/// Pass OK responses through; turn anything else into `Rejected` carrying
/// the server's `message` or the fallback.
async fn check(response: Response, fallback: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .unwrap_or_default()
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    warn!(status = %status, url = %url, message = %message, "Request rejected");
    Err(AppError::Rejected { status, message })
}

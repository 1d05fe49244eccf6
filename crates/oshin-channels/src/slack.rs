//! Slack Web API: `chat.postMessage` delivery and `users.list` directory.
//!
//! Slack answers HTTP 200 for most failures and reports them in the body as
//! `{"ok": false, "error": "..."}`, so both the status and the `ok` flag are
//! checked.

use async_trait::async_trait;
use oshin_core::error::{OshinError, Result};
use oshin_core::routing::Credential;
use oshin_core::traits::{NotificationSink, OwnerDirectory};
use oshin_core::types::{DirectoryUser, OutgoingMessage};
use serde::Deserialize;
use serde_json::json;

/// Attachment color used for digest fields.
pub const ATTACHMENT_COLOR: &str = "#7CD197";

/// Page size requested from `users.list`.
const USERS_PAGE_LIMIT: u32 = 200;

/// Upper bound on `users.list` pages fetched in one listing.
const USERS_MAX_PAGES: usize = 500;

/// Build the JSON body for `chat.postMessage`.
pub fn build_post_body(destination: &str, message: &OutgoingMessage) -> serde_json::Value {
    let mut body = json!({
        "channel": destination,
        "text": message.text,
    });
    if let Some(icon) = &message.presentation.icon_url {
        body["icon_url"] = json!(icon);
    }
    if let Some(name) = &message.presentation.display_name {
        body["username"] = json!(name);
    }
    if !message.fields.is_empty() {
        let fields: Vec<_> = message
            .fields
            .iter()
            .map(|f| json!({"title": f.title, "value": f.value, "short": false}))
            .collect();
        body["attachments"] = json!([{
            "color": ATTACHMENT_COLOR,
            "fallback": message.text,
            "fields": fields,
        }]);
    }
    body
}

/// Map a Slack API response envelope to a result.
fn check_envelope(body: &serde_json::Value) -> std::result::Result<(), String> {
    if body["ok"].as_bool().unwrap_or(false) {
        Ok(())
    } else {
        Err(body["error"].as_str().unwrap_or("unknown_error").to_string())
    }
}

/// Slack `chat.postMessage` sink. Credentials are bot tokens.
pub struct SlackSink {
    client: reqwest::Client,
    api_base: String,
}

impl SlackSink {
    pub fn new(api_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for SlackSink {
    fn name(&self) -> &str {
        "slack"
    }

    fn supports_fields(&self) -> bool {
        true
    }

    async fn deliver(
        &self,
        credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&build_post_body(destination, message))
            .send()
            .await
            .map_err(|e| OshinError::delivery(format!("Slack send to {destination} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OshinError::delivery(format!(
                "Slack {status} for {destination}: {text}"
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OshinError::delivery(format!("Invalid Slack response: {e}")))?;
        check_envelope(&body)
            .map_err(|e| OshinError::delivery(format!("Slack rejected post to {destination}: {e}")))?;
        tracing::debug!("Posted to {destination} via slack");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_bot: bool,
}

/// One decoded `users.list` page: users plus the cursor for the next page.
#[derive(Debug)]
pub struct UsersPage {
    pub users: Vec<DirectoryUser>,
    pub next_cursor: Option<String>,
}

/// Decode a `users.list` response body.
pub fn parse_members(body: &serde_json::Value) -> Result<UsersPage> {
    check_envelope(body).map_err(|e| OshinError::directory(format!("users.list failed: {e}")))?;
    let members: Vec<Member> = serde_json::from_value(body["members"].clone())
        .map_err(|e| OshinError::directory(format!("Invalid users.list members: {e}")))?;
    let users = members
        .into_iter()
        .map(|m| DirectoryUser {
            id: m.id,
            name: m.name,
            is_bot: m.is_bot,
            is_deactivated: m.deleted,
        })
        .collect();
    let next_cursor = body["response_metadata"]["next_cursor"]
        .as_str()
        .filter(|c| !c.is_empty())
        .map(String::from);
    Ok(UsersPage { users, next_cursor })
}

/// Slack workspace members as the owner directory.
pub struct SlackDirectory {
    client: reqwest::Client,
    api_base: String,
    credential: Credential,
}

impl SlackDirectory {
    pub fn new(api_base: &str, credential: Credential) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            credential,
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<UsersPage> {
        let url = format!("{}/users.list", self.api_base);
        let limit = USERS_PAGE_LIMIT.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(c) = cursor {
            query.push(("cursor", c));
        }
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.credential.expose())
            .query(&query)
            .send()
            .await
            .map_err(|e| OshinError::directory(format!("users.list request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(OshinError::directory(format!("users.list returned {status}")));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OshinError::directory(format!("Invalid users.list response: {e}")))?;
        parse_members(&body)
    }
}

#[async_trait]
impl OwnerDirectory for SlackDirectory {
    fn name(&self) -> &str {
        "slack"
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            pages += 1;
            users.extend(page.users);
            let Some(next) = page.next_cursor else {
                break;
            };
            if cursor.as_deref() == Some(next.as_str()) {
                return Err(OshinError::directory(format!(
                    "users.list returned the same cursor twice ({next})"
                )));
            }
            if pages >= USERS_MAX_PAGES {
                return Err(OshinError::directory(format!(
                    "users.list did not finish after {USERS_MAX_PAGES} pages"
                )));
            }
            cursor = Some(next);
        }
        tracing::debug!("Fetched {} users from slack", users.len());
        Ok(users)
    }
}

// src/publish/mod.rs
//! Authenticated publish client for the X v2 tweets endpoint. One call
//! per post; the returned post id threads digest replies.

pub mod oauth1;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use oauth1::OauthKeys;

pub const POST_TWEET_URL: &str = "https://api.twitter.com/2/tweets";

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Mutually exclusive authentication schemes.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Static pre-issued token; no per-request computation.
    Bearer(String),
    /// Per-request OAuth 1.0a signature.
    OAuth1(OauthKeys),
}

/// Publish failure carrying enough to diagnose the rejection.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("publish transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The platform's answer to a successful publish.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub id: String,
}

#[derive(Serialize)]
struct TweetBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyRef<'a>>,
}

#[derive(Serialize)]
struct ReplyRef<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

pub struct PublishClient {
    client: reqwest::Client,
    auth: Auth,
    endpoint: String,
}

impl PublishClient {
    pub fn new(client: reqwest::Client, auth: Auth) -> Self {
        Self {
            client,
            auth,
            endpoint: POST_TWEET_URL.to_string(),
        }
    }

    /// Test seam: point the client at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Publish one post, optionally as a reply. A non-2xx response is a
    /// [`PublishError::Rejected`] with the body preserved for diagnostics.
    pub async fn post(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<PostReceipt, PublishError> {
        let body = TweetBody {
            text,
            reply: reply_to.map(|id| ReplyRef {
                in_reply_to_tweet_id: id,
            }),
        };

        let mut req = self
            .client
            .post(&self.endpoint)
            .timeout(HTTP_TIMEOUT)
            .json(&body);

        // The signature covers only the protocol parameters: the JSON
        // body carries no form-encoded params to fold into the base
        // string, and the endpoint has no query.
        req = match &self.auth {
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::OAuth1(keys) => req.header(
                reqwest::header::AUTHORIZATION,
                oauth1::authorization_header("POST", &self.endpoint, keys),
            ),
        };

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TweetResponse = resp.json().await?;
        tracing::info!(id = %parsed.data.id, "post published");
        Ok(PostReceipt {
            id: parsed.data.id,
        })
    }
}

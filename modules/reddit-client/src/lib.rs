pub mod error;
pub mod feed;
pub mod types;

mod comments;

pub use error::{RedditError, Result};
pub use types::{Item, ItemKind};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use types::{JsonEnvelope, Listing, Me, MoreChildrenData, TokenResponse};

const AUTH_URL: &str = "https://www.reddit.com";
const API_URL: &str = "https://oauth.reddit.com";

/// Listings return at most this many items per request.
pub const LISTING_MAX: u32 = 100;

/// `/api/morechildren` accepts at most this many ids per call.
const MORE_CHILDREN_BATCH: usize = 100;

/// Refresh the token this long before Reddit says it expires.
const TOKEN_SLACK: Duration = Duration::from_secs(60);

/// Script-app credentials. Username and password are optional; without them
/// the client is read-only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// True when both username and password are present.
    pub fn has_user(&self) -> bool {
        self.user().is_some()
    }

    fn user(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Reddit OAuth client. Cheap to clone; clones share the access token.
#[derive(Clone)]
pub struct RedditClient {
    http: reqwest::Client,
    credentials: Arc<Credentials>,
    token: Arc<Mutex<Option<AccessToken>>>,
    auth_url: String,
    api_url: String,
    poll_interval: Duration,
}

impl RedditClient {
    /// Build a client and fetch the first access token, so bad credentials
    /// fail here rather than in the middle of a stream.
    pub async fn authenticate(credentials: Credentials) -> Result<Self> {
        let client = Self::with_endpoints(credentials, AUTH_URL, API_URL)?;
        client.access_token().await?;
        info!(
            read_only = !client.can_reply(),
            "Authenticated with Reddit"
        );
        Ok(client)
    }

    /// Build a client against explicit endpoints without authenticating.
    pub fn with_endpoints(credentials: Credentials, auth_url: &str, api_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            credentials: Arc::new(credentials),
            token: Arc::new(Mutex::new(None)),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(5),
        })
    }

    /// Set how often the live feeds poll for new items.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether the client holds user credentials (needed to reply).
    pub fn can_reply(&self) -> bool {
        self.credentials.has_user()
    }

    /// Return a valid bearer token, fetching a new one if missing or expiring.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let mut form = vec![];
        match self.credentials.user() {
            Some((username, password)) => {
                form.push(("grant_type", "password"));
                form.push(("username", username));
                form.push(("password", password));
            }
            None => form.push(("grant_type", "client_credentials")),
        }

        let url = format!("{}/api/v1/access_token", self.auth_url);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&form)
            .send()
            .await?;

        let grant: TokenResponse = parse(resp).await?;
        let value = match (grant.access_token, grant.error) {
            (Some(value), _) => value,
            (None, Some(error)) => return Err(RedditError::Auth(error)),
            (None, None) => return Err(RedditError::Auth("no access token in response".into())),
        };
        let lifetime = Duration::from_secs(grant.expires_in.unwrap_or(3600));
        debug!(expires_in = lifetime.as_secs(), "Fetched Reddit access token");

        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_SLACK),
        });
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_url, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("raw_json", "1")])
            .query(query)
            .send()
            .await?;
        parse(resp).await
    }

    /// Fetch one listing page. `limit` is capped at [`LISTING_MAX`]; zero
    /// returns nothing without a request, since Reddit reads `limit=0` as 25.
    async fn listing(&self, path: &str, limit: u32) -> Result<Vec<Item>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(LISTING_MAX).to_string();
        let listing: Listing = self.get(path, &[("limit", limit.as_str())]).await?;
        let mut items = Vec::with_capacity(listing.data.children.len());
        for thing in listing.data.children {
            if let Some(item) = thing.into_item()? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Newest posts of one subreddit, most recent first.
    pub async fn recent_posts(&self, subreddit: &str, limit: u32) -> Result<Vec<Item>> {
        self.listing(&format!("/r/{subreddit}/new"), limit).await
    }

    /// Newest posts across several subreddits, most recent first.
    pub async fn new_posts(&self, subreddits: &[String], limit: u32) -> Result<Vec<Item>> {
        self.listing(&format!("/r/{}/new", subreddits.join("+")), limit).await
    }

    /// Newest comments across several subreddits, most recent first.
    pub async fn new_comments(&self, subreddits: &[String], limit: u32) -> Result<Vec<Item>> {
        self.listing(&format!("/r/{}/comments", subreddits.join("+")), limit).await
    }

    /// Every comment under a post, with all "load more" and
    /// "continue this thread" placeholders expanded.
    pub async fn post_comments(&self, post_id: &str) -> Result<Vec<Item>> {
        let pages: Vec<Listing> = self
            .get(&format!("/comments/{post_id}"), &[("limit", "500")])
            .await?;

        let mut found = Vec::new();
        let mut pending = Vec::new();
        if let Some(tree) = pages.into_iter().nth(1) {
            comments::flatten(tree.data.children, &mut found, &mut pending)?;
        }

        let link_id = format!("t3_{post_id}");
        let mut continued = HashSet::new();
        while let Some(more) = pending.pop() {
            if more.children.is_empty() {
                // "continue this thread": the parent's subtree lives on its own page.
                let Some(parent) = more.parent_id.strip_prefix("t1_") else {
                    continue;
                };
                if !continued.insert(parent.to_string()) {
                    continue;
                }
                let pages: Vec<Listing> = self
                    .get(&format!("/comments/{post_id}/_/{parent}"), &[])
                    .await?;
                if let Some(tree) = pages.into_iter().nth(1) {
                    let mut subtree = Vec::new();
                    comments::flatten(tree.data.children, &mut subtree, &mut pending)?;
                    found.extend(subtree.into_iter().filter(|c| c.id != parent));
                }
                continue;
            }

            for batch in more.children.chunks(MORE_CHILDREN_BATCH) {
                let children = batch.join(",");
                let envelope: JsonEnvelope<MoreChildrenData> = self
                    .get(
                        "/api/morechildren",
                        &[
                            ("api_type", "json"),
                            ("link_id", link_id.as_str()),
                            ("children", children.as_str()),
                        ],
                    )
                    .await?;
                if !envelope.json.errors.is_empty() {
                    return Err(RedditError::Platform(format!("{:?}", envelope.json.errors)));
                }
                let things = envelope.json.data.map(|d| d.things).unwrap_or_default();
                comments::flatten(things, &mut found, &mut pending)?;
            }
        }

        comments::dedup_by_id(&mut found);
        debug!(post_id, count = found.len(), "Expanded post comments");
        Ok(found)
    }

    /// Reply to a post (`t3_`) or comment (`t1_`) by fullname.
    pub async fn reply(&self, fullname: &str, text: &str) -> Result<()> {
        if !(fullname.starts_with("t3_") || fullname.starts_with("t1_")) {
            return Err(RedditError::InvalidTarget(fullname.to_string()));
        }
        if !self.can_reply() {
            return Err(RedditError::Auth(
                "replying requires a username and password".into(),
            ));
        }

        let token = self.access_token().await?;
        let url = format!("{}/api/comment", self.api_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .form(&[("api_type", "json"), ("thing_id", fullname), ("text", text)])
            .send()
            .await?;

        let envelope: JsonEnvelope<serde_json::Value> = parse(resp).await?;
        if !envelope.json.errors.is_empty() {
            return Err(RedditError::Platform(format!("{:?}", envelope.json.errors)));
        }
        Ok(())
    }

    /// Username of the authenticated account. `None` for read-only clients.
    pub async fn me(&self) -> Result<Option<String>> {
        if !self.can_reply() {
            return Ok(None);
        }
        let me: Me = self.get("/api/v1/me", &[]).await?;
        Ok(Some(me.name))
    }
}

async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RedditError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(user: bool) -> Credentials {
        Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            user_agent: "riftbound-bot/test".into(),
            username: user.then(|| "riftbot".to_string()),
            password: user.then(|| "hunter2".to_string()),
        }
    }

    async fn mock_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, user: bool) -> RedditClient {
        RedditClient::with_endpoints(credentials(user), &server.uri(), &server.uri()).unwrap()
    }

    fn comment(id: &str) -> serde_json::Value {
        json!({ "kind": "t1", "data": { "id": id, "author": "u", "body": id, "link_id": "t3_p", "replies": "" } })
    }

    #[tokio::test]
    async fn recent_posts_parses_listing() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/r/riftboundtcg/new"))
            .and(query_param("limit", "25"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "children": [
                    { "kind": "t3", "data": { "id": "p2", "title": "second", "selftext": "", "author": "a" } },
                    { "kind": "t3", "data": { "id": "p1", "title": "first", "selftext": "[[Jinx]]", "author": "b" } }
                ], "after": null }
            })))
            .mount(&server)
            .await;

        let posts = client(&server, false).recent_posts("riftboundtcg", 25).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].fullname(), "t3_p2");
        assert_eq!(posts[1].text(), "first\n[[Jinx]]");
    }

    #[tokio::test]
    async fn read_only_client_uses_client_credentials_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server, false);
        assert_eq!(c.access_token().await.unwrap(), "tok");
        // Cached on the second call.
        assert_eq!(c.access_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn user_credentials_use_password_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=riftbot"))
            .and(body_string_contains("password=hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "user-tok" })))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server, true);
        assert!(c.can_reply());
        assert_eq!(c.access_token().await.unwrap(), "user-tok");
    }

    #[tokio::test]
    async fn listing_limit_is_capped() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/r/riftboundtcg/new"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "children": [] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let posts = client(&server, false).recent_posts("riftboundtcg", 500).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_makes_no_request() {
        // No mocks mounted: any request, token fetch included, would fail.
        let server = MockServer::start().await;
        let posts = client(&server, false).recent_posts("riftboundtcg", 0).await.unwrap();
        assert!(posts.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_error_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        let err = client(&server, true).access_token().await.unwrap_err();
        assert!(matches!(err, RedditError::Auth(ref e) if e == "invalid_grant"));
    }

    #[tokio::test]
    async fn post_comments_expands_more_placeholders() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/comments/p"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "kind": "Listing", "data": { "children": [
                    { "kind": "t3", "data": { "id": "p", "title": "t" } }
                ] } },
                { "kind": "Listing", "data": { "children": [
                    comment("a"),
                    { "kind": "more", "data": { "id": "m", "parent_id": "t3_p", "children": ["b", "c"], "count": 2 } }
                ] } }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/morechildren"))
            .and(query_param("link_id", "t3_p"))
            .and(query_param("children", "b,c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "json": { "errors": [], "data": { "things": [comment("b"), comment("c")] } }
            })))
            .mount(&server)
            .await;

        let comments = client(&server, false).post_comments("p").await.unwrap();
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn post_comments_follows_continue_thread() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/comments/p"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "kind": "Listing", "data": { "children": [] } },
                { "kind": "Listing", "data": { "children": [
                    comment("a"),
                    { "kind": "more", "data": { "id": "_", "parent_id": "t1_a", "children": [], "count": 0 } }
                ] } }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/comments/p/_/a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "kind": "Listing", "data": { "children": [] } },
                { "kind": "Listing", "data": { "children": [
                    { "kind": "t1", "data": { "id": "a", "body": "a", "replies": {
                        "kind": "Listing", "data": { "children": [comment("deep")] }
                    } } }
                ] } }
            ])))
            .mount(&server)
            .await;

        let comments = client(&server, false).post_comments("p").await.unwrap();
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "deep"]);
    }

    #[tokio::test]
    async fn reply_requires_user_credentials() {
        let server = MockServer::start().await;
        let err = client(&server, false).reply("t1_x", "hi").await.unwrap_err();
        assert!(matches!(err, RedditError::Auth(_)));
    }

    #[tokio::test]
    async fn reply_rejects_unknown_fullname() {
        let server = MockServer::start().await;
        let err = client(&server, true).reply("t5_x", "hi").await.unwrap_err();
        assert!(matches!(err, RedditError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn reply_posts_comment_form() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/comment"))
            .and(header("authorization", "Bearer tok"))
            .and(body_string_contains("api_type=json"))
            .and(body_string_contains("thing_id=t3_abc"))
            .and(body_string_contains("text=Jinx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "json": { "errors": [], "data": { "things": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, true).reply("t3_abc", "Jinx").await.unwrap();
    }

    #[tokio::test]
    async fn reply_surfaces_platform_errors() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/comment"))
            .and(body_string_contains("thing_id=t1_x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "json": { "errors": [["RATELIMIT", "slow down", "ratelimit"]] }
            })))
            .mount(&server)
            .await;

        let err = client(&server, true).reply("t1_x", "hi").await.unwrap_err();
        assert!(matches!(err, RedditError::Platform(_)));
    }

    #[tokio::test]
    async fn me_is_none_without_user() {
        let server = MockServer::start().await;
        assert_eq!(client(&server, false).me().await.unwrap(), None);
    }

    #[tokio::test]
    async fn me_returns_username() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "riftbot" })))
            .mount(&server)
            .await;

        assert_eq!(client(&server, true).me().await.unwrap().as_deref(), Some("riftbot"));
    }
}

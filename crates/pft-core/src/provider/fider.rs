//! Fider (fider.io) provider.
//!
//! Posts are addressed by their public number, which becomes the item's
//! `id` and `external_id`. Fider's API offers no update or delete for
//! regular API keys.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::http::{self, Auth, JsonClient};
use super::{status, FeedbackProvider, ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::models::FeedbackItem;

const NAME: &str = "fider";
const POSTS_PATH: &str = "/api/v1/posts";

#[derive(Debug, Default)]
pub struct FiderProvider {
    client: Option<JsonClient>,
}

impl FiderProvider {
    pub const fn new() -> Self {
        Self { client: None }
    }

    fn client(&self) -> ProviderResult<&JsonClient> {
        self.client.as_ref().ok_or(ProviderError::NotConnected)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FiderPost {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    user: FiderUser,
    #[serde(default)]
    votes_count: u32,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    tags: Vec<FiderTag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FiderUser {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FiderTag {
    slug: String,
}

#[derive(Debug, Serialize)]
struct CreatePost<'a> {
    title: &'a str,
    description: &'a str,
}

impl From<FiderPost> for FeedbackItem {
    fn from(post: FiderPost) -> Self {
        let number = if post.number > 0 { post.number } else { post.id };
        let mut item = Self::remote(number.to_string(), post.title);
        item.description = post.description;
        item.status = status::from_fider(&post.status);
        item.votes = post.votes_count;
        item.categories = post.tags.into_iter().map(|tag| tag.slug).collect();
        item.created_at = post.created_at;
        item.metadata.insert("post_id".to_string(), post.id.to_string());
        if !post.slug.is_empty() {
            item.metadata.insert("slug".to_string(), post.slug);
        }
        if post.user.id > 0 {
            item.metadata
                .insert("author_id".to_string(), post.user.id.to_string());
        }
        if !post.user.name.is_empty() {
            item.metadata.insert("author_name".to_string(), post.user.name);
        }
        item
    }
}

impl FeedbackProvider for FiderProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn connect(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        self.client = None;
        if config.api_token.trim().is_empty() {
            return Err(ProviderError::InvalidConfiguration(
                "Fider requires an API token".to_string(),
            ));
        }
        let client = JsonClient::new(
            config.base_url()?,
            Auth::Bearer(config.api_token.trim().to_string()),
            config,
        )?;
        http::send_json::<Vec<serde_json::Value>>(client.request(Method::GET, POSTS_PATH)?).await?;
        tracing::debug!(provider = NAME, "Connected");
        self.client = Some(client);
        Ok(())
    }

    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>> {
        let client = self.client()?;
        let posts: Vec<FiderPost> = http::send_json(client.request(Method::GET, POSTS_PATH)?).await?;
        Ok(posts.into_iter().map(FeedbackItem::from).collect())
    }

    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem> {
        let client = self.client()?;
        let number: u64 = id
            .trim()
            .parse()
            .map_err(|_| ProviderError::NotFound(id.to_string()))?;
        let request = client.request(Method::GET, &format!("{POSTS_PATH}/{number}"))?;
        match http::send_json::<FiderPost>(request).await {
            Ok(post) => Ok(post.into()),
            Err(ProviderError::Api { status: 404, .. }) => Err(ProviderError::NotFound(id.to_string())),
            Err(error) => Err(error),
        }
    }

    async fn create(&self, item: &FeedbackItem) -> ProviderResult<FeedbackItem> {
        let client = self.client()?;
        let title = item.clean_title();
        let description = item.remote_body();
        let body = CreatePost {
            title: &title,
            description: &description,
        };
        let post: FiderPost =
            http::send_json(client.request(Method::POST, POSTS_PATH)?.json(&body)).await?;

        let mut created = FeedbackItem::from(post);
        if created.title.is_empty() {
            created.title = title;
        }
        if created.description.is_empty() {
            created.description = description;
        }
        Ok(created)
    }

    async fn update(&self, _item: &FeedbackItem) -> ProviderResult<()> {
        self.client()?;
        Err(ProviderError::not_implemented(NAME, "update"))
    }

    async fn delete(&self, _id: &str) -> ProviderResult<()> {
        self.client()?;
        Err(ProviderError::not_implemented(NAME, "delete"))
    }

    fn close(&mut self) {
        self.client = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_maps_to_item() {
        let post: FiderPost = serde_json::from_value(serde_json::json!({
            "id": 301,
            "number": 7,
            "title": "Login",
            "slug": "login",
            "description": "Please add SSO",
            "status": "duplicate",
            "user": {"id": 4, "name": "Jana"},
            "votesCount": 12,
            "createdAt": "2024-01-02T03:04:05Z",
            "tags": [{"slug": "auth"}]
        }))
        .unwrap();

        let item = FeedbackItem::from(post);
        assert_eq!(item.id, "7");
        assert_eq!(item.external_id.as_deref(), Some("7"));
        assert_eq!(item.status, "declined");
        assert_eq!(item.votes, 12);
        assert_eq!(item.categories, vec!["auth"]);
        assert_eq!(item.metadata_value("slug"), Some("login"));
        assert_eq!(item.metadata_value("author_name"), Some("Jana"));
        assert_eq!(item.metadata_value("post_id"), Some("301"));
    }

    #[tokio::test]
    async fn operations_require_connection() {
        let provider = FiderProvider::new();
        assert!(matches!(provider.list().await, Err(ProviderError::NotConnected)));
        assert!(matches!(
            provider.update(&FeedbackItem::default()).await,
            Err(ProviderError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_rejects_missing_token() {
        let mut provider = FiderProvider::new();
        let config = ProviderConfig::new("https://fider.example.com", "");
        assert!(provider.connect(&config).await.is_err());
        assert!(provider.client.is_none());
    }
}

//! ClearFlask provider.
//!
//! Requires the `project_id` option. Statuses and categories are fetched on
//! connect so that ids can be shown by name and statuses written back.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::http::{self, Auth, JsonClient};
use super::{status, FeedbackProvider, ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::models::FeedbackItem;

const NAME: &str = "clearflask";
const TOKEN_HEADER: &str = "x-cf-token";

#[derive(Debug, Default)]
pub struct ClearFlaskProvider {
    connection: Option<Connection>,
}

#[derive(Debug)]
struct Connection {
    client: JsonClient,
    project_id: String,
    statuses: Vec<IdeaStatus>,
    categories: Vec<IdeaCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Idea {
    idea_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    status_id: String,
    #[serde(default)]
    tag_ids: Vec<String>,
    #[serde(default)]
    author_user_id: String,
    #[serde(default)]
    voters_count: u32,
    #[serde(default)]
    created: String,
    #[serde(default)]
    edited: String,
    author: Option<IdeaAuthor>,
    category: Option<IdeaCategory>,
    status: Option<IdeaStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaAuthor {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaCategory {
    category_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaStatus {
    status_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdeaPage {
    Page {
        results: Vec<Idea>,
        #[serde(default)]
        cursor: Option<String>,
    },
    Items(Vec<Idea>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdeaCreate<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tag_ids: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdeaUpdate<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_id: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tag_ids: &'a [String],
}

impl ClearFlaskProvider {
    pub const fn new() -> Self {
        Self { connection: None }
    }

    fn connection(&self) -> ProviderResult<&Connection> {
        self.connection.as_ref().ok_or(ProviderError::NotConnected)
    }
}

impl Connection {
    fn path(&self, suffix: &str) -> String {
        format!("/api/v1/projects/{}/{suffix}", self.project_id)
    }

    async fn list_ideas(&self) -> ProviderResult<Vec<Idea>> {
        let mut ideas = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = self.path("ideas");
            if let Some(cursor) = &cursor {
                let encoded: String = url::form_urlencoded::byte_serialize(cursor.as_bytes()).collect();
                path.push_str("?cursor=");
                path.push_str(&encoded);
            }

            match http::send_json::<IdeaPage>(self.client.request(Method::GET, &path)?).await? {
                IdeaPage::Items(items) => {
                    ideas.extend(items);
                    return Ok(ideas);
                }
                IdeaPage::Page { results, cursor: next } => {
                    ideas.extend(results);
                    let next = next.filter(|next| !next.is_empty());
                    if next.is_none() || next == cursor {
                        return Ok(ideas);
                    }
                    cursor = next;
                }
            }
        }
    }

    fn status_name<'a>(&'a self, idea: &'a Idea) -> &'a str {
        if let Some(status) = &idea.status {
            return &status.name;
        }
        self.statuses
            .iter()
            .find(|status| status.status_id == idea.status_id)
            .map_or(idea.status_id.as_str(), |status| status.name.as_str())
    }

    fn category_name<'a>(&'a self, idea: &'a Idea) -> &'a str {
        if let Some(category) = &idea.category {
            return &category.name;
        }
        self.categories
            .iter()
            .find(|category| category.category_id == idea.category_id)
            .map_or(idea.category_id.as_str(), |category| category.name.as_str())
    }

    /// Status id for an internal status: by vocabulary first, then by name or id.
    fn status_id_for(&self, internal: &str) -> Option<&str> {
        let internal = internal.trim();
        if internal.is_empty() {
            return None;
        }
        self.statuses
            .iter()
            .find(|status| {
                status::clearflask_canonical(&status.name)
                    .is_some_and(|canonical| canonical.as_str() == internal)
            })
            .or_else(|| {
                self.statuses.iter().find(|status| {
                    status.name.eq_ignore_ascii_case(internal) || status.status_id == internal
                })
            })
            .map(|status| status.status_id.as_str())
    }

    fn to_item(&self, idea: Idea) -> FeedbackItem {
        let status_name = self.status_name(&idea).to_string();
        let category_name = self.category_name(&idea).to_string();

        let mut item = FeedbackItem::remote(idea.idea_id.clone(), idea.title.clone());
        item.description.clone_from(&idea.description);
        item.status = status::from_clearflask(&status_name);
        item.votes = idea.voters_count;
        item.created_at.clone_from(&idea.created);
        item.updated_at.clone_from(&idea.edited);
        if !category_name.is_empty() {
            item.categories.push(category_name.clone());
        }

        let metadata = &mut item.metadata;
        for (key, value) in [
            ("slug", idea.slug.as_str()),
            ("category_id", idea.category_id.as_str()),
            ("category", category_name.as_str()),
            ("status_id", idea.status_id.as_str()),
        ] {
            if !value.is_empty() {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
        match &idea.author {
            Some(author) => {
                metadata.insert("author_id".to_string(), author.user_id.clone());
                metadata.insert("author_name".to_string(), author.name.clone());
            }
            None if !idea.author_user_id.is_empty() => {
                metadata.insert("author_id".to_string(), idea.author_user_id.clone());
            }
            None => {}
        }
        item.tags = idea.tag_ids;
        item
    }
}

impl FeedbackProvider for ClearFlaskProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn connect(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        self.connection = None;
        let project_id = config.require_option("project_id")?;
        let client = JsonClient::new(
            config.base_url()?,
            Auth::Header {
                name: TOKEN_HEADER,
                value: config.api_token.trim().to_string(),
            },
            config,
        )?;

        let mut connection = Connection {
            client,
            project_id,
            statuses: Vec::new(),
            categories: Vec::new(),
        };
        http::send_json::<serde_json::Value>(
            connection
                .client
                .request(Method::GET, &connection.path("ideas"))?,
        )
        .await?;

        match http::send_json(connection.client.request(Method::GET, &connection.path("statuses"))?).await {
            Ok(statuses) => connection.statuses = statuses,
            Err(error) => tracing::warn!(provider = NAME, %error, "Could not load statuses"),
        }
        match http::send_json(connection.client.request(Method::GET, &connection.path("categories"))?).await {
            Ok(categories) => connection.categories = categories,
            Err(error) => tracing::warn!(provider = NAME, %error, "Could not load categories"),
        }

        tracing::debug!(provider = NAME, project = %connection.project_id, "Connected");
        self.connection = Some(connection);
        Ok(())
    }

    async fn list(&self) -> ProviderResult<Vec<FeedbackItem>> {
        let connection = self.connection()?;
        let ideas = connection.list_ideas().await?;
        Ok(ideas.into_iter().map(|idea| connection.to_item(idea)).collect())
    }

    async fn get(&self, id: &str) -> ProviderResult<FeedbackItem> {
        let connection = self.connection()?;
        let request = connection
            .client
            .request(Method::GET, &connection.path(&format!("ideas/{}", id.trim())))?;
        match http::send_json::<Idea>(request).await {
            Ok(idea) => Ok(connection.to_item(idea)),
            Err(ProviderError::Api { status: 404, .. }) => Err(ProviderError::NotFound(id.to_string())),
            Err(error) => Err(error),
        }
    }

    async fn create(&self, item: &FeedbackItem) -> ProviderResult<FeedbackItem> {
        let connection = self.connection()?;
        let title = item.clean_title();
        let description = item.remote_body();
        let body = IdeaCreate {
            title: &title,
            description: &description,
            category_id: item.metadata_value("category_id"),
            tag_ids: &item.tags,
        };
        let request = connection
            .client
            .request(Method::POST, &connection.path("ideas"))?
            .json(&body);
        let idea: Idea = http::send_json(request).await?;
        Ok(connection.to_item(idea))
    }

    async fn update(&self, item: &FeedbackItem) -> ProviderResult<()> {
        let connection = self.connection()?;
        let idea_id = item
            .external_id()
            .ok_or_else(|| ProviderError::NotFound(item.id.clone()))?;
        let title = item.clean_title();
        let description = item.remote_body();
        let body = IdeaUpdate {
            title: &title,
            description: &description,
            status_id: connection.status_id_for(&item.status),
            category_id: item.metadata_value("category_id"),
            tag_ids: &item.tags,
        };
        let request = connection
            .client
            .request(Method::PATCH, &connection.path(&format!("ideas/{idea_id}")))?
            .json(&body);
        http::send_expecting(request, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        let connection = self.connection()?;
        let request = connection
            .client
            .request(Method::DELETE, &connection.path(&format!("ideas/{}", id.trim())))?;
        http::send_expecting(request, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    fn close(&mut self) {
        self.connection = None;
    }
}

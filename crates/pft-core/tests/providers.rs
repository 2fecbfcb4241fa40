use pft_core::config::ProviderConfig;
use pft_core::models::FeedbackItem;
use pft_core::provider::{FeedbackProvider, ProviderError, ProviderRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connected(name: &str, config: &ProviderConfig) -> pft_core::provider::Provider {
    let mut provider = ProviderRegistry::builtin().create(name).unwrap();
    provider.connect(config).await.unwrap();
    provider
}

fn local_item(title: &str, description: &str) -> FeedbackItem {
    FeedbackItem {
        description: description.to_string(),
        ..FeedbackItem::local("UC001-login", title, "/tmp/UC001-login.md")
    }
}

#[tokio::test]
async fn fider_lists_and_creates_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 301, "number": 7, "title": "Login", "slug": "login", "status": "started",
             "user": {"id": 2, "name": "Ana"}, "votesCount": 3, "tags": []}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/posts"))
        .and(body_json(json!({"title": "Login", "description": "Body"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 302, "number": 8, "title": "Login"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = connected("fider", &ProviderConfig::new(server.uri(), "secret")).await;

    let items = provider.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id(), Some("7"));
    assert_eq!(items[0].status, "started");
    assert_eq!(items[0].metadata_value("author_name"), Some("Ana"));

    let created = provider.create(&local_item("UC001: Login", "Body")).await.unwrap();
    assert_eq!(created.external_id(), Some("8"));
    assert_eq!(created.description, "Body");

    assert!(matches!(
        provider.update(&created).await,
        Err(ProviderError::NotImplemented { .. })
    ));
}

#[tokio::test]
async fn fider_get_maps_missing_post_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let provider = connected("fider", &ProviderConfig::new(server.uri(), "secret")).await;
    assert!(matches!(
        provider.get("99").await,
        Err(ProviderError::NotFound(id)) if id == "99"
    ));
}

#[tokio::test]
async fn fider_rejected_token_fails_connect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad token"})))
        .mount(&server)
        .await;

    let mut provider = ProviderRegistry::builtin().create("fider").unwrap();
    let error = provider
        .connect(&ProviderConfig::new(server.uri(), "wrong"))
        .await
        .unwrap_err();
    assert!(error.is_connection_error());
    assert!(error.to_string().contains("bad token"));
    assert!(matches!(provider.list().await, Err(ProviderError::NotConnected)));
}

#[tokio::test]
async fn clearflask_follows_cursor_and_maps_statuses() {
    let server = MockServer::start().await;
    let ideas = "/api/v1/projects/demo/ideas";
    Mock::given(method("GET"))
        .and(path(ideas))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"ideaId": "b", "title": "Export", "statusId": "s2"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ideas))
        .and(header("x-cf-token", "cf-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"ideaId": "a", "title": "Dark mode", "statusId": "s1", "votersCount": 4}],
            "cursor": "page2"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/demo/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"statusId": "s1", "name": "In Progress"},
            {"statusId": "s2", "name": "Under Review"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/demo/categories"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(server.uri(), "cf-secret").with_option("project_id", "demo");
    let provider = connected("clearflask", &config).await;

    let items = provider.list().await.unwrap();
    let summary: Vec<_> = items
        .iter()
        .map(|item| (item.id.as_str(), item.status.as_str()))
        .collect();
    assert_eq!(summary, vec![("a", "started"), ("b", "open")]);
    assert_eq!(items[0].votes, 4);
}

#[tokio::test]
async fn clearflask_update_sends_translated_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/demo/ideas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/demo/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"statusId": "done-id", "name": "Completed"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/demo/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/projects/demo/ideas/abc"))
        .and(body_json(json!({"title": "Login", "description": "Body", "statusId": "done-id"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(server.uri(), "token").with_option("project_id", "demo");
    let provider = connected("clearflask", &config).await;

    let mut item = local_item("UC001: Login", "Body");
    item.external_id = Some("abc".to_string());
    item.status = "completed".to_string();
    provider.update(&item).await.unwrap();
}

#[tokio::test]
async fn clearflask_without_project_fails_before_any_request() {
    let mut provider = ProviderRegistry::builtin().create("clearflask").unwrap();
    let error = provider
        .connect(&ProviderConfig::new("http://127.0.0.1:9", "token"))
        .await
        .unwrap_err();
    assert!(matches!(error, ProviderError::MissingOption(ref option) if option == "project_id"));
}

#[tokio::test]
async fn eververse_reads_features_and_creates_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/features"))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 12, "title": "Roadmap view", "status": "in_progress", "priority": 2}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/features"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": "f-1", "title": "Login", "description": "Body", "status": "idea"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(server.uri(), "anon").with_option("supabase_service_key", "service");
    let provider = connected("eververse", &config).await;

    let items = provider.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id(), Some("12"));
    assert_eq!(items[0].status, "started");
    assert_eq!(items[0].priority, "high");

    let created = provider.create(&local_item("UC001: Login", "Body")).await.unwrap();
    assert_eq!(created.external_id(), Some("f-1"));
    assert_eq!(created.status, "open");
}

#[tokio::test]
async fn eververse_falls_back_to_feedback_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/features"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "relation does not exist"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "fb-1", "title": "Slow search", "content": "Takes ages"}
        ])))
        .mount(&server)
        .await;

    let provider = connected("eververse", &ProviderConfig::new(server.uri(), "anon")).await;
    let items = provider.list().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "fb-1");
    assert_eq!(items[0].description, "Takes ages");
}

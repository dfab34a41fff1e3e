//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the recipe portal and run full
//! crawls through the real HTTP transport, HTML parser and JSON output.

use ladle::config::{Config, RateLimit};
use ladle::crawler::{Coordinator, ReqwestTransport, SeedSource, Shutdown};
use ladle::DedupIndex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing both portal roots at the mock server
fn create_test_config(base_url: &str, folder: &Path, depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.recursion_depth = depth;
    config.crawler.rate_limit = RateLimit::Fixed(0.0);
    config.crawler.max_fetch_attempts = 3;
    config.crawler.comment_fetch_count = 0;
    config.portal.base_url = base_url.to_string();
    config.portal.api_url = base_url.to_string();
    config.output.folder = folder.to_path_buf();
    config
}

fn coordinator(config: Config, index: &Arc<DedupIndex>) -> Coordinator {
    let transport = Arc::new(ReqwestTransport::new().expect("Failed to build client"));
    Coordinator::new(Arc::new(config), Arc::clone(index), transport, Shutdown::new())
}

fn open_index(folder: &Path) -> Arc<DedupIndex> {
    Arc::new(DedupIndex::open(&folder.join("index.dat")).expect("Failed to open index"))
}

/// Renders a recipe page the HTML parser accepts
fn recipe_page(title: &str, related: &[&str]) -> String {
    let links: String = related
        .iter()
        .map(|id| format!(r#"<a href="/rezepte/{}/Rezept.html">Rezept {}</a>"#, id, id))
        .collect();
    format!(
        r#"<html><head>
        <script type="application/ld+json">{{"@type": "Recipe", "author": {{"name": "tester"}}, "keywords": ["Test"]}}</script>
        </head><body>
        <h1>{}</h1>
        <article><h2>Zubereitung</h2><div>Kochen.</div></article>
        <section><h2>Weitere Rezepte von tester</h2><div>{}</div></section>
        </body></html>"#,
        title, links
    )
}

async fn mount_recipe(server: &MockServer, id: &str, related: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/rezepte/{}/", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(recipe_page(&format!("Rezept {}", id), related))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_full_crawl_follows_related_recipes() {
    let mock_server = MockServer::start().await;
    mount_recipe(&mock_server, "100", &["200", "300"]).await;
    mount_recipe(&mock_server, "200", &["100"]).await;
    mount_recipe(&mock_server, "300", &[]).await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let config = create_test_config(&mock_server.uri(), dir.path(), 1);

    let report = coordinator(config, &index)
        .run(ids(&["100"]))
        .await
        .expect("Crawl failed");

    assert_eq!(report.fetched, 3);
    assert_eq!(report.levels, 2);
    assert_eq!(report.failed, 0);

    for id in ["100", "200", "300"] {
        let written = std::fs::read_to_string(dir.path().join(format!("{}.json", id)))
            .expect("Missing recipe file");
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json["id"], id);
        assert_eq!(json["title"], format!("Rezept {}", id));
        assert_eq!(json["author"], "tester");
    }

    index.close().unwrap();
    let reopened = DedupIndex::open(&dir.path().join("index.dat")).unwrap();
    let known: HashSet<String> = reopened.ids().into_iter().collect();
    assert_eq!(known, ids(&["100", "200", "300"]).into_iter().collect());
}

#[tokio::test]
async fn test_rerun_skips_indexed_recipes() {
    let mock_server = MockServer::start().await;
    mount_recipe(&mock_server, "100", &[]).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 0);

    let index = open_index(dir.path());
    let first = coordinator(config.clone(), &index)
        .run(ids(&["100"]))
        .await
        .unwrap();
    index.close().unwrap();
    drop(index);

    let index = open_index(dir.path());
    let second = coordinator(config, &index)
        .run(ids(&["100"]))
        .await
        .unwrap();

    assert_eq!(first.fetched, 1);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.skipped, 1);
}

#[tokio::test]
async fn test_force_all_refetches_indexed_recipes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rezepte/100/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(recipe_page("Suppe", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    index.add("100").unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 0);
    config.crawler.force_all = true;

    let report = coordinator(config, &index).run(ids(&["100"])).await.unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn test_index_only_mode_sends_no_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 3);
    config.crawler.index_only = true;

    let report = coordinator(config, &index)
        .run(ids(&["1", "2", "3"]))
        .await
        .unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(index.ids(), ids(&["1", "2", "3"]));
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rezepte/100/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_recipe(&mock_server, "100", &[]).await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let config = create_test_config(&mock_server.uri(), dir.path(), 0);

    let report = coordinator(config, &index).run(ids(&["100"])).await.unwrap();

    assert_eq!(report.fetched, 1);
    assert!(index.contains("100"));
}

#[tokio::test]
async fn test_exhausted_recipe_does_not_stop_level() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rezepte/100/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_recipe(&mock_server, "200", &[]).await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let config = create_test_config(&mock_server.uri(), dir.path(), 0);

    let report = coordinator(config, &index)
        .run(ids(&["100", "200"]))
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.failed, 1);
    assert!(!index.contains("100"));
    assert!(index.contains("200"));
}

#[tokio::test]
async fn test_comments_are_attached_to_record() {
    let mock_server = MockServer::start().await;
    mount_recipe(&mock_server, "100", &[]).await;
    Mock::given(method("GET"))
        .and(path("/v2/recipes/100/comments"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"count": 2, "results": [
                {"text": "Sehr lecker", "owner": {"username": "anna"}},
                {"text": "Zu salzig", "owner": {"username": "bert"}}
            ]}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 0);
    config.crawler.comment_fetch_count = -1;

    coordinator(config, &index).run(ids(&["100"])).await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("100.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["comment_count"], 2);
    assert_eq!(json["comments"][0]["author"], "anna");
    assert_eq!(json["comments"][1]["text"], "Zu salzig");
}

#[tokio::test]
async fn test_search_seeds_are_crawled() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    Mock::given(method("GET"))
        .and(path("/rs/s0/kartoffel+suppe/Rezepte.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><head><script type="application/ld+json">{{"itemListElement": [
                {{"url": "{base}/rezepte/100/A.html"}},
                {{"url": "{base}/rezepte/200/B.html"}}
            ]}}</script></head><body></body></html>"#,
            base = base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_recipe(&mock_server, "100", &[]).await;
    mount_recipe(&mock_server, "200", &[]).await;

    let dir = TempDir::new().unwrap();
    let index = open_index(dir.path());
    let config = create_test_config(&base_url, dir.path(), 0);
    let coordinator = coordinator(config, &index);

    let seeds = coordinator
        .resolve_seeds(&SeedSource::Search(vec!["kartoffel suppe".to_string()]))
        .await
        .unwrap();
    assert_eq!(seeds, ids(&["100", "200"]));

    let report = coordinator.run(seeds).await.unwrap();
    assert_eq!(report.fetched, 2);
}

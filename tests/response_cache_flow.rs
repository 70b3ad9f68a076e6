//! Integration tests for the response cache path.

use std::sync::Arc;

use edge_gateway::directory::InMemoryDirectory;

mod common;
use common::*;

fn blog_host() -> String {
    format!("blog.{BASE_DOMAIN}")
}

fn seeded_directory() -> Arc<InMemoryDirectory> {
    let dir = Arc::new(InMemoryDirectory::new());
    dir.insert_app(app("blog", None));
    dir.insert_version("id-blog", version("v1"));
    dir
}

#[tokio::test]
async fn test_miss_then_hit_bypasses_rendering() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    let first = get(&gw, &blog_host(), "/articles").await;
    assert_eq!(first.status(), 200);
    let cache_header = first
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cache_header.starts_with("miss "));
    let first_body = first.text().await.unwrap();
    assert_eq!(renderer.call_count(), 1);
    settle().await;

    let second = get(&gw, &blog_host(), "/articles").await;
    assert_eq!(second.status(), 200);
    let cache_header = second
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cache_header.starts_with("hit "));
    assert_eq!(second.text().await.unwrap(), first_body);
    assert_eq!(renderer.call_count(), 1, "hit must not re-render");
}

#[tokio::test]
async fn test_distinct_paths_get_distinct_entries() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    get(&gw, &blog_host(), "/a").await;
    settle().await;
    get(&gw, &blog_host(), "/b").await;
    assert_eq!(renderer.call_count(), 2);
}

#[tokio::test]
async fn test_querystring_does_not_change_fingerprint() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    get(&gw, &blog_host(), "/list?page=1").await;
    settle().await;
    let second = get(&gw, &blog_host(), "/list?page=2").await;
    assert!(second
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("hit "));
    assert_eq!(renderer.call_count(), 1);
}

#[tokio::test]
async fn test_conditional_get_revalidates_with_304() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    let first = get(&gw, &blog_host(), "/page").await;
    let etag = first
        .headers()
        .get("etag")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    settle().await;

    let revalidation = client()
        .get(gw.url("/page"))
        .header("host", blog_host())
        .header("if-none-match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(revalidation.status(), 304);
    assert_eq!(revalidation.headers().get("etag").unwrap(), etag.as_str());
    assert_eq!(
        revalidation.headers().get("cache-control").unwrap(),
        "no-cache"
    );
    assert_eq!(renderer.call_count(), 1);
}

#[tokio::test]
async fn test_new_version_changes_fingerprint_and_misses() {
    let mut config = test_config();
    // Re-resolve every request so the new deployment is observed
    // immediately.
    config.resolution_cache.enabled = false;

    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(config, dir.clone(), dir.clone(), renderer.clone()).await;

    let first = get(&gw, &blog_host(), "/home").await;
    assert_eq!(first.text().await.unwrap(), "rendered v1");
    settle().await;

    dir.insert_version("id-blog", version("v2"));

    let second = get(&gw, &blog_host(), "/home").await;
    assert!(second
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("miss "));
    assert_eq!(second.text().await.unwrap(), "rendered v2");
    assert_eq!(renderer.call_count(), 2);
}

#[tokio::test]
async fn test_nocache_param_bypasses_the_read_path() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    get(&gw, &blog_host(), "/fresh").await;
    settle().await;

    let bypassed = get(&gw, &blog_host(), "/fresh?_nocache=1").await;
    assert!(bypassed
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("miss "));
    assert_eq!(renderer.call_count(), 2);
}

#[tokio::test]
async fn test_dev_environment_is_never_cached() {
    let dir = seeded_directory();
    let renderer = StubRenderer::ok();
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;
    let host = format!("blog--dev.{BASE_DOMAIN}");

    let first = get(&gw, &host, "/").await;
    assert_eq!(first.status(), 200);
    assert!(first.headers().get("x-edge-server-cache").is_none());
    settle().await;

    get(&gw, &host, "/").await;
    assert_eq!(renderer.call_count(), 2);
}

#[tokio::test]
async fn test_rendered_redirects_are_memoized() {
    let dir = seeded_directory();
    let renderer = StubRenderer::redirect("https://moved.example.net/");
    let gw = spawn_gateway(test_config(), dir.clone(), dir, renderer.clone()).await;

    let first = get(&gw, &blog_host(), "/moved").await;
    assert_eq!(first.status(), 302);
    settle().await;

    let second = get(&gw, &blog_host(), "/moved").await;
    assert_eq!(second.status(), 302);
    assert_eq!(
        second.headers().get("location").unwrap(),
        "https://moved.example.net/"
    );
    assert!(second
        .headers()
        .get("x-edge-server-cache")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("hit "));
    assert_eq!(renderer.call_count(), 1);
}

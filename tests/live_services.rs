//! Integration tests against the real services.
//!
//! These make network calls and need credentials.
//! Run with: SYNAPSE_AUTH_TOKEN=... cargo test --test live_services -- --ignored

use htan_artist::repository::{DataRepository, SynapseClient};
use htan_artist::storage::HttpFetcher;
use htan_artist::assets::parse_latest_assets;

fn synapse_client() -> SynapseClient {
    let token = std::env::var("SYNAPSE_AUTH_TOKEN")
        .expect("SYNAPSE_AUTH_TOKEN environment variable must be set for live tests");
    SynapseClient::new(token).expect("token should be accepted")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test live_services -- --ignored
async fn test_fetch_annotations() {
    let client = synapse_client();
    let synid = std::env::var("HTAN_TEST_SYNID").unwrap_or_else(|_| "syn25892951".to_string());

    let annotations = client.get_annotations(&synid).await;
    assert!(annotations.is_ok(), "Fetch failed: {:?}", annotations.err());
    let annotations = annotations.expect("Should have annotations");
    assert_eq!(annotations.id, synid);
    assert!(!annotations.etag.is_empty(), "Should have an etag");
}

#[tokio::test]
#[ignore]
async fn test_list_children() {
    let client = synapse_client();
    let children = client
        .list_children("syn25892951")
        .await
        .expect("Listing should succeed");
    assert!(!children.is_empty(), "Container should have children");
}

#[tokio::test]
#[ignore]
async fn test_fetch_published_assets() {
    let url = std::env::var("HTAN_ASSETS_URL")
        .expect("HTAN_ASSETS_URL must point at the published latest-assets JSON");
    let body = HttpFetcher::new()
        .get_text(&url)
        .await
        .expect("Fetch should succeed");
    let entries = parse_latest_assets(&body).expect("Document should parse");
    assert!(!entries.is_empty(), "Document should list entities");
}

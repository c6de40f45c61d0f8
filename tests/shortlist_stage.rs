//! End-to-end shortlist runs against in-memory service fakes.

use async_trait::async_trait;
use htan_artist::shortlist::{
    read_samplesheet, run_shortlist, CloudProviderFilter, EligibleEntity, EntityCatalog,
    ShortlistConfig,
};
use htan_artist::storage::{HttpFetcher, InventoryEntry, ObjectStore, ObjectUri};
use htan_artist::{QueryError, StorageError};

struct AssetsBucket(String);

#[async_trait]
impl ObjectStore for AssetsBucket {
    async fn list_objects(&self, _bucket: &str) -> Result<Vec<InventoryEntry>, StorageError> {
        Ok(Vec::new())
    }

    async fn get_object(&self, _uri: &ObjectUri) -> Result<String, StorageError> {
        Ok(self.0.clone())
    }
}

struct FixedCatalog(Vec<EligibleEntity>);

#[async_trait]
impl EntityCatalog for FixedCatalog {
    async fn eligible_entities(&self) -> Result<Vec<EligibleEntity>, QueryError> {
        Ok(self.0.clone())
    }
}

struct BrokenCatalog;

#[async_trait]
impl EntityCatalog for BrokenCatalog {
    async fn eligible_entities(&self) -> Result<Vec<EligibleEntity>, QueryError> {
        Err(QueryError::Failed {
            code: 1,
            stderr: "Access Denied".to_string(),
        })
    }
}

fn entity(n: usize, image: &str) -> EligibleEntity {
    EligibleEntity {
        id: format!("syn{:08}", n),
        image: image.to_string(),
        he: n % 2 == 0,
        convert: n % 3 == 0,
        assay_type: if n % 2 == 0 { "H&E" } else { "CyCIF" }.to_string(),
        center: "HTAN OHSU".to_string(),
    }
}

fn assets_doc(done: &[usize]) -> String {
    let entries: Vec<_> = done
        .iter()
        .map(|n| {
            serde_json::json!({
                "synid": format!("syn{:08}", n),
                "thumbnail": format!("https://cdn/{n}.png"),
                "minerva": format!("https://cdn/{n}/index.html"),
            })
        })
        .collect();
    serde_json::to_string(&entries).unwrap()
}

#[tokio::test]
async fn writes_full_and_sample_samplesheets() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("samplesheet");
    let entities: Vec<_> = (1..=20)
        .map(|n| entity(n, &format!("s3://bucket/{n}.svs")))
        .collect();

    let config = ShortlistConfig::default()
        .with_output_dir(&out)
        .with_sample_size(5)
        .with_seed(11);
    let outcome = run_shortlist(
        &config,
        &AssetsBucket(assets_doc(&[1, 2, 3])),
        &HttpFetcher::new(),
        &FixedCatalog(entities),
    )
    .await
    .unwrap();

    assert_eq!(outcome.records.len(), 17);
    let saved = outcome.saved.expect("samplesheets written");
    let full = read_samplesheet(&saved.full).unwrap();
    assert_eq!(full.len(), 17);
    assert!(full.iter().all(|r| r.miniature || r.minerva));
    assert_eq!(full[0].id, "syn00000020");

    let sample = read_samplesheet(saved.sample.as_ref().unwrap()).unwrap();
    assert_eq!(sample.len(), 5);
    assert!(sample.iter().all(|r| full.contains(r)));
}

#[tokio::test]
async fn nothing_to_do_writes_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("samplesheet");
    let entities = vec![entity(1, "s3://b/1.svs"), entity(2, "s3://b/2.svs")];

    let outcome = run_shortlist(
        &ShortlistConfig::default().with_output_dir(&out),
        &AssetsBucket(assets_doc(&[1, 2])),
        &HttpFetcher::new(),
        &FixedCatalog(entities),
    )
    .await
    .unwrap();

    assert!(outcome.is_empty());
    assert!(outcome.saved.is_none());
    assert!(!out.exists());
}

#[tokio::test]
async fn provider_filter_can_empty_the_shortlist() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("samplesheet");
    let entities = vec![entity(1, "s3://b/1.svs"), entity(2, "s3://b/2.svs")];

    let outcome = run_shortlist(
        &ShortlistConfig::default()
            .with_output_dir(&out)
            .with_cloud_provider(CloudProviderFilter::Gs),
        &AssetsBucket("[]".to_string()),
        &HttpFetcher::new(),
        &FixedCatalog(entities),
    )
    .await
    .unwrap();

    assert!(outcome.is_empty());
    assert!(!out.exists());
}

#[tokio::test]
async fn catalog_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_shortlist(
        &ShortlistConfig::default().with_output_dir(dir.path().join("s")),
        &AssetsBucket("[]".to_string()),
        &HttpFetcher::new(),
        &BrokenCatalog,
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Access Denied"));
}

#[tokio::test]
async fn local_assets_file_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("latest.json");
    std::fs::write(&assets, assets_doc(&[1])).unwrap();

    let outcome = run_shortlist(
        &ShortlistConfig::default()
            .with_assets_uri(assets.display().to_string())
            .with_output_dir(dir.path().join("out")),
        &AssetsBucket(String::new()),
        &HttpFetcher::new(),
        &FixedCatalog(vec![entity(1, "s3://b/1.svs"), entity(2, "gs://b/2.svs")]),
    )
    .await
    .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].entity.id, "syn00000002");
    assert!(outcome.saved.unwrap().sample.is_none());
}

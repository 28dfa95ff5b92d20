mod common;

use std::sync::Arc;

use quiz_core::model::{TestId, TestSummary};
use services::{CatalogOrigin, CatalogSyncManager, ManualConnectivity, NetworkError, QuizError};
use storage::repository::{CatalogRepository, InMemoryRepository, Storage, StorageError};

use common::{FakeApi, summary};

fn catalog() -> Vec<TestSummary> {
    ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| summary(id, &format!("Test {id}")))
        .collect()
}

fn sorted_ids(tests: &[TestSummary]) -> Vec<TestId> {
    let mut ids: Vec<_> = tests.iter().map(|t| t.id().clone()).collect();
    ids.sort();
    ids
}

fn manager(
    api: &Arc<FakeApi>,
    repo: &InMemoryRepository,
    online: bool,
) -> CatalogSyncManager {
    CatalogSyncManager::new(
        api.clone(),
        Arc::new(repo.clone()),
        Arc::new(ManualConnectivity::new(online)),
    )
    .with_seed(5)
}

fn manager_over(
    api: &Arc<FakeApi>,
    store: &Arc<dyn CatalogRepository>,
    online: bool,
) -> CatalogSyncManager {
    CatalogSyncManager::new(
        api.clone(),
        Arc::clone(store),
        Arc::new(ManualConnectivity::new(online)),
    )
    .with_seed(11)
}

async fn backends(name: &str) -> Vec<Arc<dyn CatalogRepository>> {
    let sqlite = Storage::sqlite(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .unwrap();
    vec![Arc::new(InMemoryRepository::new()), sqlite.catalog]
}

#[tokio::test]
async fn online_sync_writes_every_entry_through_in_presented_order() {
    let api = FakeApi::new();
    api.set_catalog(Ok(catalog()));
    let repo = InMemoryRepository::new();

    let snapshot = manager(&api, &repo, true).fetch_catalog().await;
    assert_eq!(snapshot.origin, CatalogOrigin::Remote);
    assert!(snapshot.issues.is_empty());
    assert_eq!(sorted_ids(&snapshot.tests), sorted_ids(&catalog()));

    let cached = repo.query_all().await.unwrap();
    assert_eq!(cached, snapshot.tests);
}

#[tokio::test]
async fn offline_reads_cache_verbatim() {
    let api = FakeApi::new();
    api.set_catalog(Ok(catalog()));
    let repo = InMemoryRepository::new();
    let stored = vec![summary("c", "C"), summary("a", "A"), summary("b", "B")];
    repo.upsert_all(&stored).await.unwrap();

    let snapshot = manager(&api, &repo, false).fetch_catalog().await;
    assert_eq!(snapshot.origin, CatalogOrigin::Cache);
    assert!(snapshot.issues.is_empty());
    assert_eq!(snapshot.tests, stored);
}

#[tokio::test]
async fn offline_with_empty_cache_returns_nothing_and_reports_why() {
    let api = FakeApi::new();
    let repo = InMemoryRepository::new();

    let snapshot = manager(&api, &repo, false).fetch_catalog().await;
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.origin, CatalogOrigin::Unavailable);
    assert_eq!(snapshot.issues.len(), 1);
    assert!(matches!(
        snapshot.issues[0],
        QuizError::Network(NetworkError::Offline)
    ));
}

#[tokio::test]
async fn remote_failure_mid_flight_falls_back_to_cache() {
    let api = FakeApi::new();
    api.set_catalog(Err(NetworkError::Timeout));
    let repo = InMemoryRepository::new();
    repo.upsert_all(&[summary("x", "X")]).await.unwrap();

    let snapshot = manager(&api, &repo, true).fetch_catalog().await;
    assert_eq!(snapshot.origin, CatalogOrigin::Cache);
    assert_eq!(snapshot.tests, vec![summary("x", "X")]);
}

#[tokio::test]
async fn unreadable_cache_reports_both_failures() {
    let api = FakeApi::new();
    let repo = InMemoryRepository::new();
    repo.set_available(false);

    let snapshot = manager(&api, &repo, false).fetch_catalog().await;
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.origin, CatalogOrigin::Unavailable);
    assert!(matches!(
        snapshot.issues.as_slice(),
        [
            QuizError::Network(NetworkError::Offline),
            QuizError::Storage(StorageError::Connection(_))
        ]
    ));
}

#[tokio::test]
async fn rejected_row_is_skipped_but_fresh_list_is_returned() {
    let api = FakeApi::new();
    api.set_catalog(Ok(catalog()));
    let repo = InMemoryRepository::new();
    repo.reject_writes_for(TestId::new("c"));

    let snapshot = manager(&api, &repo, true).fetch_catalog().await;
    assert_eq!(snapshot.origin, CatalogOrigin::Remote);
    assert_eq!(snapshot.tests.len(), 5);

    let cached = repo.query_all().await.unwrap();
    assert_eq!(cached.len(), 4);
    assert!(cached.iter().all(|t| t.id() != &TestId::new("c")));
}

#[tokio::test]
async fn broken_store_does_not_hide_remote_catalog() {
    let api = FakeApi::new();
    api.set_catalog(Ok(catalog()));
    let repo = InMemoryRepository::new();
    repo.set_available(false);

    let snapshot = manager(&api, &repo, true).fetch_catalog().await;
    assert_eq!(snapshot.origin, CatalogOrigin::Remote);
    assert_eq!(snapshot.tests.len(), 5);
}

#[tokio::test]
async fn random_test_picks_from_the_list() {
    let api = FakeApi::new();
    let repo = InMemoryRepository::new();
    let sync = manager(&api, &repo, true);

    assert!(sync.random_test(&[]).is_none());
    let tests = catalog();
    let picked = sync.random_test(&tests).unwrap();
    assert!(tests.contains(&picked));
}

#[tokio::test]
async fn sqlite_cache_survives_going_offline() {
    let storage = Storage::sqlite("sqlite:file:memdb_catalog_sync?mode=memory&cache=shared")
        .await
        .unwrap();
    let api = FakeApi::new();
    api.set_catalog(Ok(catalog()));

    let online = CatalogSyncManager::new(
        api.clone(),
        Arc::clone(&storage.catalog),
        Arc::new(ManualConnectivity::new(true)),
    );
    let fresh = online.fetch_catalog().await;
    assert_eq!(fresh.origin, CatalogOrigin::Remote);

    let offline = CatalogSyncManager::new(
        api.clone(),
        Arc::clone(&storage.catalog),
        Arc::new(ManualConnectivity::new(false)),
    );
    let cached = offline.fetch_catalog().await;
    assert_eq!(cached.origin, CatalogOrigin::Cache);
    assert_eq!(cached.tests, fresh.tests);
}

#[tokio::test]
async fn resync_leaves_exactly_the_latest_catalog_cached() {
    for store in backends("memdb_catalog_resync").await {
        let api = FakeApi::new();
        api.set_catalog(Ok(vec![summary("a", "A"), summary("b", "B"), summary("c", "C")]));
        manager_over(&api, &store, true).fetch_catalog().await;

        api.set_catalog(Ok(vec![summary("a", "A"), summary("d", "D")]));
        let fresh = manager_over(&api, &store, true).fetch_catalog().await;
        assert_eq!(fresh.origin, CatalogOrigin::Remote);
        assert_eq!(sorted_ids(&fresh.tests), vec![TestId::new("a"), TestId::new("d")]);

        let persisted = store.query_all().await.unwrap();
        assert_eq!(sorted_ids(&persisted), sorted_ids(&fresh.tests));

        let cached = manager_over(&api, &store, false).fetch_catalog().await;
        assert_eq!(cached.origin, CatalogOrigin::Cache);
        assert_eq!(cached.tests, fresh.tests);
    }
}

#[tokio::test]
async fn padded_wire_catalog_reads_back_the_same_offline() {
    let storage = Storage::sqlite("sqlite:file:memdb_catalog_wire?mode=memory&cache=shared")
        .await
        .unwrap();
    let decoded: Vec<TestSummary> = serde_json::from_str(
        r#"[
            {"id":"m","name":"Math ","description":" algebra","level":"easy ","numberOfTasks":3},
            {"id":"h","name":" History","description":"dates ","level":" hard","numberOfTasks":5}
        ]"#,
    )
    .unwrap();
    let api = FakeApi::new();
    api.set_catalog(Ok(decoded
        .into_iter()
        .map(|s| s.validate().unwrap())
        .collect()));

    let fresh = manager_over(&api, &storage.catalog, true).fetch_catalog().await;
    assert_eq!(fresh.origin, CatalogOrigin::Remote);

    let cached = manager_over(&api, &storage.catalog, false).fetch_catalog().await;
    assert_eq!(cached.origin, CatalogOrigin::Cache);
    assert_eq!(cached.tests, fresh.tests);
    assert!(cached.tests.iter().any(|t| t.name() == "Math" && t.level() == "easy"));
}

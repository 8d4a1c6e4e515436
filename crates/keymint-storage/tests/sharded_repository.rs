use keymint_core::{Error, ShortKey, UrlRecord};
use keymint_sharding::{PrefixPolicy, RoundRobinPolicy, ShardCoordinator};
use keymint_storage::ShardedUrlRepository;
use sqlx::Row;
use std::sync::Arc;
use tempfile::TempDir;

async fn repository(ranges: &[&str]) -> (TempDir, Arc<ShardCoordinator>, ShardedUrlRepository) {
    let dir = tempfile::tempdir().unwrap();
    let ranges = ranges
        .iter()
        .map(|r| r.parse().unwrap())
        .collect::<Vec<_>>();

    let mut coordinator = ShardCoordinator::with_base_dir(ranges, dir.path());
    coordinator.bootstrap().await.unwrap();

    let coordinator = Arc::new(coordinator);
    coordinator.set_policy(Arc::new(PrefixPolicy::new(
        coordinator.get_shards().to_vec(),
    )));

    let repo = ShardedUrlRepository::new(coordinator.clone());
    (dir, coordinator, repo)
}

fn free_slots(keys: &[&str]) -> Vec<UrlRecord> {
    keys.iter()
        .map(|k| UrlRecord::free_slot(ShortKey::new_unchecked(*k)))
        .collect()
}

#[tokio::test]
async fn batches_land_on_their_routed_shards() {
    let (_dir, coordinator, repo) = repository(&["a-e", "f-j", "k-p"]).await;

    repo.create_batches(free_slots(&["a1", "c2", "f1", "m1"]))
        .await
        .unwrap();

    let mut counts = Vec::new();
    for shard in coordinator.get_shards() {
        let row = sqlx::query("SELECT COUNT(1) FROM urls")
            .fetch_one(shard.pool())
            .await
            .unwrap();
        counts.push(row.get::<i64, _>(0));
    }
    assert_eq!(counts, [2, 1, 1]);

    coordinator.teardown().await;
}

#[tokio::test]
async fn unroutable_batch_key_fails_before_any_insert() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;

    let err = repo
        .create_batches(free_slots(&["z9"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    coordinator.teardown().await;
}

#[tokio::test]
async fn assignment_claims_a_slot_and_makes_it_findable() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1", "a2", "a3"]))
        .await
        .unwrap();

    coordinator.set_policy(Arc::new(RoundRobinPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    let assigned = repo.assign_url("https://example.com/a").await.unwrap();
    assert_eq!(assigned.url.as_deref(), Some("https://example.com/a"));
    assert_eq!(assigned.malicious, Some(0));

    // Reads route by prefix.
    coordinator.set_policy(Arc::new(PrefixPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    let found = repo.find(assigned.short_key.as_str()).await.unwrap();
    assert_eq!(found.url.as_deref(), Some("https://example.com/a"));

    coordinator.teardown().await;
}

#[tokio::test]
async fn second_assignment_takes_a_different_slot() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1", "a2"])).await.unwrap();

    coordinator.set_policy(Arc::new(RoundRobinPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    let first = repo.assign_url("https://one.example").await.unwrap();
    let second = repo.assign_url("https://two.example").await.unwrap();
    assert_ne!(first.short_key, second.short_key);

    coordinator.teardown().await;
}

#[tokio::test]
async fn assignment_fails_when_the_shard_is_exhausted() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1"])).await.unwrap();

    coordinator.set_policy(Arc::new(RoundRobinPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    repo.assign_url("https://one.example").await.unwrap();

    let err = repo.assign_url("https://two.example").await.unwrap_err();
    assert!(matches!(err, Error::Exhausted(_)));

    coordinator.teardown().await;
}

#[tokio::test]
async fn unassigned_slots_are_not_findable() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1"])).await.unwrap();

    let err = repo.find("a1").await.unwrap_err();
    assert!(err.is_not_found());

    coordinator.teardown().await;
}

#[tokio::test]
async fn find_rejects_malformed_lookup_keys() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;

    assert!(matches!(repo.find("").await, Err(Error::Invalid(_))));
    assert!(matches!(
        repo.find("aaaaaaaaaaaaa").await, // 13 chars
        Err(Error::Invalid(_))
    ));

    coordinator.teardown().await;
}

#[tokio::test]
async fn soft_delete_hides_the_row_but_keeps_it() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1"])).await.unwrap();

    coordinator.set_policy(Arc::new(RoundRobinPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    let assigned = repo.assign_url("https://example.com").await.unwrap();

    coordinator.set_policy(Arc::new(PrefixPolicy::new(
        coordinator.get_shards().to_vec(),
    )));
    let deleted = repo.delete(assigned.short_key.as_str()).await.unwrap();
    assert!(deleted);

    let err = repo.find(assigned.short_key.as_str()).await.unwrap_err();
    assert!(err.is_not_found());

    // The row survives with deleted_at stamped.
    let row = sqlx::query("SELECT deleted_at FROM urls WHERE short_key = ?")
        .bind(assigned.short_key.as_str())
        .fetch_one(coordinator.get_shards()[0].pool())
        .await
        .unwrap();
    assert!(row.get::<Option<i64>, _>(0).is_some());

    coordinator.teardown().await;
}

#[tokio::test]
async fn large_batches_insert_in_one_round_trip() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;

    let keys: Vec<String> = (0..500).map(|i| format!("a{i}")).collect();
    let records = keys
        .iter()
        .map(|k| UrlRecord::free_slot(ShortKey::new_unchecked(k.as_str())))
        .collect();
    repo.create_batches(records).await.unwrap();

    let row = sqlx::query("SELECT COUNT(1) FROM urls WHERE url IS NULL")
        .fetch_one(coordinator.get_shards()[0].pool())
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>(0), 500);

    coordinator.teardown().await;
}

#[tokio::test]
async fn duplicate_short_keys_surface_the_store_error() {
    let (_dir, coordinator, repo) = repository(&["a-e"]).await;
    repo.create_batches(free_slots(&["a1"])).await.unwrap();

    let err = repo.create_batches(free_slots(&["a1"])).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));

    coordinator.teardown().await;
}

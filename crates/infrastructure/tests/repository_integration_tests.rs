use anyhow::Result;
use chrono::{Datelike, Timelike};
use datasync_core::models::{NewNodeClient, NodeKey, RunState};
use datasync_core::traits::{NodeClientRepository, RunRepository, RunSampleRepository};
use datasync_core::SyncError;
use datasync_infrastructure::database::{
    SqliteNodeClientRepository, SqliteRunRepository, SqliteRunSampleRepository,
};

use database_test_utils::TestDatabase;

fn new_node(station: &str) -> NewNodeClient {
    NewNodeClient {
        organisation_name: "orgA".to_string(),
        site_name: "siteB".to_string(),
        station_name: station.to_string(),
        hostname: Some("ms-host".to_string()),
        username: None,
        flags: Some("lcms".to_string()),
    }
}

#[tokio::test]
async fn test_migrate_is_idempotent() -> Result<()> {
    let db = TestDatabase::new().await?;
    db.manager.migrate().await?;
    db.manager.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn test_node_client_repository_crud() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteNodeClientRepository::new(db.pool());

    let created = repo.create(&new_node("station1")).await?;
    assert!(created.id > 0);
    assert_eq!(created.hostname.as_deref(), Some("ms-host"));

    let found = repo
        .find_by_key(&NodeKey::new("orgA", "siteB", "station1"))
        .await?
        .expect("node should exist");
    assert_eq!(found.id, created.id);

    // 三元组精确匹配
    assert!(repo
        .find_by_key(&NodeKey::new("orga", "siteB", "station1"))
        .await?
        .is_none());

    let mut updated = found.clone();
    updated.username = Some("sync".to_string());
    updated.flags = None;
    repo.update(&updated).await?;

    let reloaded = repo.find_by_id(created.id).await?.unwrap();
    assert_eq!(reloaded.username.as_deref(), Some("sync"));
    assert_eq!(reloaded.flags, None);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_node_rejected() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteNodeClientRepository::new(db.pool());

    repo.create(&new_node("station1")).await?;
    let err = repo.create(&new_node("station1")).await.unwrap_err();
    assert!(matches!(err, SyncError::NodeAlreadyExists { .. }));
    Ok(())
}

#[tokio::test]
async fn test_list_sorted_by_triple() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteNodeClientRepository::new(db.pool());

    repo.create(&new_node("station2")).await?;
    repo.create(&new_node("station1")).await?;

    let stations: Vec<String> = repo
        .list()
        .await?
        .into_iter()
        .map(|node| node.station_name)
        .collect();
    assert_eq!(stations, vec!["station1", "station2"]);
    Ok(())
}

#[tokio::test]
async fn test_rules_in_insertion_order() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteNodeClientRepository::new(db.pool());
    let node = repo.create(&new_node("station1")).await?;

    repo.add_rule(node.id, "copy raw files").await?;
    repo.add_rule(node.id, "skip blanks").await?;

    let rules: Vec<String> = repo
        .rules_for(node.id)
        .await?
        .into_iter()
        .map(|rule| rule.description)
        .collect();
    assert_eq!(rules, vec!["copy raw files", "skip blanks"]);
    Ok(())
}

#[tokio::test]
async fn test_run_repository_reads_and_updates_state() -> Result<()> {
    let db = TestDatabase::new().await?;
    let nodes = SqliteNodeClientRepository::new(db.pool());
    let node = nodes.create(&new_node("station1")).await?;
    let other = nodes.create(&new_node("station2")).await?;

    let first = db.insert_run(node.id, "plasma", "2024-03-09 10:00:00").await?;
    let second = db.insert_run(node.id, "urine", "2024-04-01 08:30:00").await?;
    db.insert_run(other.id, "other", "2024-04-01 08:30:00").await?;

    let repo = SqliteRunRepository::new(db.pool());
    let runs = repo.find_by_machine(node.id).await?;
    assert_eq!(runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first, second]);
    assert_eq!(runs[0].state, RunState::New);
    assert_eq!(runs[0].created_at.year(), 2024);
    assert_eq!(runs[0].created_at.month(), 3);
    assert_eq!(runs[0].created_at.hour(), 10);
    assert_eq!(runs[0].relative_dir(), format!("runs/2024/03/{first}"));

    repo.update_state(first, RunState::InProgress).await?;
    let run = repo.find_by_id(first).await?.unwrap();
    assert_eq!(run.state, RunState::InProgress);

    assert!(repo.find_by_id(9999).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_run_sample_repository_filters_and_orders() -> Result<()> {
    let db = TestDatabase::new().await?;
    let node = SqliteNodeClientRepository::new(db.pool())
        .create(&new_node("station1"))
        .await?;
    let run_id = db.insert_run(node.id, "plasma", "2024-03-09 10:00:00").await?;

    let late = db.insert_sample(run_id, Some("B02.d"), 2).await?;
    let early = db.insert_sample(run_id, Some("A01.d"), 1).await?;
    db.insert_sample(run_id, Some(""), 3).await?;
    db.insert_sample(run_id, None, 4).await?;

    let repo = SqliteRunSampleRepository::new(db.pool());
    let samples = repo.find_with_files_by_run(run_id).await?;
    assert_eq!(samples.iter().map(|s| s.id).collect::<Vec<_>>(), vec![early, late]);
    assert!(samples.iter().all(|s| !s.complete));

    repo.set_complete(early, true).await?;
    assert!(repo.find_by_id(early).await?.unwrap().complete);

    let marked = repo.mark_all_complete(run_id).await?;
    assert_eq!(marked, 4);
    assert!(repo.find_by_id(late).await?.unwrap().complete);
    Ok(())
}

#[tokio::test]
async fn test_run_sample_update_persists_whitelisted_fields() -> Result<()> {
    let db = TestDatabase::new().await?;
    let node = SqliteNodeClientRepository::new(db.pool())
        .create(&new_node("station1"))
        .await?;
    let run_id = db.insert_run(node.id, "plasma", "2024-03-09 10:00:00").await?;
    let id = db.insert_sample(run_id, Some("A01.d"), 1).await?;

    let repo = SqliteRunSampleRepository::new(db.pool());
    let mut sample = repo.find_by_id(id).await?.unwrap();
    sample.filename = Some("A01_rerun.d".to_string());
    sample.vial_number = Some(12);
    repo.update(&sample).await?;

    let reloaded = repo.find_by_id(id).await?.unwrap();
    assert_eq!(reloaded.filename.as_deref(), Some("A01_rerun.d"));
    assert_eq!(reloaded.vial_number, Some(12));
    assert!(!reloaded.complete);
    Ok(())
}

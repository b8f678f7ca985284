use entity::Build;
use reaper_store::{Store, keys};
use serde_json::json;

fn test_build(id: &str, created_at: &str, project: &str, branch: &str) -> Build {
    serde_json::from_value(json!({
        "id": id,
        "createdAt": created_at,
        "project": {
            "id": project,
            "organizationId": "org-1",
            "organization": { "id": "org-1", "subscription": { "rules": {} } }
        },
        "branch": { "name": branch },
        "diskSpace": { "realBytes": 536870912, "virtualBytes": 1073741824 },
        "container": { "id": format!("container {id}") }
    }))
    .expect("valid build")
}

fn setup_store() -> Store {
    Store::in_memory().expect("Failed to open in-memory store")
}

#[tokio::test]
async fn test_put_indexes_build_under_every_key() {
    let store = setup_store();
    let build = test_build("build 1", "2016-02-27T05:44:46.947Z", "project 1", "branch 1");

    store.builds().put(&build).await.expect("put");

    let keys: Vec<String> = store
        .builds()
        .export()
        .await
        .expect("export")
        .into_iter()
        .map(|e| e.key)
        .collect();

    assert_eq!(
        keys,
        vec![
            "build!!build 1",
            "build_date!!2016-02-27T05:44:46.947Z!!build 1",
            "organization_build!!org-1!!2016-02-27T05:44:46.947Z!!build 1",
            "project_branch_build!!project 1!!branch 1!!2016-02-27T05:44:46.947Z!!build 1",
        ]
    );
}

#[tokio::test]
async fn test_every_key_maps_to_full_record() {
    let store = setup_store();
    let build = test_build("build 1", "2016-02-27T05:44:46.947Z", "project 1", "branch 1");
    store.builds().put(&build).await.expect("put");

    let expected = serde_json::to_value(&build).unwrap();
    for entry in store.builds().export().await.expect("export") {
        assert_eq!(entry.value, expected, "record under {}", entry.key);
    }
}

#[tokio::test]
async fn test_keys_from_two_builds_interleave_in_key_order() {
    let store = setup_store();
    store
        .builds()
        .put(&test_build("build 1", "2016-02-27T05:44:46.947Z", "project 1", "branch 1"))
        .await
        .expect("put");
    store
        .builds()
        .put(&test_build("build 2", "2016-02-27T05:44:46.947Z", "project 2", "branch 1"))
        .await
        .expect("put");

    let keys: Vec<String> = store
        .builds()
        .export()
        .await
        .expect("export")
        .into_iter()
        .map(|e| e.key)
        .collect();

    assert_eq!(keys.len(), 8);
    assert_eq!(keys[0], "build!!build 1");
    assert_eq!(keys[1], "build!!build 2");
    assert_eq!(keys[2], "build_date!!2016-02-27T05:44:46.947Z!!build 1");
    assert_eq!(keys[3], "build_date!!2016-02-27T05:44:46.947Z!!build 2");
    assert_eq!(
        keys[6],
        "project_branch_build!!project 1!!branch 1!!2016-02-27T05:44:46.947Z!!build 1"
    );
    assert_eq!(
        keys[7],
        "project_branch_build!!project 2!!branch 1!!2016-02-27T05:44:46.947Z!!build 2"
    );
}

#[tokio::test]
async fn test_branch_scan_is_creation_ordered() {
    let store = setup_store();
    for (id, date) in [
        ("b3", "2016-02-03T00:00:00.000Z"),
        ("b1", "2016-02-01T00:00:00.000Z"),
        ("b2", "2016-02-02T00:00:00.000Z"),
    ] {
        store
            .builds()
            .put(&test_build(id, date, "project 1", "main"))
            .await
            .expect("put");
    }
    store
        .builds()
        .put(&test_build("other", "2016-01-01T00:00:00.000Z", "project 1", "main-2"))
        .await
        .expect("put");

    let ids: Vec<String> = store
        .builds()
        .list_by_project_branch("project 1", "main")
        .await
        .expect("scan")
        .into_iter()
        .map(|b| b.id)
        .collect();

    assert_eq!(ids, vec!["b1", "b2", "b3"]);
}

#[tokio::test]
async fn test_organization_scan() {
    let store = setup_store();
    store
        .builds()
        .put(&test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "a"))
        .await
        .expect("put");
    store
        .builds()
        .put(&test_build("b2", "2016-02-02T00:00:00.000Z", "project 2", "b"))
        .await
        .expect("put");

    let org = store
        .builds()
        .list_by_organization("org-1")
        .await
        .expect("scan");
    assert_eq!(org.len(), 2);

    let none = store
        .builds()
        .list_by_organization("org-2")
        .await
        .expect("scan");
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_overwrite_is_idempotent() {
    let store = setup_store();
    let mut build = test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "main");
    store.builds().put(&build).await.expect("put");

    build.pinned = true;
    store.builds().put(&build).await.expect("put");

    let entries = store.builds().export().await.expect("export");
    assert_eq!(entries.len(), 4);

    let stored = store
        .builds()
        .find_by_id("b1")
        .await
        .expect("find")
        .expect("present");
    assert!(stored.pinned);
}

#[tokio::test]
async fn test_update_with_moved_branch_drops_stale_keys() {
    let store = setup_store();
    let mut build = test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "old");
    store.builds().put(&build).await.expect("put");

    build.branch = Some(entity::build::BranchRef {
        name: "new".to_string(),
        ..Default::default()
    });
    store.builds().put(&build).await.expect("put");

    assert!(
        store
            .builds()
            .list_by_project_branch("project 1", "old")
            .await
            .expect("scan")
            .is_empty()
    );
    assert_eq!(
        store
            .builds()
            .list_by_project_branch("project 1", "new")
            .await
            .expect("scan")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_delete_removes_full_key_set() {
    let store = setup_store();
    let doomed = test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "main");
    let survivor = test_build("b2", "2016-02-02T00:00:00.000Z", "project 1", "main");
    store.builds().put(&doomed).await.expect("put");
    store.builds().put(&survivor).await.expect("put");

    store.builds().delete(&doomed).await.expect("delete");

    for prefix in [
        keys::build_prefix(),
        format!("{}!!", keys::BUILD_DATE),
        keys::organization_prefix("org-1"),
        keys::project_branch_prefix("project 1", "main"),
    ] {
        let remaining = store.builds().scan(&prefix).await.expect("scan");
        assert!(
            remaining.iter().all(|s| s.build.id != "b1"),
            "b1 still indexed under {prefix}"
        );
        assert!(remaining.iter().any(|s| s.build.id == "b2"));
    }
}

#[tokio::test]
async fn test_delete_uses_stored_keys_when_caller_copy_is_stale() {
    let store = setup_store();
    let stored = test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "main");
    store.builds().put(&stored).await.expect("put");

    let mut stale = stored.clone();
    stale.created_at = "2099-01-01T00:00:00.000Z".to_string();
    store.builds().delete(&stale).await.expect("delete");

    assert!(store.builds().export().await.expect("export").is_empty());
}

#[tokio::test]
async fn test_delete_missing_build_is_noop() {
    let store = setup_store();
    let build = test_build("ghost", "2016-02-01T00:00:00.000Z", "project 1", "main");

    store.builds().delete(&build).await.expect("first delete");
    store.builds().delete(&build).await.expect("second delete");

    assert!(store.builds().find_by_id("ghost").await.expect("find").is_none());
}

#[tokio::test]
async fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let build = test_build("b1", "2016-02-01T00:00:00.000Z", "project 1", "main");

    {
        let store = Store::open(dir.path()).expect("open");
        store.builds().put(&build).await.expect("put");
    }

    let store = Store::open(dir.path()).expect("reopen");
    let found = store.builds().find_by_id("b1").await.expect("find");
    assert_eq!(found, Some(build));
}

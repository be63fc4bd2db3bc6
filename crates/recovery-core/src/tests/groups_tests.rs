use super::{group_json, Harness, TINY_PNG};
use crate::error::DecodeError;
use recovery_api::types::GroupRecord;
use recovery_api::validation::ValidationError;
use serde_json::json;

#[tokio::test]
async fn merges_groups_with_extras() {
    let h = Harness::new("me");
    let mut payload = group_json("G");
    payload["photo"] = json!(TINY_PNG);
    h.put_json("group_G", payload).await;
    let manifest = h.manifest().await;

    let report = h.sync.sync_groups(&h.session, &manifest).await.unwrap();

    assert_eq!(report.merged, 1);
    let group = h.store.group("G").await.unwrap();
    assert_eq!(group.aes_key, "G-key");
    assert_eq!(group.name.as_deref(), Some("group G"));
    assert_eq!(group.members, vec!["A", "B"]);
    assert_eq!(group.photo.as_deref(), Some("G.png"));
    assert_eq!(h.session.progress().await.recovered_groups, 1);
}

#[tokio::test]
async fn group_without_key_is_skipped() {
    let h = Harness::new("me");
    h.put_json("group_G", json!({ "id": "G" })).await;
    h.put_json("group_H", group_json("H")).await;
    let manifest = h.manifest().await;

    let report = h.sync.sync_groups(&h.session, &manifest).await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.merged, 1);
    assert_eq!(
        report.skipped[0].reason,
        DecodeError::MissingData(ValidationError::Empty("aesKey"))
    );
    assert_eq!(h.session.progress().await.recovered_groups, 1);
}

#[tokio::test]
async fn existing_group_is_neither_downloaded_nor_overwritten() {
    use crate::store::RecoveryStore;

    let h = Harness::new("me");
    h.store
        .add_group(GroupRecord {
            id: "G".to_string(),
            aes_key: "local".to_string(),
            photo: None,
            name: None,
            members: Vec::new(),
            admins: Vec::new(),
        })
        .await
        .unwrap();
    h.put_json("group_G", group_json("G")).await;
    let manifest = h.manifest().await;

    let report = h.sync.sync_groups(&h.session, &manifest).await.unwrap();

    assert_eq!(report.candidates, 0);
    assert_eq!(h.channel.download_count(), 0);
    assert_eq!(h.store.group("G").await.unwrap().aes_key, "local");
    assert_eq!(h.session.progress().await.recovered_groups, 0);
}

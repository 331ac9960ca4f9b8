use super::*;
use chrono::{Duration, TimeZone};

fn post(id: &str, pinned: bool, minutes: i64) -> Post {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
    Post {
        id: id.into(),
        title: format!("Post {}", id),
        description: None,
        content: None,
        pdf_path: format!("/blobs/sv/{}.pdf", id),
        published: true,
        pinned,
        created_at: at,
        updated_at: at,
    }
}

fn user(id: &str, email: &str) -> User {
    User { id: id.into(), email: email.into(), password_hash: "phc".into(), role: Role::Admin, created_at: Utc::now() }
}

#[test]
fn sort_puts_pinned_first_then_newest() {
    let mut posts = vec![post("old", false, 0), post("pin-old", true, 1), post("new", false, 10), post("pin-new", true, 5)];
    sort_posts(&mut posts);
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["pin-new", "pin-old", "new", "old"]);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let store = JsonStore::in_memory();
    store.insert_user(user("1", "a@example.org")).await.unwrap();
    assert!(store.insert_user(user("2", "a@example.org")).await.is_err());
    assert_eq!(store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_and_delete_posts() {
    let store = JsonStore::in_memory();
    store.insert_post(post("p1", false, 0)).await.unwrap();
    let fields = PostFields { title: "Renamed".into(), published: false, pinned: true, ..Default::default() };
    assert!(store.update_post("p1", fields, "/blobs/sv/new.pdf".into()).await.unwrap());
    let p = store.get_post("p1").await.unwrap().unwrap();
    assert_eq!(p.title, "Renamed");
    assert_eq!(p.pdf_path, "/blobs/sv/new.pdf");
    assert!(p.pinned && !p.published);

    assert!(!store.update_post("missing", PostFields::default(), String::new()).await.unwrap());
    assert_eq!(store.delete_post("p1").await.unwrap().map(|p| p.id), Some("p1".to_string()));
    assert!(store.delete_post("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = JsonStore::open(tmp.path()).unwrap();
        store.insert_user(user("u1", "owner@example.org")).await.unwrap();
        store.insert_post(post("p1", true, 0)).await.unwrap();
    }
    let reopened = JsonStore::open(tmp.path()).unwrap();
    assert_eq!(reopened.find_by_email("owner@example.org").await.unwrap().map(|u| u.id), Some("u1".to_string()));
    assert!(reopened.find_by_id("u1").await.unwrap().is_some());
    assert_eq!(reopened.list_posts().await.unwrap().len(), 1);
    assert!(!tmp.path().join("store.json.tmp").exists());
}

#[tokio::test]
async fn failed_write_leaves_memory_unchanged() {
    let tmp = tempfile::tempdir().unwrap();
    let store = JsonStore::open(tmp.path()).unwrap();
    store.insert_post(post("p1", false, 0)).await.unwrap();

    // A directory in place of store.json makes the final rename fail
    std::fs::remove_file(tmp.path().join("store.json")).unwrap();
    std::fs::create_dir(tmp.path().join("store.json")).unwrap();

    assert!(store.insert_user(user("u1", "new@example.org")).await.is_err());
    assert!(store.find_by_email("new@example.org").await.unwrap().is_none());

    let fields = PostFields { title: "Renamed".into(), ..Default::default() };
    assert!(store.update_post("p1", fields, "/blobs/sv/other.pdf".into()).await.is_err());
    assert_eq!(store.get_post("p1").await.unwrap().unwrap().title, "Post p1");

    assert!(store.delete_post("p1").await.is_err());
    assert!(store.get_post("p1").await.unwrap().is_some());
    assert!(!tmp.path().join("store.json.tmp").exists());
}

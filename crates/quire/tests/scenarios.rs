//! End-to-end scenarios over a fully initialized engine.

use std::collections::BTreeMap;

use anyhow::Result;
use proptest::prelude::*;
use quire::core::{access, sys, AccessKind, EntryKind};
use quire::store::SqliteStore;
use quire::{AclTest, Engine, EngineConfig, ErrorKind, MemoryBlobStore, NewObject};
use quire_testkit::generators::link_chain;
use quire_testkit::{credential, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn grants(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
    entries
        .iter()
        .map(|(name, bits)| (name.to_string(), *bits))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-user inheritance
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sub_user_needs_create_grant_then_owns_its_object() -> Result<()> {
    init_tracing();
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let u0 = &fx.admin;

    engine.add_bucket(u0, "docs").await?;
    engine
        .create_template(u0, "mine", &grants(&[(fx.uid("admin").as_str(), 0x1F)]), &BTreeMap::new())
        .await?;
    engine.set_bucket_acl_from_template(u0, "docs", "mine").await?;

    engine
        .add_sub_user(u0, &fx.uid("u1"), grants(&[("docs", access::READ)]), 0)
        .await?;
    let u1 = credential("u1");

    let err = engine
        .create_object(&u1, "docs", NewObject::new("a.txt").content(3, "abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    engine
        .set_sub_user_permission(u0, &fx.uid("u1"), "docs", access::READ | access::CREATE)
        .await?;
    engine
        .create_object(&u1, "docs", NewObject::new("a.txt").content(3, "abc"))
        .await?;
    engine.commit_object(&u1, "docs", "a.txt").await?;

    // Overwrite is not granted, ownership alone suffices.
    engine
        .create_object(
            &u1,
            "docs",
            NewObject::new("a.txt").content(4, "abcd").overwrite(true),
        )
        .await?;
    let object = engine.object(&u1, "docs", "a.txt").await?;
    assert_eq!(object.size, 4);
    assert_eq!(object.owner, engine.whoami(&u1).await?.id);
    Ok(())
}

#[tokio::test]
async fn test_revoked_grant_falls_back_to_wildcard() -> Result<()> {
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    engine
        .add_sub_user(
            &fx.admin,
            &fx.uid("u1"),
            grants(&[("docs", access::CREATE), ("*", access::READ)]),
            0,
        )
        .await?;

    let map = engine.gather_user_inherited_perms(&fx.uid("u1"), "docs").await?;
    assert_eq!(map.get(&fx.root.id), Some(&access::CREATE));

    engine
        .revoke_sub_user_permission(&fx.admin, &fx.uid("u1"), "docs")
        .await?;
    let map = engine.gather_user_inherited_perms(&fx.uid("u1"), "docs").await?;
    assert_eq!(map.get(&fx.root.id), Some(&access::READ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Group inheritance
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_nested_group_paths_decide_create() -> Result<()> {
    init_tracing();
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let admin = &fx.admin;
    let v = fx.user("v", 0).await?;

    engine.add_bucket(admin, "photos").await?;
    engine.add_group(admin, "editors", false).await?;
    engine
        .add_sub_group(admin, "editors", "team-a", grants(&[("photos", 0x0C)]), false)
        .await?;
    engine
        .add_sub_group(admin, "team-a", "squad", grants(&[("photos", access::CREATE)]), false)
        .await?;
    engine
        .add_sub_group(admin, "editors", "team-b", grants(&[("photos", access::READ)]), false)
        .await?;
    engine.add_user_to_group(admin, "squad", &fx.uid("v")).await?;
    engine.add_user_to_group(admin, "team-b", &fx.uid("v")).await?;

    engine
        .create_template(admin, "editing", &BTreeMap::new(), &grants(&[("editors", 0x0C)]))
        .await?;
    engine.set_bucket_acl_from_template(admin, "photos", "editing").await?;

    let create = AclTest {
        uid: fx.uid("v"),
        bucket: "photos".into(),
        access: AccessKind::Create.code(),
    };
    assert!(engine.test_acl_access(admin, "editing", &create).await?);
    engine
        .create_object(&v, "photos", NewObject::new("cat.png").content(10, "d1"))
        .await?;

    // squad now reaches editors with Overwrite only; team-b still carries Read.
    engine
        .set_sub_group_permission(admin, "team-a", "squad", "photos", access::OVERWRITE)
        .await?;
    let groups = engine.gather_group_perms_for_user(&fx.uid("v"), "photos").await?;
    let editors = engine.group_by_name("editors").await?;
    assert_eq!(groups.get(&editors.id), Some(&access::OVERWRITE));

    assert!(!engine.test_acl_access(admin, "editing", &create).await?);
    let err = engine
        .create_object(&v, "photos", NewObject::new("dog.png").content(10, "d2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_template_edits_do_not_reach_applied_acls() -> Result<()> {
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let bob = fx.user("bob", 0).await?;

    engine.add_bucket(&fx.admin, "shared").await?;
    engine
        .create_template(
            &fx.admin,
            "open",
            &grants(&[(fx.uid("bob").as_str(), access::LIST | access::CREATE)]),
            &BTreeMap::new(),
        )
        .await?;
    engine.set_bucket_acl_from_template(&fx.admin, "shared", "open").await?;

    engine
        .edit_entry(&fx.admin, "open", EntryKind::User, &fx.uid("bob"), 0)
        .await?;
    engine
        .create_object(&bob, "shared", NewObject::new("note").content(1, "x"))
        .await?;

    engine.delete_my_template(&fx.admin, "open").await?;
    let listing = engine.list_objects(&bob, "shared", 10, false, None).await?;
    assert_eq!(listing.count, 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Indexes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_index_follows_object_lifecycle() -> Result<()> {
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let admin = &fx.admin;

    engine.add_bucket(admin, "photos").await?;
    engine.create_index(admin, "camera", "photos").await?;

    engine
        .create_object(admin, "photos", NewObject::new("a.png").content(1, "a").meta("camera", "x100"))
        .await?;
    engine
        .create_empty_object(admin, "photos", NewObject::new("b.png").meta("camera", "x100"))
        .await?;
    let hits = engine
        .query_objects_by_index(admin, "photos", "camera", "x100", 0, true)
        .await?;
    assert_eq!(hits.count, 2);
    assert!(hits.token.is_none());

    engine
        .create_object(
            admin,
            "photos",
            NewObject::new("a.png").content(1, "a").meta("camera", "gr3").overwrite(true),
        )
        .await?;
    assert_eq!(engine.lookup(&fx.uid("admin"), "photos", "camera", "x100").await?, ["b.png"]);
    assert_eq!(engine.lookup(&fx.uid("admin"), "photos", "camera", "gr3").await?, ["a.png"]);

    let tombstone = engine.remove_object(admin, "photos", "b.png").await?;
    assert!(engine.lookup(&fx.uid("admin"), "photos", "camera", "x100").await?.is_empty());
    // Index-only objects have no bytes to remove.
    assert!(engine.blobs().removed().is_empty());

    let deleted = engine
        .query_delete_records(
            admin,
            "photos",
            &grants_str(&[("camera", "x100")]),
            10,
            true,
            None,
        )
        .await?;
    assert_eq!(deleted.count, 1);
    assert_eq!(deleted.objects[0].id, Some(tombstone.object.id));
    Ok(())
}

#[tokio::test]
async fn test_recreating_a_key_keeps_every_delete_record() -> Result<()> {
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let admin = &fx.admin;
    engine.add_bucket(admin, "scratch").await?;

    let mut ids = std::collections::BTreeSet::new();
    for _ in 0..50 {
        engine
            .create_empty_object(admin, "scratch", NewObject::new("k"))
            .await?;
        ids.insert(engine.remove_object(admin, "scratch", "k").await?.object.id);
    }
    assert_eq!(ids.len(), 50);

    let deleted = engine.list_deleted_objects(admin, "scratch", 0, false, None).await?;
    assert_eq!(deleted.count, 50);
    for id in &ids {
        engine.delete_record(admin, "scratch", id).await?;
    }
    Ok(())
}

fn grants_str(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger bootstrap
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ledger_cannot_be_initialized_twice() -> Result<()> {
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let mallory = credential("mallory");

    let err = engine.init_ledger(&mallory).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = engine
        .add_user(&mallory, &fx.uid("eve"), sys::ALL)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(engine.whoami(&fx.admin).await?.sys_perms, sys::ALL);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Atomicity
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_blob_removal_rolls_back_delete() -> Result<()> {
    init_tracing();
    let fx = TestFixture::new().await?;
    let engine = &fx.engine;
    let admin = &fx.admin;

    engine.add_bucket(admin, "photos").await?;
    engine.create_index(admin, "camera", "photos").await?;
    engine
        .create_object(admin, "photos", NewObject::new("a.png").content(1, "a").meta("camera", "x100"))
        .await?;

    engine.blobs().fail_removals(true);
    assert!(engine.remove_object(admin, "photos", "a.png").await.is_err());

    engine.object(admin, "photos", "a.png").await?;
    assert_eq!(engine.lookup(&fx.uid("admin"), "photos", "camera", "x100").await?, ["a.png"]);
    let deleted = engine.list_deleted_objects(admin, "photos", 10, false, None).await?;
    assert_eq!(deleted.count, 0);

    engine.blobs().fail_removals(false);
    engine.remove_object(admin, "photos", "a.png").await?;
    assert_eq!(
        engine.blobs().removed(),
        vec![("photos".to_string(), "a.png".to_string())]
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sqlite_ledger_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ledger.db");
    let admin = credential("admin");

    {
        let engine = Engine::new(SqliteStore::open(&path)?, MemoryBlobStore::new(), EngineConfig::default());
        engine.init_ledger(&admin).await?;
        engine.add_bucket(&admin, "photos").await?;
        for key in ["a", "b", "c"] {
            engine
                .create_object(&admin, "photos", NewObject::new(key).content(1, key).meta("kind", "jpg"))
                .await?;
        }
    }

    let engine = Engine::new(SqliteStore::open(&path)?, MemoryBlobStore::new(), EngineConfig::default());
    let err = engine.init_ledger(&admin).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let first = engine.list_objects(&admin, "photos", 2, false, None).await?;
    assert_eq!(first.count, 2);
    let rest = engine
        .list_objects(&admin, "photos", 2, false, first.token.as_deref())
        .await?;
    assert_eq!(rest.count, 1);
    assert_eq!(rest.objects[0].key, "c");
    assert!(rest.token.is_none());

    let jpgs = engine
        .query_objects(&admin, "photos", &grants_str(&[("kind", "jpg")]), 0, false, None)
        .await?;
    assert_eq!(jpgs.count, 3);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

/// Expected rights of each ancestor over the leaf, nearest first.
fn expected_chain(links: &[u32]) -> Vec<u32> {
    let mut effective = 0xFF;
    let mut out = Vec::new();
    for &link in links.iter().rev() {
        if link == 0 {
            break;
        }
        effective &= link;
        if effective == 0 {
            break;
        }
        out.push(effective);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_chain_rights_are_anded_links(links in link_chain(5)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (got, want) = rt.block_on(async {
            let fx = TestFixture::new().await.unwrap();
            let mut names = vec!["admin".to_string()];
            for (i, bits) in links.iter().enumerate() {
                let child = format!("c{}", i);
                fx.engine
                    .add_sub_user(
                        &credential(&names[i]),
                        &fx.uid(&child),
                        grants(&[("photos", *bits)]),
                        sys::ADD_SUB_USERS,
                    )
                    .await
                    .unwrap();
                names.push(child);
            }

            let leaf = names.last().unwrap();
            let map = fx
                .engine
                .gather_user_inherited_perms(&fx.uid(leaf), "photos")
                .await
                .unwrap();

            // Walk ancestors nearest first.
            let mut got = Vec::new();
            for name in names.iter().rev().skip(1) {
                let id = fx.engine.user_by_uid(&fx.uid(name)).await.unwrap().id;
                match map.get(&id) {
                    Some(bits) => got.push(*bits),
                    None => break,
                }
            }
            (got, expected_chain(&links))
        });
        prop_assert_eq!(got, want);
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;
use trove_asset::{
    scan, Asset, AssetStatus, AssetType, ConflictPolicy, LocalPaths, Manifest, Preset,
    PublishOutcome, Repository, RepositoryConfig, Session, Unattended,
};
use trove_core::{Version, VersionField};

fn session(base: &Path, repo_root: &Path, user: &str) -> Session {
    let config = RepositoryConfig {
        root: repo_root.display().to_string(),
        subfolder: vec!["Gizmo".into(), "Script".into()],
    };
    let repository = Repository::from_config(&config).expect("repository config is valid");
    let nuke = base.join(user).join("nuke");
    fs::create_dir_all(&nuke).unwrap();
    let paths = LocalPaths::new(&nuke, nuke.join("trove"), base.join(user).join("state"));
    Session::new(repository, paths)
}

fn write_asset(dir: &Path, file: &str, message: &str) -> Asset {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, format!("Group {{\n name {}\n}}\n", file)).unwrap();
    let mut asset = Asset::from_path(&path).unwrap();
    asset.message = Some(message.to_string());
    asset
}

fn read_manifest_json(root: &Path) -> serde_json::Value {
    let text = fs::read_to_string(root.join("manifest.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn scan_assigns_unversioned_default() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("foo_v1.0.0.gizmo"), "").unwrap();
    fs::write(tmp.path().join("bar.nk"), "").unwrap();

    let manifest = scan(tmp.path()).unwrap();
    assert!(manifest.has_asset(AssetType::Gizmo, "foo", Version::new(1, 0, 0)));
    assert!(manifest.has_asset(AssetType::Script, "bar", Version::new(0, 0, 0)));
    assert_eq!(manifest.len(), 2);
}

#[test]
fn publish_to_empty_repository() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("central");
    let session = session(tmp.path(), &root, "ana");
    let asset = write_asset(&session.paths().nuke_dir, "foo_v1.0.0.gizmo", "first cut");

    let outcome = session.publish(asset, &mut Unattended).unwrap();
    assert!(outcome.is_published());

    let published = root.join("Gizmo/foo/foo_v1.0.0.gizmo");
    assert!(published.is_file());

    let json = read_manifest_json(&root);
    let entry = &json["Gizmo"]["foo"]["1.0.0"];
    assert_eq!(entry["status"], "Published");
    assert_eq!(entry["message"], "first cut");
    assert_eq!(entry["type"], "Gizmo");
    assert_eq!(entry["source_path"], published.display().to_string());
    assert!(json["Script"].as_object().unwrap().is_empty());
}

#[test]
fn concurrent_publishes_keep_every_entry() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("central");
    let users = ["ana", "ben", "cai", "dee"];
    let barrier = Arc::new(Barrier::new(users.len()));

    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let base = tmp.path().to_path_buf();
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            let user = user.to_string();
            thread::spawn(move || {
                let session = session(&base, &root, &user);
                let file = format!("{}_tool_v1.0.0.gizmo", user);
                let asset = write_asset(&session.paths().nuke_dir, &file, "concurrent");
                barrier.wait();
                session.publish(asset, &mut Unattended).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_published());
    }

    let manifest = Manifest::load(root.join("manifest.json"));
    assert_eq!(manifest.len(), users.len());
    for user in users {
        let name = format!("{}_tool", user);
        let asset = manifest
            .get_asset(AssetType::Gizmo, &name, Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(asset.status, AssetStatus::Published);
    }
}

#[test]
fn concurrent_publishes_of_one_name_get_distinct_versions() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("central");
    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let base = tmp.path().to_path_buf();
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let session = session(&base, &root, &format!("user{}", i));
                let asset = write_asset(&session.paths().nuke_dir, "blur_v1.0.0.gizmo", "tweak");
                let mut policy = Preset::new(ConflictPolicy::Bump(VersionField::Patch));
                barrier.wait();
                match session.publish(asset, &mut policy).unwrap() {
                    PublishOutcome::Published { asset, .. } => asset.version,
                    PublishOutcome::Aborted { .. } => panic!("bump policy never aborts"),
                }
            })
        })
        .collect();

    let mut versions: Vec<Version> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    versions.sort();
    let expected: Vec<Version> = (0..workers as u64).map(|p| Version::new(1, 0, p)).collect();
    assert_eq!(versions, expected);

    let manifest = Manifest::load(root.join("manifest.json"));
    assert_eq!(manifest.versions(AssetType::Gizmo, "blur"), expected);
    for version in expected {
        let file: PathBuf = root.join(format!("Gizmo/blur/blur_v{}.gizmo", version));
        assert!(file.is_file(), "missing {}", file.display());
    }
}

#[test]
fn install_copies_from_repository() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("central");
    let publisher = session(tmp.path(), &root, "ana");
    let asset = write_asset(&publisher.paths().nuke_dir, "comp_v2.1.0.nk", "shot template");
    publisher.publish(asset, &mut Unattended).unwrap();

    let consumer = session(tmp.path(), &root, "ben");
    let remote = consumer.remote_view();
    let record = remote.lookup(None, "comp", None).unwrap().clone();
    assert_eq!(record.status, AssetStatus::NonLocal);

    let outcome = consumer.install(&record, &mut Unattended).unwrap();
    assert!(outcome.is_installed());
    let installed = consumer.paths().install_dir.join("comp_v2.1.0.nk");
    assert!(installed.is_file());

    // Install never writes to the repository manifest
    let json = read_manifest_json(&root);
    assert_eq!(json["Script"]["comp"]["2.1.0"]["status"], "Published");

    let cache = consumer.cached_manifest();
    let cached = cache
        .get_asset(AssetType::Script, "comp", Version::new(2, 1, 0))
        .unwrap();
    assert_eq!(cached.status, AssetStatus::Local);
    assert_eq!(cached.message.as_deref(), Some("shot template"));

    let again = consumer.remote_view();
    let record = again.lookup(Some(AssetType::Script), "comp", None).unwrap();
    assert_eq!(record.status, AssetStatus::Local);
}

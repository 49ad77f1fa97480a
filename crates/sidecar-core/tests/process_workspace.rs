//! Integration test: the checksum activity end to end with a mirror object store.
//!
//! Inputs come from the mirror (`s3://`), a local HTTP server, and a plain
//! local path; sidecars are uploaded back into the mirror.

mod common;

use sidecar_core::activity::{ActivityLoop, DirQueue};
use sidecar_core::checksum;
use sidecar_core::config::HttpConfig;
use sidecar_core::fetch::{Fetcher, InputKeys};
use sidecar_core::granule::{TaskConfig, TaskEnvelope, TaskInput};
use sidecar_core::process::{run_task, ChecksumProcess, Workspace};
use sidecar_core::store::{MirrorStore, ObjectStore};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn task_config() -> TaskConfig {
    serde_json::from_str(
        r#"{
            "collection": {"name": "MOD09", "version": "006"},
            "buckets": {"internal": {"name": "mybucket"}},
            "stack": "dev"
        }"#,
    )
    .unwrap()
}

fn workspace(root: &Path, keep_downloads: bool) -> Workspace<MirrorStore> {
    let fetcher = Fetcher::new(
        root.join("work"),
        HttpConfig::default(),
        InputKeys::default(),
    );
    Workspace::new(fetcher, MirrorStore::new(root.join("mirror")), keep_downloads)
}

#[test]
fn modis_granule_from_mirror() {
    let dir = tempdir().unwrap();
    let ws = workspace(dir.path(), false);
    let src = dir.path().join("seed.hdf");
    fs::write(&src, b"test").unwrap();
    ws.store()
        .put_from_file(&src, "protected", "MOD09/modis.hdf")
        .unwrap();

    let input: TaskInput = serde_json::from_str(
        r#"{"granules": [{"files": [
            {"filename": "s3://protected/MOD09/modis.hdf", "type": "data"},
            {"filename": "s3://protected/MOD09/modis.hdf.met", "type": "metadata"}
        ]}]}"#,
    )
    .unwrap();

    let mut process = ChecksumProcess::new(ws);
    let out = process.process(&input, &task_config()).expect("process");
    assert_eq!(
        out,
        vec![
            "s3://mybucket/staging/dev/MOD09__006/modis.hdf.md5",
            "s3://protected/MOD09/modis.hdf",
            "s3://protected/MOD09/modis.hdf.met",
        ]
    );

    let uploaded = dir
        .path()
        .join("mirror/mybucket/staging/dev/MOD09__006/modis.hdf.md5");
    assert_eq!(
        fs::read_to_string(&uploaded).unwrap(),
        "098f6bcd4621d373cade4e832627b4f6"
    );

    // Cleanup removed both the download and its sidecar.
    assert!(!dir.path().join("work/modis.hdf").exists());
    assert!(!dir.path().join("work/modis.hdf.md5").exists());
    assert!(process.capabilities().fetcher().downloaded().is_empty());
}

#[test]
fn mixed_sources_and_kept_downloads() {
    let dir = tempdir().unwrap();
    let mut served = HashMap::new();
    served.insert("/b.hdf".to_string(), b"from http".to_vec());
    let base = common::file_server::start(served);

    let local_input = dir.path().join("local").join("c.hdf");
    fs::create_dir_all(local_input.parent().unwrap()).unwrap();
    fs::write(&local_input, b"local bytes").unwrap();

    let ws = workspace(dir.path(), true);
    let seed = dir.path().join("seed");
    fs::write(&seed, b"from s3").unwrap();
    ws.store().put_from_file(&seed, "protected", "a.hdf").unwrap();

    let task = TaskEnvelope {
        input: serde_json::from_value(serde_json::json!({
            "granules": [
                {"files": [
                    {"filename": "s3://protected/a.hdf", "type": "data"},
                    {"filename": format!("{}/b.hdf", base), "type": "data"},
                    {"filename": "s3://protected/a.jpg", "type": "browse"}
                ]},
                {"files": [
                    {"filename": local_input.to_string_lossy(), "type": "data"},
                    {"filename": "s3://protected/notes.txt", "type": "data"}
                ]}
            ]
        }))
        .unwrap(),
        config: task_config(),
    };

    let out = run_task(ws, &task).expect("run_task");
    let prefix = "s3://mybucket/staging/dev/MOD09__006";
    assert_eq!(out.len(), 3 + 5);
    assert_eq!(out[0], format!("{}/a.hdf.md5", prefix));
    assert_eq!(out[1], format!("{}/b.hdf.md5", prefix));
    assert_eq!(out[2], format!("{}/c.hdf.md5", prefix));
    assert_eq!(out[3..], task.input.original_filenames()[..]);

    let mirror = dir.path().join("mirror/mybucket/staging/dev/MOD09__006");
    for (name, body) in [
        ("a.hdf.md5", &b"from s3"[..]),
        ("b.hdf.md5", &b"from http"[..]),
        ("c.hdf.md5", &b"local bytes"[..]),
    ] {
        assert_eq!(
            fs::read_to_string(mirror.join(name)).unwrap(),
            checksum::md5_bytes(body),
            "sidecar {}",
            name
        );
    }

    // Downloads are kept, sidecars are removed, the caller's local file is untouched.
    assert!(dir.path().join("work/a.hdf").exists());
    assert!(dir.path().join("work/b.hdf").exists());
    assert!(!dir.path().join("work/a.hdf.md5").exists());
    assert!(!dir.path().join("work/c.hdf.md5").exists());
    assert!(!dir.path().join("local/c.hdf.md5").exists());
    assert!(local_input.exists());
}

#[test]
fn missing_input_aborts_without_uploads() {
    let dir = tempdir().unwrap();
    let ws = workspace(dir.path(), false);
    let task = TaskEnvelope {
        input: serde_json::from_str(
            r#"{"granules": [{"files": [{"filename": "/nonexistent/x.hdf", "type": "data"}]}]}"#,
        )
        .unwrap(),
        config: task_config(),
    };
    let err = run_task(ws, &task).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/x.hdf"));
    assert!(!dir.path().join("mirror/mybucket").exists());
}

#[test]
fn caller_sidecar_next_to_local_input_is_untouched() {
    let dir = tempdir().unwrap();
    let local = dir.path().join("local");
    fs::create_dir_all(&local).unwrap();
    let data = local.join("modis.hdf");
    let existing = local.join("modis.hdf.md5");
    fs::write(&data, b"test").unwrap();
    fs::write(&existing, b"caller owned").unwrap();

    let task = TaskEnvelope {
        input: serde_json::from_value(serde_json::json!({
            "granules": [{"files": [{"filename": data.to_string_lossy(), "type": "data"}]}]
        }))
        .unwrap(),
        config: task_config(),
    };
    let out = run_task(workspace(dir.path(), false), &task).expect("run_task");
    assert_eq!(out[0], "s3://mybucket/staging/dev/MOD09__006/modis.hdf.md5");

    let uploaded = dir
        .path()
        .join("mirror/mybucket/staging/dev/MOD09__006/modis.hdf.md5");
    assert_eq!(
        fs::read_to_string(uploaded).unwrap(),
        "098f6bcd4621d373cade4e832627b4f6"
    );
    assert_eq!(fs::read_to_string(&existing).unwrap(), "caller owned");
    assert!(data.exists());
    assert!(!dir.path().join("work/modis.hdf.md5").exists());
}

#[test]
fn failed_upload_cleans_up_partial_outputs() {
    let dir = tempdir().unwrap();
    let ws = workspace(dir.path(), false);
    let seed = dir.path().join("seed");
    fs::write(&seed, b"test").unwrap();
    ws.store().put_from_file(&seed, "protected", "a.hdf").unwrap();
    ws.store().put_from_file(&seed, "protected", "b.hdf").unwrap();
    // A plain file where the sidecar bucket directory would go makes every upload fail.
    fs::write(dir.path().join("mirror/mybucket"), b"").unwrap();

    let task = TaskEnvelope {
        input: serde_json::from_str(
            r#"{"granules": [{"files": [
                {"filename": "s3://protected/a.hdf", "type": "data"},
                {"filename": "s3://protected/b.hdf", "type": "data"}
            ]}]}"#,
        )
        .unwrap(),
        config: task_config(),
    };
    assert!(run_task(ws, &task).is_err());
    for name in ["a.hdf", "a.hdf.md5", "b.hdf"] {
        assert!(!dir.path().join("work").join(name).exists(), "{} left behind", name);
    }
}

#[test]
fn colliding_remote_names_abort_without_uploads() {
    let dir = tempdir().unwrap();
    let ws = workspace(dir.path(), false);
    for (key, body) in [("2017/modis.hdf", "first"), ("2018/modis.hdf", "second")] {
        let seed = dir.path().join("seed");
        fs::write(&seed, body).unwrap();
        ws.store().put_from_file(&seed, "protected", key).unwrap();
    }

    let task = TaskEnvelope {
        input: serde_json::from_str(
            r#"{"granules": [
                {"files": [{"filename": "s3://protected/2017/modis.hdf", "type": "data"}]},
                {"files": [{"filename": "s3://protected/2018/modis.hdf", "type": "data"}]}
            ]}"#,
        )
        .unwrap(),
        config: task_config(),
    };
    let err = run_task(ws, &task).unwrap_err();
    assert!(format!("{:#}", err).contains("s3://protected/2018/modis.hdf"));
    assert!(!dir.path().join("mirror/mybucket").exists());
    assert!(!dir.path().join("work/modis.hdf").exists());
}

#[test]
fn activity_loop_runs_queued_task() {
    let dir = tempdir().unwrap();
    let queue = dir.path().join("queue");
    fs::create_dir_all(&queue).unwrap();
    let data = dir.path().join("modis.hdf");
    fs::write(&data, b"test").unwrap();
    let task = serde_json::json!({
        "input": {"granules": [{"files": [{"filename": data.to_string_lossy(), "type": "data"}]}]},
        "config": {
            "collection": {"name": "MOD09", "version": "006"},
            "buckets": {"internal": {"name": "mybucket"}},
            "stack": "dev"
        }
    });
    fs::write(queue.join("job-1.json"), task.to_string()).unwrap();

    let root = dir.path().to_path_buf();
    let mut lp = ActivityLoop::new(DirQueue::new(&queue), Duration::ZERO, |t: &TaskEnvelope| {
        run_task(workspace(&root, false), t)
    })
    .with_max_tasks(1);
    assert_eq!(lp.run().unwrap(), 1);

    let out: Vec<String> =
        serde_json::from_slice(&fs::read(queue.join("job-1.out.json")).unwrap()).unwrap();
    assert_eq!(
        out,
        vec![
            "s3://mybucket/staging/dev/MOD09__006/modis.hdf.md5".to_string(),
            data.to_string_lossy().into_owned(),
        ]
    );
    assert!(lp.run_once().unwrap().is_none());
}

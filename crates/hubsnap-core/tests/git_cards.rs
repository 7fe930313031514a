use std::fs;
use std::path::Path;
use std::process::Command;

use hubsnap_core::{CardSource, GitSparseSource, HubsnapError};
use tempfile::tempdir;

// The sparse git source runs against bare repositories served over file://,
// laid out as `{root}/datasets/{id}` like the hub.

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=hubsnap",
            "-c",
            "user.email=hubsnap@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git should run");
    assert!(status.success(), "git {args:?} failed");
}

fn publish_dataset(root: &Path, id: &str, files: &[(&str, &str)]) {
    let work = root.join("work").join(id.replace('/', "_"));
    fs::create_dir_all(&work).expect("work dir");
    git(&work, &["init", "--quiet"]);
    git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    for (name, contents) in files {
        fs::write(work.join(name), contents).expect("write file");
    }
    git(&work, &["add", "."]);
    git(&work, &["commit", "--quiet", "-m", "initial"]);

    let bare = root.join("datasets").join(id);
    fs::create_dir_all(bare.parent().expect("dataset parent")).expect("datasets dir");
    git(
        root,
        &[
            "clone",
            "--quiet",
            "--bare",
            work.to_str().expect("utf-8 path"),
            bare.to_str().expect("utf-8 path"),
        ],
    );
}

fn source_for(root: &Path, workdir: &Path) -> GitSparseSource {
    let endpoint = format!("file://{}", root.display());
    GitSparseSource::new(workdir, endpoint, None, None)
}

#[tokio::test]
async fn sparse_checkout_reads_readme_and_removes_scratch() {
    let remote = tempdir().expect("remote root");
    let scratch = tempdir().expect("scratch root");
    let card = "---\nlicense: mit\n---\n# Hi\n";
    publish_dataset(
        remote.path(),
        "org/with-card",
        &[("README.md", card), ("data.csv", "a,b\n1,2\n")],
    );

    let source = source_for(remote.path(), scratch.path());
    let readme = source
        .fetch_readme("org/with-card")
        .await
        .expect("fetch succeeds");
    assert_eq!(readme.as_deref(), Some(card));
    assert!(!source.scratch_dir("org/with-card").exists());
}

#[tokio::test]
async fn repository_without_readme_yields_none() {
    let remote = tempdir().expect("remote root");
    let scratch = tempdir().expect("scratch root");
    publish_dataset(remote.path(), "org/no-card", &[("data.csv", "a\n1\n")]);

    let source = source_for(remote.path(), scratch.path());
    let readme = source
        .fetch_readme("org/no-card")
        .await
        .expect("fetch succeeds");
    assert_eq!(readme, None);
    assert!(!source.scratch_dir("org/no-card").exists());
}

#[tokio::test]
async fn missing_repository_is_a_git_error() {
    let remote = tempdir().expect("remote root");
    let scratch = tempdir().expect("scratch root");
    fs::create_dir_all(remote.path().join("datasets")).expect("datasets dir");

    let source = source_for(remote.path(), scratch.path());
    let err = source
        .fetch_readme("org/missing")
        .await
        .expect_err("fetch should fail");
    match err {
        HubsnapError::Git { command, .. } => assert!(command.starts_with("fetch")),
        other => panic!("expected a git error, got {other:?}"),
    }
    assert!(!source.scratch_dir("org/missing").exists());
}

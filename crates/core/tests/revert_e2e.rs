//! End-to-end tests for reverting unstable builds.
//!
//! These tests drive the real `Bouncer`, `SvnReverter` and `SvnClient`
//! against a local SVN repository created with `svnadmin create` and
//! accessed through `file://` URLs. No network I/O.
//!
//! Tests skip gracefully if `svn` / `svnadmin` are not installed.

use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

use svnrevert_core::config::SvnConfig;
use svnrevert_core::models::{ChangeEntry, ModuleLocation, PreviousBuild, ScmConfig, ScmKind};
use svnrevert_core::{
    Bouncer, Build, BuildLog, BuildResult, ChangedRevisions, ModuleFinder, RevertPolicy,
    SvnClientFactory, SvnReverter,
};

// ===========================================================================
// Helpers
// ===========================================================================

fn svn_available() -> bool {
    let ok = |bin: &str| {
        Command::new(bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    };
    ok("svn") && ok("svnadmin")
}

fn svn(args: &[&str]) -> String {
    let output = Command::new("svn")
        .args(args)
        .arg("--non-interactive")
        .output()
        .expect("failed to run svn");
    assert!(
        output.status.success(),
        "svn {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 temp path")
}

/// Repository with `/trunk/a.txt` = "good" at r2. Returns the root URL.
fn create_repo(dir: &Path) -> String {
    let repo_dir = dir.join("repo");
    let status = Command::new("svnadmin")
        .args(["create", path_str(&repo_dir)])
        .status()
        .expect("failed to run svnadmin create");
    assert!(status.success(), "svnadmin create failed");
    let url = format!("file://{}", repo_dir.display());

    let seed = dir.join("seed");
    svn(&["checkout", &url, path_str(&seed)]);
    std::fs::create_dir(seed.join("trunk")).unwrap();
    svn(&["add", path_str(&seed.join("trunk"))]);
    svn(&["commit", "-m", "Create trunk", path_str(&seed)]);

    std::fs::write(seed.join("trunk").join("a.txt"), "good\n").unwrap();
    svn(&["add", path_str(&seed.join("trunk").join("a.txt"))]);
    svn(&["commit", "-m", "Add a.txt", path_str(&seed)]);
    url
}

/// Commit a new content of `trunk/a.txt` from a developer working copy.
fn developer_commit(dir: &Path, url: &str, name: &str, content: &str, message: &str) {
    let wc = dir.join(name);
    svn(&["checkout", &format!("{}/trunk", url), path_str(&wc)]);
    std::fs::write(wc.join("a.txt"), content).unwrap();
    svn(&["commit", "-m", message, path_str(&wc)]);
}

fn unstable_build(url: &str, workspace: &Path, revision: &str) -> Build {
    Build {
        project: "e2e-job".into(),
        number: 2,
        result: BuildResult::Unstable,
        url: None,
        workspace: workspace.to_path_buf(),
        scm: ScmConfig {
            kind: ScmKind::Subversion,
            repository_root: url.into(),
            modules: vec![ModuleLocation {
                url: format!("{}/trunk", url),
                local: "trunk".into(),
            }],
        },
        changes: vec![ChangeEntry {
            revision: revision.into(),
            author: "alice".into(),
            message: "Break the build".into(),
            paths: vec!["/trunk/a.txt".into()],
        }],
        previous: Some(PreviousBuild {
            number: 1,
            result: Some(BuildResult::Success),
            building: false,
        }),
    }
}

fn evaluate(build: &Build) -> (bool, String) {
    let svn_config = SvnConfig {
        username: Some("builder".into()),
        password: Some("secret".into()),
        ..SvnConfig::default()
    };
    let factory = SvnClientFactory::new(&svn_config);
    let modules = ModuleFinder::new(build.workspace.clone());
    let changes = ChangedRevisions;
    let reverter = SvnReverter::new(&factory, &modules, &changes);
    let messenger = BuildLog::new(Vec::new());

    let passed = Bouncer::new(&messenger, &reverter, &changes, RevertPolicy::default())
        .evaluate(build)
        .expect("evaluation failed");
    let log = String::from_utf8(messenger.into_inner()).unwrap();
    (passed, log)
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_unstable_build_is_reverted() {
    if !svn_available() {
        eprintln!("skipping: svn/svnadmin not installed");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = create_repo(tmp.path());

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    svn(&["checkout", &format!("{}/trunk", url), path_str(&workspace.join("trunk"))]);
    developer_commit(tmp.path(), &url, "dev", "bad\n", "Break the build");
    svn(&["update", path_str(&workspace.join("trunk"))]);

    let build = unstable_build(&url, &workspace, "3");
    let (passed, log) = evaluate(&build);

    assert!(passed, "build log:\n{}", log);
    assert!(
        log.contains(&format!("Reverted changes between 2:3 in {}/trunk", url)),
        "build log:\n{}",
        log
    );
    assert_eq!(
        std::fs::read_to_string(workspace.join("trunk").join("a.txt")).unwrap(),
        "good\n"
    );

    let head = svn(&["log", "-l", "1", &format!("{}/trunk", url)]);
    assert!(head.contains(
        "Automatically reverted revision 3 since build e2e-job became UNSTABLE."
    ));
    let content = svn(&["cat", &format!("{}/trunk/a.txt", url)]);
    assert_eq!(content, "good\n");
}

#[test]
fn test_out_of_date_workspace_reverts_nothing() {
    if !svn_available() {
        eprintln!("skipping: svn/svnadmin not installed");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = create_repo(tmp.path());

    let workspace = tmp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    svn(&["checkout", &format!("{}/trunk", url), path_str(&workspace.join("trunk"))]);
    developer_commit(tmp.path(), &url, "dev", "bad\n", "Break the build");
    svn(&["update", path_str(&workspace.join("trunk"))]);

    // Someone commits on top of r3 while the build runs.
    developer_commit(tmp.path(), &url, "dev2", "worse\n", "Keep going");

    let build = unstable_build(&url, &workspace, "3");
    let (passed, log) = evaluate(&build);

    assert!(passed);
    assert!(log.contains("files to revert are out of date"), "build log:\n{}", log);
    assert!(!log.contains("Reverted changes"));
    assert_eq!(svn(&["cat", &format!("{}/trunk/a.txt", url)]), "worse\n");
}

#[test]
fn test_missing_credentials_fail_the_step() {
    if !svn_available() {
        eprintln!("skipping: svn/svnadmin not installed");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let url = create_repo(tmp.path());
    let workspace = tmp.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();
    svn(&["checkout", &format!("{}/trunk", url), path_str(&workspace.join("trunk"))]);
    developer_commit(tmp.path(), &url, "dev", "bad\n", "Break the build");
    svn(&["update", path_str(&workspace.join("trunk"))]);

    let build = unstable_build(&url, &workspace, "3");
    let factory = SvnClientFactory::new(&SvnConfig::default());
    let modules = ModuleFinder::new(build.workspace.clone());
    let reverter = SvnReverter::new(&factory, &modules, &ChangedRevisions);
    let messenger = BuildLog::new(Vec::new());

    let passed = Bouncer::new(&messenger, &reverter, &ChangedRevisions, RevertPolicy::default())
        .evaluate(&build)
        .unwrap();
    let log = String::from_utf8(messenger.into_inner()).unwrap();

    assert!(!passed);
    assert_eq!(log, "No Subversion credentials available.\n");
    assert_eq!(svn(&["cat", &format!("{}/trunk/a.txt", url)]), "bad\n");
}

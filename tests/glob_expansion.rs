// tests/glob_expansion.rs

mod common;
use crate::common::{init_tracing, TempProject, TestResult};

use std::path::Path;

use assetpipe::errors::AssetpipeError;
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::RealFileSystem;
use assetpipe::patterns::{expand, PatternGroup};

fn group(patterns: &[&str]) -> PatternGroup {
    PatternGroup::new(patterns).expect("patterns compile")
}

fn files(fs: &MockFileSystem, cwd: &str, patterns: &[&str]) -> Vec<String> {
    expand(fs, Path::new("."), cwd, &group(patterns))
        .expect("expansion succeeds")
        .files
}

#[test]
fn exclusion_removes_matches_in_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    // Inserted out of order; the expander sorts each include's matches.
    fs.add_file("./a/y.js", "y");
    fs.add_file("./a/skip.js", "skip");
    fs.add_file("./a/x.js", "x");

    assert_eq!(files(&fs, "", &["a/*.js", "!a/skip.js"]), vec!["a/x.js", "a/y.js"]);
}

#[test]
fn earlier_includes_keep_their_position() {
    let fs = MockFileSystem::new();
    fs.add_file("./lib/a.js", "");
    fs.add_file("./lib/b.js", "");
    fs.add_file("./lib/c.js", "");

    // `b.js` first, then the remaining matches of the wildcard, no duplicates.
    assert_eq!(
        files(&fs, "", &["lib/b.js", "lib/*.js"]),
        vec!["lib/b.js", "lib/a.js", "lib/c.js"]
    );
}

#[test]
fn re_included_path_moves_to_the_end() {
    let fs = MockFileSystem::new();
    fs.add_file("./a.js", "");
    fs.add_file("./b.js", "");
    fs.add_file("./c.js", "");

    assert_eq!(
        files(&fs, "", &["*.js", "!b.js", "b.js"]),
        vec!["a.js", "c.js", "b.js"]
    );
}

#[test]
fn single_star_does_not_cross_directories() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/app.js", "");
    fs.add_file("./src/nested/deep.js", "");

    assert_eq!(files(&fs, "", &["src/*.js"]), vec!["src/app.js"]);
    assert_eq!(
        files(&fs, "", &["src/**/*.js"]),
        vec!["src/app.js", "src/nested/deep.js"]
    );
}

#[test]
fn cwd_makes_paths_relative_to_the_group_directory() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./vendor/fonts/a.woff", "");
    fs.add_file("./vendor/fonts/sub/b.woff", "");

    let expansion = expand(&fs, Path::new("."), "vendor", &group(&["fonts/**/*.woff"]))?;
    assert_eq!(expansion.files, vec!["fonts/a.woff", "fonts/sub/b.woff"]);
    assert_eq!(
        expansion.root_relative(),
        vec!["vendor/fonts/a.woff", "vendor/fonts/sub/b.woff"]
    );
    assert_eq!(expansion.paths()[0], Path::new("./vendor/fonts/a.woff"));
    Ok(())
}

#[test]
fn literal_patterns_only_match_existing_files() {
    let fs = MockFileSystem::new();
    fs.add_file("./index.html", "");
    fs.add_dir("./assets");

    assert_eq!(files(&fs, "", &["index.html", "missing.html", "assets"]), vec!["index.html"]);
}

#[test]
fn missing_base_directory_expands_to_nothing() {
    let fs = MockFileSystem::new();
    assert!(files(&fs, "", &["nowhere/**/*.js"]).is_empty());
}

#[test]
fn expansion_is_deterministic() -> TestResult {
    let fs = MockFileSystem::new();
    for name in ["z", "m", "a", "q"] {
        fs.add_file(format!("./src/{name}.js"), name);
        fs.add_file(format!("./src/{name}/index.js"), name);
    }
    let g = group(&["src/**/*.js", "!src/m/**"]);

    let first = expand(&fs, Path::new("."), "", &g)?;
    let second = expand(&fs, Path::new("."), "", &g)?;
    assert_eq!(first, second);
    assert!(!first.files.iter().any(|f| f.starts_with("src/m/")));
    Ok(())
}

#[test]
fn invalid_glob_is_rejected() {
    assert!(PatternGroup::new(["src/[a.js"]).is_err());
    assert!(PatternGroup::new(["!"]).is_err());
}

#[test]
fn group_membership_is_last_match_wins() {
    let g = group(&["src/**/*.js", "!src/vendor/**", "src/vendor/keep.js"]);
    assert!(g.matches("src/app.js"));
    assert!(g.matches("./src/app.js"));
    assert!(!g.matches("src/vendor/lib.js"));
    assert!(g.matches("src/vendor/keep.js"));
    assert!(!g.matches("test/app.js"));
}

#[test]
fn real_filesystem_expansion_matches_mock_semantics() -> TestResult {
    let project = TempProject::new();
    project.write("src/b.js", "b");
    project.write("src/a.js", "a");
    project.write("src/a.spec.js", "spec");

    let expansion = expand(
        &RealFileSystem,
        project.root(),
        "",
        &group(&["src/**/*.js", "!src/**/*.spec.js"]),
    )?;
    assert_eq!(expansion.files, vec!["src/a.js", "src/b.js"]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn symlink_cycle_is_a_walk_error() -> TestResult {
    let project = TempProject::new();
    project.write("src/app.js", "app");
    std::os::unix::fs::symlink(project.path("src"), project.path("src/loop"))?;

    let err = expand(&RealFileSystem, project.root(), "", &group(&["src/**/*.js"])).unwrap_err();
    match err {
        AssetpipeError::FilesystemWalkError { reason, .. } => {
            assert!(reason.contains("symlink cycle"), "{reason}");
        }
        other => panic!("expected FilesystemWalkError, got {other:?}"),
    }
    Ok(())
}

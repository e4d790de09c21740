#![allow(dead_code)]

use std::sync::Arc;

use assetpipe::config::ConfigFile;
use assetpipe::exec::ExecutorSet;
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::FileSystem;
use assetpipe::pipeline::PipelineScheduler;

pub use assetpipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
pub use assetpipe_test_utils::fake_executor::{FakeExecutor, FakeRunBackend, RecordedCall};
pub use assetpipe_test_utils::project::TempProject;
pub use assetpipe_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Built-in executors plus `fake`.
pub fn executors_with(fake: &FakeExecutor) -> ExecutorSet {
    let mut set = ExecutorSet::builtin();
    set.register("fake", fake.clone());
    set
}

/// Scheduler over an in-memory filesystem rooted at `"."`.
pub fn mock_scheduler(cfg: &ConfigFile, fake: &FakeExecutor, fs: &MockFileSystem) -> PipelineScheduler {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    PipelineScheduler::from_config(cfg, executors_with(fake), fs).expect("scheduler builds")
}

/// A small front-end project: a build pipeline with separate script and
/// style steps and a compile pipeline on top.
pub fn sample_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_var("build_dir", "build")
        .with_task(
            "lint",
            TaskConfigBuilder::new("fake").input("src", &["src/**/*.js"]),
        )
        .with_task(
            "build:js",
            TaskConfigBuilder::new("fake")
                .input("src", &["src/**/*.js", "!src/**/*.spec.js"])
                .output("<%= build_dir %>/app.js"),
        )
        .with_task(
            "build:css",
            TaskConfigBuilder::new("fake")
                .input("src", &["src/**/*.less"])
                .output("<%= build_dir %>/app.css"),
        )
        .with_task(
            "compile:js",
            TaskConfigBuilder::new("fake")
                .input("src", &["build/app.js"])
                .output("bin/app.min.js"),
        )
        .with_pipeline("build", &["lint", "build:js", "build:css"])
        .with_pipeline("compile", &["compile:js"])
        .with_watch("scripts", &["src/**/*.js"], &["lint", "build:js"])
        .with_watch("styles", &["src/**/*.less"], &["build:css"])
        .build()
}

/// Sources for [`sample_config`].
pub fn sample_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/app.js", "app");
    fs.add_file("./src/util.js", "util");
    fs.add_file("./src/app.spec.js", "spec");
    fs.add_file("./src/main.less", "less");
    fs
}

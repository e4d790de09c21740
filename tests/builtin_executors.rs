// tests/builtin_executors.rs

mod common;
use crate::common::{
    init_tracing, mock_scheduler, ConfigFileBuilder, FakeExecutor, TaskConfigBuilder, TempProject,
    TestResult,
};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use assetpipe::config::load_and_validate;
use assetpipe::errors::AssetpipeError;
use assetpipe::exec::command::{render_command, shell_quote};
use assetpipe::exec::{ExecutorSet, TaskInvocation};
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::{FileSystem, RealFileSystem};
use assetpipe::patterns::Expansion;
use assetpipe::pipeline::PipelineScheduler;
use assetpipe::watch::hash::hash_bytes;

fn both_pipelines(builder: ConfigFileBuilder, tasks: &[&str]) -> ConfigFileBuilder {
    builder.with_pipeline("build", tasks).with_pipeline("compile", tasks)
}

fn read(fs: &MockFileSystem, path: &str) -> String {
    fs.read_to_string(Path::new(path)).expect("file exists")
}

#[tokio::test]
async fn copy_keeps_paths_relative_to_cwd() -> TestResult {
    init_tracing();
    let cfg = both_pipelines(
        ConfigFileBuilder::new()
            .with_task(
                "copy:assets",
                TaskConfigBuilder::new("copy")
                    .input_in("assets", "src", &["img/**", "fonts/*.woff"])
                    .output("build"),
            )
            .with_task(
                "copy:flat",
                TaskConfigBuilder::new("copy")
                    .input("assets", &["src/img/**"])
                    .output("build/flat")
                    .option("flatten", true),
            ),
        &["copy"],
    )
    .build();

    let fs = MockFileSystem::new();
    fs.add_file("./src/img/logo.png", "png");
    fs.add_file("./src/img/icons/x.svg", "svg");
    fs.add_file("./src/fonts/a.woff", "woff");
    let mut scheduler = mock_scheduler(&cfg, &FakeExecutor::new(), &fs);

    scheduler.run_pipeline("build").await?;

    assert_eq!(read(&fs, "./build/img/logo.png"), "png");
    assert_eq!(read(&fs, "./build/img/icons/x.svg"), "svg");
    assert_eq!(read(&fs, "./build/fonts/a.woff"), "woff");
    assert_eq!(read(&fs, "./build/flat/x.svg"), "svg");
    assert_eq!(read(&fs, "./build/flat/logo.png"), "png");
    assert_eq!(scheduler.metadata().get("copy:assets", "count"), Some("3"));
    Ok(())
}

#[tokio::test]
async fn concat_uses_banner_separator_and_reports_hash() -> TestResult {
    let cfg = both_pipelines(
        ConfigFileBuilder::new()
            .with_var("name", "demo")
            .with_task(
                "concat:js",
                TaskConfigBuilder::new("concat")
                    .input("vendor", &["vendor/*.js"])
                    .input("zapp", &["src/*.js"])
                    .output("bin/<%= name %>.js")
                    .option("banner", "/*! <%= name %> */\n")
                    .option("separator", ";\n"),
            ),
        &["concat:js"],
    )
    .build();

    let fs = MockFileSystem::new();
    fs.add_file("./src/b.js", "b()");
    fs.add_file("./src/a.js", "a()");
    fs.add_file("./vendor/lib.js", "lib()");
    let mut scheduler = mock_scheduler(&cfg, &FakeExecutor::new(), &fs);

    scheduler.run_target("concat:js").await?;

    // Groups in name order, each group's matches sorted.
    let expected = "/*! demo */\nlib();\na();\nb()";
    assert_eq!(read(&fs, "./bin/demo.js"), expected);
    assert_eq!(
        scheduler.metadata().get("concat:js", "hash"),
        Some(hash_bytes(expected.as_bytes()).as_str())
    );
    assert_eq!(scheduler.metadata().get("concat:js", "output"), Some("bin/demo.js"));

    // A second run overwrites rather than appends.
    scheduler.run_target("concat:js").await?;
    assert_eq!(read(&fs, "./bin/demo.js"), expected);
    Ok(())
}

#[tokio::test]
async fn clean_removes_listed_paths() -> TestResult {
    let cfg = both_pipelines(
        ConfigFileBuilder::new().with_task(
            "clean",
            TaskConfigBuilder::new("clean").option_list("paths", &["build", "bin", "tmp"]),
        ),
        &["clean"],
    )
    .build();

    let fs = MockFileSystem::new();
    fs.add_file("./build/app.js", "x");
    fs.add_file("./bin/app.min.js", "x");
    fs.add_file("./src/app.js", "keep");
    let mut scheduler = mock_scheduler(&cfg, &FakeExecutor::new(), &fs);

    scheduler.run_pipeline("build").await?;

    assert!(!fs.exists(Path::new("./build/app.js")));
    assert!(!fs.exists(Path::new("./bin")));
    assert!(fs.exists(Path::new("./src/app.js")));
    assert_eq!(scheduler.metadata().get("clean", "removed"), Some("2"));
    Ok(())
}

#[test]
fn clean_refuses_paths_outside_the_project() {
    for bad in ["../elsewhere", "/etc", "", "."] {
        let cfg = both_pipelines(
            ConfigFileBuilder::new()
                .with_task("clean", TaskConfigBuilder::new("clean").option_list("paths", &[bad])),
            &["clean"],
        )
        .build();
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let err = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs).unwrap_err();
        assert!(matches!(err, AssetpipeError::ConfigError(_)), "{bad:?}: {err:?}");
    }
}

#[test]
fn copy_requires_an_output() {
    let cfg = both_pipelines(
        ConfigFileBuilder::new()
            .with_task("copy", TaskConfigBuilder::new("copy").input("src", &["src/**"])),
        &["copy"],
    )
    .build();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    let err = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs).unwrap_err();
    match err {
        AssetpipeError::ConfigError(msg) => assert!(msg.contains("output"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

fn invocation(files: &[&str], output: Option<&str>) -> TaskInvocation {
    let mut inputs = BTreeMap::new();
    inputs.insert(
        "src".to_string(),
        Expansion {
            base: ".".into(),
            cwd: String::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
        },
    );
    TaskInvocation {
        task: "lint".into(),
        inputs,
        output: output.map(str::to_string),
        options: toml::Table::new(),
    }
}

#[test]
fn command_placeholders_are_shell_quoted() {
    let inv = invocation(&["src/a.js", "src/my file.js"], Some("build/out.js"));
    assert_eq!(
        render_command("jshint {inputs} > {output}", &inv),
        "jshint src/a.js 'src/my file.js' > build/out.js"
    );
    assert_eq!(render_command("echo {output}", &invocation(&[], None)), "echo ");

    // Braces inside substituted paths are left alone.
    let odd = invocation(&["src/{output}.js"], Some("build/{inputs}.js"));
    assert_eq!(
        render_command("cat {inputs} > {output}", &odd),
        "cat 'src/{output}.js' > 'build/{inputs}.js'"
    );

    assert_eq!(shell_quote("plain/path-1.js"), "plain/path-1.js");
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
}

#[cfg(unix)]
#[tokio::test]
async fn command_runs_in_the_project_root() -> TestResult {
    let project = TempProject::new();
    project.write("src/a.txt", "alpha\n");
    project.write("src/b.txt", "beta\n");

    let cfg = both_pipelines(
        ConfigFileBuilder::at(project.root()).with_task(
            "join",
            TaskConfigBuilder::new("command")
                .input("src", &["src/*.txt"])
                .output("out.txt")
                .option("cmd", "cat {inputs} > {output}")
                .output_exists(),
        ),
        &["join"],
    )
    .build();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut scheduler = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs)?;
    scheduler.run_target("join").await?;

    assert_eq!(project.read("out.txt"), "alpha\nbeta\n");
    assert_eq!(scheduler.metadata().get("join", "exit_code"), Some("0"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_fails_the_task() -> TestResult {
    let project = TempProject::new();
    let cfg = both_pipelines(
        ConfigFileBuilder::at(project.root()).with_task(
            "lint",
            TaskConfigBuilder::new("command").option("cmd", "echo 'bad style' >&2; exit 3"),
        ),
        &["lint"],
    )
    .build();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut scheduler = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs)?;
    let err = scheduler.run_target("lint").await.unwrap_err();

    match err {
        AssetpipeError::TaskFailed { task, source } => {
            assert_eq!(task, "lint");
            let message = source.to_string();
            assert!(message.contains("status 3"), "{message}");
            assert!(message.contains("bad style"), "{message}");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn empty_command_is_rejected_at_startup() {
    let cfg = both_pipelines(
        ConfigFileBuilder::new()
            .with_task("lint", TaskConfigBuilder::new("command").option("cmd", "  ")),
        &["lint"],
    )
    .build();
    let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
    assert!(PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs).is_err());
}

#[tokio::test]
async fn config_validation_task_rereads_the_file() -> TestResult {
    let project = TempProject::new();
    let builder = both_pipelines(
        ConfigFileBuilder::at(project.root())
            .with_task("clean", TaskConfigBuilder::new("clean").option_list("paths", &["build"])),
        &["clean"],
    );
    let config_path = builder.write();

    let cfg = load_and_validate(&config_path)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut scheduler = PipelineScheduler::from_config(&cfg, ExecutorSet::builtin(), fs)?;

    scheduler.run_target("config:validate").await?;
    // `clean` plus the implicit validation task.
    assert_eq!(scheduler.metadata().get("config:validate", "tasks"), Some("2"));

    project.write("Assetpipe.toml", "[pipeline]\nbuild = [\"nope\"]\n");
    let err = scheduler.run_target("config:validate").await.unwrap_err();
    assert_eq!(err.task_name(), Some("config:validate"));
    assert!(err.to_string().contains("config is invalid"), "{err}");
    Ok(())
}

// tests/config_validation.rs

mod common;
use crate::common::{init_tracing, ConfigFileBuilder, TaskConfigBuilder, TempProject, TestResult};

use assetpipe::config::{load_and_validate, CONFIG_VALIDATE_TASK, CONFIG_WATCH_RULE};
use assetpipe::errors::AssetpipeError;

fn base() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::new("clean").option_list("paths", &["build"]))
        .with_task("less:app", TaskConfigBuilder::new("fake").output("build/app.css"))
        .with_task("less:theme", TaskConfigBuilder::new("fake").output("build/theme.css"))
        .with_task("concat", TaskConfigBuilder::new("fake").output("bin/app.js"))
}

#[test]
fn aliases_and_multi_targets_flatten_in_order() -> TestResult {
    init_tracing();
    let cfg = base()
        .with_pipeline("styles", &["less"])
        .with_pipeline("build", &["clean", "styles"])
        .with_pipeline("compile", &["build", "concat"])
        .try_build()?;

    assert_eq!(
        cfg.pipeline("build").unwrap(),
        ["clean", "less:app", "less:theme"]
    );
    assert_eq!(
        cfg.pipeline("compile").unwrap(),
        ["clean", "less:app", "less:theme", "concat"]
    );
    // `default` is implied as build then compile.
    assert_eq!(
        cfg.pipeline("default").unwrap(),
        ["clean", "less:app", "less:theme", "clean", "less:app", "less:theme", "concat"]
    );
    assert_eq!(cfg.declared_pipelines["styles"], vec!["less"]);
    Ok(())
}

#[test]
fn unknown_task_in_pipeline_fails_before_anything_runs() {
    let err = base()
        .with_pipeline("build", &["clean", "uglify"])
        .with_pipeline("compile", &["concat"])
        .try_build()
        .unwrap_err();

    match err {
        AssetpipeError::UnknownTaskReference { task, referrer } => {
            assert_eq!(task, "uglify");
            assert_eq!(referrer, "pipeline 'build'");
        }
        other => panic!("expected UnknownTaskReference, got {other:?}"),
    }
}

#[test]
fn unknown_task_in_watch_rule_is_rejected() {
    let err = base()
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["concat"])
        .with_watch("scripts", &["src/**/*.js"], &["jshint"])
        .try_build()
        .unwrap_err();

    match err {
        AssetpipeError::UnknownTaskReference { task, referrer } => {
            assert_eq!(task, "jshint");
            assert_eq!(referrer, "watch rule 'scripts'");
        }
        other => panic!("expected UnknownTaskReference, got {other:?}"),
    }
}

#[test]
fn alias_cycle_is_rejected() {
    let err = base()
        .with_pipeline("build", &["compile"])
        .with_pipeline("compile", &["build"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetpipeError::PipelineCycle(_)), "{err:?}");
}

#[test]
fn build_and_compile_are_required() {
    let err = base().with_pipeline("build", &["clean"]).try_build().unwrap_err();
    match err {
        AssetpipeError::ConfigError(msg) => assert!(msg.contains("compile"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn pipeline_named_like_a_task_is_rejected() {
    let err = base()
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["concat"])
        .with_pipeline("concat", &["clean"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn zero_debounce_is_rejected() {
    let err = base()
        .with_config("debounce_ms", 0i64)
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["concat"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, AssetpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn reserved_top_level_keys_are_rejected() {
    for key in ["pkg", "run"] {
        let err = base()
            .with_var(key, "x")
            .with_pipeline("build", &["clean"])
            .with_pipeline("compile", &["concat"])
            .try_build()
            .unwrap_err();
        assert!(matches!(err, AssetpipeError::ConfigError(_)), "{key}: {err:?}");
    }
}

#[test]
fn run_reference_to_unknown_task_is_rejected() {
    let err = base()
        .with_var("bundle", "bin/app-<%= run.minify.hash %>.js")
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["concat"])
        .try_build()
        .unwrap_err();

    match err {
        AssetpipeError::UnknownTaskReference { task, .. } => assert_eq!(task, "minify"),
        other => panic!("expected UnknownTaskReference, got {other:?}"),
    }
}

#[test]
fn implicit_config_rule_is_added() -> TestResult {
    let cfg = base()
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["concat"])
        .with_watch("styles", &["src/**/*.less", "Assetpipe.toml"], &["less"])
        .try_build()?;

    assert!(cfg.task.contains_key(CONFIG_VALIDATE_TASK));
    let rule = cfg
        .watch
        .iter()
        .find(|r| r.name == CONFIG_WATCH_RULE)
        .expect("config rule present");
    assert_eq!(rule.files, vec!["Assetpipe.toml"]);
    assert_eq!(rule.livereload, Some(false));

    // Multi-target names in rules are flattened.
    let styles = cfg.watch.iter().find(|r| r.name == "styles").unwrap();
    assert_eq!(styles.tasks, vec!["less:app", "less:theme"]);
    Ok(())
}

#[test]
fn bad_input_glob_is_a_config_error() {
    let err = base()
        .with_task("lint", TaskConfigBuilder::new("fake").input("src", &["src/[oops"]))
        .with_pipeline("build", &["lint"])
        .with_pipeline("compile", &["concat"])
        .try_build()
        .and_then(|cfg| {
            assetpipe::pipeline::TaskRegistry::from_config(&cfg).map(|_| cfg)
        })
        .unwrap_err();
    assert!(matches!(err, AssetpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn unknown_executor_fails_when_building_the_scheduler() {
    let cfg = base()
        .with_task("minify", TaskConfigBuilder::new("uglify").output("bin/app.min.js"))
        .with_pipeline("build", &["clean"])
        .with_pipeline("compile", &["minify"])
        .build();

    let fake = common::FakeExecutor::new();
    let fs = assetpipe::fs::mock::MockFileSystem::new();
    let err = assetpipe::pipeline::PipelineScheduler::from_config(
        &cfg,
        common::executors_with(&fake),
        std::sync::Arc::new(fs),
    )
    .unwrap_err();
    match err {
        AssetpipeError::ConfigError(msg) => assert!(msg.contains("uglify"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn missing_executor_options_fail_at_startup() {
    let cfg = base()
        .with_task("index", TaskConfigBuilder::new("index").output("build/index.html"))
        .with_pipeline("build", &["index"])
        .with_pipeline("compile", &["concat"])
        .build();

    let fake = common::FakeExecutor::new();
    let fs = assetpipe::fs::mock::MockFileSystem::new();
    let err = assetpipe::pipeline::PipelineScheduler::from_config(
        &cfg,
        common::executors_with(&fake),
        std::sync::Arc::new(fs),
    )
    .unwrap_err();
    assert!(matches!(err, AssetpipeError::ConfigError(_)), "{err:?}");
}

#[test]
fn loads_a_config_file_from_disk() -> TestResult {
    let project = TempProject::new();
    project.write_package("site", "0.3.0");
    project.write(
        "Assetpipe.toml",
        r#"
        build_dir = "build"

        [config]
        debounce_ms = 50

        [task.clean]
        executor = "clean"
        options = { paths = ["<%= build_dir %>"] }

        [task."copy:assets"]
        executor = "copy"
        inputs = { assets = { cwd = "src", patterns = ["assets/**"] } }
        output = "<%= build_dir %>"

        [pipeline]
        build = ["clean", "copy"]
        compile = ["build"]

        [[watch]]
        name = "assets"
        files = ["src/assets/**"]
        tasks = ["copy"]
        "#,
    );

    let cfg = load_and_validate(project.path("Assetpipe.toml"))?;
    assert_eq!(cfg.config.debounce_ms, 50);
    assert_eq!(cfg.pipeline("build").unwrap(), ["clean", "copy:assets"]);
    assert_eq!(cfg.pipeline("compile").unwrap(), ["clean", "copy:assets"]);
    assert_eq!(cfg.task["copy:assets"].output.as_deref(), Some("build"));
    assert_eq!(cfg.root(), project.root());
    Ok(())
}

#[test]
fn spliced_lists_flatten_in_watch_rules_and_pipelines() -> TestResult {
    let project = TempProject::new();
    project.write_package("site", "0.3.0");
    project.write(
        "Assetpipe.toml",
        r#"
        build_tasks = ["clean", "copy"]

        [app_files]
        js = ["src/**/*.js", "!src/**/*.spec.js"]

        [task.clean]
        executor = "clean"
        options = { paths = ["build"] }

        [task."copy:js"]
        executor = "copy"
        inputs = { src = ["<%= app_files.js %>"] }
        output = "build"

        [pipeline]
        build = ["<%= build_tasks %>"]
        compile = ["build"]

        [[watch]]
        name = "jssrc"
        files = ["<%= app_files.js %>", "!src/legacy/**"]
        tasks = ["<%= build_tasks %>"]
        "#,
    );

    let cfg = load_and_validate(project.path("Assetpipe.toml"))?;
    assert_eq!(cfg.pipeline("build").unwrap(), ["clean", "copy:js"]);
    assert_eq!(cfg.declared_pipelines["build"], vec!["clean", "copy"]);

    let rule = cfg.watch.iter().find(|r| r.name == "jssrc").expect("rule present");
    assert_eq!(
        rule.files,
        vec!["src/**/*.js", "!src/**/*.spec.js", "!src/legacy/**"]
    );
    assert_eq!(rule.tasks, vec!["clean", "copy:js"]);
    Ok(())
}

use proptest::prelude::*;

use assetpipe::engine::{CoreCommand, CoreRuntime, RunOutcome, RuntimeEvent, RuntimeOptions};
use assetpipe::watch::{WatchRule, WatchRules};

const PIPELINE: [&str; 4] = ["lint", "scripts", "styles", "index"];

fn rules() -> WatchRules {
    let rule = |name: &str, glob: &str, tasks: &[&str]| {
        WatchRule::new(name, [glob], tasks.iter().map(|t| t.to_string()).collect(), true)
            .expect("rule compiles")
    };
    let pipeline: Vec<String> = PIPELINE.iter().map(|t| t.to_string()).collect();
    WatchRules::new(
        vec![
            rule("js", "src/**/*.js", &["lint", "scripts"]),
            rule("css", "src/**/*.css", &["styles"]),
            rule("html", "src/index.html", &["index"]),
        ],
        &pipeline,
        "Assetpipe.toml",
    )
}

#[derive(Debug, Clone)]
enum Input {
    Change(Vec<&'static str>),
    CompleteActive(bool),
    CompleteStale,
}

fn input() -> impl Strategy<Value = Input> {
    let path = prop_oneof![
        Just("src/app.js"),
        Just("src/app.css"),
        Just("src/index.html"),
        Just("README.md"),
    ];
    prop_oneof![
        proptest::collection::vec(path, 1..4).prop_map(Input::Change),
        any::<bool>().prop_map(Input::CompleteActive),
        Just(Input::CompleteStale),
    ]
}

fn position(task: &str) -> usize {
    PIPELINE.iter().position(|t| *t == task).unwrap_or(usize::MAX)
}

proptest! {
    #[test]
    fn at_most_one_run_and_pipeline_ordered_tasks(inputs in proptest::collection::vec(input(), 1..40)) {
        let mut core = CoreRuntime::new(rules(), RuntimeOptions::default());
        let mut in_flight: Option<u64> = None;
        let mut last_id = 0u64;

        for input in inputs {
            let event = match input {
                Input::Change(paths) => RuntimeEvent::FilesChanged {
                    paths: paths.into_iter().map(str::to_string).collect(),
                },
                Input::CompleteActive(ok) => match in_flight {
                    Some(run_id) => RuntimeEvent::RunCompleted {
                        run_id,
                        outcome: if ok {
                            RunOutcome::Success
                        } else {
                            RunOutcome::Failed { task: None, message: "x".into() }
                        },
                    },
                    None => continue,
                },
                Input::CompleteStale => RuntimeEvent::RunCompleted {
                    run_id: last_id + 100,
                    outcome: RunOutcome::Success,
                },
            };

            if let RuntimeEvent::RunCompleted { run_id, .. } = &event {
                if Some(*run_id) == in_flight {
                    in_flight = None;
                }
            }

            let step = core.step(event);
            prop_assert!(step.keep_running);

            for command in &step.commands {
                if let CoreCommand::StartRun(request) = command {
                    prop_assert!(in_flight.is_none(), "a second run started while one is active");
                    prop_assert!(request.run_id > last_id);
                    prop_assert!(!request.tasks.is_empty());
                    prop_assert!(request.tasks.windows(2).all(|w| position(&w[0]) < position(&w[1])));
                    in_flight = Some(request.run_id);
                    last_id = request.run_id;
                }
            }

            prop_assert_eq!(core.is_idle(), in_flight.is_none());
        }

        // Draining: completing runs until idle never loops forever.
        let mut guard = 0;
        while let Some(run_id) = in_flight.take() {
            let step = core.step(RuntimeEvent::RunCompleted { run_id, outcome: RunOutcome::Success });
            for command in step.commands {
                if let CoreCommand::StartRun(request) = command {
                    in_flight = Some(request.run_id);
                }
            }
            guard += 1;
            prop_assert!(guard <= 2, "queue did not drain in one follow-up run");
        }
        prop_assert!(core.is_idle());
        prop_assert!(core.queue_is_empty());
    }
}

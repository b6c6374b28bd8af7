mod common;

use agentnet_exp::{Dispatcher, Experiment, ExperimentEvent, ExperimentManager, Status};
use std::thread;
use std::time::Duration;

use common::{config, context, read_lines, with_files};

fn csv_path(dir: &std::path::Path, trial: u16) -> std::path::PathBuf {
    dir.join(format!("proj_e1_t{trial}.csv"))
}

#[test]
fn full_run_writes_one_row_per_step() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let ctx = context();
    let exp = Experiment::new(ctx.clone(), "proj", with_files(config(3, 10), temp.path()));
    assert_eq!(exp.status(), Status::Ready);

    let manager = ExperimentManager::from_context(&ctx).expect("manager");
    exp.play(&manager);
    assert_eq!(exp.status(), Status::Queued);
    manager.run_queued();

    assert_eq!(exp.status(), Status::Finished);
    assert_eq!(exp.progress(), 360);
    for trial in 0..3 {
        let lines = read_lines(&csv_path(temp.path(), trial));
        assert_eq!(lines.len(), 12, "trial {trial}");
        assert_eq!(lines[0], "steps,count_nodes_opinion_0,count_nodes_opinion_1");
        for (step, line) in lines[1..].iter().enumerate() {
            let cells: Vec<&str> = line.split(',').collect();
            assert_eq!(cells.len(), 3);
            assert_eq!(cells[0], step.to_string());
            let zeros: usize = cells[1].parse().expect("count");
            let ones: usize = cells[2].parse().expect("count");
            assert_eq!(zeros + ones, 20);
        }
        assert_eq!(exp.trial(trial).expect("trial").status(), Status::Finished);
    }
}

#[test]
fn pause_horizon_splits_the_run() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let ctx = context();
    let exp = Experiment::new(ctx.clone(), "proj", with_files(config(3, 10), temp.path()));
    let manager = ExperimentManager::new(2).expect("manager");

    assert_eq!(exp.set_pause_at(5), 5);
    exp.play(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Ready);
    assert!(exp.progress() < 360);
    for trial in 0..3 {
        assert_eq!(exp.trial(trial).expect("trial").curr_step(), 5);
        // only the step-0 row has been flushed so far
        assert_eq!(read_lines(&csv_path(temp.path(), trial)).len(), 2);
    }

    assert_eq!(exp.set_pause_at(10), 10);
    exp.play(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Finished);
    for trial in 0..3 {
        assert_eq!(exp.trial(trial).expect("trial").curr_step(), 10);
        assert_eq!(read_lines(&csv_path(temp.path(), trial)).len(), 12);
    }
}

#[test]
fn pause_horizon_is_clamped() {
    let exp = Experiment::new(context(), "proj", config(2, 10));
    assert_eq!(exp.pause_at(), 10);
    assert_eq!(exp.set_pause_at(50), 10);
    exp.process_trial(0);
    assert_eq!(exp.trial(0).expect("trial").curr_step(), 10);
    assert_eq!(exp.set_pause_at(3), 10);
}

#[test]
fn model_failure_invalidates_experiment() {
    let ctx = context();
    let mut cfg = config(3, 10);
    // trial 1 is seeded with 11 + 1
    cfg.model_params.set("fail_seed", 12);
    let exp = Experiment::new(ctx.clone(), "proj", cfg);
    let manager = ExperimentManager::new(3).expect("manager");
    exp.play(&manager);
    manager.run_queued();

    assert_eq!(exp.status(), Status::Invalid);
    assert_eq!(exp.progress(), 0);
    assert!(exp.trial(1).is_none());

    let steps: Vec<Option<u32>> = (0..3)
        .map(|id| exp.trial(id).map(|t| t.curr_step()))
        .collect();
    exp.process_trial(0);
    exp.process_trial(2);
    let after: Vec<Option<u32>> = (0..3)
        .map(|id| exp.trial(id).map(|t| t.curr_step()))
        .collect();
    assert_eq!(steps, after);

    exp.reset().expect("reset");
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(exp.trials_count(), 0);
}

#[test]
fn graph_failure_invalidates_experiment() {
    let mut cfg = config(2, 5);
    cfg.graph_id = "broken".into();
    let exp = Experiment::new(context(), "proj", cfg);
    assert_eq!(exp.status(), Status::Ready);
    let err = exp.ensure_trial(0).expect_err("broken graph");
    assert_eq!(err.code(), "broken-topology");
    assert_eq!(err.info().context.get("trial").map(String::as_str), Some("0"));

    exp.process_trial(0);
    assert_eq!(exp.status(), Status::Invalid);
    assert_eq!(exp.trials_count(), 0);
}

#[test]
fn invalid_graph_type_invalidates_on_first_trial() {
    let mut cfg = config(2, 5);
    cfg.graph_type = "sideways".into();
    let exp = Experiment::new(context(), "proj", cfg);
    exp.process_trial(0);
    assert_eq!(exp.status(), Status::Invalid);
}

#[test]
fn unknown_plugin_leaves_experiment_invalid() {
    let mut cfg = config(2, 5);
    cfg.model_id = "missing".into();
    let exp = Experiment::new(context(), "proj", cfg.clone());
    assert_eq!(exp.status(), Status::Invalid);

    let err = exp.initialize(cfg).expect_err("unknown model");
    assert_eq!(err.code(), "unknown-plugin");
    exp.reset().expect("reset is allowed");
    assert_eq!(exp.status(), Status::Invalid);

    exp.initialize(config(2, 5)).expect("valid inputs");
    assert_eq!(exp.status(), Status::Ready);
}

#[test]
fn invalid_inputs_are_rejected_without_side_effects() {
    let exp = Experiment::new(context(), "proj", config(2, 5));
    let mut bad = config(2, 5);
    bad.trials = 0;
    let err = exp.initialize(bad).expect_err("no trials");
    assert_eq!(err.code(), "invalid-trials");
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(exp.config().trials, 2);
}

#[test]
fn busy_experiment_refuses_reinitialization() {
    let exp = Experiment::new(context(), "proj", config(2, 5));
    let manager = ExperimentManager::new(1).expect("manager");
    exp.play(&manager);
    assert_eq!(exp.status(), Status::Queued);

    assert_eq!(
        exp.initialize(config(4, 5)).expect_err("queued").code(),
        "experiment-busy"
    );
    assert_eq!(exp.reset().expect_err("queued").code(), "experiment-busy");
    assert_eq!(exp.config().trials, 2);

    manager.dequeue(&exp);
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(manager.queued(), 0);
    exp.initialize(config(4, 5)).expect("ready again");
    assert_eq!(exp.num_trials(), 4);
}

#[test]
fn transitions_follow_table() {
    let exp = Experiment::new(context(), "proj", config(1, 5));
    assert_eq!(
        exp.transition(Status::Finished).expect_err("ready to finished").code(),
        "illegal-transition"
    );
    exp.transition(Status::Running).expect("ready to running");
    assert!(exp.transition(Status::Queued).is_err());
    exp.transition(Status::Ready).expect("running to ready");
    exp.transition(Status::Queued).expect("ready to queued");
    exp.transition(Status::Running).expect("queued to running");
    exp.transition(Status::Invalid).expect("any to invalid");
    assert!(exp.transition(Status::Ready).is_err());
    exp.reset().expect("reset");
    assert_eq!(exp.status(), Status::Ready);
}

#[test]
fn transition_table_is_exhaustive() {
    use Status::*;
    let all = [Invalid, Ready, Queued, Running, Finished];
    let allowed = [
        (Ready, Queued),
        (Queued, Ready),
        (Ready, Running),
        (Queued, Running),
        (Running, Ready),
        (Running, Finished),
    ];
    for from in all {
        for to in all {
            let expected = to == Invalid || allowed.contains(&(from, to));
            assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
        }
    }
}

#[test]
fn convergence_finishes_early() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let mut cfg = with_files(config(2, 10), temp.path());
    cfg.model_params.set("converge_at", 4);
    let exp = Experiment::new(context(), "proj", cfg);
    let manager = ExperimentManager::new(2).expect("manager");
    exp.play(&manager);
    manager.run_queued();

    assert_eq!(exp.status(), Status::Finished);
    for trial in 0..2 {
        assert_eq!(exp.trial(trial).expect("trial").curr_step(), 4);
        assert_eq!(read_lines(&csv_path(temp.path(), trial)).len(), 6);
    }
}

#[test]
fn play_next_advances_one_step() {
    let exp = Experiment::new(context(), "proj", config(2, 10));
    let manager = ExperimentManager::new(2).expect("manager");

    exp.play_next(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(exp.pause_at(), 1);
    for trial in 0..2 {
        assert_eq!(exp.trial(trial).expect("trial").curr_step(), 1);
    }

    exp.play_next(&manager);
    manager.run_queued();
    assert_eq!(exp.trial(0).expect("trial").curr_step(), 2);
}

#[test]
fn toggle_queues_and_unqueues() {
    let exp = Experiment::new(context(), "proj", config(1, 10));
    let manager = ExperimentManager::new(1).expect("manager");

    exp.toggle(&manager);
    assert_eq!(exp.status(), Status::Queued);
    assert_eq!(manager.queued(), 1);

    exp.toggle(&manager);
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(manager.queued(), 0);

    exp.transition(Status::Running).expect("running");
    exp.toggle(&manager);
    assert_eq!(exp.pause_at(), 0);
    exp.transition(Status::Ready).expect("running to ready");
}

#[test]
fn autodelete_drops_trials_once_finished() {
    let mut cfg = config(2, 3);
    cfg.autodelete = true;
    let exp = Experiment::new(context(), "proj", cfg);
    let manager = ExperimentManager::new(2).expect("manager");
    exp.play(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Finished);
    assert_eq!(exp.progress(), 360);
    assert_eq!(exp.trials_count(), 0);

    exp.process_trial(0);
    assert_eq!(exp.trials_count(), 0);
}

#[test]
fn events_are_published_in_order() {
    let exp = Experiment::new(context(), "proj", config(2, 4));
    let events = exp.subscribe();
    let manager = ExperimentManager::new(2).expect("manager");
    exp.play(&manager);
    manager.run_queued();

    let received: Vec<ExperimentEvent> = events.try_iter().collect();
    let statuses: Vec<Status> = received
        .iter()
        .filter_map(|event| match event {
            ExperimentEvent::StatusChanged(status) => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![Status::Queued, Status::Running, Status::Finished]
    );
    let created = received
        .iter()
        .filter(|event| matches!(event, ExperimentEvent::TrialCreated(_)))
        .count();
    assert_eq!(created, 2);
    let last_progress = received.iter().rev().find_map(|event| match event {
        ExperimentEvent::ProgressUpdated(value) => Some(*value),
        _ => None,
    });
    assert_eq!(last_progress, Some(360));

    exp.reset().expect("reset");
    let after: Vec<ExperimentEvent> = events.try_iter().collect();
    assert_eq!(
        after,
        vec![
            ExperimentEvent::StatusChanged(Status::Ready),
            ExperimentEvent::Restarted,
            ExperimentEvent::ProgressUpdated(0),
        ]
    );
}

#[test]
fn toggle_pauses_and_resumes_a_running_experiment() {
    let exp = Experiment::new(context(), "proj", config(2, 200));
    exp.set_delay(2);
    let manager = ExperimentManager::new(2).expect("manager");
    exp.toggle(&manager);
    assert_eq!(exp.status(), Status::Queued);

    thread::scope(|scope| {
        let runner = scope.spawn(|| manager.run_queued());
        while exp.trial(0).map_or(0, |trial| trial.curr_step()) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(exp.status(), Status::Running);
        exp.toggle(&manager);
        runner.join().expect("runner");
    });
    assert_eq!(exp.status(), Status::Ready);
    let paused_at = exp.pause_at();
    assert!(paused_at < 200);
    assert_eq!(exp.trial(0).expect("trial").curr_step(), paused_at);

    exp.set_delay(0);
    exp.toggle(&manager);
    assert_eq!(exp.status(), Status::Queued);
    assert_eq!(exp.pause_at(), 200);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Finished);
}

#[test]
fn play_after_pause_runs_to_the_end() {
    let exp = Experiment::new(context(), "proj", config(2, 10));
    let manager = ExperimentManager::new(2).expect("manager");
    exp.set_pause_at(4);
    exp.play(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Ready);

    exp.pause();
    assert_eq!(exp.pause_at(), 4);
    exp.play(&manager);
    manager.run_queued();
    assert_eq!(exp.status(), Status::Finished);
    assert_eq!(exp.trial(1).expect("trial").curr_step(), 10);
}

#[test]
fn reset_waits_for_the_open_pass() {
    let exp = Experiment::new(context(), "proj", config(2, 10));
    exp.begin_pass().expect("pass");
    exp.process_trial(0);
    exp.transition(Status::Invalid).expect("invalid");

    let err = exp.reset().expect_err("pass still open");
    assert_eq!(err.code(), "pass-in-flight");
    assert_eq!(
        exp.initialize(config(2, 10)).expect_err("pass still open").code(),
        "pass-in-flight"
    );
    assert_eq!(exp.trials_count(), 1);

    assert_eq!(exp.complete_pass(), Status::Invalid);
    exp.reset().expect("reset");
    assert_eq!(exp.status(), Status::Ready);
    assert_eq!(exp.trials_count(), 0);
}

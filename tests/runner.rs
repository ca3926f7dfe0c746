mod common;

use common::fixtures::{png_fixture, read_back, scenario_image, TempFile};
use filterlab::cli::{self, Step};
use filterlab::{
    Command, EditError, EditSession, EditorSettings, Filter, SessionOptions, SessionRunner,
};
use image::Rgb;

#[test]
fn background_walkthrough_matches_synchronous_session() {
    let source = png_fixture(&scenario_image());
    let mut runner = SessionRunner::new(EditSession::default(), 2).unwrap();
    let mut session = EditSession::default();

    let commands = [
        Command::Open(source.path().to_path_buf()),
        Command::Apply(Filter::color(128, 255, 0)),
        Command::Apply(Filter::contrast(20)),
        Command::Undo,
    ];
    for command in commands {
        runner.run(command.clone()).unwrap();
        session.execute(command).unwrap();
        assert_eq!(runner.session().current(), session.current());
    }
    assert_eq!(runner.session().descriptions(), vec!["Color Filter (128, 255, 0)".to_string()]);
}

#[test]
fn poll_eventually_reports_the_job() {
    let source = png_fixture(&scenario_image());
    let mut runner = SessionRunner::new(EditSession::default(), 1).unwrap();
    let job = runner.submit(Command::Open(source.path().to_path_buf())).unwrap();

    let report = loop {
        if let Some(report) = runner.poll() {
            break report;
        }
        std::thread::yield_now();
    };
    assert_eq!(report.job, job);
    assert_eq!(report.command, "open");
    assert!(report.is_ok());
    assert!(runner.session().has_image());
}

#[test]
fn busy_submit_is_rejected_without_side_effects() {
    let source = png_fixture(&scenario_image());
    let mut runner = SessionRunner::new(EditSession::default(), 1).unwrap();
    runner.run(Command::Open(source.path().to_path_buf())).unwrap();

    runner.submit(Command::Apply(Filter::contrast(20))).unwrap();
    assert!(matches!(runner.submit(Command::Apply(Filter::contrast(99))), Err(EditError::Busy)));
    runner.wait().unwrap().result.unwrap();

    assert_eq!(runner.session().descriptions(), vec!["Contrast Filter (20)".to_string()]);
}

#[test]
fn cli_pipeline_applies_steps_and_saves() {
    let source = png_fixture(&scenario_image());
    let out = TempFile::new("png");
    let settings = EditorSettings::default();
    let steps = [
        Step::Apply(Filter::color(128, 255, 0)),
        Step::DefaultContrast,
        Step::Undo,
        Step::Redo,
        Step::Undo,
    ];

    let chain = cli::run_one(
        source.path(),
        out.path(),
        &steps,
        SessionOptions::from(&settings),
        &settings,
    )
    .unwrap();

    assert_eq!(chain, vec!["Color Filter (128, 255, 0)".to_string()]);
    assert_eq!(read_back(out.path()).pixel(0, 0), Rgb([100, 100, 0]));
}

#[test]
fn cli_pipeline_reports_the_failing_step() {
    let source = png_fixture(&scenario_image());
    let out = TempFile::new("png");
    let settings = EditorSettings::default();

    let err = cli::run_one(
        source.path(),
        out.path(),
        &[Step::Redo],
        SessionOptions::from(&settings),
        &settings,
    )
    .unwrap_err();

    assert!(err.contains("redo"), "{}", err);
    assert!(!out.path().exists());
}

//! Integration tests: the run state machine and its terminal flush.

use std::io::{self, BufRead, Cursor, Read};
use std::path::Path;

use strata_amr::AmrConfig;
use strata_comm::{SerialComm, ThreadGroup};
use strata_core::RunError;
use strata_eb::EbConfig;
use strata_engine::{Driver, DriverPhase, RunParams, RunSummary};
use strata_plotfile::{read_checkpoint_header, read_plotfile, DatasetWriter, HeaderFormat, PlotfileWriter};
use strata_test_utils::fixtures::{amr_config, output_root, single_level, sphere};
use strata_test_utils::{MockBuilder, RecordingWriter};

fn steps(max_step: i64) -> RunParams {
    RunParams {
        max_step,
        ..RunParams::default()
    }
}

fn run<W: DatasetWriter>(
    config: AmrConfig,
    params: RunParams,
    builder: MockBuilder,
    writer: W,
) -> Result<RunSummary, RunError> {
    run_with_eb(config, params, &EbConfig::default(), builder, writer)
}

fn run_with_eb<W: DatasetWriter>(
    config: AmrConfig,
    params: RunParams,
    eb: &EbConfig,
    builder: MockBuilder,
    writer: W,
) -> Result<RunSummary, RunError> {
    let driver = Driver::new(params, config, eb, Box::new(builder), writer, &SerialComm)?;
    driver.run(&SerialComm, &mut io::empty())
}

/// Coarse step of every write under `root`, deduplicated in order.
fn written_steps(writer: &RecordingWriter, root: &str) -> Vec<i64> {
    let mut out: Vec<i64> = writer.writes_under(root).iter().map(|w| w.level_steps[0]).collect();
    out.dedup();
    out
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// ── Startup validation ───────────────────────────────────────────

#[test]
fn zero_steps_still_flush_one_checkpoint_and_one_plot() {
    let tmp = tempfile::tempdir().unwrap();
    let builder = MockBuilder::standard();
    let writer = RecordingWriter::new();
    let summary = run(amr_config(tmp.path()), steps(0), builder.clone(), writer.clone()).unwrap();

    assert_eq!(builder.advance_count(), 0);
    assert_eq!(summary.steps, 0);
    let plt = output_root(tmp.path(), "plt");
    let chk = output_root(tmp.path(), "chk");
    assert_eq!(writer.writes_under(&plt).len(), 1);
    assert_eq!(written_steps(&writer, &chk), vec![0]);
    // One dataset per state type.
    let chk_dirs: Vec<_> = writer.writes_under(&chk).into_iter().map(|w| w.dir).collect();
    assert_eq!(chk_dirs, vec![tmp.path().join("chk00000/State"), tmp.path().join("chk00000/Nodal")]);
    assert_eq!(summary.final_plot, Some(tmp.path().join("plt00000")));
    assert_eq!(summary.final_checkpoint, Some(tmp.path().join("chk00000")));

    let header = read_checkpoint_header(&tmp.path().join("chk00000")).unwrap();
    assert_eq!(header.state_types, ["State", "Nodal"]);
    assert_eq!(header.level_steps, vec![0, 0]);
}

#[test]
fn negative_start_time_aborts_before_the_hierarchy_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let builder = MockBuilder::standard();
    let params = RunParams {
        strt_time: -1.0,
        ..steps(5)
    };
    let err = run(amr_config(tmp.path()), params, builder, RecordingWriter::new()).unwrap_err();
    assert!(matches!(err, RunError::Usage { .. }));
    assert!(is_empty_dir(tmp.path()));
}

#[test]
fn unbounded_run_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let builder = MockBuilder::standard();
    let err = run(amr_config(tmp.path()), RunParams::default(), builder.clone(), RecordingWriter::new())
        .unwrap_err();
    assert!(matches!(err, RunError::Usage { .. }));
    assert_eq!(builder.advance_count(), 0);
    assert!(is_empty_dir(tmp.path()));
}

#[test]
fn unknown_geometry_is_unsupported() {
    let tmp = tempfile::tempdir().unwrap();
    let eb = EbConfig {
        geom_type: "torus".into(),
        ..EbConfig::default()
    };
    let err = run_with_eb(
        amr_config(tmp.path()),
        steps(1),
        &eb,
        MockBuilder::standard(),
        RecordingWriter::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Unsupported { .. }));
}

// ── Terminal flush ───────────────────────────────────────────────

#[test]
fn terminal_flush_covers_a_step_between_intervals() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_int: 2,
        check_int: 2,
        ..amr_config(tmp.path())
    };
    let writer = RecordingWriter::new();
    let summary = run(config, steps(3), MockBuilder::standard(), writer.clone()).unwrap();
    assert_eq!(summary.steps, 3);
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "plt")), vec![0, 2, 3]);
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "chk")), vec![0, 2, 3]);
    assert_eq!(summary.final_plot, Some(tmp.path().join("plt00003")));
}

#[test]
fn terminal_flush_does_not_repeat_scheduled_output() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_int: 2,
        check_int: 2,
        ..amr_config(tmp.path())
    };
    let writer = RecordingWriter::new();
    let summary = run(config, steps(4), MockBuilder::standard(), writer.clone()).unwrap();
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "plt")), vec![0, 2, 4]);
    assert_eq!(writer.writes_under(&output_root(tmp.path(), "plt")).len(), 3);
    assert_eq!(summary.final_checkpoint, Some(tmp.path().join("chk00004")));
}

#[test]
fn small_plots_follow_their_own_interval() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        small_plot_int: 1,
        small_plot_vars: vec!["temp".into()],
        ..single_level(tmp.path())
    };
    let writer = RecordingWriter::new();
    run(config, steps(2), MockBuilder::standard(), writer.clone()).unwrap();
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "smallplt")), vec![0, 1, 2]);
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "plt")), vec![2]);
}

#[test]
fn disabled_output_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_files_output: false,
        checkpoint_files_output: false,
        plot_int: 1,
        check_int: 1,
        ..amr_config(tmp.path())
    };
    let writer = RecordingWriter::new();
    let summary = run(config, steps(2), MockBuilder::standard(), writer.clone()).unwrap();
    assert!(writer.writes().is_empty());
    assert_eq!(summary.final_plot, None);
    assert_eq!(summary.final_checkpoint, None);
}

// ── Stop conditions ──────────────────────────────────────────────

#[test]
fn stop_time_truncates_the_last_step() {
    let tmp = tempfile::tempdir().unwrap();
    let params = RunParams {
        stop_time: 0.3125,
        ..RunParams::default()
    };
    let builder = MockBuilder::standard().with_dt(0.125);
    let summary = run(amr_config(tmp.path()), params, builder, RecordingWriter::new()).unwrap();
    assert_eq!(summary.steps, 3);
    assert_eq!(summary.final_time, 0.3125);
}

#[test]
fn physics_can_end_the_loop_early() {
    let tmp = tempfile::tempdir().unwrap();
    let builder = MockBuilder::standard().stopping_after(2);
    let writer = RecordingWriter::new();
    let summary = run(single_level(tmp.path()), steps(10), builder, writer.clone()).unwrap();
    assert_eq!(summary.steps, 2);
    assert_eq!(written_steps(&writer, &output_root(tmp.path(), "plt")), vec![2]);
}

#[test]
fn finer_levels_subcycle() {
    let tmp = tempfile::tempdir().unwrap();
    let builder = MockBuilder::standard();
    let summary = run(amr_config(tmp.path()), steps(2), builder.clone(), RecordingWriter::new()).unwrap();
    assert_eq!(summary.steps, 2);
    // One coarse advance plus two fine advances per step.
    assert_eq!(builder.advance_count(), 6);
}

#[test]
fn collaborator_failure_aborts_without_terminal_output() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = RecordingWriter::new();
    let builder = MockBuilder::standard().failing_on(2);
    let err = run(single_level(tmp.path()), steps(5), builder, writer.clone()).unwrap_err();
    assert!(matches!(err, RunError::Collaborator { .. }), "{err:?}");
    assert!(writer.writes().is_empty());
    assert!(is_empty_dir(tmp.path()));
}

// ── Embedded boundary ────────────────────────────────────────────

#[test]
fn cut_cell_runs_mark_every_plot() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_int: 1,
        ..amr_config(tmp.path())
    };
    let writer = RecordingWriter::new();
    run_with_eb(config, steps(2), &sphere(), MockBuilder::standard(), writer.clone()).unwrap();

    let plots = writer.writes_under(&output_root(tmp.path(), "plt"));
    assert_eq!(plots.len(), 3);
    assert!(plots.iter().all(|w| w.cut_cell_variant));
    assert!(plots.iter().all(|w| w.var_names.last().map(String::as_str) == Some("vfrac")));
    let checkpoints = writer.writes_under(&output_root(tmp.path(), "chk"));
    assert!(!checkpoints.is_empty());
    assert!(checkpoints.iter().all(|w| !w.cut_cell_variant));
}

#[test]
fn regular_runs_never_mark_a_plot() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_int: 1,
        ..amr_config(tmp.path())
    };
    let writer = RecordingWriter::new();
    run(config, steps(2), MockBuilder::standard(), writer.clone()).unwrap();
    let plots = writer.writes_under(&output_root(tmp.path(), "plt"));
    assert_eq!(plots.len(), 3);
    assert!(plots.iter().all(|w| !w.cut_cell_variant));
}

// ── Restart ──────────────────────────────────────────────────────

fn restarted(root: &Path, chk: &str, regrid_on_restart: bool) -> AmrConfig {
    AmrConfig {
        restart: Some(root.join(chk).display().to_string()),
        regrid_on_restart,
        ..amr_config(root)
    }
}

#[test]
fn restart_resumes_the_step_counter() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = PlotfileWriter::new(HeaderFormat::Native);
    run(amr_config(tmp.path()), steps(2), MockBuilder::standard(), writer).unwrap();

    let builder = MockBuilder::standard();
    let summary = run(
        restarted(tmp.path(), "chk00002", false),
        steps(4),
        builder.clone(),
        writer,
    )
    .unwrap();
    assert_eq!(summary.steps, 4);
    assert_eq!(builder.advance_count(), 6);
    assert_eq!(summary.final_checkpoint, Some(tmp.path().join("chk00004")));
    let plot = read_plotfile(&tmp.path().join("plt00004")).unwrap();
    assert_eq!(plot.header.level_steps, vec![4, 8]);
}

#[test]
fn finished_restart_regrids_without_stepping() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = PlotfileWriter::new(HeaderFormat::Native);
    run(amr_config(tmp.path()), steps(2), MockBuilder::standard(), writer).unwrap();

    let builder = MockBuilder::standard();
    let mut driver = Driver::new(
        steps(2),
        restarted(tmp.path(), "chk00002", true),
        &EbConfig::default(),
        Box::new(builder.clone()),
        writer,
        &SerialComm,
    )
    .unwrap();
    assert_eq!(driver.phase(), DriverPhase::Init);
    driver.init(&SerialComm).unwrap();
    assert!(driver.regrid_only_due());
    assert_eq!(driver.phase(), DriverPhase::Running);
    driver.advance(&SerialComm).unwrap();
    let summary = driver.finish(&SerialComm).unwrap();

    assert_eq!(builder.advance_count(), 0);
    // Two levels restored, then one regrid pass over level 1.
    assert_eq!(builder.build_count(), 3);
    assert_eq!(builder.init_count(), 3);
    assert_eq!(summary.steps, 2);
    // The restart checkpoint already holds this state.
    assert_eq!(summary.final_checkpoint, Some(tmp.path().join("chk00002")));
    assert_eq!(summary.final_plot, Some(tmp.path().join("plt00002")));
}

#[test]
fn regrid_on_restart_waits_for_a_finished_state() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = PlotfileWriter::new(HeaderFormat::Native);
    run(amr_config(tmp.path()), steps(1), MockBuilder::standard(), writer).unwrap();
    let mut driver = Driver::new(
        steps(3),
        restarted(tmp.path(), "chk00001", true),
        &EbConfig::default(),
        Box::new(MockBuilder::standard()),
        writer,
        &SerialComm,
    )
    .unwrap();
    driver.init(&SerialComm).unwrap();
    assert!(!driver.regrid_only_due());
}

// ── Process group ────────────────────────────────────────────────

#[test]
fn pause_for_debug_reads_one_line() {
    let tmp = tempfile::tempdir().unwrap();
    let params = RunParams {
        pause_for_debug: true,
        ..steps(1)
    };
    let driver = Driver::new(
        params,
        single_level(tmp.path()),
        &EbConfig::default(),
        Box::new(MockBuilder::standard()),
        RecordingWriter::new(),
        &SerialComm,
    )
    .unwrap();
    let mut input = Cursor::new("\n");
    let summary = driver.run(&SerialComm, &mut input).unwrap();
    assert_eq!(input.position(), 1);
    assert_eq!(summary.steps, 1);
}

/// Input that records how many levels existed when it was first read.
struct WatchedInput {
    inner: Cursor<&'static str>,
    builder: MockBuilder,
    builds_at_read: Option<usize>,
}

impl Read for WatchedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for WatchedInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.builds_at_read.is_none() {
            self.builds_at_read = Some(self.builder.build_count());
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}

#[test]
fn pause_comes_before_the_hierarchy_is_built() {
    let tmp = tempfile::tempdir().unwrap();
    let params = RunParams {
        pause_for_debug: true,
        ..steps(1)
    };
    let builder = MockBuilder::standard();
    let writer = RecordingWriter::new();
    let driver = Driver::new(
        params,
        amr_config(tmp.path()),
        &EbConfig::default(),
        Box::new(builder.clone()),
        writer.clone(),
        &SerialComm,
    )
    .unwrap();
    let mut input = WatchedInput {
        inner: Cursor::new("go\n"),
        builder: builder.clone(),
        builds_at_read: None,
    };
    driver.run(&SerialComm, &mut input).unwrap();
    assert_eq!(input.builds_at_read, Some(0));
    assert!(builder.build_count() > 0);
    assert!(!writer.writes().is_empty());
}

#[test]
fn ranks_agree_and_share_one_dataset() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AmrConfig {
        plot_int: 1,
        ..amr_config(tmp.path())
    };
    let results = ThreadGroup::run(3, |comm| {
        let driver = Driver::new(
            steps(2),
            config.clone(),
            &EbConfig::default(),
            Box::new(MockBuilder::standard()),
            PlotfileWriter::new(HeaderFormat::Native),
            &comm,
        )?;
        driver.run(&comm, &mut io::empty())
    })
    .unwrap();

    let summaries: Vec<RunSummary> = results.into_iter().map(Result::unwrap).collect();
    assert!(summaries.iter().all(|s| s.steps == 2 && s.final_plot == summaries[0].final_plot));
    assert!(summaries.iter().all(|s| s.timings == summaries[0].timings));
    let plot = read_plotfile(&tmp.path().join("plt00002")).unwrap();
    assert_eq!(plot.levels.len(), 2);
    // 8³ cells in 4³ boxes, spread over three ranks.
    assert_eq!(plot.levels[0].fabs.len(), 8);
}

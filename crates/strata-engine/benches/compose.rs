//! Criterion benchmarks for plot composition over a two-level hierarchy.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_amr::{AmrConfig, AmrHierarchy};
use strata_comm::{Communicator, SerialComm};
use strata_core::PlotKind;
use strata_engine::{ComposerConfig, OutputManager, PlotComposer};
use strata_plotfile::{DatasetWriter, HeaderFormat, PlotRequest, PlotfileError, PlotfileWriter, WriteSummary};
use strata_test_utils::fixtures::amr_config;
use strata_test_utils::{MockBuilder, RecordingWriter};

/// Accepts every request without touching the filesystem.
struct DiscardWriter;

impl DatasetWriter for DiscardWriter {
    fn write(&self, request: &PlotRequest<'_>, _comm: &dyn Communicator) -> Result<WriteSummary, PlotfileError> {
        request.validate()?;
        Ok(WriteSummary {
            dir: request.dir.to_path_buf(),
            var_names: request.var_names.to_vec(),
            nlevels: request.levels.len(),
            cut_cell_variant: false,
            bytes_written: 0,
        })
    }
}

/// A 16³ coarse domain in 8³ boxes, refined once, with every variable
/// selected for both plot kinds.
fn hierarchy(root: &std::path::Path) -> (AmrConfig, AmrHierarchy) {
    let config = AmrConfig {
        n_cell: [16; 3],
        max_grid_size: 8,
        small_plot_vars: vec!["ALL".into()],
        derive_plot_vars: vec!["ALL".into()],
        ..amr_config(root)
    };
    let mut hier = AmrHierarchy::new(config.clone(), Box::new(MockBuilder::standard()), 0, 1).unwrap();
    let mut sink = OutputManager::new(&config, RecordingWriter::new());
    hier.init(0.0, -1.0, &mut sink, &SerialComm).unwrap();
    (config, hier)
}

fn bench_compose_small(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let (config, hier) = hierarchy(tmp.path());
    let mut composer = PlotComposer::new(ComposerConfig::from_amr(&config));

    c.bench_function("compose_small_discard", |b| {
        b.iter(|| {
            let dir = composer
                .compose(PlotKind::Small, &hier, &DiscardWriter, &SerialComm)
                .unwrap();
            black_box(dir);
        });
    });
}

fn bench_compose_full_native(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let (config, hier) = hierarchy(tmp.path());
    let mut composer = PlotComposer::new(ComposerConfig::from_amr(&config));
    let writer = PlotfileWriter::new(HeaderFormat::Native);

    c.bench_function("compose_full_native", |b| {
        b.iter(|| {
            let dir = composer
                .compose(PlotKind::Full, &hier, &writer, &SerialComm)
                .unwrap();
            black_box(dir);
        });
    });
}

criterion_group!(benches, bench_compose_small, bench_compose_full_native);
criterion_main!(benches);

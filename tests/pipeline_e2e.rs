use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use simdispatch::backend::{EntryPoints, PropensitySource};
use simdispatch::{
    config, resolve, BackendError, DenseMatrix, DispatchError, DispatchSettings, Field, FnBackend,
    MemorySink, Overrides, Pipeline, SimulationConfig, SparseMatrix, Value,
};

/// Two species diffusing over four cells with one reaction `A -> B`.
fn model() -> SimulationConfig {
    let (species, cells) = (2, 4);
    let dofs = species * cells;
    let mut diffusion = Vec::new();
    for i in 0..dofs {
        diffusion.push((i, i, -0.5));
        if i + species < dofs {
            diffusion.push((i + species, i, 0.5));
        }
    }
    let overrides = Overrides::new()
        .set(Field::Propensities, "mymodel")
        .set(Field::Tspan, vec![0.0, 1.0, 2.0, 3.0])
        .set(Field::U0, DenseMatrix::from_column_major(species, cells, vec![4.0; dofs]).unwrap())
        .set(Field::Diffusion, SparseMatrix::from_triplets(dofs, dofs, &diffusion).unwrap())
        .set(
            Field::Stoich,
            SparseMatrix::from_triplets(species, 1, &[(0, 0, -1.0), (1, 0, 1.0)]).unwrap(),
        )
        .set(Field::DepGraph, SparseMatrix::from_triplets(1, 3, &[(0, 0, 1.0)]).unwrap())
        .set(Field::Vol, vec![1.0; cells])
        .set(Field::Sd, vec![1.0; cells]);
    resolve(None, &overrides).unwrap()
}

struct Harness {
    pipeline: Pipeline,
    sink: MemorySink,
    builds: Arc<AtomicUsize>,
    runs: Arc<AtomicUsize>,
    sources: Arc<std::sync::Mutex<Vec<String>>>,
}

fn harness() -> Harness {
    let sink = MemorySink::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));
    let sources = Arc::new(std::sync::Mutex::new(Vec::new()));

    let (b, r, s) = (Arc::clone(&builds), Arc::clone(&runs), Arc::clone(&sources));
    let backend = FnBackend::new(move |input| {
        r.fetch_add(1, Ordering::SeqCst);
        Ok(DenseMatrix::zeros(input.u0.data.len(), input.tspan.len()))
    })
    .with_build(move |source| {
        b.fetch_add(1, Ordering::SeqCst);
        s.lock().unwrap().push(source.to_string());
        Ok(())
    });

    let pipeline = Pipeline::builder().backend("nsm", backend).sink(sink.clone()).build();
    Harness {
        pipeline,
        sink,
        builds,
        runs,
        sources,
    }
}

#[test]
fn first_use_resolves_validates_builds_and_runs() {
    let h = harness();
    let prior = SimulationConfig::new()
        .with(Field::Tspan, vec![0.0, 1.0])
        .with(Field::U0, DenseMatrix::zeros(2, 4));
    let overrides: Overrides = {
        let full = model();
        let mut o = Overrides::new().set(Field::Report, 1);
        for field in [Field::Propensities, Field::Diffusion, Field::Stoich, Field::DepGraph, Field::Vol, Field::Sd] {
            o.insert(field, full.get(field).cloned().unwrap());
        }
        o
    };

    let out = h.pipeline.run(prior, overrides).unwrap();

    assert!(out.is_complete());
    assert_eq!(out.trajectory().unwrap().shape(), "8x2");
    assert_eq!(h.builds.load(Ordering::SeqCst), 1);
    assert_eq!(*h.sources.lock().unwrap(), vec!["mymodel.c".to_string()]);
    assert_eq!(
        h.sink.lines(),
        vec!["Parsing...", "Compiling mymodel.c with build_nsm..."]
    );
}

#[test]
fn fast_path_skips_resolution_and_parsing_message() {
    let h = harness();
    let mut prior = model().with(Field::Parse, false).with(Field::Report, 3);
    // A record that resolution would complete.
    prior.remove(Field::Vis);

    let out = h.pipeline.run(prior.clone(), Overrides::new()).unwrap();

    assert!(!out.contains(Field::Vis));
    for (name, value) in prior.iter().filter(|(name, _)| *name != "trajectory") {
        assert_eq!(out.get_named(name), Some(value), "field {name}");
    }
    assert!(!h.sink.contains("Parsing..."));
    assert!(h.sink.contains("Parsing turned off."));
}

#[test]
fn both_toggles_off_runs_only_the_solver() {
    let h = harness();
    let prior = model()
        .with(Field::Compile, false)
        .with(Field::Parse, false)
        .with(Field::Report, 1);

    let out = h.pipeline.run(prior, Overrides::new()).unwrap();

    assert!(out.trajectory().is_some());
    assert_eq!(h.builds.load(Ordering::SeqCst), 0);
    assert_eq!(h.runs.load(Ordering::SeqCst), 1);
    let lines = h.sink.lines();
    assert!(lines.iter().any(|l| l == "Compilation turned off."));
    assert!(lines.iter().any(|l| l == "Parsing turned off."));
    assert!(!h.sink.contains("Elapsed time"));
    assert!(!h.sink.contains("Compiling"));
}

#[test]
fn absent_report_resolves_to_zero_and_stays_silent() {
    let h = harness();
    let mut prior = model();
    prior.remove(Field::Report);

    let out = h.pipeline.run(prior, Overrides::new()).unwrap();

    assert_eq!(out.get(Field::Report), Some(&Value::Int(0)));
    assert!(h.sink.lines().is_empty());
}

#[test]
fn timing_line_appears_at_level_two() {
    let h = harness();
    let summary = h
        .pipeline
        .execute(model(), &Overrides::new().set(Field::Report, 2))
        .unwrap();

    assert!(summary.elapsed.is_some());
    assert!(h.sink.lines().last().unwrap().starts_with("Elapsed time: "));
}

#[test]
fn rerun_with_toggles_off_replaces_trajectory() {
    let h = harness();
    let first = h.pipeline.run(model(), Overrides::new()).unwrap();
    assert_eq!(h.builds.load(Ordering::SeqCst), 1);

    let again = first.with(Field::Parse, false).with(Field::Compile, false);
    let second = h.pipeline.run(again, Overrides::new()).unwrap();

    assert_eq!(h.builds.load(Ordering::SeqCst), 1);
    assert_eq!(h.runs.load(Ordering::SeqCst), 2);
    assert!(second.trajectory().is_some());
}

#[test]
fn unregistered_solver_fails_without_building() {
    let h = harness();
    let err = h
        .pipeline
        .run(model(), Overrides::new().set(Field::Solver, "dfsp"))
        .unwrap_err();

    assert!(err.to_string().contains("run_dfsp"));
    assert!(matches!(
        err,
        DispatchError::Backend(BackendError::BackendNotFound { ref solver, .. }) if solver == "dfsp"
    ));
    assert_eq!(h.builds.load(Ordering::SeqCst), 0);
    assert_eq!(h.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn build_failure_stops_before_the_run_step() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let failing = FnBackend::new(move |input| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(DenseMatrix::zeros(input.u0.data.len(), input.tspan.len()))
    })
    .with_build(|source| Err(format!("{source}: syntax error").into()));
    let pipeline = Pipeline::builder()
        .backend("nsm", failing)
        .sink(MemorySink::new())
        .build();

    let err = pipeline.run(model(), Overrides::new()).unwrap_err();
    assert!(matches!(err, DispatchError::Backend(BackendError::BuildFailure { .. })));
    assert!(err.to_string().contains("mymodel.c: syntax error"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn validation_failure_names_the_field() {
    let h = harness();
    let err = h
        .pipeline
        .run(model(), Overrides::new().set(Field::Tspan, vec![2.0, 1.0]))
        .unwrap_err();

    let DispatchError::Validation(inner) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(inner.field(), "tspan");
    assert_eq!(h.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn naming_follows_dispatch_settings() {
    let defaults = EntryPoints::for_solver("nsm", &DispatchSettings::default());
    assert_eq!((defaults.build.as_str(), defaults.run.as_str()), ("build_nsm", "run_nsm"));

    assert_eq!(PropensitySource::new("mymodel", ".c").as_str(), "mymodel.c");
    assert_eq!(PropensitySource::new("mymodel.c", ".c").as_str(), "mymodel.c");
    assert_eq!(PropensitySource::new("mymodel.so", ".c").as_str(), "mymodel.so");
}

#[test]
fn configuration_survives_a_file_roundtrip_between_runs() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let out = h.pipeline.run(model(), Overrides::new()).unwrap();
    config::save(&path, &out).unwrap();

    let reloaded = config::load(&path).unwrap();
    assert_eq!(reloaded.trajectory(), out.trajectory());

    let again = h
        .pipeline
        .run(reloaded, Overrides::new().set(Field::Parse, false).set(Field::Compile, false))
        .unwrap();
    assert!(again.trajectory().is_some());
}

#[cfg(unix)]
#[test]
fn process_backend_exchanges_json_with_solver() {
    use simdispatch::ProcessBackend;

    let dir = tempfile::tempdir().unwrap();
    let solver = dir.path().join("solver.sh");
    std::fs::write(
        &solver,
        "echo '{\"rows\":2,\"cols\":2,\"data\":[1,2,3,4]}' > \"$2\"\n",
    )
    .unwrap();

    let pipeline = Pipeline::builder()
        .backend("ssa", ProcessBackend::new("sh").with_args([solver.as_os_str()]))
        .sink(MemorySink::new())
        .build();

    let out = pipeline
        .run(
            model(),
            Overrides::new().set(Field::Solver, "ssa").set(Field::Compile, false),
        )
        .unwrap();
    assert_eq!(out.trajectory().unwrap().data, vec![1.0, 2.0, 3.0, 4.0]);
}

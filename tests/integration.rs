//! End-to-end integration tests for triplewalk.
//!
//! These tests drive the public API from an RDF file on disk through entity
//! selection, parallel sampling and the gzip walk writer, then read the walk
//! files back.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use triplewalk::config::WalkConfig;
use triplewalk::engine::WalkEngine;
use triplewalk::graph::index::TripleStore;
use triplewalk::pool::{read_walk_file, PoolConfig, WalkPool, WalkWriter};
use triplewalk::select::{ContinuationSelector, EntitySelector, FullSelector, SubsetSelector};
use triplewalk::walk::{SamplerConfig, WalkMode, WalkSampler};

const GRAPH: &str = r#"<http://ex.org/A> <http://ex.org/P1> <http://ex.org/B> .
<http://ex.org/B> <http://ex.org/P2> <http://ex.org/C> .
<http://ex.org/B> <http://ex.org/P3> <http://ex.org/D> .
<http://ex.org/D> <http://ex.org/P4> <http://ex.org/E> .
<http://ex.org/E> <http://ex.org/name> "Entity E" .
"#;

fn write_graph(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("graph.nt");
    std::fs::write(&path, GRAPH).unwrap();
    path
}

fn base_config(dir: &Path) -> WalkConfig {
    WalkConfig {
        threads: 4,
        walks_per_entity: 20,
        depth: 3,
        output_path: dir.join("walks").join("walk_file_0.txt.gz"),
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn rdf_file_to_walk_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());
    let mut config = base_config(dir.path());
    config.prefixes.insert("ex".into(), "http://ex.org/".into());

    let engine = WalkEngine::from_rdf(config, &[graph]).unwrap();
    assert_eq!(engine.store().len(), 4);

    let summary = engine.run().unwrap();
    assert_eq!(summary.selected, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);

    let walks: BTreeSet<String> = read_walk_file(&engine.config().output_path)
        .unwrap()
        .into_iter()
        .collect();
    let expected: BTreeSet<String> = [
        "ex:A ex:P1 ex:B ex:P2 ex:C",
        "ex:A ex:P1 ex:B ex:P3 ex:D ex:P4 ex:E",
        "ex:B ex:P2 ex:C",
        "ex:B ex:P3 ex:D ex:P4 ex:E",
        "ex:D ex:P4 ex:E",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(walks, expected);
    assert_eq!(summary.walks_written, 5);
}

#[test]
fn literals_can_be_kept() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());
    let config = WalkConfig {
        include_literals: true,
        ..base_config(dir.path())
    };

    let engine = WalkEngine::from_rdf(config, &[graph]).unwrap();
    assert_eq!(engine.store().len(), 5);
    assert!(engine
        .store()
        .contains("http://ex.org/E", "http://ex.org/name", "Entity_E"));
}

#[test]
fn walk_modes_respect_depth() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());

    for mode in WalkMode::ALL {
        let config = WalkConfig {
            mode,
            depth: 2,
            output_path: dir.path().join(format!("{mode}.txt")),
            compress: false,
            ..base_config(dir.path())
        };
        let engine = WalkEngine::from_rdf(config, &[graph.clone()]).unwrap();
        engine.run().unwrap();

        let walks = read_walk_file(&engine.config().output_path).unwrap();
        assert!(!walks.is_empty(), "{mode} wrote nothing");
        for walk in walks {
            let tokens = walk.split(' ').count();
            assert!(tokens % 2 == 1 && tokens <= 5, "{mode}: {walk}");
        }
    }
}

#[test]
fn second_run_resumes_first() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());
    let walks_dir = dir.path().join("walks");

    // First run only covers A.
    let entity_file = dir.path().join("entities.txt");
    std::fs::write(&entity_file, "http://ex.org/A\n\n").unwrap();
    let first = WalkConfig {
        entity_file: Some(entity_file),
        ..base_config(dir.path())
    };
    let summary = WalkEngine::from_rdf(first, &[graph.clone()])
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(summary.selected, 1);

    let second = WalkConfig {
        resume_dir: Some(walks_dir.clone()),
        ..base_config(dir.path())
    };
    let summary = WalkEngine::from_rdf(second, &[graph]).unwrap().run().unwrap();
    assert_eq!(summary.selected, 2);

    let mut files: Vec<_> = std::fs::read_dir(&walks_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "walk_file_0.txt.gz",
            "walk_file_0.txt.gz.entities",
            "walk_file_0_1.txt.gz",
            "walk_file_0_1.txt.gz.entities",
        ]
    );

    let resumed = read_walk_file(&walks_dir.join("walk_file_0_1.txt.gz")).unwrap();
    assert!(resumed.iter().all(|w| !w.starts_with("http://ex.org/A ")));
}

fn first_run_over(dir: &Path, graph: &Path, entity: &str, config: WalkConfig) {
    let entity_file = dir.join("entities.txt");
    std::fs::write(&entity_file, format!("{entity}\n")).unwrap();
    let first = WalkConfig {
        entity_file: Some(entity_file),
        ..config
    };
    let summary = WalkEngine::from_rdf(first, &[graph.to_path_buf()])
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(summary.selected, 1);
}

#[test]
fn resume_with_shortened_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());
    let walks_dir = dir.path().join("walks");
    let mut config = base_config(dir.path());
    config.prefixes.insert("ex".into(), "http://ex.org/".into());

    first_run_over(dir.path(), &graph, "http://ex.org/A", config.clone());
    let first = read_walk_file(&walks_dir.join("walk_file_0.txt.gz")).unwrap();
    assert!(first.iter().all(|w| w.starts_with("ex:A ")));

    let second = WalkConfig {
        resume_dir: Some(walks_dir.clone()),
        ..config
    };
    let engine = WalkEngine::from_rdf(second, &[graph]).unwrap();
    let remaining: Vec<String> = engine
        .selector()
        .unwrap()
        .entities()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(remaining, vec!["http://ex.org/B", "http://ex.org/D"]);

    let summary = engine.run().unwrap();
    assert_eq!(summary.selected, 2);
    let resumed = read_walk_file(&walks_dir.join("walk_file_0_1.txt.gz")).unwrap();
    assert!(!resumed.is_empty());
    assert!(resumed.iter().all(|w| !w.starts_with("ex:A ")));
}

#[test]
fn resume_in_mid_mode() {
    let dir = tempfile::TempDir::new().unwrap();
    let graph = write_graph(dir.path());
    let walks_dir = dir.path().join("walks");
    let config = WalkConfig {
        mode: WalkMode::Mid,
        ..base_config(dir.path())
    };

    // C is a pure object, so none of its mid walks start with C.
    first_run_over(dir.path(), &graph, "http://ex.org/C", config.clone());
    let first = read_walk_file(&walks_dir.join("walk_file_0.txt.gz")).unwrap();
    assert!(!first.is_empty());
    assert!(first.iter().all(|w| !w.starts_with("http://ex.org/C")));

    let second = WalkConfig {
        resume_dir: Some(walks_dir),
        ..config
    };
    let engine = WalkEngine::from_rdf(second, &[graph]).unwrap();
    let remaining: Vec<String> = engine
        .selector()
        .unwrap()
        .entities()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(
        remaining,
        vec![
            "http://ex.org/A",
            "http://ex.org/B",
            "http://ex.org/D",
            "http://ex.org/E",
        ]
    );
    assert_eq!(engine.run().unwrap().selected, 4);
}

#[test]
fn duplicate_free_walk_set_is_thread_independent() {
    let store = TripleStore::new();
    store.add("A", "P1", "B");
    store.add("B", "P2", "C");
    store.add("B", "P3", "D");
    store.add("C", "P4", "A");
    let store = Arc::new(store);

    let sampler = WalkSampler::new(
        Arc::clone(&store),
        SamplerConfig {
            mode: WalkMode::RandomDuplicateFree,
            walks_per_entity: 50,
            depth: 3,
        },
    );
    let entities = FullSelector::new(Arc::clone(&store)).entities();
    let dir = tempfile::TempDir::new().unwrap();

    let mut sets = Vec::new();
    for threads in [1, 8] {
        let path = dir.path().join(format!("walks_{threads}.txt.gz"));
        let pool = WalkPool::new(PoolConfig {
            threads,
            ..Default::default()
        });
        pool.run(&sampler, &entities, WalkWriter::create(&path, true).unwrap())
            .unwrap();
        let set: BTreeSet<String> = read_walk_file(&path).unwrap().into_iter().collect();
        sets.push(set);
    }
    assert_eq!(sets[0], sets[1]);
    assert!(sets[0].contains("A P1 B P2 C P4 A"));
}

#[test]
fn continuation_selector_over_walk_directory() {
    let dir = tempfile::TempDir::new().unwrap();
    let writer = WalkWriter::create(&dir.path().join("walk_file_0.txt.gz"), true).unwrap();
    writer.write_entity("A", &["A P1 B P2 C".to_string()]).unwrap();
    writer.close().unwrap();

    let selector = ContinuationSelector::from_walk_dir(SubsetSelector::new(["A", "B"]), dir.path());
    let remaining: Vec<String> = selector.entities().iter().map(|e| e.to_string()).collect();
    assert_eq!(remaining, vec!["B"]);
}

#[test]
fn unknown_input_format_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("graph.csv");
    std::fs::write(&path, "a,b,c\n").unwrap();

    let err = WalkEngine::from_rdf(WalkConfig::default(), &[path]).unwrap_err();
    assert!(err.to_string().contains("unrecognized RDF format"));
}

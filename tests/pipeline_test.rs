//! Integration tests for the full dashboard pipeline.
//!
//! Tests the complete flow: extract → load → filter → aggregate → export.

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use lube_dash::archive::extract_archive;
use lube_dash::data::aggregate::{compute_indicators, summarize};
use lube_dash::data::cache::{write_snapshot, SnapshotCache};
use lube_dash::data::export::export_to_bytes;
use lube_dash::data::filter::{apply_filters, FilterCriteria, FilteredView};
use lube_dash::data::format::{TextEncoding, TextFormat};
use lube_dash::data::loader::{load_from_reader, load_table, LoadOptions};
use lube_dash::data::model::{Dimension, Value};
use lube_dash::{DashboardConfig, Error, Session};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MEMBER: &str = "Lubrificante_Anexo_A.csv";

const SCENARIO: &str = "Ano;Mês;Descrição do Produto;UF de Origem;UF do Destinatário;Região do Destinatário;Volume(L)\n\
    2022;1;OIL-A;SP;SOUTH;SUL;100\n\
    2022;1;OIL-B;SP;SOUTH;SUL;50\n\
    2023;1;OIL-A;RJ;NORTH;NORTE;30\n";

fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn latin1(text: &str) -> Vec<u8> {
    TextEncoding::Latin1.encode(text).unwrap()
}

/// Every regular file under `root` with its contents, sorted by path.
fn snapshot_dir(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    out.sort();
    out
}

#[test]
fn test_full_pipeline() {
    let temp = tempdir().unwrap();
    let csv = latin1(SCENARIO);
    let bytes = build_archive(&[("LEIAME.txt", &b"dados abertos"[..]), (MEMBER, csv.as_slice())]);

    // Extract
    let mut progress = Vec::new();
    let extraction = extract_archive(Cursor::new(bytes), temp.path().join("out"), |p| {
        progress.push(p)
    })
    .unwrap();
    assert_eq!(progress, vec![0.5, 1.0]);
    let member = extraction.member(MEMBER).unwrap();

    // Load
    let table = load_table(&member, &LoadOptions::default()).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.headers()[1], "Mês");

    // Filter + aggregate
    let criteria = FilterCriteria::new().with(Dimension::Year, [Value::Integer(2022)]);
    let view = apply_filters(&table, &criteria);
    assert_eq!(view.rows(), &[0, 1]);
    let summary = summarize(&view).unwrap();
    assert_eq!(summary.indicators.total_volume, 150.0);
    assert_eq!(
        summary.indicators.top_product.as_ref().map(|t| t.label.clone()),
        Some(Value::text("OIL-A"))
    );
    assert_eq!(summary.regional_shares.len(), 1);
    assert_eq!(summary.regional_shares[0].share, 1.0);

    // Export, then load the export back
    let exported = export_to_bytes(&view, &TextFormat::default()).unwrap();
    let reloaded = load_from_reader(exported.as_slice(), &LoadOptions::default(), |_| {}).unwrap();
    assert_eq!(reloaded, view.to_table());
}

#[test]
fn test_example_scenario() {
    let table = load_from_reader(latin1(SCENARIO).as_slice(), &LoadOptions::default(), |_| {})
        .unwrap();

    let view = apply_filters(
        &table,
        &FilterCriteria::new().with(Dimension::Year, [Value::Integer(2022)]),
    );
    let indicators = compute_indicators(&view);
    assert_eq!(indicators.rows, 2);
    assert_eq!(indicators.total_volume, 150.0);
    let top = indicators.top_product.unwrap();
    assert_eq!(top.label, Value::text("OIL-A"));
    assert_eq!(top.volume, 100.0);

    let empty = apply_filters(
        &table,
        &FilterCriteria::new().with(Dimension::Year, [Value::Integer(2024)]),
    );
    let indicators = compute_indicators(&empty);
    assert_eq!(indicators.rows, 0);
    assert_eq!(indicators.total_volume, 0.0);
    assert!(indicators.top_product.is_none());
    assert!(summarize(&empty).is_none());
}

#[test]
fn test_unfiltered_round_trip() {
    let table = load_from_reader(latin1(SCENARIO).as_slice(), &LoadOptions::default(), |_| {})
        .unwrap();
    let exported = export_to_bytes(&FilteredView::all(&table), &TextFormat::default()).unwrap();
    assert_eq!(exported, latin1(SCENARIO));
    let reloaded = load_from_reader(exported.as_slice(), &LoadOptions::default(), |_| {}).unwrap();
    assert_eq!(reloaded, table);
}

#[test]
fn test_extraction_is_deterministic() {
    let temp = tempdir().unwrap();
    let csv = latin1(SCENARIO);
    let bytes = build_archive(&[
        ("docs/LEIAME.txt", &b"leia-me"[..]),
        (MEMBER, csv.as_slice()),
        ("docs/notas/1.txt", &b"nota"[..]),
    ]);

    let first = extract_archive(Cursor::new(bytes.clone()), temp.path().join("a"), |_| {}).unwrap();
    let second = extract_archive(Cursor::new(bytes), temp.path().join("b"), |_| {}).unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(
        snapshot_dir(&temp.path().join("a")),
        snapshot_dir(&temp.path().join("b"))
    );
    assert_eq!(snapshot_dir(&temp.path().join("a")).len(), 3);
}

#[test]
fn test_session_recovers_after_failed_upload() {
    let temp = tempdir().unwrap();
    let broken = temp.path().join("broken.zip");
    fs::write(&broken, b"PK\x03\x04 not really a zip").unwrap();
    let good = temp.path().join("good.zip");
    File::create(&good)
        .unwrap()
        .write_all(&build_archive(&[(MEMBER, latin1(SCENARIO).as_slice())]))
        .unwrap();

    let mut session = Session::new(DashboardConfig {
        extract_dir: temp.path().join("extracted"),
        cache_snapshots: false,
        ..DashboardConfig::default()
    });

    let err = session.ingest_archive(&broken).unwrap_err();
    assert!(matches!(err, Error::Archive(_)), "{err}");
    assert!(session.table().is_none());

    session.ingest_archive(&good).unwrap();
    assert_eq!(session.visible_rows(), &[0, 1, 2]);
    let summary = session.summary().unwrap();
    assert_eq!(summary.indicators.total_volume, 180.0);
}

#[test]
fn test_repeat_upload_is_served_from_snapshot() {
    let temp = tempdir().unwrap();
    let archive = temp.path().join("lub.zip");
    fs::write(&archive, build_archive(&[(MEMBER, latin1(SCENARIO).as_slice())])).unwrap();

    let config = DashboardConfig {
        extract_dir: temp.path().join("extracted"),
        ..DashboardConfig::default()
    };
    let cache = SnapshotCache::new(config.snapshot_dir());
    let member = config.extract_dir.join(MEMBER);

    let mut session = Session::new(config.clone());
    session.ingest_archive(&archive).unwrap();
    let parsed = session.table().unwrap().clone();
    let snapshots = cache.snapshots_of(&member).unwrap();
    assert_eq!(snapshots.len(), 1);

    // Mark the snapshot so a hit is distinguishable from a fresh parse.
    let marked = parsed.select(&[2]);
    write_snapshot(&marked, &snapshots[0]).unwrap();

    for _ in 0..2 {
        session.ingest_archive(&archive).unwrap();
        assert_eq!(session.table(), Some(&marked));
        assert_eq!(cache.snapshots_of(&member).unwrap(), snapshots);
    }

    // Different content under the same member name replaces the snapshot.
    let changed = SCENARIO.replace(";30\n", ";35\n");
    fs::write(&archive, build_archive(&[(MEMBER, latin1(&changed).as_slice())])).unwrap();
    session.ingest_archive(&archive).unwrap();
    assert_eq!(session.table().map(|t| t.len()), Some(3));
    assert_eq!(session.summary().unwrap().indicators.total_volume, 185.0);
    let replaced = cache.snapshots_of(&member).unwrap();
    assert_eq!(replaced.len(), 1);
    assert_ne!(replaced, snapshots);

    let mut fresh = Session::new(DashboardConfig {
        cache_snapshots: false,
        ..config
    });
    fresh.ingest_archive(&archive).unwrap();
    assert_eq!(fresh.table(), session.table());
}

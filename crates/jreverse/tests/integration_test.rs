//! End-to-end pipeline tests over freshly written JAR archives.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use jreverse_core::config::Config;
use jreverse_core::pipeline::AnalysisPipeline;
use jreverse_core::{default_registry, ArchiveLayout, RuleEngine};
use jreverse_report::{json, text};

/// Minimal valid class file: `public class <name> extends Object` with no
/// members. `name` is slash-separated.
fn class_bytes(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&61u16.to_be_bytes()); // major, Java 17

    // constant pool: [1] Utf8 name, [2] Class #1, [3] Utf8 Object, [4] Class #3
    out.extend_from_slice(&5u16.to_be_bytes());
    out.push(1);
    out.extend_from_slice(&(name.len() as u16).to_be_bytes());
    out.extend_from_slice(name.as_bytes());
    out.push(7);
    out.extend_from_slice(&1u16.to_be_bytes());
    out.push(1);
    out.extend_from_slice(&16u16.to_be_bytes());
    out.extend_from_slice(b"java/lang/Object");
    out.push(7);
    out.extend_from_slice(&3u16.to_be_bytes());

    out.extend_from_slice(&0x0021u16.to_be_bytes()); // access
    out.extend_from_slice(&2u16.to_be_bytes()); // this
    out.extend_from_slice(&4u16.to_be_bytes()); // super
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&0u16.to_be_bytes()); // fields
    out.extend_from_slice(&0u16.to_be_bytes()); // methods
    out.extend_from_slice(&0u16.to_be_bytes()); // attributes
    out
}

fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (entry, bytes) in entries {
        zip.start_file(entry.to_string(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

fn pipeline() -> AnalysisPipeline {
    let config = Config::default();
    let engine = RuleEngine::new(default_registry(&config));
    AnalysisPipeline::new(engine, config)
}

fn boot_jar(dir: &Path) -> PathBuf {
    let path = dir.join("app.jar");
    write_jar(
        &path,
        &[
            (
                "BOOT-INF/classes/com/acme/Application.class",
                class_bytes("com/acme/Application"),
            ),
            (
                "BOOT-INF/classes/com/acme/OrderService.class",
                class_bytes("com/acme/OrderService"),
            ),
            ("BOOT-INF/classes/application.properties", b"server.port=8080".to_vec()),
        ],
    );
    path
}

#[test]
fn test_spring_boot_layout_detected() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline().analyze(&boot_jar(dir.path())).unwrap();

    assert_eq!(result.layout, ArchiveLayout::SpringBootFatJar);
    assert_eq!(result.pool.len(), 2);
    assert!(result.pool.contains("com.acme.Application"));
    assert!(result.pool.contains("com.acme.OrderService"));
    assert!(!result.incomplete);
}

#[test]
fn test_plain_jar_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.jar");
    write_jar(&path, &[("com/acme/Util.class", class_bytes("com/acme/Util"))]);

    let result = pipeline().analyze(&path).unwrap();
    assert_eq!(result.layout, ArchiveLayout::PlainJar);
    assert!(result.pool.get("com.acme.Util").unwrap().application);
}

#[test]
fn test_all_analyzers_report_on_clean_archive() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline().analyze(&boot_jar(dir.path())).unwrap();

    assert_eq!(result.scores_by_analyzer.len(), 6);
    assert!(result.failures.is_empty());
    for score in result.scores_by_analyzer.values() {
        assert!(score.value() <= 100);
    }
    assert!(result.issues().next().is_none());
}

#[test]
fn test_corrupt_entry_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.jar");
    write_jar(
        &path,
        &[
            ("com/acme/Good.class", class_bytes("com/acme/Good")),
            ("com/acme/Bad.class", vec![0xCA, 0xFE, 0xBA]),
        ],
    );

    let result = pipeline().analyze(&path).unwrap();
    assert_eq!(result.pool.len(), 1);
    assert_eq!(result.load_errors.len(), 1);
    assert_eq!(result.load_errors[0].entry, "com/acme/Bad.class");
}

#[test]
fn test_not_a_zip_is_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.jar");
    std::fs::write(&path, b"not an archive").unwrap();
    assert!(pipeline().analyze(&path).is_err());
}

#[test]
fn test_text_and_json_reports_render() {
    colored::control::set_override(false);
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline().analyze(&boot_jar(dir.path())).unwrap();

    let report = text::format_report(&result);
    assert!(report.contains("JReverse"));
    assert!(report.contains("2 classes"));

    let json_report = json::format_report(&result, false);
    let parsed: serde_json::Value = serde_json::from_str(&json_report).unwrap();
    assert_eq!(parsed["layout"], "spring_boot_fat_jar");
    assert_eq!(parsed["class_count"], 2);
}

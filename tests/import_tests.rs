//! End-to-end import tests
//!
//! Drive the importer over temporary folders built from the fixture records.

use std::fs;
use std::path::Path;

use serde_json::Value;
use study_import::config::{DiscoveryConfig, OutputFormat};
use study_import::duplicate::DuplicateReason;
use study_import::error::ErrorKind;
use study_import::health::{self, HealthDetails, HealthIssueKind};
use study_import::report::{
    ReportWriter, DUPLICATE_REPORT, HEALTH_REPORT, LOAD_ERROR_REPORT, VALIDATION_REPORT,
};
use study_import::{
    DuplicateMode, DuplicateResolver, FileOutcome, Importer, MemoryStore, SchemaValidator,
    SqliteStore, StudyStore,
};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    fs::read_to_string(path).unwrap()
}

fn fixture_value(name: &str) -> Value {
    serde_json::from_str(&fixture(name)).unwrap()
}

fn copy_fixture(dir: &Path, name: &str, as_name: &str) {
    if let Some(parent) = dir.join(as_name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(as_name), fixture(name)).unwrap();
}

fn importer<S: StudyStore>(store: S) -> Importer<S> {
    Importer::new(
        SchemaValidator::study().unwrap(),
        DuplicateResolver::default(),
        DiscoveryConfig::default(),
        store,
    )
}

// =============================================================================
// Import runs
// =============================================================================

#[test]
fn test_new_duplicate_and_malformed_files() {
    let input = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();

    copy_fixture(input.path(), "valid_study.json", "new/valid_study.json");
    copy_fixture(input.path(), "second_study.json", "already_imported.json");
    copy_fixture(input.path(), "malformed.json", "broken/malformed.json");

    let mut store = MemoryStore::new();
    let existing = store.insert_one(&fixture_value("second_study.json")).unwrap();

    let mut importer = importer(store);
    let summary = importer.run(input.path(), DuplicateMode::Basic).unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.invalid, 0);
    assert_eq!(summary.load_errors, 1);

    let duplicate = &summary.duplicates[0];
    assert_eq!(duplicate.reason, DuplicateReason::Doi);
    assert_eq!(duplicate.existing_id, existing);
    assert_eq!(duplicate.value, "10.21437/Interspeech.2019-2880");
    assert_eq!(summary.load_failures[0].error_type, ErrorKind::Decode);

    let writer = ReportWriter::new(reports.path(), OutputFormat::Pretty);
    let written = writer.write_run_reports(&summary).unwrap();
    assert_eq!(
        written,
        vec![
            reports.path().join(DUPLICATE_REPORT),
            reports.path().join(LOAD_ERROR_REPORT),
        ]
    );
    assert!(!reports.path().join(VALIDATION_REPORT).exists());

    let dup_report: Value =
        serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!(dup_report.as_array().unwrap().len(), 1);
    assert_eq!(dup_report[0]["reason"], "doi");
    assert!(dup_report[0]["file"].as_str().unwrap().ends_with("already_imported.json"));
}

#[test]
fn test_nested_results_rejected_with_validation_report() {
    let input = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    copy_fixture(input.path(), "nested_results.json", "nested_results.json");

    let mut importer = importer(MemoryStore::new());
    let summary = importer.run(input.path(), DuplicateMode::Enhanced).unwrap();

    assert_eq!(summary.invalid, 1);
    assert_eq!(
        summary.validation_failures[0].instance_path,
        "/ml_approaches/0/results/accuracy"
    );
    assert_eq!(importer.store().count().unwrap(), 0);

    let written = ReportWriter::new(reports.path(), OutputFormat::Compact)
        .write_run_reports(&summary)
        .unwrap();
    assert_eq!(written, vec![reports.path().join(VALIDATION_REPORT)]);
}

#[test]
fn test_second_run_inserts_nothing() {
    let input = tempfile::tempdir().unwrap();
    let db = tempfile::tempdir().unwrap();
    let db_path = db.path().join("studies.db");

    copy_fixture(input.path(), "valid_study.json", "a.json");
    copy_fixture(input.path(), "second_study.json", "b.json");

    for mode in [DuplicateMode::Basic, DuplicateMode::Enhanced] {
        let collection = format!("studies_{}", mode);

        let first = importer(SqliteStore::open(&db_path, &collection).unwrap())
            .run(input.path(), mode)
            .unwrap();
        assert_eq!(first.inserted, 2);

        let mut second_importer = importer(SqliteStore::open(&db_path, &collection).unwrap());
        let second = second_importer.run(input.path(), mode).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second_importer.store().count().unwrap(), 2);
    }
}

#[test]
fn test_enhanced_rerun_skips_records_without_datasets() {
    let input = tempfile::tempdir().unwrap();
    let db = tempfile::tempdir().unwrap();
    let db_path = db.path().join("studies.db");

    copy_fixture(input.path(), "no_datasets_study.json", "a.json");
    copy_fixture(input.path(), "valid_study.json", "b.json");

    let first = importer(SqliteStore::open(&db_path, "studies").unwrap())
        .run(input.path(), DuplicateMode::Enhanced)
        .unwrap();
    assert_eq!(first.inserted, 2);

    let mut second_importer = importer(SqliteStore::open(&db_path, "studies").unwrap());
    let second = second_importer.run(input.path(), DuplicateMode::Enhanced).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.duplicates[0].reason, DuplicateReason::DoiDataset);
    assert_eq!(second.duplicates[0].value, "10.21437/Interspeech.2019-1107");
    assert_eq!(second_importer.store().count().unwrap(), 2);
}

#[test]
fn test_enhanced_mode_imports_same_doi_with_new_dataset() {
    let input = tempfile::tempdir().unwrap();

    let mut reanalysis = fixture_value("valid_study.json");
    reanalysis["study_id"] = Value::from("PD-2021-014b");
    reanalysis["source_dataset"] = serde_json::json!([{"name": "mPower"}]);

    copy_fixture(input.path(), "valid_study.json", "a.json");
    fs::write(input.path().join("b.json"), reanalysis.to_string()).unwrap();

    let summary = importer(MemoryStore::new())
        .run(input.path(), DuplicateMode::Enhanced)
        .unwrap();
    assert_eq!(summary.inserted, 2);

    let summary = importer(MemoryStore::new())
        .run(input.path(), DuplicateMode::Basic)
        .unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_outcomes_cover_every_file() {
    let input = tempfile::tempdir().unwrap();
    copy_fixture(input.path(), "valid_study.json", "a.json");
    copy_fixture(input.path(), "nested_results.json", "b.json");
    copy_fixture(input.path(), "malformed.json", "c.json");
    fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    let summary = importer(MemoryStore::new())
        .run(input.path(), DuplicateMode::Basic)
        .unwrap();

    assert_eq!(summary.total_files(), 3);
    assert!(matches!(summary.outcomes[0], FileOutcome::Inserted { .. }));
    assert!(matches!(summary.outcomes[1], FileOutcome::RejectedInvalid(_)));
    assert!(matches!(summary.outcomes[2], FileOutcome::LoadError(_)));
}

// =============================================================================
// Health check
// =============================================================================

#[test]
fn test_health_scan_without_store() {
    let input = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();

    copy_fixture(input.path(), "valid_study.json", "ok.json");
    copy_fixture(input.path(), "malformed.json", "broken.json");
    fs::write(input.path().join("partial.json"), r#"{"title": "Only a title"}"#).unwrap();

    let summary = health::scan(input.path(), &DiscoveryConfig::default()).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.healthy, 1);

    let partial = summary
        .issues
        .iter()
        .find(|i| i.issue == HealthIssueKind::MissingFields)
        .unwrap();
    assert_eq!(
        partial.details,
        HealthDetails::Fields(vec![
            "year".to_string(),
            "doi".to_string(),
            "ml_approaches".to_string()
        ])
    );

    let path = ReportWriter::new(reports.path(), OutputFormat::Pretty)
        .write_health_report(&summary)
        .unwrap()
        .unwrap();
    assert_eq!(path, reports.path().join(HEALTH_REPORT));
}

#[test]
fn test_healthy_folder_writes_no_report() {
    let input = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    copy_fixture(input.path(), "valid_study.json", "ok.json");
    copy_fixture(input.path(), "nested_results.json", "nested.json");

    let summary = health::scan(input.path(), &DiscoveryConfig::default()).unwrap();
    assert!(summary.is_healthy());

    let written = ReportWriter::new(reports.path(), OutputFormat::Pretty)
        .write_health_report(&summary)
        .unwrap();
    assert!(written.is_none());
}

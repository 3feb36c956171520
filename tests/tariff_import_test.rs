// ==========================================
// 税则表导入 + 入库 + 快照刷新 集成测试
// ==========================================
// 测试目标: CSV 导入 → ImportReport → TariffRepository → TariffReferenceStore
// ==========================================


use customs_weight_engine::engine::{
    PatternRuleSet, QuoteLineResolver, TariffReferenceStore, TariffSnapshot,
};
use customs_weight_engine::importer::{ImportError, TariffImporter};
use customs_weight_engine::repository::TariffRepository;
use customs_weight_engine::{EngineConfig, WeightSource};
use std::sync::Arc;
use test_helpers::{create_test_db, quote, sample_tariff_csv_lines, write_temp_csv};

#[test]
fn test_import_csv_and_build_snapshot() {
    let file = write_temp_csv(&sample_tariff_csv_lines()).unwrap();
    let report = TariffImporter::new().import_file(file.path()).unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.accepted(), 3);
    assert!(report.rejected.is_empty());

    let snapshot = report.to_snapshot("2026-10").unwrap();
    assert_eq!(snapshot.lookup("851713").unwrap().description, "Smartphones");
    assert_eq!(snapshot.lookup("6403").unwrap().representative_weight(), 0.9);
}

#[test]
fn test_bad_rows_rejected_with_line_numbers() {
    let file = write_temp_csv(&[
        "code,weight_min_kg,weight_max_kg,duty_rate_percent",
        "8517,0.15,0.25,20",
        "6403,1.4,0.6,35",
        ",0.1,0.2,10",
        "9102,0.05,0.2,150",
        "8517,0.1,0.3,20",
    ])
    .unwrap();

    let report = TariffImporter::new().import_file(file.path()).unwrap();
    assert_eq!(report.accepted(), 1);
    let lines: Vec<usize> = report.rejected.iter().map(|r| r.line).collect();
    assert_eq!(lines, vec![3, 4, 5, 6]);
}

#[test]
fn test_missing_column_fails_whole_file() {
    let file = write_temp_csv(&["code,description", "8517,phones"]).unwrap();
    let err = TariffImporter::new().import_file(file.path()).unwrap_err();
    assert!(matches!(err, ImportError::MissingColumn(_)));
}

#[test]
fn test_missing_file_reported() {
    let err = TariffImporter::new()
        .import_file("/nonexistent/tariffs.csv")
        .unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)));
}

#[test]
fn test_repository_round_trip_from_file() {
    let (_db, db_path) = create_test_db().unwrap();
    let repo = TariffRepository::new(&db_path).unwrap();
    let file = write_temp_csv(&sample_tariff_csv_lines()).unwrap();

    let snapshot = TariffImporter::new()
        .import_file(file.path())
        .unwrap()
        .to_snapshot("customs-2026")
        .unwrap();
    assert_eq!(repo.save_snapshot(&snapshot).unwrap(), 3);

    // 重新打开仓储，模拟进程重启
    let reopened = TariffRepository::new(&db_path).unwrap();
    let loaded = reopened.load_snapshot().unwrap().unwrap();
    assert_eq!(loaded.version(), "customs-2026");
    assert_eq!(loaded.len(), 3);
}

#[test]
fn test_store_refresh_is_seen_by_new_requests_only() {
    let store = Arc::new(TariffReferenceStore::new(TariffSnapshot::empty()));
    let resolver = QuoteLineResolver::new(
        Arc::clone(&store),
        PatternRuleSet::builtin(),
        EngineConfig::default(),
    )
    .unwrap();

    let request = quote("Apple iPhone 15 Pro", 999.0, Some("8517.13.00"));
    let before = resolver.resolve_line(&request).unwrap();
    assert_eq!(before.weight.selected_source(), WeightSource::Pattern);

    // 旧快照持有者不受刷新影响
    let held = store.snapshot();

    let file = write_temp_csv(&sample_tariff_csv_lines()).unwrap();
    let snapshot = TariffImporter::new()
        .import_file(file.path())
        .unwrap()
        .to_snapshot("v2")
        .unwrap();
    store.replace(snapshot);

    let after = resolver.resolve_line(&request).unwrap();
    assert_eq!(after.weight.selected_source(), WeightSource::Tariff);
    assert_eq!(after.tariff.as_ref().unwrap().code, "851713");
    assert!(held.is_empty());
    assert_eq!(store.snapshot().version(), "v2");
}

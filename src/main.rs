// ==========================================
// 跨境报价系统 - 命令行入口
// ==========================================
// 用法:
//   customs-weight-engine <requests.json> [tariff.csv|tariff.xlsx|-] [config.db]
//
// - requests.json: QuoteRequest 数组
// - 税则表文件: 给出时导入并入库；"-" 或缺省时读取已入库的表（无则用内置表）
// - config.db: 配置与税则库（缺省见 CUSTOMS_WEIGHT_ENGINE_DB_PATH / 用户数据目录）
// 输出: stdout 打印 JSON 结果，日志写 stderr
// ==========================================

use anyhow::{anyhow, Context};
use customs_weight_engine::config::ConfigManager;
use customs_weight_engine::db::{ensure_schema, get_default_db_path, open_sqlite_connection};
use customs_weight_engine::engine::{QuoteLineResolver, QuoteRequest, TariffReferenceStore, TariffSnapshot};
use customs_weight_engine::i18n;
use customs_weight_engine::importer::TariffImporter;
use customs_weight_engine::logging;
use customs_weight_engine::repository::TariffRepository;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let requests_path = args
        .next()
        .ok_or_else(|| anyhow!("用法: customs-weight-engine <requests.json> [tariff.csv|xlsx|-] [config.db]"))?;
    let tariff_path = args.next().filter(|p| p.trim() != "-" && !p.trim().is_empty());
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    tracing::info!(
        version = customs_weight_engine::VERSION,
        db = %db_path,
        "{} 启动",
        customs_weight_engine::APP_NAME
    );

    // 配置与税则库共用一个连接
    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库 {}", db_path))?;
    ensure_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));
    let config_manager =
        ConfigManager::from_connection(conn.clone()).map_err(|e| anyhow!("配置初始化失败: {}", e))?;
    let tariff_repo = TariffRepository::from_connection(conn)?;

    // 税则快照
    let snapshot = match tariff_path {
        Some(path) => {
            ensure_file_exists(&path)?;
            let report = TariffImporter::new().import_file(&path)?;
            eprintln!("{}", i18n::import_summary(&report));
            let version = Path::new(&path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "imported".to_string());
            let snapshot = report.to_snapshot(&version)?;
            tariff_repo.save_snapshot(&snapshot)?;
            snapshot
        }
        None => tariff_repo.load_snapshot()?.unwrap_or_else(TariffSnapshot::builtin),
    };
    let store = Arc::new(TariffReferenceStore::new(snapshot));

    let resolver = QuoteLineResolver::from_config_reader(store, &config_manager)
        .await
        .map_err(|e| anyhow!("引擎初始化失败: {}", e))?;

    ensure_file_exists(&requests_path)?;
    let raw = std::fs::read_to_string(&requests_path)
        .with_context(|| format!("无法读取请求文件 {}", requests_path))?;
    let requests: Vec<QuoteRequest> =
        serde_json::from_str(&raw).with_context(|| format!("请求文件格式错误 {}", requests_path))?;

    let results = Arc::new(resolver).resolve_batch(requests).await;

    let output: Vec<serde_json::Value> = results
        .iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(line) => json!({
                "index": index,
                "status": "OK",
                "summary": format!(
                    "{}\n{}",
                    i18n::decision_summary(&line.weight),
                    i18n::valuation_summary(&line.valuation)
                ),
                "resolution": line,
            }),
            Err(e) if e.requires_manual_entry() => json!({
                "index": index,
                "status": "NEEDS_MANUAL_WEIGHT",
                "error": e.to_string(),
                "summary": i18n::t("weight.no_candidate"),
            }),
            Err(e) => json!({
                "index": index,
                "status": "ERROR",
                "error": e.to_string(),
            }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// 输入文件不存在时给出本地化提示
fn ensure_file_exists(path: &str) -> anyhow::Result<()> {
    if !Path::new(path).exists() {
        return Err(anyhow!(i18n::t_with_args("import.file_not_found", &[("path", path)])));
    }
    Ok(())
}

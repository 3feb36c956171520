// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// 用途: 面向报价页面的判定摘要与偏差提示文案
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::domain::types::WeightSource;
use crate::domain::valuation::ValuationBasis;
use crate::domain::weight::WeightDecision;
use crate::importer::ImportReport;

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use customs_weight_engine::i18n::t_with_args;
/// let msg = t_with_args("import.file_not_found", &[("path", "/tmp/tariffs.csv")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 重量来源名称
pub fn source_label(source: WeightSource) -> String {
    let key = match source {
        WeightSource::Tariff => "weight.source.tariff",
        WeightSource::Pattern => "weight.source.pattern",
        WeightSource::Volumetric => "weight.source.volumetric",
        WeightSource::Manual => "weight.source.manual",
    };
    t(key)
}

/// 重量判定摘要（偏差超阈值时追加提示行）
pub fn decision_summary(decision: &WeightDecision) -> String {
    let source = source_label(decision.selected_source());
    let weight = format!("{:.3}", decision.selected_value_kg());
    let confidence = format!("{:.2}", decision.selected.confidence);
    let mut lines = vec![t_with_args(
        "weight.summary",
        &[
            ("source", source.as_str()),
            ("weight", weight.as_str()),
            ("confidence", confidence.as_str()),
        ],
    )];

    if decision.discrepancy_flag {
        let count = decision.discrepancies.len().to_string();
        let threshold = format!("{:.0}", decision.discrepancy_threshold * 100.0);
        lines.push(t_with_args(
            "weight.discrepancy",
            &[("count", count.as_str()), ("threshold", threshold.as_str())],
        ));
    }

    lines.join("\n")
}

/// 完税价格摘要
pub fn valuation_summary(basis: &ValuationBasis) -> String {
    let base = format!("{:.2}", basis.resolved_base);
    let duty = format!("{:.2}", basis.duty_amount);
    let rate = basis.duty_rate_percent.to_string();
    let mut lines = vec![t_with_args(
        "valuation.summary",
        &[
            ("base", base.as_str()),
            ("duty", duty.as_str()),
            ("rate", rate.as_str()),
        ],
    )];
    if basis.fallback_applied {
        lines.push(t("valuation.fallback"));
    }
    lines.join("\n")
}

/// 税则表导入摘要
pub fn import_summary(report: &ImportReport) -> String {
    let total = report.total_rows.to_string();
    let accepted = report.accepted().to_string();
    let rejected = report.rejected.len().to_string();
    t_with_args(
        "import.summary",
        &[
            ("total", total.as_str()),
            ("accepted", accepted.as_str()),
            ("rejected", rejected.as_str()),
        ],
    )
}

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use cutquote_engine::diagnostics::EntityWarning;
use cutquote_engine::rates::{RateTable, format_thickness_label};
use cutquote_engine::session::Quote;

/// 报价摘要的文本形式。
pub fn format_report(
    path: &Path,
    histogram: &BTreeMap<String, usize>,
    quote: &Quote,
    display_name: &str,
    currency_symbol: &str,
) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut out = String::new();
    let _ = writeln!(out, "文件: {file_name}");
    let kinds: Vec<String> = histogram
        .iter()
        .map(|(kind, count)| format!("{kind}×{count}"))
        .collect();
    let _ = writeln!(out, "实体: {}", kinds.join(", "));
    let _ = writeln!(out, "切割长度: {:.2} m", quote.total_length_mm / 1000.0);
    let _ = writeln!(out, "空行程: {:.2} m", quote.rapid_distance_mm / 1000.0);
    let _ = writeln!(
        out,
        "尺寸: {:.0} × {:.0} mm",
        quote.width_mm, quote.height_mm
    );
    let _ = writeln!(out, "材料: {display_name}");
    let _ = writeln!(out, "厚度: {}", format_thickness_label(&quote.thickness));
    let _ = writeln!(out, "机时: {} min", quote.time_minutes);
    let _ = writeln!(out, "价格: {currency_symbol}{:.2}", quote.price);

    let unsupported = quote
        .warnings
        .iter()
        .filter(|warning| matches!(warning, EntityWarning::Unsupported { .. }))
        .count();
    let malformed = quote.warnings.len() - unsupported;
    if unsupported > 0 || malformed > 0 {
        let _ = writeln!(
            out,
            "未计入长度: {unsupported} 个不支持的实体，{malformed} 个数据不完整的实体"
        );
    }
    out
}

/// 材料目录的文本形式。
pub fn format_materials(table: &RateTable) -> String {
    let mut out = String::new();
    for material in table.materials() {
        let labels: Vec<String> = material
            .thickness_labels()
            .map(format_thickness_label)
            .collect();
        let _ = writeln!(
            out,
            "{} ({}): {}",
            material.name,
            material.display_name,
            labels.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> Quote {
        Quote {
            material: "hierro".to_string(),
            thickness: "3".to_string(),
            total_length_mm: 1234.5,
            rapid_distance_mm: 10.0,
            width_mm: 100.4,
            height_mm: 49.6,
            time_minutes: 1,
            price: 50.0,
            warnings: vec![EntityWarning::Unsupported {
                index: 3,
                kind: "TEXT".to_string(),
            }],
        }
    }

    #[test]
    fn report_contains_rounded_figures() {
        let histogram = BTreeMap::from([("LINE".to_string(), 2), ("TEXT".to_string(), 1)]);
        let report = format_report(
            Path::new("/tmp/parts/plate.dxf"),
            &histogram,
            &sample_quote(),
            "HIERRO NEGRO",
            "$",
        );
        assert!(report.contains("文件: plate.dxf"));
        assert!(report.contains("LINE×2, TEXT×1"));
        assert!(report.contains("切割长度: 1.23 m"));
        assert!(report.contains("尺寸: 100 × 50 mm"));
        assert!(report.contains("厚度: 3.0 mm"));
        assert!(report.contains("价格: $50.00"));
        assert!(report.contains("1 个不支持的实体，0 个数据不完整的实体"));
    }

    #[test]
    fn materials_list_every_thickness() {
        let text = format_materials(&RateTable::builtin());
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("hierro (HIERRO NEGRO): 0.5 mm, 0.8 mm, 1.0 mm"));
        assert!(text.contains("20.0 mm"));
    }
}

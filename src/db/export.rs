use crate::error::{DsrError, Result};
use crate::models::{MatchReport, MatchedItemRow, RateRecord};
use csv::Writer;
use std::fs::File;
use std::path::Path;

fn option_to_csv<T: ToString>(val: &Option<T>) -> String {
    val.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn create_writer(output_path: &Path) -> Result<Writer<File>> {
    let file = File::create(output_path).map_err(|e| DsrError::io(output_path, e))?;
    Ok(Writer::from_writer(file))
}

/// 导出参考库 (列同数据库表)
pub fn export_store_csv(records: &[RateRecord], output_path: &Path) -> Result<()> {
    let mut writer = create_writer(output_path)?;
    writer.write_record([
        "code", "category", "chapter", "section", "description", "unit", "rate", "volume", "page", "keywords",
    ])?;

    for record in records {
        let keywords: Vec<&str> = record.keywords.iter().map(String::as_str).collect();
        writer.write_record(&[
            record.code.clone(),
            record.category.clone(),
            record.chapter.clone(),
            record.section.clone(),
            record.description.clone(),
            record.unit.clone(),
            record.rate.to_string(),
            record.volume.clone(),
            record.page.to_string(),
            keywords.join(" "),
        ])?;
    }

    writer.flush().map_err(|e| DsrError::io(output_path, e))?;
    tracing::info!("Exported {} reference records to {}", records.len(), output_path.display());
    Ok(())
}

/// 导出匹配明细
pub fn export_report_csv(report: &MatchReport, output_path: &Path) -> Result<()> {
    let mut writer = create_writer(output_path)?;
    writer.write_record([
        "itemNumber",
        "code",
        "description",
        "quantity",
        "unit",
        "rate",
        "amount",
        "matchType",
        "similarityScore",
        "matchedCode",
        "matchedDescription",
        "volume",
        "page",
    ])?;

    for result in &report.items {
        let row = MatchedItemRow::from(result);
        writer.write_record(&[
            row.item_number.to_string(),
            row.code,
            row.description,
            row.quantity.to_string(),
            row.unit,
            option_to_csv(&row.rate),
            option_to_csv(&row.amount),
            row.match_type.to_string(),
            option_to_csv(&row.similarity_score.or(row.description_score)),
            row.matched_code.unwrap_or_default(),
            row.matched_description.unwrap_or_default(),
            row.volume.unwrap_or_default(),
            option_to_csv(&row.page),
        ])?;
    }

    writer.flush().map_err(|e| DsrError::io(output_path, e))?;
    tracing::info!("Exported {} matched items to {}", report.items.len(), output_path.display());
    Ok(())
}

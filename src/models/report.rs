use crate::models::{MatchResult, MatchType};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 汇总统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub total_items: usize,
    pub exact_matches: usize,
    pub code_match_description_mismatch: usize,
    pub similarity_matches: usize,
    pub not_found: usize,
    pub total_estimated_amount: f64,
}

impl MatchSummary {
    pub fn count(&self, match_type: MatchType) -> usize {
        match match_type {
            MatchType::ExactMatch => self.exact_matches,
            MatchType::CodeMatchDescriptionMismatch => self.code_match_description_mismatch,
            MatchType::SimilarityMatch => self.similarity_matches,
            MatchType::NotFound => self.not_found,
        }
    }
}

/// 匹配报告 (MatchReport), items 保持输入顺序
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub summary: MatchSummary,
    pub items: Vec<MatchResult>,
}

/// 报告文件中的单行
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedItemRow {
    pub item_number: u32,
    pub code: String,
    pub clean_code: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub rate: Option<f64>,
    pub amount: Option<f64>,
    pub match_type: MatchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_score: Option<f64>,
    pub matched_code: Option<String>,
    pub matched_description: Option<String>,
    pub matched_unit: Option<String>,
    pub volume: Option<String>,
    pub page: Option<u32>,
}

impl From<&MatchResult> for MatchedItemRow {
    fn from(result: &MatchResult) -> Self {
        let item = &result.item;
        let reference = result.reference.as_ref();
        Self {
            item_number: item.item_number,
            code: item.code.clone(),
            clean_code: item.clean_code.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            rate: result.rate,
            amount: result.amount,
            match_type: result.match_type,
            similarity_score: result.similarity_score,
            description_score: result.description_score,
            matched_code: result.matched_code.clone(),
            matched_description: reference.map(|r| r.description.clone()),
            matched_unit: reference.map(|r| r.unit.clone()),
            volume: reference.map(|r| r.volume.clone()),
            page: reference.map(|r| r.page),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFiles {
    pub items: String,
    pub references: Vec<String>,
}

/// 落盘的报告文档
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub project: String,
    pub source_files: SourceFiles,
    pub generated_at: DateTime<Local>,
    pub summary: MatchSummary,
    pub matched_items: Vec<MatchedItemRow>,
}

impl ReportDocument {
    pub fn new(report: &MatchReport, project: String, source_files: SourceFiles) -> Self {
        Self {
            project,
            source_files,
            generated_at: Local::now(),
            summary: report.summary.clone(),
            matched_items: report.items.iter().map(MatchedItemRow::from).collect(),
        }
    }
}

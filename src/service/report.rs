use crate::models::{MatchReport, MatchResult, MatchSummary, MatchType};

/// 汇总匹配结果 (ReportBuilder)
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    /// 纯聚合: 各分类计数与金额合计, 条目顺序不变
    pub fn build(results: Vec<MatchResult>) -> MatchReport {
        let mut summary = MatchSummary {
            total_items: results.len(),
            ..MatchSummary::default()
        };

        for result in &results {
            match result.match_type {
                MatchType::ExactMatch => summary.exact_matches += 1,
                MatchType::CodeMatchDescriptionMismatch => summary.code_match_description_mismatch += 1,
                MatchType::SimilarityMatch => summary.similarity_matches += 1,
                MatchType::NotFound => summary.not_found += 1,
            }
            if let Some(amount) = result.amount {
                summary.total_estimated_amount += amount;
            }
        }

        MatchReport {
            summary,
            items: results,
        }
    }
}

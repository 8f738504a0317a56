use crate::models::{ExtractedItem, RateRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 匹配分类 (终态, 不再迁移)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// 编码命中且描述相似度达标
    ExactMatch,
    /// 编码命中但描述不符
    CodeMatchDescriptionMismatch,
    /// 编码缺失/未命中, 由全库相似度兜底
    SimilarityMatch,
    NotFound,
}

impl MatchType {
    pub const ALL: [MatchType; 4] = [
        MatchType::ExactMatch,
        MatchType::CodeMatchDescriptionMismatch,
        MatchType::SimilarityMatch,
        MatchType::NotFound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::ExactMatch => "exact_match",
            MatchType::CodeMatchDescriptionMismatch => "code_match_description_mismatch",
            MatchType::SimilarityMatch => "similarity_match",
            MatchType::NotFound => "not_found",
        }
    }

    /// 是否得到了单价
    pub fn is_priced(self) -> bool {
        !matches!(self, MatchType::NotFound)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个工作项的匹配结果 (MatchResult)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub item: ExtractedItem,
    pub matched_code: Option<String>,
    pub rate: Option<f64>,
    /// quantity * rate
    pub amount: Option<f64>,
    pub match_type: MatchType,
    /// 仅兜底匹配时给出
    pub similarity_score: Option<f64>,
    /// 编码命中时的描述相似度
    pub description_score: Option<f64>,
    /// 命中的参考记录
    pub reference: Option<RateRecord>,
}

impl MatchResult {
    /// 编码命中: 根据描述相似度区分 ExactMatch / CodeMatchDescriptionMismatch
    pub fn code_match(item: ExtractedItem, record: &RateRecord, description_score: f64, description_threshold: f64) -> Self {
        let match_type = if description_score >= description_threshold {
            MatchType::ExactMatch
        } else {
            MatchType::CodeMatchDescriptionMismatch
        };
        let amount = item.quantity * record.rate;
        Self {
            item,
            matched_code: Some(record.code.clone()),
            rate: Some(record.rate),
            amount: Some(amount),
            match_type,
            similarity_score: None,
            description_score: Some(description_score),
            reference: Some(record.clone()),
        }
    }

    /// 相似度兜底命中
    pub fn similarity_match(item: ExtractedItem, record: &RateRecord, score: f64) -> Self {
        let amount = item.quantity * record.rate;
        Self {
            item,
            matched_code: Some(record.code.clone()),
            rate: Some(record.rate),
            amount: Some(amount),
            match_type: MatchType::SimilarityMatch,
            similarity_score: Some(score),
            description_score: None,
            reference: Some(record.clone()),
        }
    }

    pub fn not_found(item: ExtractedItem) -> Self {
        Self {
            item,
            matched_code: None,
            rate: None,
            amount: None,
            match_type: MatchType::NotFound,
            similarity_score: None,
            description_score: None,
            reference: None,
        }
    }
}

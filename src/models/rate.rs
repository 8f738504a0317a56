use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 默认专业类别
pub const DEFAULT_CATEGORY: &str = "civil";

/// 参考单价记录 (RateRecord), 主键 (code, category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub code: String,
    pub category: String,
    pub chapter: String,
    pub section: String,
    pub description: String,
    pub unit: String,
    pub rate: f64,
    pub volume: String,
    pub page: u32,
    pub keywords: BTreeSet<String>,
}

impl RateRecord {
    pub fn key(&self) -> (&str, &str) {
        (&self.code, &self.category)
    }
}

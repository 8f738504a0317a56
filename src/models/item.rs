use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// 合法编码: 1~3 位数字, 2~4 段
static CLEAN_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){1,3}$").expect("valid clean code pattern"));

/// 校验点分编码 (如 "15.12.2")
pub fn is_valid_clean_code(code: &str) -> bool {
    CLEAN_CODE_RE.is_match(code)
}

/// 由编码推导 (chapter, section): "15.12.2" -> ("15", "15.12")
pub fn chapter_and_section(clean_code: &str) -> (String, String) {
    if clean_code.is_empty() {
        return (String::new(), String::new());
    }
    let parts: Vec<&str> = clean_code.split('.').collect();
    let chapter = parts[0].to_string();
    let section = if parts.len() >= 2 {
        parts[..2].join(".")
    } else {
        clean_code.to_string()
    };
    (chapter, section)
}

/// 待计价工作项 (ExtractedItem)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItem {
    #[serde(default, alias = "item_number")]
    pub item_number: u32,
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "clean_code")]
    pub clean_code: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl ExtractedItem {
    /// 是否带有可用于精确查找的编码
    pub fn has_code(&self) -> bool {
        !self.clean_code.is_empty()
    }
}

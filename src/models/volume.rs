use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 参考分册文件 (结构化 JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeFile {
    #[serde(default)]
    pub metadata: VolumeMetadata,
    #[serde(default)]
    pub dsr_codes: Vec<VolumeEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeMetadata {
    /// 分册标签, 如 "Volume 2"
    #[serde(default)]
    pub volume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_codes: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
}

/// 分册中的单条记录; 缺省字段从 metadata 继承或由编码推导
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeEntry {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<BTreeSet<String>>,
}

impl VolumeFile {
    pub fn label(&self) -> &str {
        &self.metadata.volume
    }
}

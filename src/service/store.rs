//! 参考单价库 (ReferenceStore)
//!
//! 多个分册按给定顺序合并, 每个 (code, category) 只保留一条记录。
//! 冲突时由 [`DuplicatePolicy`] 决定去留, 默认策略为 [`VolumeOrdinalPolicy`]:
//! 分册序号大者优先, 序号相同取单价低者。
//! 构建完成后只读, 可在多个线程间共享。

use crate::models::{
    chapter_and_section, is_valid_clean_code, RateRecord, VolumeEntry, VolumeFile, VolumeMetadata,
    DEFAULT_CATEGORY,
};
use crate::service::normalizer::normalize;
use crate::service::similarity::PreparedText;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// 导出文件的格式版本
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// 重复编码的去留策略
pub trait DuplicatePolicy: Send + Sync {
    /// `candidate` 是否取代已有的 `incumbent`
    fn prefer(&self, incumbent: &RateRecord, candidate: &RateRecord) -> bool;
}

/// 分册序号优先, 其次低单价; 完全相同时保留先到者
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeOrdinalPolicy;

impl DuplicatePolicy for VolumeOrdinalPolicy {
    fn prefer(&self, incumbent: &RateRecord, candidate: &RateRecord) -> bool {
        match volume_ordinal(&candidate.volume).cmp(&volume_ordinal(&incumbent.volume)) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => candidate.rate < incumbent.rate,
        }
    }
}

/// 从分册标签中取序号: "Volume 2" -> 2, "DSR Vol. II" -> 2, "Civil-III" -> 3
///
/// 优先取 vol/volume 之后的 token; 四位数 (年份) 不计; 取不到时为 1。
pub fn volume_ordinal(label: &str) -> u32 {
    let tokens: Vec<&str> = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for (idx, token) in tokens.iter().enumerate() {
        let lower = token.to_lowercase();
        let rest = lower
            .strip_prefix("volume")
            .or_else(|| lower.strip_prefix("vol"));
        match rest {
            Some("") => {
                if let Some(n) = tokens.get(idx + 1).and_then(|t| parse_ordinal(t)) {
                    return n;
                }
            }
            Some(suffix) => {
                if let Some(n) = suffix.parse::<u32>().ok().filter(|n| *n < 1000) {
                    return n;
                }
            }
            None => {}
        }
    }

    tokens.iter().find_map(|t| parse_ordinal(t)).unwrap_or(1)
}

fn parse_ordinal(token: &str) -> Option<u32> {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse::<u32>().ok().filter(|n| *n < 1000);
    }
    parse_roman(token)
}

/// 仅大写 I/V/X 组成的罗马数字 (分册序号不会太大, 也避免把 "CIVIL" 之类当成数字)
fn parse_roman(token: &str) -> Option<u32> {
    let values: Vec<i64> = token
        .chars()
        .map(|c| match c {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let mut total = 0i64;
    for (idx, value) in values.iter().enumerate() {
        match values.get(idx + 1) {
            Some(next) if next > value => total -= value,
            _ => total += value,
        }
    }
    u32::try_from(total).ok().filter(|n| *n > 0)
}

/// 入库统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub volumes: usize,
    pub entries: usize,
    /// 编码不合法而跳过
    pub invalid_codes: usize,
    /// 单价为负或非数值而跳过
    pub invalid_rates: usize,
    /// 主键冲突次数
    pub duplicates: usize,
    /// 冲突中新记录胜出的次数
    pub replaced: usize,
}

/// 单写者构建阶段
pub struct ReferenceStoreBuilder {
    records: IndexMap<(String, String), RateRecord>,
    policy: Box<dyn DuplicatePolicy>,
    default_category: String,
    stats: IngestStats,
}

impl Default for ReferenceStoreBuilder {
    fn default() -> Self {
        Self::with_policy(VolumeOrdinalPolicy)
    }
}

impl ReferenceStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: impl DuplicatePolicy + 'static) -> Self {
        Self {
            records: IndexMap::new(),
            policy: Box::new(policy),
            default_category: DEFAULT_CATEGORY.to_string(),
            stats: IngestStats::default(),
        }
    }

    /// 分册与条目都未标注类别时使用
    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// 按策略合并一条记录, 返回该记录是否留在库中
    pub fn add_record(&mut self, record: RateRecord) -> bool {
        self.stats.entries += 1;
        let key = (record.code.clone(), record.category.clone());
        match self.records.get_mut(&key) {
            Some(incumbent) => {
                self.stats.duplicates += 1;
                if self.policy.prefer(incumbent, &record) {
                    tracing::debug!(
                        "Duplicate {}/{}: {} ({}) replaces {} ({})",
                        record.code,
                        record.category,
                        record.volume,
                        record.rate,
                        incumbent.volume,
                        incumbent.rate
                    );
                    self.stats.replaced += 1;
                    *incumbent = record;
                    true
                } else {
                    false
                }
            }
            None => {
                self.records.insert(key, record);
                true
            }
        }
    }

    pub fn add_volume(&mut self, volume: &VolumeFile) {
        self.stats.volumes += 1;
        let label = volume.label();
        let category = volume
            .metadata
            .category
            .clone()
            .unwrap_or_else(|| self.default_category.clone());

        for entry in &volume.dsr_codes {
            let code = entry.code.trim();
            if !is_valid_clean_code(code) {
                self.stats.invalid_codes += 1;
                tracing::warn!("Skipping entry with invalid code {:?} in {}", entry.code, label);
                continue;
            }
            if !entry.rate.is_finite() || entry.rate < 0.0 {
                self.stats.invalid_rates += 1;
                tracing::warn!("Skipping {} in {}: invalid rate {}", code, label, entry.rate);
                continue;
            }
            let record = record_from_entry(entry, code, label, &category);
            self.add_record(record);
        }

        tracing::info!(
            "Ingested volume {:?}: {} entries, store now holds {} records",
            label,
            volume.dsr_codes.len(),
            self.records.len()
        );
    }

    pub fn build(self) -> ReferenceStore {
        let records: Vec<RateRecord> = self.records.into_values().collect();
        ReferenceStore::index(records, self.stats)
    }
}

fn record_from_entry(entry: &VolumeEntry, code: &str, label: &str, category: &str) -> RateRecord {
    let (chapter, section) = chapter_and_section(code);
    RateRecord {
        code: code.to_string(),
        category: entry.category.clone().unwrap_or_else(|| category.to_string()),
        chapter: entry.chapter.clone().unwrap_or(chapter),
        section: entry.section.clone().unwrap_or(section),
        description: entry.description.clone(),
        unit: entry.unit.clone(),
        rate: entry.rate,
        volume: entry.volume.clone().unwrap_or_else(|| label.to_string()),
        page: entry.page.unwrap_or(0),
        keywords: entry
            .keywords
            .clone()
            .unwrap_or_else(|| normalize(&entry.description)),
    }
}

/// 只读参考库
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    records: Vec<RateRecord>,
    prepared: Vec<PreparedText>,
    by_code: HashMap<String, BTreeMap<String, usize>>,
    by_chapter: HashMap<String, HashMap<String, Vec<usize>>>,
    stats: IngestStats,
}

impl PartialEq for ReferenceStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl ReferenceStore {
    /// 默认策略、默认类别下按顺序合并各分册
    pub fn ingest(volumes: &[VolumeFile]) -> Self {
        let mut builder = ReferenceStoreBuilder::new();
        for volume in volumes {
            builder.add_volume(volume);
        }
        builder.build()
    }

    /// 由已合并的记录 (如数据库) 重建索引; 仍按默认策略处理重复键
    pub fn from_records(records: impl IntoIterator<Item = RateRecord>) -> Self {
        let mut builder = ReferenceStoreBuilder::new();
        for record in records {
            builder.add_record(record);
        }
        builder.build()
    }

    fn index(records: Vec<RateRecord>, stats: IngestStats) -> Self {
        let mut by_code: HashMap<String, BTreeMap<String, usize>> = HashMap::new();
        let mut by_chapter: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_code
                .entry(record.code.clone())
                .or_default()
                .insert(record.category.clone(), idx);
            by_chapter
                .entry(record.category.clone())
                .or_default()
                .entry(record.chapter.clone())
                .or_default()
                .push(idx);
        }
        let prepared = records.iter().map(|r| PreparedText::new(&r.description)).collect();

        Self {
            records,
            prepared,
            by_code,
            by_chapter,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 合并顺序 (首次出现的顺序)
    pub fn records(&self) -> &[RateRecord] {
        &self.records
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn lookup(&self, code: &str, category: &str) -> Option<&RateRecord> {
        self.by_code
            .get(code)
            .and_then(|categories| categories.get(category))
            .map(|&idx| &self.records[idx])
    }

    /// 该编码在所有类别下的记录, 按类别名排序
    pub fn lookup_code(&self, code: &str) -> Vec<&RateRecord> {
        self.code_indices(code).into_iter().map(|idx| &self.records[idx]).collect()
    }

    pub fn by_chapter(&self, chapter: &str, category: &str) -> Vec<&RateRecord> {
        self.chapter_indices(chapter, Some(category))
            .into_iter()
            .map(|idx| &self.records[idx])
            .collect()
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.by_chapter.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }

    pub(crate) fn code_indices(&self, code: &str) -> Vec<usize> {
        self.by_code
            .get(code)
            .map(|categories| categories.values().copied().collect())
            .unwrap_or_default()
    }

    /// `category` 为 None 时跨所有类别; 结果按合并顺序
    pub(crate) fn chapter_indices(&self, chapter: &str, category: Option<&str>) -> Vec<usize> {
        let mut indices: Vec<usize> = match category {
            Some(category) => self
                .by_chapter
                .get(category)
                .and_then(|chapters| chapters.get(chapter))
                .cloned()
                .unwrap_or_default(),
            None => self
                .by_chapter
                .values()
                .filter_map(|chapters| chapters.get(chapter))
                .flatten()
                .copied()
                .collect(),
        };
        indices.sort_unstable();
        indices
    }

    pub(crate) fn record(&self, idx: usize) -> &RateRecord {
        &self.records[idx]
    }

    pub(crate) fn prepared(&self, idx: usize) -> &PreparedText {
        &self.prepared[idx]
    }

    /// 导出为分册文件; 每条记录自带 volume 与 category, 重新入库可得到同样的记录集
    pub fn export_volume(&self, label: &str) -> VolumeFile {
        let dsr_codes = self
            .records
            .iter()
            .map(|r| VolumeEntry {
                code: r.code.clone(),
                category: Some(r.category.clone()),
                chapter: Some(r.chapter.clone()),
                section: Some(r.section.clone()),
                description: r.description.clone(),
                unit: r.unit.clone(),
                rate: r.rate,
                volume: Some(r.volume.clone()),
                page: Some(r.page),
                keywords: Some(r.keywords.clone()),
            })
            .collect();

        VolumeFile {
            metadata: VolumeMetadata {
                volume: label.to_string(),
                category: None,
                source_file: None,
                total_codes: Some(self.records.len()),
                format_version: Some(EXPORT_FORMAT_VERSION.to_string()),
            },
            dsr_codes,
        }
    }
}

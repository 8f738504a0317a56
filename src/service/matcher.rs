use crate::config::MatchingConfig;
use crate::error::{DsrError, Result};
use crate::models::{chapter_and_section, ExtractedItem, MatchResult, MatchType, RateRecord};
use crate::service::similarity::{score_prepared, PreparedText};
use crate::service::store::ReferenceStore;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// 匹配参数
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// 相似度兜底阈值 [0, 1]
    pub threshold: f64,
    /// ExactMatch 的描述相似度下限
    pub description_threshold: f64,
    /// 为空时跨所有类别
    pub category: Option<String>,
    pub chapter_prefilter: bool,
    /// 为空时使用 rayon 全局线程池
    pub workers: Option<usize>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            threshold: config.threshold,
            description_threshold: config.description_threshold,
            category: config.category.clone(),
            chapter_prefilter: config.chapter_prefilter,
            workers: config.workers,
        }
    }
}

impl MatchOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// 匹配引擎: 编码精确查找, 失败时按描述相似度全库兜底
///
/// 参考库只读, 各条目互不依赖, 因此按条目并行; 输出顺序与输入一致。
pub struct MatchEngine<'a> {
    store: &'a ReferenceStore,
    options: MatchOptions,
}

impl<'a> MatchEngine<'a> {
    pub fn new(store: &'a ReferenceStore, options: MatchOptions) -> Result<Self> {
        for value in [options.threshold, options.description_threshold] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DsrError::InvalidThreshold(value));
            }
        }
        Ok(Self { store, options })
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// 批量匹配 (fan-out / fan-in)
    pub fn match_all(&self, items: Vec<ExtractedItem>) -> Result<Vec<MatchResult>> {
        let total = items.len();
        tracing::info!(
            "Matching {} items against {} reference records (threshold {})",
            total,
            self.store.len(),
            self.options.threshold
        );

        let results = match self.options.workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
                pool.install(|| self.run(items))
            }
            None => self.run(items),
        };

        let matched = results.iter().filter(|r| r.match_type.is_priced()).count();
        tracing::info!("Matching finished: {} items, {} priced, {} not found", total, matched, total - matched);
        Ok(results)
    }

    fn run(&self, items: Vec<ExtractedItem>) -> Vec<MatchResult> {
        let total = items.len();
        let done = AtomicUsize::new(0);
        items
            .into_par_iter()
            .map(|item| {
                let result = self.match_item(item);
                // 进度日志 (每100条或第一条)
                let current = done.fetch_add(1, AtomicOrdering::Relaxed) + 1;
                if current % 100 == 0 || current == 1 {
                    tracing::info!("Matching progress: {}/{}", current, total);
                }
                result
            })
            .collect()
    }

    /// 单条目匹配
    pub fn match_item(&self, item: ExtractedItem) -> MatchResult {
        let prepared = PreparedText::new(&item.description);

        // 1. 编码查找
        if item.has_code() {
            if let Some((idx, description_score)) = self.lookup_by_code(&item.clean_code, &prepared) {
                let record = self.store.record(idx);
                let result =
                    MatchResult::code_match(item, record, description_score, self.options.description_threshold);
                tracing::debug!(
                    "Item {} code {} -> {} (description score {:.3})",
                    result.item.item_number,
                    record.code,
                    result.match_type,
                    description_score
                );
                return result;
            }
        }

        // 2. 相似度兜底
        match self.best_candidate(&item, &prepared) {
            Some((idx, score)) if score >= self.options.threshold => {
                let record = self.store.record(idx);
                tracing::debug!(
                    "Item {} matched by similarity to {} ({:.3})",
                    item.item_number,
                    record.code,
                    score
                );
                MatchResult::similarity_match(item, record, score)
            }
            best => {
                tracing::debug!(
                    "Item {} not found (best score {:.3})",
                    item.item_number,
                    best.map_or(0.0, |(_, score)| score)
                );
                MatchResult::not_found(item)
            }
        }
    }

    /// 配置了类别时只查该类别; 否则取描述最相似的类别, 同分取低单价
    fn lookup_by_code(&self, clean_code: &str, prepared: &PreparedText) -> Option<(usize, f64)> {
        let candidates = self
            .store
            .code_indices(clean_code)
            .into_iter()
            .filter(|&idx| self.in_category(self.store.record(idx)));
        self.best_of(candidates, prepared)
    }

    fn best_candidate(&self, item: &ExtractedItem, prepared: &PreparedText) -> Option<(usize, f64)> {
        let category = self.options.category.as_deref();

        if self.options.chapter_prefilter {
            let chapter = if item.chapter.is_empty() {
                chapter_and_section(&item.clean_code).0
            } else {
                item.chapter.clone()
            };
            if !chapter.is_empty() {
                let in_chapter = self.store.chapter_indices(&chapter, category);
                // 章节内没有达到阈值的候选时, 退回全库扫描
                if let Some(best) = self
                    .best_of(in_chapter.into_iter(), prepared)
                    .filter(|(_, score)| *score >= self.options.threshold)
                {
                    return Some(best);
                }
            }
        }

        let all = (0..self.store.len()).filter(|&idx| self.in_category(self.store.record(idx)));
        self.best_of(all, prepared)
    }

    /// 最高分; 同分时取低单价, 再取小编码
    fn best_of(&self, candidates: impl Iterator<Item = usize>, prepared: &PreparedText) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for idx in candidates {
            let score = score_prepared(prepared, self.store.prepared(idx));
            let better = match best {
                None => true,
                Some((best_idx, best_score)) => match score.total_cmp(&best_score) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => cheaper(self.store.record(idx), self.store.record(best_idx)),
                },
            };
            if better {
                best = Some((idx, score));
            }
        }
        best
    }

    fn in_category(&self, record: &RateRecord) -> bool {
        self.options
            .category
            .as_deref()
            .map_or(true, |category| record.category == category)
    }
}

fn cheaper(a: &RateRecord, b: &RateRecord) -> bool {
    a.rate
        .total_cmp(&b.rate)
        .then_with(|| a.code.cmp(&b.code))
        .is_lt()
}

/// 便捷入口: 默认参数, 指定兜底阈值
pub fn match_all(items: Vec<ExtractedItem>, store: &ReferenceStore, threshold: f64) -> Result<Vec<MatchResult>> {
    MatchEngine::new(store, MatchOptions::default().with_threshold(threshold))?.match_all(items)
}

/// 各分类条目数, 供日志与摘要使用
pub fn count_by_type(results: &[MatchResult]) -> Vec<(MatchType, usize)> {
    MatchType::ALL
        .iter()
        .map(|&t| (t, results.iter().filter(|r| r.match_type == t).count()))
        .collect()
}

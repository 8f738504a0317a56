//! 从 PDF 转文本的原始分册中抽取单价 (RateExtractor)
//!
//! 分册正文每个 block 一条记录:
//! 第一行是编码, 倒数第二行是单位, 最后一行是单价, 中间各行拼成描述。
//! 不符合该形状的 block (页眉、说明、表头) 直接跳过。

use crate::models::{TextBlock, VolumeEntry, VolumeFile, VolumeMetadata};
use crate::service::store::EXPORT_FORMAT_VERSION;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// 记录 block 的最少行数: 编码 + 描述 + 单位 + 单价
const MIN_RECORD_LINES: usize = 4;

/// 编码行的最大长度, 排除日期和大数字
const MAX_CODE_LEN: usize = 8;

/// 合理单价范围
pub const MIN_RATE: f64 = 10.0;
pub const MAX_RATE: f64 = 1_000_000.0;

/// 分册中出现的计量单位 (小写、去点后)
pub const RATE_UNITS: &[&str] = &["cum", "sqm", "nos", "each", "kg", "mtr", "ltr", "metre", "quintal"];

static RATE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(?:\.\d+)?$").expect("valid rate code pattern"));

/// 抽取统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateExtractionStats {
    pub blocks: usize,
    /// 首行是编码的 block
    pub candidates: usize,
    pub entries: usize,
    /// 单位不在列表内
    pub unknown_units: usize,
    /// 单价无法解析或超出范围
    pub invalid_rates: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RateExtractor;

impl RateExtractor {
    /// 抽取为分册结构; 分册标签留空, 由加载方按位置命名
    pub fn extract(&self, blocks: &[TextBlock]) -> (VolumeFile, RateExtractionStats) {
        let mut stats = RateExtractionStats {
            blocks: blocks.len(),
            ..RateExtractionStats::default()
        };

        let mut entries = Vec::new();
        for block in blocks {
            let lines: Vec<&str> = block.lines.iter().map(|l| l.trim()).collect();
            if lines.len() < MIN_RECORD_LINES {
                continue;
            }
            let code = lines[0];
            if code.len() > MAX_CODE_LEN || !RATE_CODE_RE.is_match(code) {
                continue;
            }
            stats.candidates += 1;

            let n = lines.len();
            let Some(unit) = rate_unit(lines[n - 2]) else {
                stats.unknown_units += 1;
                tracing::debug!("Block {} on page {}: unknown unit {:?}", code, block.page, lines[n - 2]);
                continue;
            };
            let Some(rate) = parse_rate(lines[n - 1]) else {
                stats.invalid_rates += 1;
                tracing::debug!("Block {} on page {}: unusable rate {:?}", code, block.page, lines[n - 1]);
                continue;
            };

            entries.push(VolumeEntry {
                code: code.to_string(),
                description: lines[1..n - 2].join(" "),
                unit,
                rate,
                page: Some(block.page),
                ..VolumeEntry::default()
            });
        }
        stats.entries = entries.len();

        tracing::info!(
            "Extracted {} rate entries from {} blocks ({} candidates, {} unknown units, {} bad rates)",
            stats.entries,
            stats.blocks,
            stats.candidates,
            stats.unknown_units,
            stats.invalid_rates
        );

        let volume = VolumeFile {
            metadata: VolumeMetadata {
                total_codes: Some(entries.len()),
                format_version: Some(EXPORT_FORMAT_VERSION.to_string()),
                ..VolumeMetadata::default()
            },
            dsr_codes: entries,
        };
        (volume, stats)
    }
}

/// "Cu.m" -> "cum", "Sq.m" -> "sqm"
fn rate_unit(text: &str) -> Option<String> {
    let unit = text.to_lowercase().replace('.', "");
    RATE_UNITS.contains(&unit.as_str()).then_some(unit)
}

fn parse_rate(text: &str) -> Option<f64> {
    text.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|rate| (MIN_RATE..=MAX_RATE).contains(rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(page: u32, lines: &[&str]) -> TextBlock {
        TextBlock::new(page, lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn reads_code_description_unit_rate_blocks() {
        let blocks = vec![
            block(1, &["DELHI SCHEDULE OF RATES", "VOLUME II"]),
            block(
                2,
                &["15.12.2", "Dismantling doors, windows and clerestory windows", "including chowkhat", "Nos", "1,502.75"],
            ),
            block(3, &["2.8.1", "Earth work in excavation", "Cu.m", "180"]),
        ];
        let (volume, stats) = RateExtractor.extract(&blocks);

        assert_eq!(stats.candidates, 2);
        assert_eq!(volume.dsr_codes.len(), 2);
        assert_eq!(volume.metadata.total_codes, Some(2));
        assert!(volume.metadata.volume.is_empty());

        let first = &volume.dsr_codes[0];
        assert_eq!(first.code, "15.12.2");
        assert_eq!(
            first.description,
            "Dismantling doors, windows and clerestory windows including chowkhat"
        );
        assert_eq!(first.unit, "nos");
        assert_eq!(first.rate, 1502.75);
        assert_eq!(first.page, Some(2));
        assert_eq!(volume.dsr_codes[1].unit, "cum");
    }

    #[test]
    fn skips_blocks_with_unknown_unit_or_rate_out_of_range() {
        let blocks = vec![
            block(1, &["15.1.1", "Brick work", "Bags", "450"]),
            block(1, &["15.1.2", "Brick work", "Cum", "5"]),
            block(1, &["15.1.3", "Brick work", "Cum", "n/a"]),
            block(1, &["15.1.4", "Cum", "450"]),
            block(1, &["2023.10.11", "Dated notice", "Cum", "450"]),
        ];
        let (volume, stats) = RateExtractor.extract(&blocks);
        assert!(volume.dsr_codes.is_empty());
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.unknown_units, 1);
        assert_eq!(stats.invalid_rates, 2);
    }
}

//! 从原始文本块中抽取工作项 (CodeExtractor)
//!
//! 识别三种编码写法, 优先级依次为:
//! 1. 合写: `2023-15.12.2` (可带 `DSR-` 前缀)
//! 2. 分写: `DSR-` `2023-` `15.12.2` 三个相邻 token (可跨行)
//! 3. 单独: 整行只有 `15.12.2`, 年份取最近几个 block 内出现过的年份
//!
//! 新编码出现或输入结束时, 当前条目定稿; 没有合法编码的文本被丢弃。

use crate::models::{chapter_and_section, is_valid_clean_code, ExtractedItem, TextBlock};
use crate::service::normalizer::normalize;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// 单独编码回看的 block 数
pub const LOOKBACK_BLOCKS: usize = 3;

/// 单独编码所在 block 的最大行数
const STANDALONE_BLOCK_LINES: usize = 3;

/// 合理数量范围
pub const MIN_QUANTITY: f64 = 0.01;
pub const MAX_QUANTITY: f64 = 100_000.0;

/// 可识别的计量单位 (小写、去点后)
pub const UNITS: &[&str] = &[
    "nos", "no", "each", "cum", "sqm", "kg", "metre", "mtr", "rmt", "ltr", "quintal", "tonne",
];

/// 表头等不进入描述的词
const NOISE_WORDS: &[&str] = &[
    "rate", "amount", "qty", "quantity", "unit", "units", "code", "description", "item", "s.no",
    "sl.no", "total", "dsr", "dsr-",
];

static COMBINED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:dsr-?)?(20\d{2})-(\d+(?:\.\d+)+)$").expect("valid combined pattern")
});
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^dsr-?$").expect("valid marker pattern"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:dsr-?)?(20\d{2})-?$").expect("valid year pattern"));
static MARKED_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^dsr-?(20\d{2})-?$").expect("valid marked year pattern"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("valid code pattern"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("valid number pattern"));

/// 抽取过程中的统计 (可恢复异常计数)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionStats {
    pub blocks: usize,
    pub lines: usize,
    /// 无法解析而跳过的行
    pub malformed_lines: usize,
    /// 形似编码但校验失败, 按描述文本处理
    pub invalid_codes: usize,
    /// 同一文档中重复出现的编码
    pub duplicate_codes: usize,
    /// 第一个编码之前、或重复编码之后的无主文本行
    pub orphan_lines: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<ExtractedItem>,
    pub stats: ExtractionStats,
}

#[derive(Debug, Clone, Copy)]
pub struct CodeExtractor {
    lookback_blocks: usize,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self {
            lookback_blocks: LOOKBACK_BLOCKS,
        }
    }
}

/// 展平后的一行
struct Line<'a> {
    block: usize,
    tokens: Vec<&'a str>,
    /// 所在 block 足够短且不含 DSR 标记, 才允许单独编码
    standalone_ok: bool,
}

/// 编码识别结果
enum CodeScan {
    Found(CodeHit),
    Invalid,
    Miss,
}

struct CodeHit {
    code: String,
    clean_code: String,
    year: Option<String>,
    /// 编码占用的窗口区间 [first, last]
    first: usize,
    last: usize,
}

/// 窗口中的 token: (行偏移, 文本)
type WindowToken<'a> = (usize, &'a str);

/// 构建中的条目
#[derive(Default)]
struct PendingItem {
    code: String,
    clean_code: String,
    description: Vec<String>,
    unit: Option<String>,
    quantity: Option<f64>,
    awaiting_quantity: bool,
}

impl PendingItem {
    fn new(code: String, clean_code: String) -> Self {
        Self {
            code,
            clean_code,
            ..Self::default()
        }
    }

    fn push_text(&mut self, tokens: &[&str]) {
        let kept: Vec<&str> = tokens.iter().copied().filter(|t| !MARKER_RE.is_match(t)).collect();
        let text = kept.join(" ");
        if !is_noise(&text) {
            self.description.push(text);
        }
    }

    fn finish(self, item_number: u32) -> ExtractedItem {
        let description = self.description.join(" ");
        let (chapter, section) = chapter_and_section(&self.clean_code);
        ExtractedItem {
            item_number,
            code: self.code,
            clean_code: self.clean_code,
            chapter,
            section,
            keywords: normalize(&description),
            description,
            unit: self.unit.unwrap_or_default(),
            quantity: self.quantity.unwrap_or(0.0),
        }
    }
}

impl CodeExtractor {
    pub fn new(lookback_blocks: usize) -> Self {
        Self { lookback_blocks }
    }

    pub fn extract(&self, blocks: &[TextBlock]) -> Extraction {
        let mut stats = ExtractionStats {
            blocks: blocks.len(),
            ..ExtractionStats::default()
        };

        let mut lines: Vec<Line<'_>> = Vec::new();
        for (block_idx, block) in blocks.iter().enumerate() {
            let non_empty = block.lines.iter().filter(|l| !l.trim().is_empty()).count();
            let standalone_ok =
                non_empty <= STANDALONE_BLOCK_LINES && !block.lines.iter().any(|l| has_dsr_marker(l));
            for text in &block.lines {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                stats.lines += 1;
                if is_malformed(text) {
                    stats.malformed_lines += 1;
                    tracing::debug!("Skipping malformed line in block {}: {:?}", block_idx, text);
                    continue;
                }
                lines.push(Line {
                    block: block_idx,
                    tokens: text.split_whitespace().collect(),
                    standalone_ok,
                });
            }
        }

        let mut items: Vec<ExtractedItem> = Vec::new();
        let mut current: Option<PendingItem> = None;
        let mut last_year: Option<(String, usize)> = None;
        let mut seen_codes: HashSet<String> = HashSet::new();

        let mut idx = 0;
        while idx < lines.len() {
            let line = &lines[idx];
            let window = token_window(&lines, idx);

            // 等待数量或下一行是单位时, 单独的数字按数量处理
            let quantity_context = matches!(line.tokens.as_slice(), [t] if parse_quantity(t).is_some())
                && (current.as_ref().is_some_and(|p| p.awaiting_quantity && p.quantity.is_none())
                    || lines.get(idx + 1).and_then(lone_unit).is_some());
            let recent_year = last_year
                .as_ref()
                .filter(|(_, block)| line.block - block <= self.lookback_blocks)
                .map(|(year, _)| year.as_str());
            let standalone_year = recent_year.filter(|_| line.standalone_ok && !quantity_context);

            match scan_code(line, &window, recent_year, standalone_year) {
                CodeScan::Found(hit) => {
                    if let Some(pending) = current.take() {
                        items.push(pending.finish(items.len() as u32 + 1));
                    }
                    if let Some(year) = &hit.year {
                        last_year = Some((year.clone(), line.block));
                    }

                    let last_offset = window[hit.last].0;
                    let rest: Vec<&str> = window
                        .iter()
                        .enumerate()
                        .filter(|(pos, (offset, _))| *offset <= last_offset && (*pos < hit.first || *pos > hit.last))
                        .map(|(_, (_, token))| *token)
                        .collect();

                    if seen_codes.insert(hit.code.clone()) {
                        let mut pending = PendingItem::new(hit.code, hit.clean_code);
                        absorb_tokens(&mut pending, &rest);
                        current = Some(pending);
                    } else {
                        stats.duplicate_codes += 1;
                        tracing::debug!("Code {} already extracted, skipping repeat", hit.code);
                    }

                    idx += last_offset + 1;
                    continue;
                }
                CodeScan::Invalid => {
                    stats.invalid_codes += 1;
                    tracing::warn!("Invalid code format in line {:?}, treating as text", line.tokens.join(" "));
                }
                CodeScan::Miss => {}
            }

            if let Some(year) = line.tokens.iter().find_map(|t| year_of(t)) {
                last_year = Some((year, line.block));
            }

            let Some(pending) = current.as_mut() else {
                stats.orphan_lines += 1;
                idx += 1;
                continue;
            };

            let awaiting = std::mem::take(&mut pending.awaiting_quantity);

            // 单独一个数字: 可能是数量 (单位在上一行或下一行), 否则视为噪声
            if let [token] = line.tokens.as_slice() {
                if let Some(qty) = parse_quantity(token) {
                    if pending.quantity.is_none() {
                        if awaiting {
                            pending.quantity = Some(qty);
                        } else if let Some(unit) = lines.get(idx + 1).and_then(lone_unit) {
                            pending.quantity = Some(qty);
                            pending.unit.get_or_insert(unit);
                            idx += 2;
                            continue;
                        }
                    }
                    idx += 1;
                    continue;
                }
            }

            absorb_tokens(pending, &line.tokens);
            idx += 1;
        }

        if let Some(pending) = current.take() {
            items.push(pending.finish(items.len() as u32 + 1));
        }

        tracing::info!(
            "Extracted {} items from {} blocks ({} malformed lines, {} invalid codes, {} repeats)",
            items.len(),
            stats.blocks,
            stats.malformed_lines,
            stats.invalid_codes,
            stats.duplicate_codes
        );

        Extraction { items, stats }
    }
}

/// 在当前行起的窗口中识别编码; `standalone_year` 为 None 时不识别单独编码
fn scan_code(
    line: &Line<'_>,
    window: &[WindowToken<'_>],
    recent_year: Option<&str>,
    standalone_year: Option<&str>,
) -> CodeScan {
    let own_tokens = window.iter().take_while(|(offset, _)| *offset == 0).count();
    for pos in 0..own_tokens {
        let token = window[pos].1;
        let next = window.get(pos + 1).map(|(_, t)| *t);
        let after = window.get(pos + 2).map(|(_, t)| *t);

        // 1. 合写
        if let Some(caps) = COMBINED_RE.captures(token) {
            return hit(Some(caps[1].to_string()), &caps[2], pos, pos);
        }

        // 2. 分写: 先认合写, 年份槽只接受纯年份
        if MARKER_RE.is_match(token) {
            if let Some(caps) = next.and_then(|t| COMBINED_RE.captures(t)) {
                return hit(Some(caps[1].to_string()), &caps[2], pos, pos + 1);
            }
            if let (Some(year_tok), Some(code_tok)) = (next, after) {
                if let (Some(caps), true) = (YEAR_RE.captures(year_tok), CODE_RE.is_match(code_tok)) {
                    return hit(Some(caps[1].to_string()), code_tok, pos, pos + 2);
                }
            }
            // 无年份时只认 "DSR-" 紧跟编码; 换行后的数字按数量处理
            if token.ends_with('-') {
                let next_token = window.get(pos + 1).filter(|&&(offset, t)| {
                    CODE_RE.is_match(t) && (offset == 0 || parse_quantity(t).is_none())
                });
                if let Some(&(_, code_tok)) = next_token {
                    return hit(recent_year.map(str::to_string), code_tok, pos, pos + 1);
                }
            }
        }
        if let Some(caps) = MARKED_YEAR_RE.captures(token) {
            if let Some(code_tok) = next.filter(|t| CODE_RE.is_match(t)) {
                return hit(Some(caps[1].to_string()), code_tok, pos, pos + 1);
            }
        }
    }

    // 3. 单独编码, 必须能回看到年份
    if let ([token], Some(year)) = (line.tokens.as_slice(), standalone_year) {
        if CODE_RE.is_match(token) && is_valid_clean_code(token) {
            return hit(Some(year.to_string()), token, 0, 0);
        }
    }

    CodeScan::Miss
}

/// 便捷入口: 默认配置抽取
pub fn extract(blocks: &[TextBlock]) -> Extraction {
    CodeExtractor::default().extract(blocks)
}

fn hit(year: Option<String>, clean_code: &str, first: usize, last: usize) -> CodeScan {
    if !is_valid_clean_code(clean_code) {
        return CodeScan::Invalid;
    }
    let code = match &year {
        Some(year) => format!("DSR-{year}-{clean_code}"),
        None => clean_code.to_string(),
    };
    CodeScan::Found(CodeHit {
        code,
        clean_code: clean_code.to_string(),
        year,
        first,
        last,
    })
}

/// 当前行起的三行 token
fn token_window<'a>(lines: &[Line<'a>], idx: usize) -> Vec<WindowToken<'a>> {
    lines[idx..]
        .iter()
        .take(3)
        .enumerate()
        .flat_map(|(offset, line)| line.tokens.iter().map(move |t| (offset, *t)))
        .collect()
}

/// 描述文本与行尾 "数量 单位" / "单位 数量" / "单位"
fn absorb_tokens(pending: &mut PendingItem, tokens: &[&str]) {
    let (keep, quantity, unit) = split_trailing(tokens);
    if let Some(unit) = unit {
        pending.unit.get_or_insert(unit);
        match quantity {
            Some(qty) => {
                pending.quantity.get_or_insert(qty);
            }
            None if pending.quantity.is_none() => pending.awaiting_quantity = true,
            None => {}
        }
    }
    pending.push_text(&tokens[..keep]);
}

fn split_trailing(tokens: &[&str]) -> (usize, Option<f64>, Option<String>) {
    let n = tokens.len();
    if n >= 2 {
        let (x, y) = (tokens[n - 2], tokens[n - 1]);
        if let (Some(qty), Some(unit)) = (parse_quantity(x), normalize_unit(y)) {
            return (n - 2, Some(qty), Some(unit));
        }
        if let (Some(unit), Some(qty)) = (normalize_unit(x), parse_quantity(y)) {
            return (n - 2, Some(qty), Some(unit));
        }
    }
    if let Some(unit) = tokens.last().and_then(|t| normalize_unit(t)) {
        return (n - 1, None, Some(unit));
    }
    (n, None, None)
}

fn lone_unit(line: &Line<'_>) -> Option<String> {
    match line.tokens.as_slice() {
        [token] => normalize_unit(token),
        _ => None,
    }
}

/// "Sq.m" -> "sqm", "Cum." -> "cum"
pub fn normalize_unit(token: &str) -> Option<String> {
    let unit = token.to_lowercase().replace('.', "");
    UNITS.contains(&unit.as_str()).then_some(unit)
}

fn parse_number(token: &str) -> Option<f64> {
    let cleaned = token.replace(',', "");
    if !NUMBER_RE.is_match(&cleaned) {
        return None;
    }
    cleaned.parse().ok()
}

fn parse_quantity(token: &str) -> Option<f64> {
    parse_number(token).filter(|v| (MIN_QUANTITY..=MAX_QUANTITY).contains(v))
}

fn year_of(token: &str) -> Option<String> {
    if let Some(caps) = COMBINED_RE.captures(token) {
        return Some(caps[1].to_string());
    }
    YEAR_RE.captures(token).map(|caps| caps[1].to_string())
}

fn has_dsr_marker(text: &str) -> bool {
    text.to_uppercase().contains("DSR") || text.split_whitespace().any(|t| COMBINED_RE.is_match(t))
}

/// 替换字符、控制字符, 或完全不含字母数字
fn is_malformed(text: &str) -> bool {
    text.contains('\u{FFFD}')
        || text.chars().any(|c| c.is_control() && c != '\t')
        || !text.chars().any(char::is_alphanumeric)
}

fn is_noise(text: &str) -> bool {
    if text.chars().count() < 2 {
        return true;
    }
    let lower = text.to_lowercase();
    if NOISE_WORDS.contains(&lower.as_str()) {
        return true;
    }
    text.split_whitespace().all(|t| parse_number(t).is_some() || year_of(t).is_some())
}

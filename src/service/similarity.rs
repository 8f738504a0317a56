//! 描述相似度 (SimilarityScorer)
//!
//! `score = 0.7 * text_ratio + 0.3 * jaccard(keywords)`
//!
//! `text_ratio` 为经典 sequence-matcher ratio: 递归取最长公共连续子串,
//! `2 * M / (len(A) + len(B))`。该算法对参数顺序敏感, 这里先把两侧规范化
//! 文本按字典序排好再比较, 保证 `score(a, b) == score(b, a)`。

use crate::service::normalizer::normalize;
use std::collections::{BTreeSet, HashMap};

pub const TEXT_WEIGHT: f64 = 0.7;
pub const KEYWORD_WEIGHT: f64 = 0.3;

/// 长度达到该值时启用 autojunk: 出现次数超过 1% 的字符不作为匹配起点
const AUTOJUNK_MIN_LEN: usize = 200;

/// 两段描述的相似度, 取值 [0, 1]
pub fn score(a: &str, b: &str) -> f64 {
    score_prepared(&PreparedText::new(a), &PreparedText::new(b))
}

/// 预处理后的描述, 供全库扫描时复用
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedText {
    normalized: String,
    chars: Vec<char>,
    keywords: BTreeSet<String>,
}

impl PreparedText {
    pub fn new(text: &str) -> Self {
        let normalized = normalize_for_ratio(text);
        let chars = normalized.chars().collect();
        Self {
            normalized,
            chars,
            keywords: normalize(text),
        }
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }
}

pub fn score_prepared(a: &PreparedText, b: &PreparedText) -> f64 {
    let (first, second) = if b.normalized < a.normalized { (b, a) } else { (a, b) };
    let ratio = char_ratio(&first.chars, &second.chars);
    TEXT_WEIGHT * ratio + KEYWORD_WEIGHT * jaccard(&a.keywords, &b.keywords)
}

/// 小写, 非 [a-z0-9] 与空白一律替换为空格, 合并空白
pub fn normalize_for_ratio(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 规范化后文本的 ratio
pub fn text_ratio(a: &str, b: &str) -> f64 {
    let mut a = normalize_for_ratio(a);
    let mut b = normalize_for_ratio(b);
    if b < a {
        std::mem::swap(&mut a, &mut b);
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    char_ratio(&a, &b)
}

/// 相同文本恒为 1.0; 长文本开启 autojunk 后逐块匹配不一定能得到这个值
fn char_ratio(a: &[char], b: &[char]) -> f64 {
    if a == b {
        return 1.0;
    }
    SequenceMatcher::new(a, b).ratio()
}

/// |S1 ∩ S2| / |S1 ∪ S2|; 两者皆空时为 0.0
pub fn jaccard(s1: &BTreeSet<String>, s2: &BTreeSet<String>) -> f64 {
    let union = s1.union(s2).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = s1.intersection(s2).count();
    intersection as f64 / union as f64
}

/// 经典 sequence matcher (无 junk 函数, 开启 autojunk)
struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// b 中字符 -> 出现位置 (升序)
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matching_characters() as f64 / total as f64
    }

    /// 所有匹配块长度之和
    fn matching_characters(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }

    /// a[alo..ahi] 与 b[blo..bhi] 的最长公共子串 (i, j, size);
    /// 并列时取 a 中最早、其次 b 中最早的一个
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 };
                    let k = prev + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // autojunk 去掉的高频字符不能作为起点, 但允许向两侧延伸
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi && best_j + best_size < bhi && a[best_i + best_size] == b[best_j + best_size] {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}

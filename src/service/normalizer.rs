//! 关键词归一化 (KeywordNormalizer)
//!
//! 小写化, 去标点, 按空白切分, 丢弃过短的词和固定停用词, 结果为集合。

use std::collections::BTreeSet;

/// 停用词: 冠词、介词、连词
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "of", "in", "to", "for", "with", "on", "at", "from", "by", "as", "is",
    "are", "a", "an",
];

/// 词长下限 (字符数)
pub const MIN_TOKEN_LEN: usize = 2;

/// 文本 -> 规范关键词集合
pub fn normalize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize("Dismantling doors, windows (steel)!"),
            set(&["dismantling", "doors", "windows", "steel"])
        );
    }

    #[test]
    fn drops_stop_words_short_tokens_and_duplicates() {
        assert_eq!(
            normalize("Brick work in the superstructure of a 2 storey brick building"),
            set(&["brick", "work", "superstructure", "storey", "building"])
        );
    }

    #[test]
    fn mix_ratio_tokens_vanish() {
        // 1:2:4 -> "1", "2", "4", 全部短于下限
        assert_eq!(normalize("cement concrete 1:2:4"), set(&["cement", "concrete"]));
    }

    #[test]
    fn empty_and_punctuation_only_inputs() {
        assert!(normalize("").is_empty());
        assert!(normalize("-- / ,, ;").is_empty());
    }
}

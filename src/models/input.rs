use crate::models::ExtractedItem;
use serde::{Deserialize, Serialize};

/// 结构化输入的类型标记
pub const INPUT_ITEMS_TYPE: &str = "input_items";

/// 原始文本块 (PDF 转文本后的 block)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub page: u32,
    pub lines: Vec<String>,
}

impl TextBlock {
    pub fn new(page: u32, lines: Vec<String>) -> Self {
        Self { page, lines }
    }
}

/// 输入格式, 加载时一次性判定
#[derive(Debug, Clone, PartialEq)]
pub enum InputFormat {
    /// 结构化条目, 直接使用
    Structured(Vec<ExtractedItem>),
    /// 原始文本, 需经 CodeExtractor
    Unstructured(Vec<TextBlock>),
}

/// 结构化输入文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredInput {
    pub metadata: StructuredMetadata,
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredMetadata {
    #[serde(default, alias = "total_items")]
    pub total_items: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "source_file", skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, alias = "format_version", skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
}

impl StructuredInput {
    pub fn new(items: Vec<ExtractedItem>, source_file: Option<String>) -> Self {
        Self {
            metadata: StructuredMetadata {
                total_items: items.len(),
                kind: INPUT_ITEMS_TYPE.to_string(),
                source_file,
                format_version: Some("1.0".to_string()),
            },
            items,
        }
    }
}

/// PDF 转文本的原始文档: { document: { pages_data: [...] } } 或 { pages: [...] }
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub document: Option<RawDocumentBody>,
    #[serde(default)]
    pub pages: Option<Vec<RawPage>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocumentBody {
    #[serde(default)]
    pub pages_data: Vec<RawPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

/// 行可能是字符串, 也可能是带 text 字段的对象
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLine {
    Text(String),
    Span { text: String },
    Other(serde_json::Value),
}

impl RawLine {
    pub fn into_text(self) -> String {
        match self {
            RawLine::Text(text) | RawLine::Span { text } => text,
            RawLine::Other(serde_json::Value::Null) => String::new(),
            RawLine::Other(value) => value.to_string(),
        }
    }
}

impl RawDocument {
    /// 展平为 TextBlock 序列, 页码从 1 开始
    pub fn into_blocks(self) -> Vec<TextBlock> {
        let pages = match (self.document, self.pages) {
            (Some(body), _) if !body.pages_data.is_empty() => body.pages_data,
            (_, Some(pages)) => pages,
            _ => Vec::new(),
        };

        let mut blocks = Vec::new();
        for (page_idx, page) in pages.into_iter().enumerate() {
            for block in page.blocks {
                let lines: Vec<String> = block.lines.into_iter().map(RawLine::into_text).collect();
                if !lines.is_empty() {
                    blocks.push(TextBlock::new(page_idx as u32 + 1, lines));
                }
            }
        }
        blocks
    }
}

//! 文件加载: 输入条目 (结构化 / 原始文本) 与参考分册

use crate::error::{DsrError, Result};
use crate::models::{
    chapter_and_section, is_valid_clean_code, ExtractedItem, InputFormat, RawDocument,
    StructuredInput, TextBlock, VolumeFile, INPUT_ITEMS_TYPE,
};
use crate::service::extractor::CodeExtractor;
use crate::service::rate_extractor::RateExtractor;
use crate::service::normalizer::normalize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// 读取输入文件并一次性判定格式
///
/// - JSON 且 `metadata.type == "input_items"`: 结构化条目
/// - 其他 JSON: PDF 转文本的原始文档
/// - 非 JSON: 纯文本, 空行分块, 换页符分页
pub fn load_input(path: &Path) -> Result<InputFormat> {
    if !path.is_file() {
        return Err(DsrError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| DsrError::io(path, e))?;

    let format = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) if value["metadata"]["type"] == INPUT_ITEMS_TYPE => {
            let input: StructuredInput = serde_json::from_value(value).map_err(|e| DsrError::json(path, e))?;
            InputFormat::Structured(prepare_structured(input.items))
        }
        Ok(value) => {
            let document: RawDocument = serde_json::from_value(value).map_err(|e| DsrError::json(path, e))?;
            InputFormat::Unstructured(document.into_blocks())
        }
        Err(_) => InputFormat::Unstructured(text_blocks(&content)),
    };

    match &format {
        InputFormat::Structured(items) => {
            tracing::info!("Loaded {} structured items from {}", items.len(), path.display())
        }
        InputFormat::Unstructured(blocks) => {
            tracing::info!("Loaded {} raw text blocks from {}", blocks.len(), path.display())
        }
    }
    Ok(format)
}

/// 按格式分派: 结构化直接使用, 原始文本经 CodeExtractor
pub fn resolve_items(format: InputFormat, extractor: &CodeExtractor) -> Vec<ExtractedItem> {
    match format {
        InputFormat::Structured(items) => items,
        InputFormat::Unstructured(blocks) => {
            let extraction = extractor.extract(&blocks);
            if extraction.items.is_empty() {
                tracing::warn!("No DSR codes found in {} text blocks", blocks.len());
            }
            extraction.items
        }
    }
}

/// 结构化条目按字面读取, 只补齐缺省字段; 不合法的 cleanCode 视为无编码
fn prepare_structured(items: Vec<ExtractedItem>) -> Vec<ExtractedItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, mut item)| {
            if item.item_number == 0 {
                item.item_number = idx as u32 + 1;
            }

            item.clean_code = item.clean_code.trim().to_string();
            if item.clean_code.is_empty() {
                // "DSR-2023-15.12.2" -> "15.12.2"
                if let Some(tail) = item.code.rsplit('-').next().filter(|t| is_valid_clean_code(t)) {
                    item.clean_code = tail.to_string();
                }
            } else if !is_valid_clean_code(&item.clean_code) {
                tracing::warn!(
                    "Item {}: invalid code format {:?}, matching by description only",
                    item.item_number,
                    item.clean_code
                );
                item.clean_code.clear();
            }

            if item.chapter.is_empty() && item.section.is_empty() {
                let (chapter, section) = chapter_and_section(&item.clean_code);
                item.chapter = chapter;
                item.section = section;
            }
            if item.keywords.is_empty() {
                item.keywords = normalize(&item.description);
            }
            item
        })
        .collect()
}

fn text_blocks(content: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for (page_idx, page) in content.split('\u{c}').enumerate() {
        let mut lines: Vec<String> = Vec::new();
        for line in page.lines() {
            if line.trim().is_empty() {
                if !lines.is_empty() {
                    blocks.push(TextBlock::new(page_idx as u32 + 1, std::mem::take(&mut lines)));
                }
            } else {
                lines.push(line.trim().to_string());
            }
        }
        if !lines.is_empty() {
            blocks.push(TextBlock::new(page_idx as u32 + 1, lines));
        }
    }
    blocks
}

/// 读取参考分册并判定格式
///
/// - 含 `dsr_codes`: 结构化分册
/// - 含 `document` 或 `pages`: PDF 转文本的原始分册, 经 RateExtractor 抽取
pub fn load_volume(path: &Path) -> Result<VolumeFile> {
    if !path.is_file() {
        return Err(DsrError::ReferenceNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| DsrError::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| DsrError::json(path, e))?;
    let is_raw = value.get("dsr_codes").is_none() && (value.get("document").is_some() || value.get("pages").is_some());
    let mut volume = if is_raw {
        let document: RawDocument = serde_json::from_value(value).map_err(|e| DsrError::json(path, e))?;
        tracing::info!("{} is a raw text volume, extracting rates", path.display());
        RateExtractor.extract(&document.into_blocks()).0
    } else {
        serde_json::from_value::<VolumeFile>(value).map_err(|e| DsrError::json(path, e))?
    };
    if volume.metadata.source_file.is_none() {
        volume.metadata.source_file = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    tracing::info!(
        "Loaded volume {:?} from {} ({} entries)",
        volume.metadata.volume,
        path.display(),
        volume.dsr_codes.len()
    );
    Ok(volume)
}

/// 按给定顺序读取; 没有标签的分册按位置命名为 "Volume n"
pub fn load_volumes<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<VolumeFile>> {
    paths
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let mut volume = load_volume(path.as_ref())?;
            if volume.metadata.volume.trim().is_empty() {
                volume.metadata.volume = format!("Volume {}", idx + 1);
            }
            Ok(volume)
        })
        .collect()
}

/// 以缩进 JSON 写出
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| DsrError::json(path, e))?;
    fs::write(path, content).map_err(|e| DsrError::io(path, e))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_splits_blocks_on_blank_lines() {
        let blocks = text_blocks("2023-15.12.2\nDismantling doors\n\n\n10 Nos\n\u{c}Page two\n");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].lines, vec!["2023-15.12.2", "Dismantling doors"]);
        assert_eq!(blocks[1].page, 1);
        assert_eq!(blocks[2].page, 2);
    }

    #[test]
    fn structured_items_fill_missing_fields() {
        let items = prepare_structured(vec![
            ExtractedItem {
                item_number: 0,
                code: "DSR-2023-15.12.2".to_string(),
                clean_code: String::new(),
                chapter: String::new(),
                section: String::new(),
                description: "Dismantling doors".to_string(),
                unit: "nos".to_string(),
                quantity: 10.0,
                keywords: Default::default(),
            },
            ExtractedItem {
                item_number: 7,
                code: "x".to_string(),
                clean_code: "1234.5".to_string(),
                chapter: String::new(),
                section: String::new(),
                description: String::new(),
                unit: String::new(),
                quantity: 0.0,
                keywords: Default::default(),
            },
        ]);
        assert_eq!(items[0].item_number, 1);
        assert_eq!(items[0].clean_code, "15.12.2");
        assert_eq!(items[0].section, "15.12");
        assert!(items[0].keywords.contains("doors"));
        assert_eq!(items[1].item_number, 7);
        assert!(items[1].clean_code.is_empty());
        assert!(items[1].chapter.is_empty());
    }
}

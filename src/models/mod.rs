pub mod input;
pub mod item;
pub mod rate;
pub mod report;
pub mod result;
pub mod volume;

pub use input::{InputFormat, RawDocument, StructuredInput, TextBlock, INPUT_ITEMS_TYPE};
pub use item::{chapter_and_section, is_valid_clean_code, ExtractedItem};
pub use rate::{RateRecord, DEFAULT_CATEGORY};
pub use report::{MatchReport, MatchSummary, MatchedItemRow, ReportDocument, SourceFiles};
pub use result::{MatchResult, MatchType};
pub use volume::{VolumeEntry, VolumeFile, VolumeMetadata};

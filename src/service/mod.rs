pub mod extractor;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod rate_extractor;
pub mod report;
pub mod similarity;
pub mod store;

pub use extractor::{CodeExtractor, Extraction, ExtractionStats};
pub use matcher::{MatchEngine, MatchOptions};
pub use rate_extractor::{RateExtractionStats, RateExtractor};
pub use report::ReportBuilder;
pub use similarity::{score, PreparedText};
pub use store::{DuplicatePolicy, IngestStats, ReferenceStore, ReferenceStoreBuilder, VolumeOrdinalPolicy};

pub mod export;
pub mod pool;
pub mod queries;

pub use export::{export_report_csv, export_store_csv};
pub use pool::{create_pool, open_pool};
pub use queries::*;

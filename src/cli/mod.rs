pub mod args;
pub mod handlers;

pub use args::{Cli, Command, ConvertArgs, IngestArgs, MatchArgs};
pub use handlers::{print_summary, run, run_convert, run_ingest, run_match};

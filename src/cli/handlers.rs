use crate::cli::args::{Cli, Command, ConvertArgs, IngestArgs, MatchArgs};
use crate::config::AppConfig;
use crate::db::{self, create_pool, open_pool};
use crate::error::{DsrError, Result};
use crate::models::{InputFormat, MatchReport, ReportDocument, SourceFiles, StructuredInput, DEFAULT_CATEGORY};
use crate::service::loader::{load_input, load_volumes, resolve_items, save_json};
use crate::service::{CodeExtractor, MatchEngine, MatchOptions, ReferenceStore, ReferenceStoreBuilder, ReportBuilder};
use std::path::{Path, PathBuf};

/// 摘要中列出的条目数
const PREVIEW_ITEMS: usize = 5;

/// 执行子命令
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::debug!("Loaded config: {:?}", config);

    match cli.command {
        Command::Ingest(args) => run_ingest(&args, &config).await.map(|_| ()),
        Command::Match(args) => run_match(&args, &config).await.map(|_| ()),
        Command::Convert(args) => run_convert(&args).map(|_| ()),
    }
}

/// 合并分册并写入数据库
pub async fn run_ingest(args: &IngestArgs, config: &AppConfig) -> Result<ReferenceStore> {
    let volumes = load_volumes(&args.volumes)?;
    let database_url = args.database.as_deref().unwrap_or(&config.database.url);
    let pool = create_pool(database_url).await?;
    tracing::info!("Database pool created");

    let category = args.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
    let mut builder = ReferenceStoreBuilder::new().default_category(category);
    if args.append {
        db::create_schema(&pool).await?;
        let existing = db::list_records(&pool).await?;
        tracing::info!("Merging into {} existing records", existing.len());
        for record in existing {
            builder.add_record(record);
        }
    }
    for volume in &volumes {
        builder.add_volume(volume);
    }

    let store = builder.build();
    if store.is_empty() {
        return Err(DsrError::EmptyReferenceStore);
    }
    db::save_store(&pool, &store).await?;

    if let Some(path) = &args.export_json {
        save_json(path, &store.export_volume("Merged reference"))?;
    }
    if let Some(path) = &args.export_csv {
        db::export_store_csv(store.records(), path)?;
    }

    let stats = store.stats();
    println!(
        "Ingested {} volume(s): {} records stored ({} duplicates resolved, {} invalid entries skipped)",
        volumes.len(),
        store.len(),
        stats.duplicates,
        stats.invalid_codes + stats.invalid_rates
    );
    Ok(store)
}

/// 加载条目与参考库, 匹配并输出报告
pub async fn run_match(args: &MatchArgs, config: &AppConfig) -> Result<MatchReport> {
    let mut options = MatchOptions::from(&config.matching);
    if let Some(threshold) = args.threshold {
        options.threshold = threshold;
    }
    if args.category.is_some() {
        options.category = args.category.clone();
    }
    if args.workers.is_some() {
        options.workers = args.workers;
    }
    if args.no_chapter_filter {
        options.chapter_prefilter = false;
    }

    let format = load_input(&args.input)?;

    let (store, references) = if args.volumes.is_empty() {
        let database_url = args.database.as_deref().unwrap_or(&config.database.url);
        let pool = open_pool(database_url).await?;
        (db::load_store(&pool).await?, vec![database_url.to_string()])
    } else {
        let volumes = load_volumes(&args.volumes)?;
        (ReferenceStore::ingest(&volumes), display_paths(&args.volumes))
    };
    if store.is_empty() {
        return Err(DsrError::EmptyReferenceStore);
    }

    let items = resolve_items(format, &CodeExtractor::default());
    let engine = MatchEngine::new(&store, options)?;
    let report = ReportBuilder::build(engine.match_all(items)?);

    if let Some(path) = &args.output {
        let project = args.project.clone().unwrap_or_else(|| file_stem(&args.input));
        let source_files = SourceFiles {
            items: args.input.display().to_string(),
            references,
        };
        save_json(path, &ReportDocument::new(&report, project, source_files))?;
    }
    if let Some(path) = &args.csv {
        db::export_report_csv(&report, path)?;
    }

    print_summary(&report);
    Ok(report)
}

/// 原始文本 -> 结构化条目文件, 返回条目数
pub fn run_convert(args: &ConvertArgs) -> Result<usize> {
    let items = match load_input(&args.input)? {
        InputFormat::Structured(items) => {
            tracing::warn!("{} is already structured, rewriting as-is", args.input.display());
            items
        }
        InputFormat::Unstructured(blocks) => {
            let extraction = CodeExtractor::default().extract(&blocks);
            let stats = &extraction.stats;
            println!(
                "Scanned {} lines in {} blocks: {} malformed, {} invalid codes, {} repeated codes",
                stats.lines, stats.blocks, stats.malformed_lines, stats.invalid_codes, stats.duplicate_codes
            );
            extraction.items
        }
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_convert_output(&args.input));
    let source_file = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let count = items.len();
    save_json(&output, &StructuredInput::new(items, source_file))?;
    println!("Wrote {} items to {}", count, output.display());
    Ok(count)
}

/// 控制台摘要
pub fn print_summary(report: &MatchReport) {
    let summary = &report.summary;
    println!("Total items:                {}", summary.total_items);
    println!("Exact matches:              {}", summary.exact_matches);
    println!("Code match, desc mismatch:  {}", summary.code_match_description_mismatch);
    println!("Similarity matches:         {}", summary.similarity_matches);
    println!("Not found:                  {}", summary.not_found);
    println!("Total estimated amount:     {:.2}", summary.total_estimated_amount);

    for result in report.items.iter().take(PREVIEW_ITEMS) {
        println!(
            "  #{} {} -> {} [{}] amount {}",
            result.item.item_number,
            if result.item.code.is_empty() { "-" } else { result.item.code.as_str() },
            result.matched_code.as_deref().unwrap_or("-"),
            result.match_type,
            result.amount.map_or_else(|| "-".to_string(), |a| format!("{a:.2}"))
        );
    }
    if report.items.len() > PREVIEW_ITEMS {
        println!("  ... {} more", report.items.len() - PREVIEW_ITEMS);
    }
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dsr-match".to_string())
}

fn default_convert_output(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}.items.json", file_stem(input)))
}

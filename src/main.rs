use clap::Parser;
use dsr_match::cli::{self, Cli};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // 初始化日志 - 使用本地时间格式; -v/-q 优先于 RUST_LOG
    let level = args.verbosity.tracing_level_filter().to_string();
    let filter = if args.verbosity.is_present() {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli::run(args).await {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!("{}", error);
            eprintln!("error: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}

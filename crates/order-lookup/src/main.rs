//! 订单查询命令行入口
//!
//! 指定 `--order-id` 时执行一次查询；否则从 stdin 逐行读取订单号。

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use order_lookup::terminal::{TerminalView, run_interactive};
use order_lookup::{HttpOrderFetcher, LookupOutcome, LookupState, LookupWidget};
use tokio::io::BufReader;

/// 订单查询工具
#[derive(Parser, Debug)]
#[command(name = "order-lookup")]
#[command(version, about = "按订单号查询订单")]
struct Cli {
    /// 订单服务地址
    #[arg(long, env = "ORDER_LOOKUP_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// 只查询这一个订单
    #[arg(long)]
    order_id: Option<String>,

    /// HTTP 请求超时（秒），不指定则不限
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数指定的级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let fetcher = HttpOrderFetcher::new(&cli.base_url, cli.timeout_secs.map(Duration::from_secs))?;
    let widget = Arc::new(LookupWidget::new(
        Arc::new(fetcher),
        Arc::new(TerminalView::stdio()),
    ));

    match cli.order_id {
        Some(order_id) => match widget.on_click(&order_id).await {
            LookupOutcome::Rendered(LookupState::Success) => Ok(ExitCode::SUCCESS),
            _ => Ok(ExitCode::FAILURE),
        },
        None => {
            run_interactive(widget, BufReader::new(tokio::io::stdin())).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

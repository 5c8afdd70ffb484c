//! 终端前端
//!
//! 结果写到 stdout；提示、加载状态与错误写到 stderr。
//! 交互模式下每行输入相当于在输入框里键入该行后按下 Enter。
//! 一次管道输入多行时查询相互重叠，只有最后一行的结果会显示，
//! 其余被丢弃的查询以 info 级别记录。

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::view::LookupView;
use crate::widget::{Key, LookupOutcome, LookupWidget};

type Sink = Mutex<Box<dyn Write + Send>>;

pub struct TerminalView {
    out: Sink,
    err: Sink,
}

impl TerminalView {
    pub fn new(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    fn write_line(sink: &Sink, text: &str) {
        let mut sink = sink.lock();
        let _ = writeln!(sink, "{text}");
        let _ = sink.flush();
    }
}

impl LookupView for TerminalView {
    fn alert(&self, message: &str) {
        Self::write_line(&self.err, &format!("! {message}"));
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            Self::write_line(&self.err, "Loading...");
        }
    }

    fn clear(&self) {}

    fn show_result(&self, text: &str) {
        Self::write_line(&self.out, text);
    }

    fn show_error(&self, text: &str) {
        Self::write_line(&self.err, text);
    }
}

/// 交互循环：逐行读取输入并发起查询，输入结束后等待所有查询完成
///
/// 返回被更新查询取代而丢弃的查询数。
pub async fn run_interactive<R>(widget: Arc<LookupWidget>, input: R) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut lookups = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let widget = widget.clone();
        lookups.spawn(async move {
            let outcome = widget.on_key(Key::Enter, &line).await;
            (line, outcome)
        });
    }

    let mut discarded = 0;
    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((line, LookupOutcome::Discarded)) => {
                discarded += 1;
                info!(order_id = line.trim(), "已有更新的查询，本次结果未显示");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "查询任务异常退出"),
        }
    }

    Ok(discarded)
}

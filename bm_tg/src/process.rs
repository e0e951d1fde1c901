use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;

use anyhow::Context;
use bm_session::ProcessController;
use parking_lot::Mutex;

/// Module the trading bot is started as
pub const BOT_MODULE: &str = "binance_trade_bot";

/// Starts the trading bot with Python and finds or stops it by command line with `pgrep`/`pkill`
pub struct ShellProcessController {
    bot_path: PathBuf,
    python_path: String,
    pattern: String,
    child: Mutex<Option<Child>>,
}

impl ShellProcessController {
    pub fn new(bot_path: impl Into<PathBuf>, python_path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { bot_path: bot_path.into(), python_path: python_path.into(), pattern: pattern.into(), child: Mutex::new(None) }
    }

    /// Whether the process we spawned is still alive, reaping it once it exited
    fn own_child_running(&self) -> bool {
        let mut child = self.child.lock();
        let Some(process) = child.as_mut() else {
            return false;
        };
        match process.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::info!(%status, "Trade bot process exited");
                *child = None;
                false
            }
            Err(err) => {
                tracing::warn!("Cannot poll trade bot process: {err}");
                false
            }
        }
    }

    fn pgrep(&self) -> bool {
        match Command::new("pgrep").arg("-f").arg(&self.pattern).stdout(Stdio::null()).stderr(Stdio::null()).status() {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!("pgrep failed: {err}");
                false
            }
        }
    }
}

impl ProcessController for ShellProcessController {
    fn is_running(&self) -> bool {
        self.own_child_running() || self.pgrep()
    }

    fn start(&self) -> anyhow::Result<()> {
        let child = Command::new(&self.python_path)
            .arg("-m")
            .arg(BOT_MODULE)
            .current_dir(&self.bot_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("starting {} -m {BOT_MODULE} in {}", self.python_path, self.bot_path.display()))?;

        tracing::info!(pid = child.id(), "Trade bot started");
        *self.child.lock() = Some(child);
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        let status = Command::new("pkill").arg("-f").arg(&self.pattern).status().context("running pkill")?;
        // pkill exits with 1 when nothing matched
        match status.code() {
            Some(0) | Some(1) => {}
            _ => anyhow::bail!("pkill -f {} failed: {status}", self.pattern),
        }
        tracing::info!("Trade bot stop signalled");
        self.own_child_running();
        Ok(())
    }
}

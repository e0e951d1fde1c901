use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use bm_session::UpdateStatus;
use bm_session::UpdateTarget;
use bm_session::Updater;

/// Updates the manager and the trading bot from their git upstreams
pub struct GitUpdater {
    manager_path: PathBuf,
    bot_path: PathBuf,
}

impl GitUpdater {
    pub fn new(manager_path: impl Into<PathBuf>, bot_path: impl Into<PathBuf>) -> Self {
        Self { manager_path: manager_path.into(), bot_path: bot_path.into() }
    }

    fn checkout(&self, target: UpdateTarget) -> &Path {
        match target {
            UpdateTarget::Manager => &self.manager_path,
            UpdateTarget::TradeBot => &self.bot_path,
        }
    }
}

impl Updater for GitUpdater {
    fn check(&self, target: UpdateTarget) -> anyhow::Result<UpdateStatus> {
        let dir = self.checkout(target);
        git(dir, &["fetch", "--quiet"])?;
        let behind = parse_count(&git(dir, &["rev-list", "--count", "HEAD..@{u}"])?)?;
        tracing::debug!(?target, behind, "Checked for updates");
        Ok(if behind == 0 { UpdateStatus::UpToDate } else { UpdateStatus::Available { commits: behind } })
    }

    fn apply(&self, target: UpdateTarget) -> anyhow::Result<()> {
        let dir = self.checkout(target);
        git(dir, &["pull", "--ff-only", "--quiet"])?;
        tracing::info!(?target, dir = %dir.display(), "Update pulled");
        Ok(())
    }
}

/// Run git in `dir`, returning stdout; a non-zero exit becomes an error carrying stderr
fn git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git").arg("-C").arg(dir).args(args).output().with_context(|| format!("running git {}", args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} in {} failed: {}", args.join(" "), dir.display(), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_count(output: &str) -> anyhow::Result<u32> {
    output.trim().parse().with_context(|| format!("unexpected rev-list output {:?}", output.trim()))
}

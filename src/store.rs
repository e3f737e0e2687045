use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use levy_ledger::{Ledger, LedgerConfig, LedgerError};
use log::debug;

/// Default state file when neither `--state` nor `LEVY_STATE` is given.
pub const DEFAULT_STATE: &str = "levy.state.json";

pub fn read_config(path: &Path) -> Result<LedgerConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: LedgerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

pub fn load(path: &Path) -> Result<Ledger> {
    let bytes = fs::read(path).with_context(|| {
        format!(
            "read ledger state {} (run `levy init` first?)",
            path.display()
        )
    })?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse ledger state {}", path.display()))
}

/// Write the ledger next to `path` and rename it into place, so a crash
/// never leaves a half-written state file.
pub fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("mkdir {}", parent.display()))?;
    }
    let tmp = tmp_path(path);
    let json = serde_json::to_vec_pretty(ledger).context("encode ledger state")?;
    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(&json)
            .with_context(|| format!("write {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("sync {}", tmp.display()))?;
    }
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    debug!("saved ledger state → {}", path.display());
    Ok(())
}

pub fn create(path: &Path, ledger: &Ledger, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to replace it",
            path.display()
        );
    }
    save(path, ledger)
}

/// Load, apply one operation, and persist only if it succeeded.
pub fn mutate<R>(
    path: &Path,
    op: impl FnOnce(&mut Ledger) -> Result<R, LedgerError>,
) -> Result<R> {
    let mut ledger = load(path)?;
    let out = op(&mut ledger).context("operation rejected")?;
    save(path, &ledger)?;
    Ok(out)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_STATE.into());
    name.push(".tmp");
    path.with_file_name(name)
}

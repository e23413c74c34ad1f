use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn tometo_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".tometo"))
}

pub fn ensure_tometo_home() -> Result<PathBuf> {
    let dir = tometo_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_board_path() -> Result<PathBuf> {
    Ok(tometo_home()?.join("board.json"))
}

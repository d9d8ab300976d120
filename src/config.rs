//! Settings from `~/.config/seam.toml`. Flags override any of these.

use std::{fs, io};

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use serde_derive::Deserialize;

use crate::filter;

#[inline]
fn definclude() -> String {
    String::from("*.md")
}

#[inline]
fn defbackups() -> bool {
    true
}

#[inline]
fn defwindow() -> f64 {
    1.0
}

fn defignores() -> Vec<String> {
    filter::DEFAULT_IGNORES
        .iter()
        .map(|s| String::from(*s))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct Configuration {
    #[serde(default = "definclude")]
    pub include: String,
    #[serde(default = "defbackups")]
    pub backups: bool,
    #[serde(default = "defwindow")]
    pub conflict_window_seconds: f64,
    #[serde(default = "defignores")]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub state_dir: Option<Utf8PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            include: definclude(),
            backups: defbackups(),
            conflict_window_seconds: defwindow(),
            ignores: defignores(),
            state_dir: None,
        }
    }
}

pub fn load() -> Result<Configuration> {
    let mut confpath: Utf8PathBuf = home::home_dir()
        .ok_or_else(|| anyhow!("Can't find home directory"))?
        .try_into()
        .context("Home directory isn't UTF-8")?;
    confpath.extend([".config", "seam.toml"]);
    load_from(&confpath)
}

fn load_from(confpath: &Utf8Path) -> Result<Configuration> {
    let s = match fs::read_to_string(confpath) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Configuration::default()),
        found => found,
    }
    .with_context(|| format!("Couldn't open {confpath}"))?;
    let conf = toml::from_str(&s).with_context(|| format!("Couldn't parse {confpath}"))?;
    Ok(conf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_means_defaults() -> Result<()> {
        let conf = load_from(Utf8Path::new("/no/such/seam.toml"))?;
        assert_eq!(conf.include, "*.md");
        assert!(conf.backups);
        assert_eq!(conf.conflict_window_seconds, 1.0);
        assert_eq!(conf.ignores, defignores());
        assert_eq!(conf.state_dir, None);
        Ok(())
    }

    #[test]
    fn partial_file_fills_in_the_rest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join("seam.toml")).unwrap();
        fs::write(
            &path,
            "include = \"*\"\nbackups = false\nstate_dir = \"/tmp/seam-state\"\n",
        )?;

        let conf = load_from(&path)?;
        assert_eq!(conf.include, "*");
        assert!(!conf.backups);
        assert_eq!(conf.conflict_window_seconds, 1.0);
        assert_eq!(conf.state_dir.as_deref(), Some(Utf8Path::new("/tmp/seam-state")));
        Ok(())
    }

    #[test]
    fn garbage_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join("seam.toml")).unwrap();
        fs::write(&path, "include = [this is not toml")?;
        assert!(load_from(&path).is_err());
        Ok(())
    }
}

//! Discovery: walk both roots and build the sorted union of candidate
//! relative paths.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::*;
use walkdir::WalkDir;

use crate::filter::{IncludeGlob, Matcher};

/// Walks both roots and returns every kept relative path from either side,
/// ordered lexicographically on the slash-normalized form.
///
/// The processing order of the whole run hangs off this sort, so it's done
/// on the string form: componentwise path comparison disagrees with it for
/// names straddling a separator (`a-b` vs. `a/b`).
pub fn sorted_union(
    root_a: &Utf8Path,
    root_b: &Utf8Path,
    include: &IncludeGlob,
    ignores: &dyn Matcher,
) -> Result<Vec<Utf8PathBuf>> {
    let mut union = BTreeSet::new();
    collect_relative_paths(root_a, include, ignores, &mut union)?;
    collect_relative_paths(root_b, include, ignores, &mut union)?;

    let mut sorted: Vec<Utf8PathBuf> = union.into_iter().collect();
    sorted.sort_by(|x, y| x.as_str().cmp(y.as_str()));
    Ok(sorted)
}

/// Walks `root` depth-first, adding each surviving file's slash-normalized
/// relative path to `into`. Ignored directories are pruned without
/// descending; any walk error is fatal.
fn collect_relative_paths(
    root: &Utf8Path,
    include: &IncludeGlob,
    ignores: &dyn Matcher,
    into: &mut BTreeSet<Utf8PathBuf>,
) -> Result<()> {
    debug!("Walking {root}");
    let mut walk = WalkDir::new(root).into_iter();
    while let Some(entry) = walk.next() {
        let entry = entry.with_context(|| format!("Couldn't walk {root}"))?;
        let path = Utf8Path::from_path(entry.path())
            .with_context(|| format!("{} isn't UTF-8", entry.path().display()))?;
        let rel = match path.strip_prefix(root) {
            Ok(r) if !r.as_str().is_empty() => slash_normalized(r),
            // The root itself, or something walkdir handed us that isn't
            // under the root. Either way, not a candidate.
            _ => continue,
        };

        if entry.file_type().is_dir() {
            if ignores.matches(&rel, true) {
                debug!("{:>9} {rel}/", "prune");
                walk.skip_current_dir();
            }
            continue;
        }
        // Symlinks and other exotica don't sync.
        if !entry.file_type().is_file() {
            trace!("{:>9} {rel}", "not-file");
            continue;
        }
        if ignores.matches(&rel, false) {
            trace!("{:>9} {rel}", "ignore");
            continue;
        }
        if !include.keeps(&rel) {
            trace!("{:>9} {rel}", "excluded");
            continue;
        }
        into.insert(rel);
    }
    Ok(())
}

/// Forward-slash form of a relative path, whatever the platform separator.
fn slash_normalized(rel: &Utf8Path) -> Utf8PathBuf {
    rel.components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
        .into()
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::filter::{DEFAULT_IGNORES, GitignoreMatcher};

    fn utf8_temp() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        (dir, path)
    }

    fn touch(root: &Utf8Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn union_is_sorted_and_deduplicated() -> Result<()> {
        let (_da, root_a) = utf8_temp();
        let (_db, root_b) = utf8_temp();

        touch(&root_a, "b.md");
        touch(&root_a, "sub/z.md");
        touch(&root_b, "b.md");
        touch(&root_b, "a.md");

        let include = IncludeGlob::new("*.md")?;
        let ignores = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        let union = sorted_union(&root_a, &root_b, &include, &ignores)?;

        assert_eq!(union, ["a.md", "b.md", "sub/z.md"].map(Utf8PathBuf::from));
        Ok(())
    }

    #[test]
    fn ignored_directories_are_pruned() -> Result<()> {
        let (_da, root_a) = utf8_temp();
        let (_db, root_b) = utf8_temp();

        touch(&root_a, ".obsidian/workspace.json");
        touch(&root_a, ".git/config");
        touch(&root_a, "kept.md");
        touch(&root_a, "sub/.DS_Store");

        let include = IncludeGlob::new("")?;
        let ignores = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        let union = sorted_union(&root_a, &root_b, &include, &ignores)?;

        assert_eq!(union, ["kept.md"].map(Utf8PathBuf::from));
        Ok(())
    }

    #[test]
    fn missing_root_is_fatal() -> Result<()> {
        let (_da, root_a) = utf8_temp();
        let include = IncludeGlob::new("")?;
        let ignores = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        let gone = root_a.join("never-made");
        assert!(sorted_union(&gone, &root_a, &include, &ignores).is_err());
        Ok(())
    }

    #[test]
    fn order_follows_the_string_form() -> Result<()> {
        let (_da, root_a) = utf8_temp();
        let (_db, root_b) = utf8_temp();

        touch(&root_a, "a/b.md");
        touch(&root_a, "a-b.md");

        let include = IncludeGlob::new("")?;
        let ignores = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        let union = sorted_union(&root_a, &root_b, &include, &ignores)?;

        // '-' sorts before '/'
        assert_eq!(union, ["a-b.md", "a/b.md"].map(Utf8PathBuf::from));
        Ok(())
    }
}

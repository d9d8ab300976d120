//! Decides which files take part in a sync: gitignore-style skip patterns
//! plus a shell-style include glob.

use anyhow::{Context, Result};
use camino::Utf8Path;
use glob::{MatchOptions, Pattern};
use ignore::gitignore::GitignoreBuilder;

/// Patterns every notes directory wants filtered out.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".obsidian/",
    ".git/",
    "node_modules/",
    "@eaDir/",
    // A leading # starts a comment in gitignore syntax, hence the escape.
    "\\#recycle/",
    ".Trash*",
    ".DS_Store",
    "._*",
    "Thumbs.db",
    "desktop.ini",
];

/// Skip-this-path predicate consulted during discovery.
///
/// Directories are consulted before descent (a match prunes the whole
/// subtree), files right before inclusion.
pub trait Matcher {
    fn matches(&self, relpath: &Utf8Path, is_dir: bool) -> bool;
}

/// [`Matcher`] over a compiled set of gitignore-style patterns.
pub struct GitignoreMatcher {
    inner: ignore::gitignore::Gitignore,
}

impl GitignoreMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder
                .add_line(None, pattern)
                .with_context(|| format!("Bad ignore pattern {pattern}"))?;
        }
        let inner = builder.build().context("Couldn't compile ignore patterns")?;
        Ok(Self { inner })
    }
}

impl Matcher for GitignoreMatcher {
    fn matches(&self, relpath: &Utf8Path, is_dir: bool) -> bool {
        self.inner
            .matched(relpath.as_std_path(), is_dir)
            .is_ignore()
    }
}

/// The include side: a shell glob matched against the slash-normalized
/// relative path or its base name. An empty pattern keeps everything.
pub struct IncludeGlob {
    pattern: Option<Pattern>,
}

impl IncludeGlob {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = if pattern.is_empty() {
            None
        } else {
            let compiled = Pattern::new(pattern)
                .with_context(|| format!("Bad include glob {pattern}"))?;
            Some(compiled)
        };
        Ok(Self { pattern })
    }

    pub fn keeps(&self, relpath: &Utf8Path) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        // Shell semantics against the whole relative path: `*` stops at `/`.
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        if pattern.matches_with(relpath.as_str(), options) {
            return true;
        }
        relpath
            .file_name()
            .is_some_and(|name| pattern.matches(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_glob_keeps_all() -> Result<()> {
        let all = IncludeGlob::new("")?;
        assert!(all.keeps(Utf8Path::new("a.md")));
        assert!(all.keeps(Utf8Path::new("deep/down/b.txt")));
        Ok(())
    }

    #[test]
    fn glob_matches_base_name_at_any_depth() -> Result<()> {
        let md = IncludeGlob::new("*.md")?;
        assert!(md.keeps(Utf8Path::new("a.md")));
        assert!(md.keeps(Utf8Path::new("Personal/Note.md")));
        assert!(!md.keeps(Utf8Path::new("Personal/photo.jpg")));
        Ok(())
    }

    #[test]
    fn glob_star_stays_within_one_directory() -> Result<()> {
        let docs = IncludeGlob::new("docs/*.md")?;
        assert!(docs.keeps(Utf8Path::new("docs/a.md")));
        assert!(!docs.keeps(Utf8Path::new("docs/sub/a.md")));
        assert!(!docs.keeps(Utf8Path::new("other/a.md")));
        Ok(())
    }

    #[test]
    fn directory_patterns_only_hit_directories() -> Result<()> {
        let ig = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        assert!(ig.matches(Utf8Path::new(".obsidian"), true));
        assert!(!ig.matches(Utf8Path::new(".obsidian"), false));
        assert!(ig.matches(Utf8Path::new("node_modules"), true));
        assert!(ig.matches(Utf8Path::new("#recycle"), true));
        assert!(!ig.matches(Utf8Path::new("notes"), true));
        Ok(())
    }

    #[test]
    fn file_patterns_hit_at_any_depth() -> Result<()> {
        let ig = GitignoreMatcher::new(DEFAULT_IGNORES)?;
        assert!(ig.matches(Utf8Path::new(".DS_Store"), false));
        assert!(ig.matches(Utf8Path::new("sub/dir/.DS_Store"), false));
        assert!(ig.matches(Utf8Path::new("._resource-fork"), false));
        assert!(ig.matches(Utf8Path::new(".Trashes"), false));
        assert!(!ig.matches(Utf8Path::new("keep.md"), false));
        Ok(())
    }

    #[test]
    fn bad_include_glob_is_an_error() {
        assert!(IncludeGlob::new("[").is_err());
    }
}

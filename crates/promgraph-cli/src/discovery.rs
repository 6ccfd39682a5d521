//! Rule file discovery from command-line patterns.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use promgraph_error::{Error, Result};

/// Expand each pattern as a glob, in argument order.
///
/// Invalid patterns are logged and skipped, as are patterns that match
/// nothing. Paths matched by more than one pattern are kept once. An empty
/// result is an error.
pub fn discover_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(err) => {
                error!(pattern = %pattern, error = %err, "failed to expand glob");
                continue;
            }
        };

        let mut matched = 0usize;
        for entry in entries {
            match entry {
                Ok(path) => {
                    matched += 1;
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "unreadable glob match");
                }
            }
        }

        if matched == 0 {
            warn!(pattern = %pattern, "pattern matched no files");
        } else {
            debug!(pattern = %pattern, matched, "expanded pattern");
        }
    }

    info!(files = files.len(), "rule file discovery done");

    if files.is_empty() {
        return Err(Error::invalid_argument("no rule files matched the given patterns")
            .with_operation("discovery::discover_files")
            .with_context("patterns", patterns.join(" ")));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use promgraph_error::ErrorKind;
    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "").unwrap();
        path
    }

    fn pattern(dir: &TempDir, glob: &str) -> String {
        dir.path().join(glob).to_string_lossy().to_string()
    }

    #[test]
    fn test_expands_globs_in_order_and_dedups() {
        let dir = TempDir::new().unwrap();
        let b = touch(&dir, "b.rules");
        let a = touch(&dir, "a.rules");
        touch(&dir, "notes.txt");

        let files = discover_files(&[
            pattern(&dir, "b.rules"),
            pattern(&dir, "*.rules"),
        ])
        .unwrap();
        assert_eq!(files, vec![b, a]);
    }

    #[test]
    fn test_skips_invalid_and_empty_patterns() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.rules");

        let files = discover_files(&[
            "[".to_string(),
            pattern(&dir, "missing-*.yml"),
            pattern(&dir, "a.rules"),
        ])
        .unwrap();
        assert_eq!(files, vec![a]);
    }

    #[test]
    fn test_nothing_matched_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover_files(&[pattern(&dir, "*.rules")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

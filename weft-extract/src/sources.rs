//! Source-glob resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink};

/// Resolve glob patterns to a deduplicated, sorted set of absolute paths.
///
/// Relative patterns are anchored at `root`. A malformed pattern or an
/// unreadable directory degrades to a warning; the remaining patterns still
/// resolve. Sorted output keeps re-runs byte-identical.
pub fn resolve_globs(patterns: &[String], root: &Path, sink: &mut DiagnosticSink) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let anchored = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            root.join(pattern).display().to_string()
        };
        let entries = match glob::glob(&anchored) {
            Ok(entries) => entries,
            Err(err) => {
                sink.push(
                    Diagnostic::warning(
                        DiagnosticCode::SourceFileSkipped,
                        format!("Invalid glob pattern {pattern}: {err}"),
                    )
                    .at(pattern.clone()),
                );
                continue;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(err) => {
                    sink.push(
                        Diagnostic::warning(
                            DiagnosticCode::SourceFileSkipped,
                            format!("Unreadable path while expanding {pattern}: {err}"),
                        )
                        .at(pattern.clone()),
                    );
                }
            }
        }
    }
    files.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir_all(&tools).unwrap();
        std::fs::write(tools.join("b.ts"), "export {};").unwrap();
        std::fs::write(tools.join("a.ts"), "export {};").unwrap();
        std::fs::write(tools.join("skip.txt"), "").unwrap();

        let mut sink = DiagnosticSink::new();
        let files = resolve_globs(&["tools/**/*.ts".to_string()], dir.path(), &mut sink);

        assert!(sink.is_empty());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("tools/a.ts"));
        assert!(files[1].ends_with("tools/b.ts"));
    }

    #[test]
    fn test_duplicate_patterns_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.ts"), "export {};").unwrap();

        let mut sink = DiagnosticSink::new();
        let files = resolve_globs(
            &["*.ts".to_string(), "only.ts".to_string()],
            dir.path(),
            &mut sink,
        );
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_bad_pattern_warns_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.ts"), "export {};").unwrap();

        let mut sink = DiagnosticSink::new();
        let files = resolve_globs(
            &["[".to_string(), "*.ts".to_string()],
            dir.path(),
            &mut sink,
        );
        assert_eq!(files.len(), 1);
        assert_eq!(sink.len(), 1);
    }
}

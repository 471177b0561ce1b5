//! Public facade: one configured parser, many documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{self, Config};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, Severity};
use crate::error::FileSystemError;
use crate::pipeline::{CancellationToken, ParseResult, Pipeline};
use crate::registry::AnalyzerRegistry;

/// Source of document bytes for `parse_file`.
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FileSystemError>;
}

/// Reads documents from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl DocumentReader for FsReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        std::fs::read(path).map_err(|source| FileSystemError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parses README documents into `ParseResult`s.
///
/// Construct once and reuse; the registry is shared read-only by every call.
pub struct ReadmeParser {
    config: Config,
    pipeline: Pipeline,
    reader: Box<dyn DocumentReader>,
}

impl ReadmeParser {
    /// A parser with the built-in analyzers plus the config's pattern
    /// analyzers.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config::validate(&config)?;
        let registry = AnalyzerRegistry::with_builtins(&config)?;
        Self::with_registry(config, registry)
    }

    /// A parser over a caller-built registry.
    pub fn with_registry(config: Config, registry: AnalyzerRegistry) -> anyhow::Result<Self> {
        config::validate(&config)?;
        let pipeline = Pipeline::new(Arc::new(registry), &config)?;
        Ok(Self {
            config,
            pipeline,
            reader: Box::new(FsReader),
        })
    }

    /// Replace the reader used by `parse_file`.
    pub fn with_reader(mut self, reader: impl DocumentReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        self.pipeline.registry()
    }

    pub fn parse_content(&self, text: &str) -> ParseResult {
        self.pipeline.run(text, &CancellationToken::new())
    }

    /// Like `parse_content`, stopping at the next stage boundary once `cancel`
    /// is triggered.
    pub fn parse_content_with_cancel(&self, text: &str, cancel: &CancellationToken) -> ParseResult {
        self.pipeline.run(text, cancel)
    }

    /// Read and parse a document. An unreadable file yields a failed result,
    /// never an `Err`.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ParseResult {
        let path = path.as_ref();
        match self.reader.read(path) {
            Ok(bytes) => self.pipeline.run_bytes(&bytes, &CancellationToken::new()),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "document unreadable");
                ParseResult::unreadable(
                    Diagnostic::new(
                        Severity::Critical,
                        DiagnosticCategory::Input,
                        "E_DOCUMENT_UNREADABLE",
                        err.to_string(),
                    )
                    .with_remediation("check the path and its permissions"),
                )
            }
        }
    }
}

/// README-like files under `root`, sorted. Hidden and vendored directories
/// are skipped.
pub fn find_readmes(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            let skip = e.depth() > 0
                && e.file_type().is_dir()
                && (name.starts_with('.') || name == "node_modules" || name == "vendor" || name == "target");
            !skip
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let is_readme = name == "readme"
            || (name.starts_with("readme.")
                && [".md", ".markdown", ".mdx", ".txt"].iter().any(|ext| name.ends_with(ext)));
        if is_readme {
            found.push(entry.path().to_path_buf());
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unreadable;

    impl DocumentReader for Unreadable {
        fn read(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
            Err(FileSystemError {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[test]
    fn test_unreadable_file_is_a_failed_result() {
        let parser = ReadmeParser::new(Config::default()).unwrap().with_reader(Unreadable);
        let result = parser.parse_file("README.md");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "E_DOCUMENT_UNREADABLE");
        assert!(result.errors[0].message.contains("README.md"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: Config = serde_yaml::from_str("conflict_margin: 2.0").unwrap();
        assert!(ReadmeParser::new(config).is_err());
    }

    #[test]
    fn test_invalid_config_rejected_with_custom_registry() {
        let registry = AnalyzerRegistry::with_builtins(&Config::default()).unwrap();
        let config = Config {
            conflict_margin: Some(2.0),
            ..Config::default()
        };
        assert!(ReadmeParser::with_registry(config, registry).is_err());
    }

    #[test]
    fn test_find_readmes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# root").unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/readme.markdown"), "# docs").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/README.md"), "# dep").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# notes").unwrap();

        let found = find_readmes(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("README.md"));
        assert!(found[1].ends_with("docs/readme.markdown"));
    }
}

//! readme-lens - structured project metadata from README documents.
//!
//! A README is parsed into a tree of blocks, several independent analyzers
//! extract languages, commands, dependencies, testing tools and project
//! metadata from it, and an aggregator merges their findings into one
//! confidence-scored `ProjectInfo`.
//!
//! # Architecture
//!
//! - `document`: Markdown to an addressable block tree
//! - `analysis`: the `Analyzer` contract and typed results
//! - `analyzers`: the built-in analyzers and their knowledge catalog
//! - `context`: language context spans shared with later analyzers
//! - `registry`: validated, ordered analyzer set
//! - `pipeline`: stage ordering, failure isolation, timeouts, cancellation
//! - `aggregate`: merging, conflict resolution and suggestions
//! - `readme`: the `ReadmeParser` facade
//!
//! # Example
//!
//! ```no_run
//! use readme_lens::{Config, ReadmeParser};
//!
//! let parser = ReadmeParser::new(Config::default())?;
//! let result = parser.parse_file("README.md");
//! if let Some(project) = result.data {
//!     println!("{:?}", project.primary_language);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Adding an Analyzer
//!
//! Implement `Analyzer` and register it on an `AnalyzerRegistry` built with
//! `AnalyzerRegistry::with_builtins`, then hand the registry to
//! `ReadmeParser::with_registry`.

pub mod aggregate;
pub mod analysis;
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod project;
pub mod readme;
pub mod registry;
pub mod report;
pub mod score;

pub use analysis::{AnalysisPayload, AnalysisResult, Analyzer, Capabilities};
pub use config::Config;
pub use context::{ContextIndex, LanguageContext};
pub use diagnostics::{Diagnostic, DiagnosticCategory, Severity, Suggestion};
pub use document::{DocumentParser, DocumentTree};
pub use error::{AnalyzerError, FileSystemError, ParseError, RegistrationError};
pub use pipeline::{CancellationToken, ParseResult, PipelineState};
pub use project::ProjectInfo;
pub use readme::{DocumentReader, FsReader, ReadmeParser};
pub use registry::AnalyzerRegistry;

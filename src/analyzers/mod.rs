//! Built-in analyzers and the knowledge catalog they share.

pub mod catalog;
mod commands;
mod custom;
mod dependencies;
mod language;
mod metadata;
mod shell;
mod testing;

pub use commands::{classify, Classified, CommandExtractor, CommandPattern};
pub use custom::PatternAnalyzer;
pub use dependencies::{parse_install, DependencyExtractor};
pub use language::LanguageDetector;
pub use metadata::{normalize_license, normalize_repository, MetadataExtractor};
pub use testing::TestingDetector;

/// Names of the built-in analyzers in registration order.
pub const BUILTIN_ANALYZERS: &[&str] = &[
    LanguageDetector::NAME,
    CommandExtractor::NAME,
    DependencyExtractor::NAME,
    TestingDetector::NAME,
    MetadataExtractor::NAME,
];

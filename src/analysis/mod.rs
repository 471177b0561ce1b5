//! Analyzer contract and typed results.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ DocumentTree │────▶│ Analyzer     │────▶│ AnalysisResult │
//! └──────────────┘     │ (name,       │     │ (payload,      │
//!        ▲             │  analyze)    │     │  confidence,   │
//!        │             └──────────────┘     │  sources)      │
//! ┌──────────────┐            ▲             └────────────────┘
//! │ ContextIndex │────────────┘
//! └──────────────┘
//! ```

mod findings;
mod result;
mod traits;

pub use findings::{
    merge_evidence, Command, CommandCategory, CommandSource, EnvVar, Finding, FrameworkFinding,
    LanguageSummary, MetadataField, Package,
};
pub use result::{payload_sizes, AnalysisPayload, AnalysisResult, Category};
pub use traits::{Analyzer, Capabilities};

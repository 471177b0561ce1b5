//! Markdown document model.

mod parser;
mod types;

pub use parser::{DocumentParser, DEFAULT_MAX_BYTES};
pub use types::{Block, BlockKind, DocumentTree, LineRange, ParseWarning};

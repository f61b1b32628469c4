//! Glint semantic analysis: takes a freshly parsed module plus the metadata
//! of its imports and produces a fully typed, fully resolved AST.
//!
//! The pass is a single mutually recursive walk with a fixed order: imports
//! load first, then every function signature, then every body. Rewrites
//! happen in place by writing a new node handle into the slot that referred
//! to the old one.

pub mod analyzer;
pub mod elf;
pub mod errors;
pub mod eval;
pub mod loader;
pub mod metadata;
pub mod spellcheck;

mod convert;

pub use analyzer::{analyse, AnalysisResult};
pub use errors::{FatalError, IceError, SemanticError, SemanticWarning, TypeError, TypeWarning};
pub use metadata::{ModuleDescription, METADATA_FILE_EXTENSION, METADATA_SECTION_NAME};

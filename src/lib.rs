// camt.053 statement downgrade pipeline with bexio import fixes
pub mod document;
pub mod entry_fixes;
pub mod normalize;
pub mod ordering;
pub mod reporter;
pub mod schema_version;
pub mod transformation_engine;
pub mod validation;

// Re-export core types for convenience
pub use document::{DocumentError, Element, XmlDocument};
pub use entry_fixes::{CopyMode, EntryFixer};
pub use normalize::TimestampNormalizer;
pub use ordering::ChildOrdering;
pub use reporter::{BatchReport, FileReport, ReportFormat, TransformationReporter};
pub use schema_version::{is_camt053_namespace, TargetVersion};
pub use transformation_engine::{
    TransformOptions, TransformationEngine, TransformationError, TransformationResult,
    TransformationSummary,
};
pub use validation::{validate_document, ValidationError, ValidationReport, ValidationWarning};

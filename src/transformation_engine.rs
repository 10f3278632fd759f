use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    document::{DocumentError, Element, XmlDocument},
    entry_fixes::{CopyMode, EntryFixer, DEFAULT_EMPTY_MARKERS, DEFAULT_SEPARATOR},
    normalize::TimestampNormalizer,
    ordering::ChildOrdering,
    schema_version::{is_camt053_namespace, TargetVersion},
};

/// Configuration for one pipeline run; passed in explicitly, never global.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub target: TargetVersion,
    pub copy_mode: CopyMode,
    pub empty_markers: Vec<String>,
    pub separator: String,
}

impl TransformOptions {
    pub fn new(target: TargetVersion) -> Self {
        Self {
            target,
            copy_mode: CopyMode::Off,
            empty_markers: DEFAULT_EMPTY_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    pub fn with_copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.copy_mode = copy_mode;
        self
    }

    pub fn with_empty_markers(mut self, empty_markers: Vec<String>) -> Self {
        self.empty_markers = empty_markers;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Counts of changes applied to one document, by fix category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationSummary {
    pub timestamps_normalized: usize,
    pub adr_tp_removed: usize,
    pub debit_sum_fixed: bool,
    pub valdt_added_on_entries: usize,
    pub bktxcd_fixed_on_entries: usize,
    pub bktxcd_fixed_on_txdtls: usize,
    pub reordered_ntry: usize,
    pub reordered_txdtls: usize,
    pub addtl_ntry_inf_changed: usize,
}

/// Result of transforming one document.
#[derive(Debug, Clone)]
pub struct TransformationResult {
    pub summary: TransformationSummary,
    pub source_namespace: String,
    pub target_namespace: String,
}

/// Errors that can occur during transformation.
#[derive(Debug, Error)]
pub enum TransformationError {
    #[error("input is not a camt.053 statement (root namespace: {0:?})")]
    SchemaMismatch(String),

    #[error("XML document error: {0}")]
    Document(#[from] DocumentError),
}

/// Drives the fixed stage order over one parsed statement document:
/// namespace retag, address-type strip, summary sign fix, per-entry fixes,
/// timestamp normalization, canonical reordering.
pub struct TransformationEngine {
    options: TransformOptions,
    normalizer: TimestampNormalizer,
    fixer: EntryFixer,
    ntry_ordering: ChildOrdering,
    tx_dtls_ordering: ChildOrdering,
}

impl TransformationEngine {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            normalizer: TimestampNormalizer::new(),
            fixer: EntryFixer::new(),
            ntry_ordering: ChildOrdering::ntry(),
            tx_dtls_ordering: ChildOrdering::tx_dtls(),
        }
    }

    pub fn target(&self) -> TargetVersion {
        self.options.target
    }

    /// Transform the document in place and report what changed.
    pub fn transform(
        &self,
        document: &mut XmlDocument,
    ) -> Result<TransformationResult, TransformationError> {
        let source_namespace = document.namespace.clone();
        if !is_camt053_namespace(&source_namespace) {
            return Err(TransformationError::SchemaMismatch(source_namespace));
        }

        let target_namespace = self.options.target.namespace().to_string();
        document.namespace = target_namespace.clone();
        // the schemaLocation hint would still point at the source schema
        document.root.remove_attribute_local("schemaLocation");

        let mut summary = TransformationSummary::default();
        summary.adr_tp_removed = self.fixer.strip_address_types(&mut document.root);
        summary.debit_sum_fixed = self.fixer.fix_negative_debit_sum(&mut document.root);

        let options = &self.options;
        document.root.for_each_named_mut("Ntry", &mut |entry| {
            let credit_debit = entry
                .child("CdtDbtInd")
                .and_then(Element::text_trimmed)
                .map(str::to_string);

            if self.fixer.ensure_value_date(entry) {
                summary.valdt_added_on_entries += 1;
            }
            if self
                .fixer
                .ensure_structured_code(entry, credit_debit.as_deref())
            {
                summary.bktxcd_fixed_on_entries += 1;
            }
            if self.fixer.copy_proprietary_code(
                entry,
                options.copy_mode,
                &options.empty_markers,
                &options.separator,
            ) {
                summary.addtl_ntry_inf_changed += 1;
            }

            entry.for_each_named_mut("TxDtls", &mut |details| {
                if self
                    .fixer
                    .ensure_structured_code(details, credit_debit.as_deref())
                {
                    summary.bktxcd_fixed_on_txdtls += 1;
                }
            });
        });

        summary.timestamps_normalized = self.normalizer.apply(&mut document.root);

        document.root.for_each_named_mut("Ntry", &mut |entry| {
            if self.ntry_ordering.reorder(entry) {
                summary.reordered_ntry += 1;
            }
        });
        document.root.for_each_named_mut("TxDtls", &mut |details| {
            if self.tx_dtls_ordering.reorder(details) {
                summary.reordered_txdtls += 1;
            }
        });

        Ok(TransformationResult {
            summary,
            source_namespace,
            target_namespace,
        })
    }

    /// Parse, transform and serialize in one step.
    pub fn transform_bytes(
        &self,
        input: &[u8],
    ) -> Result<(Vec<u8>, TransformationResult), TransformationError> {
        let mut document = XmlDocument::parse(input)?;
        let result = self.transform(&mut document)?;
        let output = document.to_bytes()?;
        Ok((output, result))
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    document::{Element, XmlDocument},
    ordering::ChildOrdering,
    schema_version::TargetVersion,
};

/// Structural check of a transformed document against the invariants the
/// target schema subset requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validation error with the offending location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field_path: String,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    NamespaceMismatch,
    MissingRequiredField,
    InvalidFieldValue,
    StructureViolation,
}

impl ValidationError {
    pub fn new(
        field_path: impl Into<String>,
        error_type: ValidationErrorType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            error_type,
            message: message.into(),
        }
    }
}

/// Non-fatal finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field_path: String,
    pub warning_type: ValidationWarningType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationWarningType {
    MissingOptionalField,
}

impl ValidationWarning {
    pub fn new(
        field_path: impl Into<String>,
        warning_type: ValidationWarningType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            warning_type,
            message: message.into(),
        }
    }
}

/// Check a transformed document: target namespace, complete structured
/// transaction codes, no address-type elements, non-negative debit sum,
/// canonical child ordering. Findings never prevent the output from being
/// written; they are reported alongside it.
pub fn validate_document(document: &XmlDocument, target: TargetVersion) -> ValidationReport {
    let mut report = ValidationReport::new();

    if document.namespace != target.namespace() {
        report.add_error(ValidationError::new(
            "Document",
            ValidationErrorType::NamespaceMismatch,
            format!(
                "root namespace is {:?}, expected {:?}",
                document.namespace,
                target.namespace()
            ),
        ));
    }

    let ntry_ordering = ChildOrdering::ntry();
    let tx_dtls_ordering = ChildOrdering::tx_dtls();

    let mut entry_index = 0usize;
    document.root.for_each_named("Ntry", &mut |entry| {
        let label = format!("Ntry[{entry_index}]");

        if !has_structured_code(entry) {
            report.add_error(ValidationError::new(
                format!("{label}/BkTxCd/Domn"),
                ValidationErrorType::MissingRequiredField,
                "entry lacks a complete structured bank transaction code",
            ));
        }

        if entry.child("ValDt").is_none() {
            report.add_warning(ValidationWarning::new(
                format!("{label}/ValDt"),
                ValidationWarningType::MissingOptionalField,
                "entry has no value date and none could be derived",
            ));
        }

        if !ntry_ordering.is_canonical(entry) {
            report.add_error(ValidationError::new(
                label.clone(),
                ValidationErrorType::StructureViolation,
                "entry children are not in the canonical sequence",
            ));
        }

        entry.for_each_named("TxDtls", &mut |details| {
            if !tx_dtls_ordering.is_canonical(details) {
                report.add_error(ValidationError::new(
                    format!("{label}/TxDtls"),
                    ValidationErrorType::StructureViolation,
                    "transaction detail children are not in the canonical sequence",
                ));
            }
        });

        entry_index += 1;
    });

    if document.root.descendant("AdrTp").is_some() {
        report.add_error(ValidationError::new(
            "AdrTp",
            ValidationErrorType::StructureViolation,
            "address type elements must be removed for the target import",
        ));
    }

    if let Some(sum) = document
        .root
        .descendant("TxsSummry")
        .and_then(|summary| summary.path(&["TtlDbtNtries", "Sum"]))
        .and_then(Element::text_trimmed)
    {
        if let Ok(value) = Decimal::from_str(sum) {
            if value.is_sign_negative() && !value.is_zero() {
                report.add_error(ValidationError::new(
                    "TxsSummry/TtlDbtNtries/Sum",
                    ValidationErrorType::InvalidFieldValue,
                    format!("debit summary total is negative: {value}"),
                ));
            }
        }
    }

    report
}

fn has_structured_code(entry: &Element) -> bool {
    let present = |path: &[&str]| {
        entry
            .path(path)
            .and_then(Element::text_trimmed)
            .is_some()
    };
    present(&["BkTxCd", "Domn", "Cd"])
        && present(&["BkTxCd", "Domn", "Fmly", "Cd"])
        && present(&["BkTxCd", "Domn", "Fmly", "SubFmlyCd"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformation_engine::{TransformOptions, TransformationEngine};

    const STATEMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.10">
  <BkToCstmrStmt>
    <Stmt>
      <Ntry>
        <Amt Ccy="CHF">25.00</Amt>
        <CdtDbtInd>DBIT</CdtDbtInd>
        <BookgDt><Dt>2024-03-01</Dt></BookgDt>
        <BkTxCd><Prtry><Cd>CARD-1</Cd></Prtry></BkTxCd>
      </Ntry>
    </Stmt>
  </BkToCstmrStmt>
</Document>"#;

    #[test]
    fn test_report_starts_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid);
        assert!(!report.has_errors());
        assert!(!report.has_warnings());
    }

    #[test]
    fn test_add_error_invalidates_report() {
        let mut report = ValidationReport::new();
        report.add_error(ValidationError::new(
            "Ntry[0]",
            ValidationErrorType::StructureViolation,
            "out of order",
        ));
        assert!(!report.is_valid);
        assert!(report.has_errors());
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut report = ValidationReport::new();
        report.add_warning(ValidationWarning::new(
            "Ntry[0]/ValDt",
            ValidationWarningType::MissingOptionalField,
            "missing",
        ));
        assert!(report.is_valid);
        assert!(report.has_warnings());
    }

    #[test]
    fn test_transformed_document_passes() {
        let engine = TransformationEngine::new(TransformOptions::new(TargetVersion::V08));
        let mut document = XmlDocument::parse(STATEMENT.as_bytes()).unwrap();
        engine.transform(&mut document).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn test_untransformed_document_fails() {
        let document = XmlDocument::parse(STATEMENT.as_bytes()).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(!report.is_valid);
        // wrong namespace and missing structured code
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::NamespaceMismatch));
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::MissingRequiredField));
    }

    #[test]
    fn test_leftover_address_type_is_an_error() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
            <A><AdrTp/></A>
        </Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(report
            .errors
            .iter()
            .any(|e| e.field_path == "AdrTp"));
    }

    #[test]
    fn test_negative_sum_is_an_error() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
            <TxsSummry><TtlDbtNtries><Sum>-10.00</Sum></TtlDbtNtries></TxsSummry>
        </Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::InvalidFieldValue));
    }

    #[test]
    fn test_out_of_order_entry_is_an_error() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
            <Stmt><Ntry>
                <AddtlNtryInf>info</AddtlNtryInf>
                <Amt>1.00</Amt>
                <BkTxCd><Domn><Cd>PMNT</Cd><Fmly><Cd>ICDT</Cd><SubFmlyCd>OTHR</SubFmlyCd></Fmly></Domn></BkTxCd>
            </Ntry></Stmt>
        </Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(report
            .errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::StructureViolation));
    }

    #[test]
    fn test_missing_value_date_is_a_warning() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
            <Stmt><Ntry>
                <Amt>1.00</Amt>
                <BkTxCd><Domn><Cd>PMNT</Cd><Fmly><Cd>ICDT</Cd><SubFmlyCd>OTHR</SubFmlyCd></Fmly></Domn></BkTxCd>
            </Ntry></Stmt>
        </Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let report = validate_document(&document, TargetVersion::V08);
        assert!(report.is_valid);
        assert!(report.has_warnings());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace marker shared by every version of the bank-to-customer
/// statement schema this tool accepts as input.
pub const SOURCE_FAMILY: &str = "camt.053.001.";

/// Target schema version the statement is converted down to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetVersion {
    V04,
    V08,
}

impl TargetVersion {
    /// Numeric version token as given on the command line.
    pub fn number(&self) -> u8 {
        match self {
            TargetVersion::V04 => 4,
            TargetVersion::V08 => 8,
        }
    }

    /// Full namespace URI declared on the root of a converted document.
    pub fn namespace(&self) -> &'static str {
        match self {
            TargetVersion::V04 => "urn:iso:std:iso:20022:tech:xsd:camt.053.001.04",
            TargetVersion::V08 => "urn:iso:std:iso:20022:tech:xsd:camt.053.001.08",
        }
    }

    /// Parse a version token (`4`, `8`, `04`, `08`).
    pub fn parse(s: &str) -> Result<Self, SchemaVersionError> {
        match s.trim() {
            "4" | "04" => Ok(TargetVersion::V04),
            "8" | "08" => Ok(TargetVersion::V08),
            other => Err(SchemaVersionError::UnsupportedTarget(other.to_string())),
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.number())
    }
}

impl FromStr for TargetVersion {
    type Err = SchemaVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetVersion::parse(s)
    }
}

/// Whether a root namespace belongs to the camt.053 statement family.
pub fn is_camt053_namespace(namespace: &str) -> bool {
    namespace.contains(SOURCE_FAMILY)
}

#[derive(Debug, Error)]
pub enum SchemaVersionError {
    #[error("unsupported target version: {0} (expected 4 or 8)")]
    UnsupportedTarget(String),
}

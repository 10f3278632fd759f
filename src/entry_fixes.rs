use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::document::Element;
use crate::normalize::ISO_DATETIME_PATTERN;

/// `AddtlNtryInf` content treated as empty when deciding whether to copy
/// the proprietary code in. Bank exports use these placeholders where no
/// counterparty text is available.
pub const DEFAULT_EMPTY_MARKERS: &[&str] = &["no information", "no info", "n/a"];

/// Separator between existing `AddtlNtryInf` content and an appended
/// proprietary code.
pub const DEFAULT_SEPARATOR: &str = " | ";

/// How the proprietary bank code is migrated into `AddtlNtryInf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyMode {
    /// Leave `AddtlNtryInf` alone.
    Off,
    /// Set `AddtlNtryInf` to the code when it is missing, empty or a
    /// placeholder; otherwise leave it untouched.
    Replace,
    /// Like `Replace`, but append the code to existing content unless it is
    /// already present.
    Append,
}

/// Per-entry structural fixes for the bexio import.
pub struct EntryFixer {
    datetime: Regex,
}

impl EntryFixer {
    pub fn new() -> Self {
        Self {
            datetime: Regex::new(ISO_DATETIME_PATTERN).expect("datetime pattern is valid"),
        }
    }

    /// Derive `ValDt/Dt` from the booking date when the entry has no value
    /// date. The new element is inserted right after `BookgDt`.
    pub fn ensure_value_date(&self, entry: &mut Element) -> bool {
        if entry.child("ValDt").is_some() {
            return false;
        }
        let Some(date) = self.booking_date(entry) else {
            return false;
        };
        let value_date = Element::new("ValDt").with_child(Element::new("Dt").with_text(date));
        let at = entry.position("BookgDt").map(|i| i + 1).unwrap_or(0);
        entry.insert_child(at, value_date);
        true
    }

    fn booking_date(&self, entry: &Element) -> Option<String> {
        let booking = entry.child("BookgDt")?;
        if let Some(text) = booking.child("Dt").and_then(Element::text_trimmed) {
            return self.date_part(text);
        }
        if let Some(text) = booking.child("DtTm").and_then(Element::text_trimmed) {
            return self.date_part(text);
        }
        None
    }

    fn date_part(&self, text: &str) -> Option<String> {
        self.datetime
            .captures(text.trim())
            .map(|captures| captures[1].to_string())
    }

    /// Make sure `BkTxCd` carries a structured `Domn/Fmly/SubFmlyCd` code.
    /// A missing block is synthesized from the credit/debit indicator; an
    /// existing `Prtry` sub-block is preserved after the structured code.
    /// Existing structured codes are never overwritten.
    pub fn ensure_structured_code(
        &self,
        parent: &mut Element,
        credit_debit: Option<&str>,
    ) -> bool {
        let mut changed = parent.child("BkTxCd").is_none();
        let bank_code = parent.child_or_append("BkTxCd");

        if bank_code.child("Domn").is_none() {
            let (domain, family, sub_family) = default_transaction_code(credit_debit);
            let domn = Element::new("Domn")
                .with_child(Element::new("Cd").with_text(domain))
                .with_child(
                    Element::new("Fmly")
                        .with_child(Element::new("Cd").with_text(family))
                        .with_child(Element::new("SubFmlyCd").with_text(sub_family)),
                );
            bank_code.insert_child(0, domn);
            if let Some(index) = bank_code.position("Prtry") {
                let proprietary = bank_code.children.remove(index);
                bank_code.push_child(proprietary);
            }
            changed = true;
        }
        changed
    }

    /// Copy the proprietary code into `AddtlNtryInf` under the precedence
    /// rules of `mode`. Returns whether the field was actually mutated.
    pub fn copy_proprietary_code(
        &self,
        entry: &mut Element,
        mode: CopyMode,
        empty_markers: &[String],
        separator: &str,
    ) -> bool {
        if mode == CopyMode::Off {
            return false;
        }
        let Some(code) = entry
            .path(&["BkTxCd", "Prtry", "Cd"])
            .and_then(Element::text_trimmed)
            .map(str::to_string)
        else {
            return false;
        };

        match entry.position("AddtlNtryInf") {
            None => {
                entry.push_child(Element::new("AddtlNtryInf").with_text(code));
                true
            }
            Some(index) => {
                let info = &mut entry.children[index];
                let current = info.text_trimmed().unwrap_or("").to_string();
                let is_empty = current.is_empty()
                    || empty_markers
                        .iter()
                        .any(|marker| marker.eq_ignore_ascii_case(&current));
                if is_empty {
                    info.set_text(code);
                    true
                } else if mode == CopyMode::Append && !current.contains(&code) {
                    info.set_text(format!("{current}{separator}{code}"));
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove every `AdrTp` element, at any depth and under any parent.
    pub fn strip_address_types(&self, root: &mut Element) -> usize {
        root.remove_named("AdrTp")
    }

    /// Replace a negative `TxsSummry/TtlDbtNtries/Sum` with its absolute
    /// value. Applies to the first summary block in document order, once
    /// per document. Unparseable values are left alone.
    pub fn fix_negative_debit_sum(&self, root: &mut Element) -> bool {
        let Some(summary) = root.descendant_mut("TxsSummry") else {
            return false;
        };
        let Some(sum) = summary.path_mut(&["TtlDbtNtries", "Sum"]) else {
            return false;
        };
        let text = match sum.text_trimmed() {
            Some(text) => text.to_string(),
            None => return false,
        };
        if !text.starts_with('-') {
            return false;
        }
        match Decimal::from_str(&text) {
            Ok(value) => {
                sum.set_text(value.abs().to_string());
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for EntryFixer {
    fn default() -> Self {
        Self::new()
    }
}

fn default_transaction_code(credit_debit: Option<&str>) -> (&'static str, &'static str, &'static str) {
    let family = match credit_debit {
        Some(indicator) if indicator.eq_ignore_ascii_case("CRDT") => "RCDT",
        _ => "ICDT",
    };
    ("PMNT", family, "OTHR")
}

use regex::Regex;

use crate::document::Element;

/// ISO-8601 date-time shape as it appears in statement exports: date,
/// optional time, optional fractional seconds, optional zone offset.
pub(crate) const ISO_DATETIME_PATTERN: &str =
    r"^(\d{4}-\d{2}-\d{2})(?:T(\d{2}:\d{2}:\d{2})(?:\.(\d+))?)?((?:Z)|(?:[+-]\d{2}:\d{2}))?$";

/// Most fractional-second digits the downstream import accepts.
const MAX_FRACTION_DIGITS: usize = 6;

/// Rewrites ISO-8601 timestamps to the canonical form the target schema
/// versions accept: fractional seconds truncated to six digits, date and
/// zone offset untouched. Text that is not a timestamp is left alone.
pub struct TimestampNormalizer {
    pattern: Regex,
}

impl TimestampNormalizer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(ISO_DATETIME_PATTERN).expect("datetime pattern is valid"),
        }
    }

    /// Canonical form of a timestamp, or `None` when the text does not
    /// match the date-time shape. A date without a time part collapses to
    /// the bare date, dropping any zone offset.
    pub fn normalize(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        let captures = self.pattern.captures(trimmed)?;

        let date = &captures[1];
        let zone = captures.get(4).map(|m| m.as_str()).unwrap_or("");
        let Some(time) = captures.get(2) else {
            return Some(date.to_string());
        };
        let time = time.as_str();

        match captures.get(3) {
            Some(fraction) => {
                let fraction = fraction.as_str();
                let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
                Some(format!("{date}T{time}.{fraction}{zone}"))
            }
            None => Some(format!("{date}T{time}{zone}")),
        }
    }

    /// Normalize every matching text node under `root`, returning the
    /// number of nodes actually changed.
    pub fn apply(&self, root: &mut Element) -> usize {
        let mut changed = 0;
        root.for_each_mut(&mut |element| {
            let Some(text) = element.text.as_deref() else {
                return;
            };
            if let Some(normalized) = self.normalize(text) {
                if normalized != text {
                    element.set_text(normalized);
                    changed += 1;
                }
            }
        });
        changed
    }
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

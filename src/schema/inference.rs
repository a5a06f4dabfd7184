//! Column type inference.
//!
//! Precedence, highest first: any date → `TIMESTAMP`, any float → `DECIMAL(18,2)`,
//! any number → `BIGINT`, otherwise `VARCHAR(n)`. A column mixing integers and date-like text
//! therefore becomes `TIMESTAMP`, and a single float turns an integer column into `DECIMAL`.

use chrono::NaiveDate;

use crate::types::{InferredType, RawCell};

/// The one text pattern recognized as a date: `YYYY-MM-DD`.
pub const DATE_TEXT_PATTERN: &str = "%Y-%m-%d";

/// Returns `true` if `text` parses as a calendar date in `YYYY-MM-DD` form.
///
/// Only ASCII digits and `-` are accepted, with a four-digit year; month and day may drop their
/// leading zero (`2023-1-5`). Surrounding whitespace and signed years are not dates.
/// Parse failures are not errors; the text simply is not a date.
pub fn looks_like_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    let plain = bytes.len() > 5
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes.iter().all(|b| b.is_ascii_digit() || *b == b'-');
    plain && NaiveDate::parse_from_str(text, DATE_TEXT_PATTERN).is_ok()
}

/// Signals gathered from a column's values.
///
/// Observing is commutative, so the resolved type does not depend on value order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeSignals {
    pub saw_date: bool,
    pub saw_number: bool,
    pub saw_decimal: bool,
    /// Longest text value, in characters.
    pub max_text_length: usize,
}

impl TypeSignals {
    /// Fold one value into the signals. Empty values are ignored.
    pub fn observe(&mut self, value: &RawCell) {
        match value {
            RawCell::Empty => {}
            RawCell::Timestamp(_) => self.saw_date = true,
            RawCell::Integer(_) => self.saw_number = true,
            RawCell::Decimal(_) => {
                self.saw_number = true;
                self.saw_decimal = true;
            }
            RawCell::Text(s) => {
                self.max_text_length = self.max_text_length.max(s.chars().count());
                if looks_like_date(s) {
                    self.saw_date = true;
                }
            }
        }
    }

    /// Resolve the signals into a single column type.
    pub fn resolve(&self) -> InferredType {
        if self.saw_date {
            InferredType::Timestamp
        } else if self.saw_decimal {
            InferredType::Decimal
        } else if self.saw_number {
            InferredType::BigInt
        } else {
            InferredType::varchar_for(self.max_text_length)
        }
    }
}

/// Infer the SQL type of a column from all of its values.
pub fn infer_type<'a, I>(values: I) -> InferredType
where
    I: IntoIterator<Item = &'a RawCell>,
{
    let mut signals = TypeSignals::default();
    for value in values {
        signals.observe(value);
    }
    signals.resolve()
}

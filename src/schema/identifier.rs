//! Warehouse-safe column identifiers.

use std::collections::HashSet;

/// Normalize one column label into a warehouse-safe identifier.
///
/// - A missing or empty label becomes `col_<position>`.
/// - The label is lower-cased and every character that is not an ASCII letter or digit is
///   replaced by exactly one `_` (`"A  B"` becomes `"a__b"`).
/// - A result starting with a digit is prefixed with `col_`.
///
/// `position` is the 1-based column position in the sheet.
pub fn normalize_identifier(label: Option<&str>, position: usize) -> String {
    let label = match label {
        Some(l) if !l.is_empty() => l,
        _ => return fallback_identifier(position),
    };

    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.chars().next() {
        None => fallback_identifier(position),
        Some(first) if first.is_ascii_digit() => format!("col_{cleaned}"),
        Some(_) => cleaned,
    }
}

fn fallback_identifier(position: usize) -> String {
    format!("col_{position}")
}

/// Sheet-scoped identifier assignment.
///
/// Each sheet gets a fresh deduper; identifiers repeated within the sheet receive the lowest
/// unused `_<k>` suffix (k >= 1), checked against every identifier assigned so far.
#[derive(Debug, Default)]
pub struct IdentifierDeduper {
    assigned: HashSet<String>,
}

impl IdentifierDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `label` and make it unique within this deduper.
    pub fn assign(&mut self, label: Option<&str>, position: usize) -> String {
        let base = normalize_identifier(label, position);
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while self.assigned.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.assigned.insert(candidate.clone());
        candidate
    }
}

/// Normalize an ordered sequence of header labels into unique identifiers.
///
/// Positions are 1-based and follow the input order.
pub fn normalize_headers<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut deduper = IdentifierDeduper::new();
    labels
        .into_iter()
        .enumerate()
        .map(|(idx0, label)| deduper.assign(label.as_ref().map(|s| s.as_ref()), idx0 + 1))
        .collect()
}

/// Derive the target table name from a source object key and a sheet name.
///
/// The key's file stem (directory and extension removed) and the sheet name are normalized
/// independently and joined by `_`. `sheet_position` (1-based) is the fallback position for
/// empty names.
pub fn table_name(source_key: &str, sheet_name: &str, sheet_position: usize) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    format!(
        "{}_{}",
        normalize_identifier(Some(stem), sheet_position),
        normalize_identifier(Some(sheet_name), sheet_position)
    )
}

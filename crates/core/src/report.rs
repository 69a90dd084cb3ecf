//! Structured reports returned by commands and the diff renderer.
//!
//! A [`Report`] is transport-neutral: the chat adapter turns it into
//! whatever embed or message format its platform wants.

use chrono::{DateTime, Utc};

/// Maximum characters a single field value may carry. Values longer
/// than this are truncated with a trailing `...` before they reach
/// the transport.
pub const FIELD_VALUE_CAP: usize = 1020;

/// One labelled value in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: String,
    pub value: String,
    /// Rendering hint: place this field beside its neighbours.
    pub inline: bool,
}

/// An ordered list of fields plus footer metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub fields: Vec<Field>,
    /// UTC timestamp the report was generated at.
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Append a field, truncating the value to [`FIELD_VALUE_CAP`].
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>, inline: bool) {
        let mut value = value.into();
        if value.len() > FIELD_VALUE_CAP {
            value = truncate_value(&value);
        }
        self.fields.push(Field {
            label: label.into(),
            value,
            inline,
        });
    }

    /// The field with the given label, if present.
    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }
}

/// Cut a value down to the cap, ending with `...` on a char boundary.
fn truncate_value(value: &str) -> String {
    let mut cut = FIELD_VALUE_CAP - 3;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &value[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_short_values() {
        let mut report = Report::new("Session");
        report.push("Gold", "+5 Gold", true);
        assert_eq!(report.field("Gold").unwrap().value, "+5 Gold");
        assert!(report.field("Karma").is_none());
    }

    #[test]
    fn push_truncates_long_values() {
        let mut report = Report::new("Session");
        let long = "x".repeat(2000);
        report.push("Deaths", long, false);
        let value = &report.field("Deaths").unwrap().value;
        assert_eq!(value.len(), FIELD_VALUE_CAP);
        assert!(value.ends_with("..."));
    }
}

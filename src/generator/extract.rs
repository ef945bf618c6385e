//! Typed extraction of declaration values.
//!
//! Each helper consumes one declared value, verifies its shape, and
//! converts it to the domain type, reporting a structured error with the
//! offending value's provenance on mismatch.

use crate::core::label::{Label, LabelPattern};
use crate::core::source_file::{SourceDir, SourceFile};
use crate::core::substitution::{SubstitutionList, SubstitutionPattern};
use crate::core::value::Value;

use super::errors::GenerateError;

/// Verify a value is a string and return it.
pub fn expect_string<'a>(value: &'a Value, field: &str) -> Result<&'a str, GenerateError> {
    value.as_string().ok_or_else(|| GenerateError::TypeMismatch {
        field: field.to_string(),
        expected: "string",
        found: value.type_name(),
        origin: value.origin,
    })
}

/// Verify a value is a boolean and return it.
pub fn expect_boolean(value: &Value, field: &str) -> Result<bool, GenerateError> {
    value.as_boolean().ok_or_else(|| GenerateError::TypeMismatch {
        field: field.to_string(),
        expected: "boolean",
        found: value.type_name(),
        origin: value.origin,
    })
}

/// Verify a value is a list and return its elements.
pub fn expect_list<'a>(value: &'a Value, field: &str) -> Result<&'a [Value], GenerateError> {
    value.as_list().ok_or_else(|| GenerateError::TypeMismatch {
        field: field.to_string(),
        expected: "list",
        found: value.type_name(),
        origin: value.origin,
    })
}

/// Verify a value is a list of strings and return the strings.
pub fn expect_string_list<'a>(
    value: &'a Value,
    field: &str,
) -> Result<Vec<&'a Value>, GenerateError> {
    let items = expect_list(value, field)?;
    for item in items {
        expect_string(item, field)?;
    }
    Ok(items.iter().collect())
}

/// Extract a list of file references resolved against the declaring
/// directory.
pub fn extract_relative_files(
    value: &Value,
    field: &str,
    dir: &SourceDir,
) -> Result<Vec<SourceFile>, GenerateError> {
    let items = expect_string_list(value, field)?;
    Ok(items
        .iter()
        .map(|item| dir.resolve_file(item.as_string().expect("checked above")))
        .collect())
}

/// Extract a list of labels resolved against the declaring directory.
pub fn extract_labels(
    value: &Value,
    field: &str,
    dir: &SourceDir,
    default_toolchain: Label,
) -> Result<Vec<Label>, GenerateError> {
    let items = expect_string_list(value, field)?;
    let mut labels = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_string().expect("checked above");
        let label = Label::resolve(text, dir, default_toolchain).map_err(|source| {
            GenerateError::InvalidLabel {
                source,
                origin: item.origin,
            }
        })?;
        labels.push(label);
    }
    Ok(labels)
}

/// Extract labels, dropping duplicates while preserving first-seen order.
///
/// Config lists are sets in declaration order; listing a config twice is
/// harmless and collapses.
pub fn extract_unique_labels(
    value: &Value,
    field: &str,
    dir: &SourceDir,
    default_toolchain: Label,
) -> Result<Vec<Label>, GenerateError> {
    let mut labels = extract_labels(value, field, dir, default_toolchain)?;
    let mut seen = Vec::with_capacity(labels.len());
    labels.retain(|label| {
        if seen.contains(label) {
            false
        } else {
            seen.push(*label);
            true
        }
    });
    Ok(labels)
}

/// Extract a list of label patterns resolved against the declaring
/// directory.
pub fn extract_label_patterns(
    value: &Value,
    field: &str,
    dir: &SourceDir,
) -> Result<Vec<LabelPattern>, GenerateError> {
    let items = expect_string_list(value, field)?;
    let mut patterns = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_string().expect("checked above");
        let pattern = LabelPattern::parse(text, dir).map_err(|source| {
            GenerateError::InvalidLabel {
                source,
                origin: item.origin,
            }
        })?;
        patterns.push(pattern);
    }
    Ok(patterns)
}

/// Extract a list of substitution patterns.
pub fn extract_substitution_list(
    value: &Value,
    field: &str,
) -> Result<SubstitutionList, GenerateError> {
    let items = expect_string_list(value, field)?;
    let mut patterns = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_string().expect("checked above");
        let pattern = SubstitutionPattern::parse(text, item.origin).map_err(|source| {
            GenerateError::InvalidPattern {
                source,
                origin: item.origin,
            }
        })?;
        patterns.push(pattern);
    }
    Ok(SubstitutionList::new(patterns))
}

/// Extract a single substitution pattern from a string value.
pub fn extract_substitution_pattern(
    value: &Value,
    field: &str,
) -> Result<SubstitutionPattern, GenerateError> {
    let text = expect_string(value, field)?;
    SubstitutionPattern::parse(text, value.origin).map_err(|source| {
        GenerateError::InvalidPattern {
            source,
            origin: value.origin,
        }
    })
}

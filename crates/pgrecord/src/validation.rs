//! Validation error types produced by record hooks.
//!
//! By convention an empty field name denotes a record-level error.

use serde::Serialize;
use std::fmt;

/// A machine-friendly validation code.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationCode {
    Required,
    Len,
    Format,
    Unique,
    Custom(String),
}

impl ValidationCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Len => "len",
            Self::Format => "format",
            Self::Unique => "unique",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl Serialize for ValidationCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    /// Whether this error applies to the record as a whole.
    pub fn is_record_level(&self) -> bool {
        self.field.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// A collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub items: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add an error for `field` (empty for a record-level error).
    pub fn add(&mut self, field: impl Into<String>, code: ValidationCode, message: impl Into<String>) {
        self.items.push(ValidationError::new(field, code, message));
    }

    pub fn push(&mut self, err: ValidationError) {
        self.items.push(err);
    }

    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    /// Errors recorded against `field`.
    pub fn on(&self, field: &str) -> Vec<&ValidationError> {
        self.items.iter().filter(|e| e.field == field).collect()
    }

    pub fn all(&self) -> &[ValidationError] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.items.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_field_and_record_level_errors() {
        let mut errs = ValidationErrors::new();
        errs.add("name", ValidationCode::Required, "can't be blank");
        errs.add("", ValidationCode::Custom("state".into()), "record is locked");
        assert_eq!(errs.to_string(), "name: can't be blank, record is locked");
        assert!(errs.all()[1].is_record_level());
    }

    #[test]
    fn on_filters_by_field() {
        let mut errs = ValidationErrors::new();
        errs.add("name", ValidationCode::Required, "can't be blank");
        errs.add("name", ValidationCode::Len, "too short");
        errs.add("email", ValidationCode::Format, "is invalid");
        assert_eq!(errs.on("name").len(), 2);
        assert_eq!(errs.on("email")[0].code, ValidationCode::Format);
        assert!(errs.on("missing").is_empty());
    }

    #[test]
    fn serializes_code_as_string() {
        let err = ValidationError::new("name", ValidationCode::Unique, "is taken");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "unique");
        assert_eq!(json["field"], "name");
    }
}

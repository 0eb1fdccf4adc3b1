//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use sea_orm::{DbErr, SqlErr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidAmount(format!("invalid {label} id")))
}

/// Map a write error, surfacing constraint violations as their own kind.
pub(crate) fn storage_error(err: DbErr) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            EngineError::ConstraintViolation(format!("unique constraint: {detail}"))
        }
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            EngineError::ConstraintViolation(format!("foreign key constraint: {detail}"))
        }
        _ => EngineError::Database(err),
    }
}

/// Trim optional text, mapping empty strings to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim a required name, rejecting empty input.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim and dedup tag names, preserving first occurrence order.
pub(crate) fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.iter().any(|existing| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_trims_and_dedups() {
        let names = vec![
            " rent ".to_string(),
            "rent".to_string(),
            String::new(),
            "utilities".to_string(),
        ];
        assert_eq!(normalize_tag_names(&names), vec!["rent", "utilities"]);
    }
}

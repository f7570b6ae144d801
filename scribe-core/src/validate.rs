//! Validation rules for commits and their fields
//!
//! Two layers live here. The field validators (`uuid4`, `maybe_uuid4`,
//! `json_patch`, `path`) are pure predicates over wire-shaped data,
//! returning a structured `Validation` error naming the offending field.
//! On top of them, `validate` checks a single commit's invariants and
//! `validate_many` checks an ordered batch forming a contiguous chain.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{ChangeError, ChangeResult};
use crate::patch::{Patch, Path};
use crate::types::Commit;

/// Marker accepted by [`maybe_uuid4`] for an explicitly absent value.
pub const ABSENT: &str = "";

const RECOGNIZED_OPS: &[&str] = &[
    "update", "replace", "delete", "add", "remove", "test", "move", "copy",
];

fn invalid(
    entity: &'static str,
    field: &'static str,
    expected: impl Into<String>,
    got: impl Into<String>,
) -> ChangeError {
    ChangeError::Validation {
        entity,
        field,
        expected: expected.into(),
        got: got.into(),
    }
}

/// Accept a canonical lowercase 8-4-4-4-12 version-4 UUID.
pub fn uuid4(entity: &'static str, field: &'static str, value: &str) -> ChangeResult<()> {
    let parsed = Uuid::parse_str(value)
        .map_err(|_| invalid(entity, field, "UUIDv4", value.to_string()))?;
    if parsed.to_string() != value || parsed.get_version_num() != 4 {
        return Err(invalid(entity, field, "UUIDv4", value.to_string()));
    }
    Ok(())
}

/// Accept a UUIDv4 or the explicit absent marker.
pub fn maybe_uuid4(entity: &'static str, field: &'static str, value: &str) -> ChangeResult<()> {
    if value == ABSENT {
        return Ok(());
    }
    uuid4(entity, field, value)
}

/// Structurally check a raw JSON value as a patch: an array of operation
/// objects with recognized ops and well-formed members.
pub fn json_patch(entity: &'static str, field: &'static str, value: &Value) -> ChangeResult<()> {
    let ops = match value {
        Value::Array(ops) => ops,
        other => {
            return Err(invalid(
                entity,
                field,
                "JSON patch array",
                kind_of(other),
            ))
        }
    };
    for op in ops {
        let object = match op {
            Value::Object(object) => object,
            other => return Err(invalid(entity, field, "operation object", kind_of(other))),
        };
        let name = match object.get("op").and_then(Value::as_str) {
            Some(name) => name,
            None => return Err(invalid(entity, field, "op member", op.to_string())),
        };
        if !RECOGNIZED_OPS.contains(&name) {
            return Err(invalid(
                entity,
                field,
                format!("op in {:?}", RECOGNIZED_OPS),
                name.to_string(),
            ));
        }
        let target = match object.get("path").and_then(Value::as_str) {
            Some(target) => target,
            None => return Err(invalid(entity, field, "path member", op.to_string())),
        };
        path(entity, field, target)?;
        if matches!(name, "move" | "copy") {
            match object.get("from").and_then(Value::as_str) {
                Some(from) => path(entity, field, from)?,
                None => return Err(invalid(entity, field, "from member", op.to_string())),
            }
        }
        if matches!(name, "update" | "replace" | "add" | "test") && !object.contains_key("value") {
            return Err(invalid(entity, field, "value member", op.to_string()));
        }
    }
    Ok(())
}

/// Validate a path as a sequence of string/integer segments.
pub fn path(entity: &'static str, field: &'static str, raw: &str) -> ChangeResult<()> {
    Path::parse(raw)
        .map(|_| ())
        .map_err(|e| invalid(entity, field, "JSON pointer path", e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn typed_uuid4(
    entity: &'static str,
    field: &'static str,
    value: &Uuid,
) -> ChangeResult<()> {
    if value.get_version_num() != 4 {
        return Err(invalid(entity, field, "UUIDv4", value.to_string()));
    }
    Ok(())
}

fn typed_patch(entity: &'static str, field: &'static str, patch: &Patch) -> ChangeResult<()> {
    patch
        .validate()
        .map_err(|reason| invalid(entity, field, "valid JSON patch", reason))
}

/// Validate a single commit.
///
/// Checks, in order: `id` is UUIDv4; `previous_commit_id` is UUIDv4 or
/// absent; `document_id` is UUIDv4; `patch` is a valid patch; the commit
/// does not reference itself. Fails fast on the first offending field.
pub fn validate(commit: &Commit) -> ChangeResult<()> {
    typed_uuid4("commit", "id", commit.id.as_uuid())?;
    if let Some(previous) = &commit.previous_commit_id {
        typed_uuid4("commit", "previous_commit_id", previous.as_uuid())?;
    }
    typed_uuid4("commit", "document_id", commit.document_id.as_uuid())?;
    typed_patch("commit", "patch", &commit.patch)?;
    if Some(commit.id) == commit.previous_commit_id {
        return Err(invalid(
            "commit",
            "previous_commit_id",
            "a different commit",
            commit.id.to_string(),
        ));
    }
    Ok(())
}

/// Validate an ordered batch of commits, root-ward first.
///
/// Enforces: each commit is individually valid; each commit after the
/// first succeeds its predecessor; all commits share one document; the
/// first commit is not a successor of any later batch element (which
/// would close a cycle inside the batch).
pub fn validate_many(commits: &[Commit]) -> ChangeResult<()> {
    if commits.is_empty() {
        return Ok(());
    }
    for commit in commits {
        validate(commit)?;
    }
    let first = &commits[0];
    for pair in commits.windows(2) {
        if pair[1].previous_commit_id != Some(pair[0].id) {
            return Err(invalid(
                "commit",
                "previous_commit_id",
                pair[0].id.to_string(),
                pair[1]
                    .previous_commit_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "absent".to_string()),
            ));
        }
    }
    for commit in commits {
        if commit.document_id != first.document_id {
            return Err(invalid(
                "commit",
                "document_id",
                first.document_id.to_string(),
                commit.document_id.to_string(),
            ));
        }
    }
    if let Some(previous) = first.previous_commit_id {
        if commits.iter().any(|commit| commit.id == previous) {
            return Err(invalid(
                "commit",
                "previous_commit_id",
                "a commit outside the batch",
                previous.to_string(),
            ));
        }
    }
    Ok(())
}

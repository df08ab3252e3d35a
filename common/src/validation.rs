//! Request body validation.
//!
//! Bodies arrive as raw JSON so every violation can be reported at once,
//! before anything reaches the store.

use crate::types::{
    IncidentPatch, NewIncident, Severity, Status, OWNER_MAX_LEN, SERVICE_MAX_LEN, SUMMARY_MAX_LEN,
    TITLE_MAX_LEN,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Keys clients may echo back from a fetched record. Always discarded.
pub const READ_ONLY_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

pub const WRITABLE_FIELDS: &[&str] = &["title", "service", "severity", "status", "owner", "summary"];

const SEVERITY_VALUES: &str = "SEV1, SEV2, SEV3, SEV4";
const STATUS_VALUES: &str = "OPEN, MITIGATED, RESOLVED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationError(pub Vec<String>);

impl ValidationError {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// What to do with keys that are neither writable nor read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    Strip,
    #[default]
    Reject,
}

pub fn validate_create(body: &Value, policy: UnknownFields) -> Result<NewIncident, ValidationError> {
    let obj = as_object(body)?;
    let mut errors = Vec::new();
    check_unknown(obj, policy, &mut errors);

    let title = required_text(obj, "title", TITLE_MAX_LEN, &mut errors);
    let service = required_text(obj, "service", SERVICE_MAX_LEN, &mut errors);
    let severity = match enum_field::<Severity>(obj, "severity", SEVERITY_VALUES, &mut errors) {
        Some(Some(sev)) => Some(sev),
        Some(None) | None => {
            if !errors.iter().any(|e| e.starts_with("severity ")) {
                errors.push(enum_message("severity", SEVERITY_VALUES));
            }
            None
        }
    };
    let status = enum_field::<Status>(obj, "status", STATUS_VALUES, &mut errors).flatten();
    let owner = optional_text(obj, "owner", OWNER_MAX_LEN, &mut errors).flatten();
    let summary = optional_text(obj, "summary", SUMMARY_MAX_LEN, &mut errors).flatten();

    match (title, service, severity) {
        (Some(title), Some(service), Some(severity)) if errors.is_empty() => Ok(NewIncident {
            title,
            service,
            severity,
            status: status.unwrap_or_default(),
            owner,
            summary,
        }),
        _ => Err(ValidationError(errors)),
    }
}

pub fn validate_update(body: &Value, policy: UnknownFields) -> Result<IncidentPatch, ValidationError> {
    let obj = as_object(body)?;
    let mut errors = Vec::new();
    check_unknown(obj, policy, &mut errors);

    let mut patch = IncidentPatch::default();

    if obj.contains_key("title") {
        patch.title = required_text(obj, "title", TITLE_MAX_LEN, &mut errors);
    }
    if obj.contains_key("service") {
        patch.service = required_text(obj, "service", SERVICE_MAX_LEN, &mut errors);
    }
    match enum_field::<Severity>(obj, "severity", SEVERITY_VALUES, &mut errors) {
        Some(Some(sev)) => patch.severity = Some(sev),
        Some(None) => errors.push(enum_message("severity", SEVERITY_VALUES)),
        None => {}
    }
    match enum_field::<Status>(obj, "status", STATUS_VALUES, &mut errors) {
        Some(Some(st)) => patch.status = Some(st),
        Some(None) => errors.push(enum_message("status", STATUS_VALUES)),
        None => {}
    }
    patch.owner = optional_text(obj, "owner", OWNER_MAX_LEN, &mut errors);
    patch.summary = optional_text(obj, "summary", SUMMARY_MAX_LEN, &mut errors);

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(ValidationError(errors))
    }
}

/// Re-checks a typed record against the same limits as [`validate_create`].
pub fn check_new(new: &NewIncident) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    check_text("title", Some(&new.title), TITLE_MAX_LEN, true, &mut errors);
    check_text("service", Some(&new.service), SERVICE_MAX_LEN, true, &mut errors);
    check_text("owner", new.owner.as_deref(), OWNER_MAX_LEN, false, &mut errors);
    check_text("summary", new.summary.as_deref(), SUMMARY_MAX_LEN, false, &mut errors);
    into_result(errors)
}

/// Re-checks a typed patch against the same limits as [`validate_update`].
pub fn check_patch(patch: &IncidentPatch) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    check_text("title", patch.title.as_deref(), TITLE_MAX_LEN, true, &mut errors);
    check_text("service", patch.service.as_deref(), SERVICE_MAX_LEN, true, &mut errors);
    check_text("owner", patch.owner.clone().flatten().as_deref(), OWNER_MAX_LEN, false, &mut errors);
    check_text("summary", patch.summary.clone().flatten().as_deref(), SUMMARY_MAX_LEN, false, &mut errors);
    into_result(errors)
}

fn check_text(key: &str, value: Option<&str>, max: usize, non_blank: bool, errors: &mut Vec<String>) {
    if let Some(value) = value {
        if non_blank && value.trim().is_empty() {
            errors.push(format!("{key} should not be empty"));
        } else {
            check_len(key, value, max, errors);
        }
    }
}

fn into_result(errors: Vec<String>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::single("request body must be a JSON object"))
}

fn check_unknown(obj: &Map<String, Value>, policy: UnknownFields, errors: &mut Vec<String>) {
    if policy == UnknownFields::Strip {
        return;
    }
    for key in obj.keys() {
        let known = WRITABLE_FIELDS.contains(&key.as_str()) || READ_ONLY_FIELDS.contains(&key.as_str());
        if !known {
            errors.push(format!("property {key} should not exist"));
        }
    }
}

/// A present, non-blank string within `max` characters. Missing, null and
/// blank values are all reported as empty.
fn required_text(obj: &Map<String, Value>, key: &str, max: usize, errors: &mut Vec<String>) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => {
            errors.push(format!("{key} should not be empty"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(format!("{key} should not be empty"));
            None
        }
        Some(Value::String(s)) => check_len(key, s, max, errors).then(|| s.clone()),
        Some(_) => {
            errors.push(format!("{key} must be a string"));
            None
        }
    }
}

/// `None` when absent, `Some(None)` for null or empty, `Some(Some(_))` otherwise.
fn optional_text(
    obj: &Map<String, Value>,
    key: &str,
    max: usize,
    errors: &mut Vec<String>,
) -> Option<Option<String>> {
    match obj.get(key)? {
        Value::Null => Some(None),
        Value::String(s) if s.is_empty() => Some(None),
        Value::String(s) => {
            if check_len(key, s, max, errors) {
                Some(Some(s.clone()))
            } else {
                None
            }
        }
        _ => {
            errors.push(format!("{key} must be a string"));
            None
        }
    }
}

/// `None` when absent, `Some(None)` for null, `Some(Some(_))` for a member.
/// Invalid values are reported and yield `None`.
fn enum_field<T: FromStr>(
    obj: &Map<String, Value>,
    key: &str,
    allowed: &str,
    errors: &mut Vec<String>,
) -> Option<Option<T>> {
    match obj.get(key)? {
        Value::Null => Some(None),
        Value::String(s) => match s.parse::<T>() {
            Ok(v) => Some(Some(v)),
            Err(_) => {
                errors.push(enum_message(key, allowed));
                None
            }
        },
        _ => {
            errors.push(enum_message(key, allowed));
            None
        }
    }
}

fn check_len(key: &str, value: &str, max: usize, errors: &mut Vec<String>) -> bool {
    if value.chars().count() > max {
        errors.push(format!("{key} must be shorter than or equal to {max} characters"));
        false
    } else {
        true
    }
}

fn enum_message(key: &str, allowed: &str) -> String {
    format!("{key} must be one of the following values: {allowed}")
}

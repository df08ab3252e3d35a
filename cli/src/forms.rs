//! Interactive prompts for creating, editing and deleting incidents.

use anyhow::Result;
use common::types::{OWNER_MAX_LEN, SERVICE_MAX_LEN, SUMMARY_MAX_LEN, TITLE_MAX_LEN};
use common::validation::check_new;
use common::{Incident, IncidentPatch, NewIncident, Severity, Status};
use inquire::validator::Validation;
use inquire::error::InquireResult;
use inquire::{Confirm, CustomUserError, InquireError, Select, Text};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    Edit,
    Delete,
    Back,
}

impl fmt::Display for DetailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetailAction::Edit => "Edit",
            DetailAction::Delete => "Delete",
            DetailAction::Back => "Back",
        })
    }
}

/// Esc and Ctrl+C inside a prompt abandon the form instead of failing.
fn cancellable<T>(result: InquireResult<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn text_rule(
    name: &'static str,
    max: usize,
    required: bool,
) -> impl Fn(&str) -> Result<Validation, CustomUserError> + Clone {
    move |input: &str| {
        let input = input.trim();
        if required && input.is_empty() {
            return Ok(Validation::Invalid(format!("{name} should not be empty").into()));
        }
        if input.chars().count() > max {
            return Ok(Validation::Invalid(
                format!("{name} must be shorter than or equal to {max} characters").into(),
            ));
        }
        Ok(Validation::Valid)
    }
}

fn optional(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Walks through every field. `current` prefills the answers when editing.
fn prompt_fields(current: Option<&Incident>) -> Result<Option<NewIncident>> {
    let title0 = current.map(|i| i.title.as_str()).unwrap_or("");
    let service0 = current.map(|i| i.service.as_str()).unwrap_or("");
    let owner0 = current.and_then(|i| i.owner.as_deref()).unwrap_or("");
    let summary0 = current.and_then(|i| i.summary.as_deref()).unwrap_or("");

    let Some(title) = cancellable(
        Text::new("Title:")
            .with_initial_value(title0)
            .with_validator(text_rule("title", TITLE_MAX_LEN, true))
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let Some(service) = cancellable(
        Text::new("Service:")
            .with_initial_value(service0)
            .with_validator(text_rule("service", SERVICE_MAX_LEN, true))
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let severity_cursor = current
        .and_then(|i| Severity::ALL.iter().position(|s| *s == i.severity))
        .unwrap_or(0);
    let Some(severity) = cancellable(
        Select::new("Severity:", Severity::ALL.to_vec())
            .with_starting_cursor(severity_cursor)
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let status_cursor = current
        .and_then(|i| Status::ALL.iter().position(|s| *s == i.status))
        .unwrap_or(0);
    let Some(status) = cancellable(
        Select::new("Status:", Status::ALL.to_vec())
            .with_starting_cursor(status_cursor)
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let Some(owner) = cancellable(
        Text::new("Owner:")
            .with_initial_value(owner0)
            .with_help_message("leave empty for unassigned")
            .with_validator(text_rule("owner", OWNER_MAX_LEN, false))
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let Some(summary) = cancellable(
        Text::new("Summary:")
            .with_initial_value(summary0)
            .with_validator(text_rule("summary", SUMMARY_MAX_LEN, false))
            .prompt(),
    )?
    else {
        return Ok(None);
    };

    let draft = NewIncident {
        title: title.trim().to_string(),
        service: service.trim().to_string(),
        severity,
        status,
        owner: optional(owner),
        summary: optional(summary),
    };
    check_new(&draft)?;
    Ok(Some(draft))
}

pub fn prompt_new() -> Result<Option<NewIncident>> {
    prompt_fields(None)
}

/// Prompts with the current values and returns only what changed.
pub fn prompt_edit(current: &Incident) -> Result<Option<IncidentPatch>> {
    Ok(prompt_fields(Some(current))?.map(|draft| changes(current, &draft)))
}

pub fn changes(current: &Incident, edited: &NewIncident) -> IncidentPatch {
    IncidentPatch {
        title: (edited.title != current.title).then(|| edited.title.clone()),
        service: (edited.service != current.service).then(|| edited.service.clone()),
        severity: (edited.severity != current.severity).then_some(edited.severity),
        status: (edited.status != current.status).then_some(edited.status),
        owner: (edited.owner != current.owner).then(|| edited.owner.clone()),
        summary: (edited.summary != current.summary).then(|| edited.summary.clone()),
    }
}

pub fn confirm_delete(incident: &Incident) -> Result<bool> {
    let answer = cancellable(
        Confirm::new(&format!("Delete \"{}\"?", incident.title))
            .with_default(false)
            .prompt(),
    )?;
    Ok(answer.unwrap_or(false))
}

pub fn choose_action() -> Result<DetailAction> {
    let actions = vec![DetailAction::Edit, DetailAction::Delete, DetailAction::Back];
    let choice = cancellable(Select::new("Action:", actions).prompt())?;
    Ok(choice.unwrap_or(DetailAction::Back))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn current() -> Incident {
        let now = Utc::now();
        Incident {
            id: "1".into(),
            title: "Slow query performance".into(),
            service: "Database".into(),
            severity: Severity::Sev3,
            status: Status::Open,
            owner: Some("david@example.com".into()),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn unchanged(incident: &Incident) -> NewIncident {
        NewIncident {
            title: incident.title.clone(),
            service: incident.service.clone(),
            severity: incident.severity,
            status: incident.status,
            owner: incident.owner.clone(),
            summary: incident.summary.clone(),
        }
    }

    #[test]
    fn untouched_form_sends_nothing() {
        let incident = current();
        assert!(changes(&incident, &unchanged(&incident)).is_empty());
    }

    #[test]
    fn only_edited_fields_are_sent() {
        let incident = current();
        let mut edited = unchanged(&incident);
        edited.status = Status::Mitigated;
        edited.owner = None;
        edited.summary = Some("Added an index".into());

        assert_eq!(
            changes(&incident, &edited),
            IncidentPatch {
                status: Some(Status::Mitigated),
                owner: Some(None),
                summary: Some(Some("Added an index".into())),
                ..Default::default()
            }
        );
    }

    #[test]
    fn rules_match_server_limits() {
        let title = text_rule("title", TITLE_MAX_LEN, true);
        assert!(matches!(title("   ").unwrap(), Validation::Invalid(_)));
        assert!(matches!(title("x".repeat(256).as_str()).unwrap(), Validation::Invalid(_)));
        assert!(matches!(title("Disk space critical").unwrap(), Validation::Valid));

        let owner = text_rule("owner", OWNER_MAX_LEN, false);
        assert!(matches!(owner("").unwrap(), Validation::Valid));
    }

    #[test]
    fn blank_optional_answers_become_none() {
        assert_eq!(optional("  ".into()), None);
        assert_eq!(optional(" emma@example.com ".into()), Some("emma@example.com".into()));
    }
}

//! Create, edit and delete flows shared by command mode and browse mode.

use crate::client::ApiClient;
use crate::forms;
use crate::render;
use anyhow::Result;
use common::{Incident, NewIncident};

/// Result of a mutating flow, worded for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),
    Failed(String),
    Cancelled,
}

impl Outcome {
    fn from_result<T>(result: Result<T>, done: &str, failed: &str) -> Self {
        match result {
            Ok(_) => Outcome::Done(done.to_string()),
            Err(e) => Outcome::Failed(format!("{failed}: {e:#}")),
        }
    }

    pub fn print(&self) {
        match self {
            Outcome::Done(message) => println!("{}", render::success(message)),
            Outcome::Failed(message) => println!("{}", render::failure(message)),
            Outcome::Cancelled => println!("{}", render::failure("Cancelled")),
        }
    }
}

pub async fn submit_new(client: &ApiClient, incident: &NewIncident) -> Outcome {
    Outcome::from_result(
        client.create(incident).await,
        "Successfully Created",
        "Error creating incident",
    )
}

pub async fn create(client: &ApiClient) -> Result<Outcome> {
    match forms::prompt_new()? {
        Some(incident) => Ok(submit_new(client, &incident).await),
        None => Ok(Outcome::Cancelled),
    }
}

pub async fn edit(client: &ApiClient, current: &Incident) -> Result<Outcome> {
    let Some(patch) = forms::prompt_edit(current)? else {
        return Ok(Outcome::Cancelled);
    };
    if patch.is_empty() {
        return Ok(Outcome::Done("No changes".to_string()));
    }
    Ok(Outcome::from_result(
        client.update(&current.id, &patch).await,
        "Incident updated successfully!",
        "Error updating incident",
    ))
}

pub async fn delete(client: &ApiClient, incident: &Incident, confirmed: bool) -> Result<Outcome> {
    if !confirmed && !forms::confirm_delete(incident)? {
        return Ok(Outcome::Cancelled);
    }
    Ok(Outcome::from_result(
        client.delete(&incident.id).await,
        "Incident deleted successfully!",
        "Error deleting incident",
    ))
}

/// Shows a record and lets the user act on it.
pub async fn open(client: &ApiClient, id: &str) -> Result<Outcome> {
    let incident = match client.get(id).await {
        Ok(incident) => incident,
        Err(e) => return Ok(Outcome::Failed(format!("{e:#}"))),
    };
    for line in render::detail(&incident) {
        println!("{}", line);
    }
    match forms::choose_action()? {
        forms::DetailAction::Edit => edit(client, &incident).await,
        forms::DetailAction::Delete => delete(client, &incident, false).await,
        forms::DetailAction::Back => Ok(Outcome::Cancelled),
    }
}

use anyhow::{Context, Result};
use common::{Incident, IncidentPatch, ListParams, NewIncident, Page, ServerStatus};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Thin client for the incident API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// Error body returned by the server for any non-2xx response.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    error: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<Incident>> {
        let response = self
            .client
            .get(self.url("/incidents"))
            .query(params)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }

    pub async fn get(&self, id: &str) -> Result<Incident> {
        let response = self
            .client
            .get(self.url(&format!("/incidents/{id}")))
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }

    pub async fn create(&self, incident: &NewIncident) -> Result<Incident> {
        let response = self
            .client
            .post(self.url("/incidents"))
            .json(incident)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }

    pub async fn update(&self, id: &str, patch: &IncidentPatch) -> Result<Incident> {
        let response = self
            .client
            .patch(self.url(&format!("/incidents/{id}")))
            .json(patch)
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<Incident> {
        let response = self
            .client
            .delete(self.url(&format!("/incidents/{id}")))
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }

    pub async fn status(&self) -> Result<ServerStatus> {
        let response = self
            .client
            .get(self.url("/status"))
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    anyhow::bail!("{}", error_message(status.as_u16(), &text))
}

/// Flattens a server error body into one line.
pub fn error_message(status: u16, body: &str) -> String {
    let Ok(body) = serde_json::from_str::<ErrorBody>(body) else {
        return format!("request failed with status {status}");
    };
    match body.message {
        Value::String(message) => message,
        Value::Array(messages) => messages
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body
            .error
            .unwrap_or_else(|| format!("request failed with status {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn joins_validation_messages() {
        let body = r#"{"statusCode":400,"message":["title should not be empty","severity must be one of the following values: SEV1, SEV2, SEV3, SEV4"],"error":"Bad Request"}"#;
        assert_eq!(
            error_message(400, body),
            "title should not be empty; severity must be one of the following values: SEV1, SEV2, SEV3, SEV4"
        );
    }

    #[test]
    fn single_message_and_unparseable_bodies() {
        let body = r#"{"statusCode":404,"message":"Incident with ID x not found","error":"Not Found"}"#;
        assert_eq!(error_message(404, body), "Incident with ID x not found");
        assert_eq!(error_message(502, "<html>bad gateway</html>"), "request failed with status 502");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/status"), "http://localhost:3000/api/status");
    }
}

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{expect_success, ApiClient, ListResponse};
use crate::error::ClientError;

/// A monitored HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEndpoint {
    pub name: String,
    pub url: String,
    pub interval_minutes: u32,
}

fn default_interval() -> u32 {
    5
}

fn default_active() -> bool {
    true
}

impl NewEndpoint {
    /// Checks the form before it is sent: a name, an absolute http(s) URL
    /// and a positive interval.
    pub fn validate(&self) -> Result<(), ClientError> {
        let mut field_errors = std::collections::BTreeMap::new();

        if self.name.trim().is_empty() {
            field_errors.insert("name".to_string(), "Name is required".to_string());
        }
        match url::Url::parse(self.url.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                field_errors.insert("url".to_string(), "Enter a valid http(s) URL".to_string());
            }
        }
        if self.interval_minutes == 0 {
            field_errors.insert(
                "interval_minutes".to_string(),
                "Interval must be at least one minute".to_string(),
            );
        }

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation {
                message: "Please fix the highlighted fields".to_string(),
                field_errors,
            })
        }
    }
}

impl ApiClient {
    pub async fn list_endpoints(&self) -> Result<Vec<Endpoint>, ClientError> {
        let list: ListResponse<Endpoint> = self
            .authorized_json(Method::GET, "/api/endpoints/", None::<&()>)
            .await?;
        Ok(list.into_items())
    }

    pub async fn create_endpoint(&self, endpoint: &NewEndpoint) -> Result<Endpoint, ClientError> {
        endpoint.validate()?;
        let created: Endpoint = self
            .authorized_json(Method::POST, "/api/endpoints/", Some(endpoint))
            .await?;
        tracing::info!(id = created.id, url = %created.url, "endpoint created");
        Ok(created)
    }

    pub async fn delete_endpoint(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .authorized(Method::DELETE, &format!("/api/endpoints/{id}/"), None::<&()>)
            .await?;
        expect_success(response).await?;
        tracing::info!(id, "endpoint deleted");
        Ok(())
    }
}

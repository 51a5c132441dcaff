//! Power BI semantic models (datasets) behind a Lakehouse
//!
//! The SQL endpoint does not expose the relationships defined in the
//! Lakehouse's semantic model, so they are read through the Power BI REST
//! API instead.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use fabric_common::auth::{AuthError, TokenCredential, POWERBI_SCOPE};

use crate::config::MissingSetting;
use crate::types::{Relationship, RelationshipTuple, SemanticModel, SemanticModelInfo};

pub mod dax;

use dax::RelationshipSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the Power BI REST API
#[derive(Error, Debug)]
pub enum SemanticModelError {
    #[error(transparent)]
    NotConfigured(#[from] MissingSetting),

    #[error("could not get a Power BI access token: {0}")]
    Auth(#[from] AuthError),

    #[error("Power BI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to get datasets: {status} - {body}")]
    ListFailed { status: u16, body: String },

    #[error("invalid Power BI response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct DatasetList {
    #[serde(default)]
    value: Vec<SemanticModel>,
}

/// Client for the dataset endpoints of one Power BI API host
pub struct SemanticModelClient {
    http: Client,
    api_base_url: String,
    credential: Arc<dyn TokenCredential>,
}

impl SemanticModelClient {
    pub fn new(api_base_url: &str, credential: Arc<dyn TokenCredential>) -> Result<Self, SemanticModelError> {
        let http = Client::builder()
            .user_agent(concat!("fabric-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn datasets_url(&self, workspace_id: &str) -> String {
        format!("{}/v1.0/myorg/groups/{}/datasets", self.api_base_url, workspace_id)
    }

    /// All datasets in a workspace
    #[instrument(skip(self))]
    pub async fn list_models(&self, workspace_id: &str) -> Result<Vec<SemanticModel>, SemanticModelError> {
        let token = self.credential.get_token(POWERBI_SCOPE).await?;

        let response = self
            .http
            .get(self.datasets_url(workspace_id))
            .bearer_auth(token.secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticModelError::ListFailed { status, body });
        }

        let list: DatasetList = response
            .json()
            .await
            .map_err(|e| SemanticModelError::InvalidResponse(e.to_string()))?;

        debug!("Found {} datasets", list.value.len());
        Ok(list.value)
    }

    /// First dataset whose name contains the Lakehouse name (case-insensitive)
    ///
    /// Lakehouses create a default semantic model named after themselves.
    pub async fn find_for_lakehouse(
        &self,
        workspace_id: &str,
        lakehouse_name: &str,
    ) -> Result<Option<SemanticModel>, SemanticModelError> {
        let models = self.list_models(workspace_id).await?;
        Ok(pick_model(models, lakehouse_name))
    }

    /// Relationships defined in a dataset
    ///
    /// Tries `INFO.RELATIONSHIPS()` first and the schema DMV if that is
    /// rejected. Query failures are logged and yield an empty list; only
    /// token errors are returned.
    #[instrument(skip(self))]
    pub async fn relationships(
        &self,
        workspace_id: &str,
        dataset_id: &str,
    ) -> Result<Vec<Relationship>, SemanticModelError> {
        let token = self.credential.get_token(POWERBI_SCOPE).await?;

        match self.execute(token.secret(), workspace_id, dataset_id, RelationshipSource::InfoFunction).await {
            Ok(Some(rels)) => return Ok(rels),
            Ok(None) => debug!("INFO.RELATIONSHIPS() rejected, trying TMSCHEMA_RELATIONSHIPS"),
            Err(e) => {
                warn!("Error querying relationships: {}", e);
                return Ok(Vec::new());
            }
        }

        match self.execute(token.secret(), workspace_id, dataset_id, RelationshipSource::SchemaDmv).await {
            Ok(rels) => Ok(rels.unwrap_or_default()),
            Err(e) => {
                warn!("DMV query failed: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Run one relationship query; `Ok(None)` when the service rejects it
    async fn execute(
        &self,
        token: &str,
        workspace_id: &str,
        dataset_id: &str,
        source: RelationshipSource,
    ) -> Result<Option<Vec<Relationship>>, SemanticModelError> {
        let url = format!("{}/{}/executeQueries", self.datasets_url(workspace_id), dataset_id);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&dax::request_body(source.query()))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), ?source, "executeQueries returned an error");
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SemanticModelError::InvalidResponse(e.to_string()))?;

        Ok(Some(dax::parse_relationships(&body, source)))
    }

    /// Relationships of the Lakehouse's semantic model as tuples; empty if
    /// there is no model
    pub async fn lakehouse_relationships(
        &self,
        workspace_id: &str,
        lakehouse_name: &str,
    ) -> Result<Vec<RelationshipTuple>, SemanticModelError> {
        let Some(model) = self.find_for_lakehouse(workspace_id, lakehouse_name).await? else {
            return Ok(Vec::new());
        };

        Ok(self
            .relationships(workspace_id, &model.id)
            .await?
            .into_iter()
            .map(Relationship::into_tuple)
            .collect())
    }

    /// Summary of the Lakehouse's semantic model
    pub async fn info(
        &self,
        workspace_id: &str,
        lakehouse_name: &str,
    ) -> Result<SemanticModelInfo, SemanticModelError> {
        let Some(model) = self.find_for_lakehouse(workspace_id, lakehouse_name).await? else {
            return Ok(SemanticModelInfo::NotFound {
                found: false,
                message: format!("No semantic model found for lakehouse '{}'", lakehouse_name),
            });
        };

        let relationships = self.relationships(workspace_id, &model.id).await?;

        Ok(SemanticModelInfo::Found {
            found: true,
            workspace_id: workspace_id.to_string(),
            dataset_id: model.id,
            lakehouse_name: lakehouse_name.to_string(),
            relationship_count: relationships.len(),
            relationships,
        })
    }
}

fn pick_model(models: Vec<SemanticModel>, lakehouse_name: &str) -> Option<SemanticModel> {
    let needle = lakehouse_name.to_lowercase();
    models
        .into_iter()
        .find(|m| m.name.to_lowercase().contains(&needle))
}

//! Synapse REST client.
//!
//! Only the handful of endpoints the annotate and walk stages need:
//! annotations (v2) get/put and paginated children listing.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RepositoryError;

use super::DataRepository;

pub const SYNAPSE_API_BASE: &str = "https://repo-prod.prod.sagebase.org/repo/v1";

const FILE_ENTITY_TYPE: &str = "org.sagebionetworks.repo.model.FileEntity";
const FOLDER_ENTITY_TYPE: &str = "org.sagebionetworks.repo.model.Folder";

/// A typed annotation value list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationValue {
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: Vec<String>,
}

impl AnnotationValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value_type: "STRING".to_string(),
            value: vec![value.into()],
        }
    }
}

/// Annotations attached to an entity, with the etag required to update them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub id: String,
    pub etag: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, AnnotationValue>,
}

impl Annotations {
    pub fn new(id: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            etag: etag.into(),
            annotations: BTreeMap::new(),
        }
    }

    /// Sets `key` to a single string value, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations
            .insert(key.into(), AnnotationValue::string(value));
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.annotations.get(key).map(|v| v.value.as_slice())
    }
}

/// Minimal description of a child entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHeader {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

impl EntityHeader {
    pub fn is_file(&self) -> bool {
        self.entity_type == FILE_ENTITY_TYPE
    }

    pub fn is_folder(&self) -> bool {
        self.entity_type == FOLDER_ENTITY_TYPE
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: FILE_ENTITY_TYPE.to_string(),
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: FOLDER_ENTITY_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenRequest<'a> {
    parent_id: &'a str,
    include_types: [&'a str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenPage {
    #[serde(default)]
    page: Vec<EntityHeader>,
    next_page_token: Option<String>,
}

/// Synapse client authenticated with a personal access token.
#[derive(Debug, Clone)]
pub struct SynapseClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SynapseClient {
    pub fn new(token: impl Into<String>) -> Result<Self, RepositoryError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RepositoryError::MissingToken);
        }
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: SYNAPSE_API_BASE.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn check(resp: Response, entity: &str) -> Result<Response, RepositoryError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(RepositoryError::ApiError {
            code: status.as_u16(),
            entity: entity.to_string(),
            message,
        })
    }
}

#[async_trait]
impl DataRepository for SynapseClient {
    async fn get_annotations(&self, synid: &str) -> Result<Annotations, RepositoryError> {
        let url = format!("{}/entity/{}/annotations2", self.base_url, synid);
        debug!(synid, "GET annotations");
        let resp = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let resp = Self::check(resp, synid).await?;
        resp.json::<Annotations>()
            .await
            .map_err(|e| RepositoryError::ParseError(e.to_string()))
    }

    async fn set_annotations(
        &self,
        annotations: &Annotations,
    ) -> Result<Annotations, RepositoryError> {
        let url = format!("{}/entity/{}/annotations2", self.base_url, annotations.id);
        debug!(synid = %annotations.id, "PUT annotations");
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(annotations)
            .send()
            .await?;
        let resp = Self::check(resp, &annotations.id).await?;
        resp.json::<Annotations>()
            .await
            .map_err(|e| RepositoryError::ParseError(e.to_string()))
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<EntityHeader>, RepositoryError> {
        let url = format!("{}/entity/children", self.base_url);
        let mut children = Vec::new();
        let mut next_page_token = None;
        loop {
            let body = ChildrenRequest {
                parent_id,
                include_types: ["folder", "file"],
                next_page_token: next_page_token.take(),
            };
            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.token)
                .json(&body)
                .send()
                .await?;
            let page: ChildrenPage = Self::check(resp, parent_id)
                .await?
                .json()
                .await
                .map_err(|e| RepositoryError::ParseError(e.to_string()))?;
            debug!(parent_id, count = page.page.len(), "Listed children page");
            children.extend(page.page);
            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }
        Ok(children)
    }
}

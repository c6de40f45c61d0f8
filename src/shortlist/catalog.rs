//! Authoritative list of released imaging entities.
//!
//! The catalog lives in BigQuery; [`BigQueryCli`] runs the eligibility query
//! through the `bq` command-line tool and decodes its JSON output.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::QueryError;
use crate::utils::run_command;

/// Released ImagingLevel2 entities with the fields the samplesheet needs.
///
/// `convert` is true unless the file is already an OME-TIFF. MERFISH assays
/// and HTAN HTAPP data are excluded.
pub const ELIGIBLE_ENTITIES_QUERY: &str = r#"
SELECT
    e.entityId as id,
    i2.Cloud_Storage_Path AS image,
    i2.Imaging_Assay_Type = 'H&E' AS he,
    CASE
        WHEN REGEXP_CONTAINS(i2.Filename, r'\.ome\.tif{1,2}$') THEN FALSE
        ELSE TRUE
    END AS convert,
    i2.Imaging_Assay_Type AS type,
    i2.HTAN_Center AS center
FROM `htan-dcc.released.entities` e
LEFT JOIN `htan-dcc.combined_assays.ImagingLevel2` i2
ON e.entityId = i2.entityId
WHERE e.Component = 'ImagingLevel2'
    AND i2.Imaging_Assay_Type != 'MERFISH'
    AND i2.HTAN_Center != 'HTAN HTAPP'
"#;

const BQ_PROGRAM: &str = "bq";
const BQ_MAX_ROWS: &str = "1000000";

/// An entity eligible for derivative generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleEntity {
    pub id: String,
    pub image: String,
    pub he: bool,
    pub convert: bool,
    pub assay_type: String,
    pub center: String,
}

/// Source of eligible entities.
#[async_trait]
pub trait EntityCatalog: Send + Sync {
    async fn eligible_entities(&self) -> Result<Vec<EligibleEntity>, QueryError>;
}

#[derive(Debug, Deserialize)]
struct RawRow {
    id: Option<Value>,
    image: Option<Value>,
    he: Option<Value>,
    convert: Option<Value>,
    #[serde(rename = "type")]
    assay_type: Option<Value>,
    center: Option<Value>,
}

fn text(column: &str, value: Option<Value>) -> Result<String, QueryError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(QueryError::UnexpectedValue {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

// `bq --format=json` renders booleans as strings.
fn flag(column: &str, value: Option<Value>) -> Result<bool, QueryError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(other) => Err(QueryError::UnexpectedValue {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Decodes query rows returned as a JSON array of objects.
pub fn parse_query_rows(json: &str) -> Result<Vec<EligibleEntity>, QueryError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<RawRow> = serde_json::from_str(json)?;
    rows.into_iter()
        .map(|row| {
            Ok(EligibleEntity {
                id: text("id", row.id)?,
                image: text("image", row.image)?,
                he: flag("he", row.he)?,
                convert: flag("convert", row.convert)?,
                assay_type: text("type", row.assay_type)?,
                center: text("center", row.center)?,
            })
        })
        .collect()
}

/// Catalog backed by the `bq` CLI and ambient Google credentials.
#[derive(Debug, Clone)]
pub struct BigQueryCli {
    project: String,
    program: String,
    query: String,
}

impl BigQueryCli {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            program: BQ_PROGRAM.to_string(),
            query: ELIGIBLE_ENTITIES_QUERY.to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    fn args(&self) -> Vec<String> {
        vec![
            format!("--project_id={}", self.project),
            "query".to_string(),
            "--format=json".to_string(),
            "--nouse_legacy_sql".to_string(),
            format!("--max_rows={}", BQ_MAX_ROWS),
            self.query.clone(),
        ]
    }
}

#[async_trait]
impl EntityCatalog for BigQueryCli {
    async fn eligible_entities(&self) -> Result<Vec<EligibleEntity>, QueryError> {
        info!(project = %self.project, "Querying BigQuery");
        let output = run_command(&self.program, &self.args(), &[])
            .await
            .map_err(|e| QueryError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;
        if !output.success() {
            return Err(QueryError::Failed {
                code: output.code,
                stderr: output.stderr,
            });
        }
        let rows = parse_query_rows(&output.stdout)?;
        info!(records = rows.len(), "Retrieved records from BigQuery");
        Ok(rows)
    }
}

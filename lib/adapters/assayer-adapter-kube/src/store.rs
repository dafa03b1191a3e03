//! `Assessment` custom resources as the assessment store.
//!
//! Status writes go through the status subresource as a JSON merge patch
//! carrying `metadata.resourceVersion`, so the API server rejects stale
//! writes with 409 Conflict.

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::GroupVersionKind;
use serde_json::{Map, Value, json};

use assayer_domain::{Assessment, AssessmentStatus, ResourceKind};
use assayer_ports::{AssessmentStore, StoreError};

pub const ASSESSMENT_GROUP: &str = "assayer.dev";
pub const ASSESSMENT_VERSION: &str = "v1alpha1";
const ASSESSMENT_KIND: &str = "Assessment";
const ASSESSMENT_PLURAL: &str = "assessments";

/// Optional status fields that must be sent as `null` to be cleared by a
/// merge patch.
const NULLABLE_STATUS_FIELDS: [&str; 4] = ["lastRunTime", "nextRunTime", "clusterInfo", "summary"];

/// Optional fields of nested status objects. Merge patches recurse into
/// objects, so these need explicit nulls too. Arrays are replaced whole.
const NULLABLE_NESTED_FIELDS: [(&str, &str); 2] =
    [("summary", "score"), ("clusterInfo", "collectedAt")];

pub fn assessment_kind() -> ResourceKind {
    ResourceKind::new(
        ASSESSMENT_GROUP,
        ASSESSMENT_VERSION,
        ASSESSMENT_KIND,
        ASSESSMENT_PLURAL,
        false,
    )
}

#[derive(Clone)]
pub struct KubeAssessmentStore {
    api: Api<DynamicObject>,
}

impl KubeAssessmentStore {
    pub fn new(client: Client) -> Self {
        Self {
            api: assessment_api(client),
        }
    }
}

pub(crate) fn assessment_api(client: Client) -> Api<DynamicObject> {
    let gvk = GroupVersionKind::gvk(ASSESSMENT_GROUP, ASSESSMENT_VERSION, ASSESSMENT_KIND);
    let resource = ApiResource::from_gvk_with_plural(&gvk, ASSESSMENT_PLURAL);
    Api::all_with(client, &resource)
}

/// Maps a custom resource onto the domain record. Missing `spec` or `status`
/// sections decode to their defaults.
pub fn decode_assessment(object: DynamicObject) -> Result<Assessment> {
    let name = object
        .metadata
        .name
        .clone()
        .context("assessment object has no name")?;
    let section = |key: &str| object.data.get(key).filter(|value| !value.is_null()).cloned();
    let spec = match section("spec") {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("invalid spec in assessment {name:?}"))?,
        None => Default::default(),
    };
    let status = match section("status") {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("invalid status in assessment {name:?}"))?,
        None => Default::default(),
    };
    Ok(Assessment {
        resource_version: object.metadata.resource_version.clone(),
        name,
        spec,
        status,
    })
}

/// Merge patch that replaces the whole status, guarded by `resource_version`.
pub fn status_patch(assessment: &Assessment) -> Result<Value> {
    let status = status_value(&assessment.status)?;
    Ok(json!({
        "apiVersion": format!("{ASSESSMENT_GROUP}/{ASSESSMENT_VERSION}"),
        "kind": ASSESSMENT_KIND,
        "metadata": {
            "name": assessment.name,
            "resourceVersion": assessment.resource_version,
        },
        "status": status,
    }))
}

fn status_value(status: &AssessmentStatus) -> Result<Value> {
    let mut fields: Map<String, Value> = match serde_json::to_value(status)? {
        Value::Object(fields) => fields,
        other => anyhow::bail!("status serialized to a non-object: {other}"),
    };
    for field in NULLABLE_STATUS_FIELDS {
        fields.entry(field).or_insert(Value::Null);
    }
    for (parent, field) in NULLABLE_NESTED_FIELDS {
        if let Some(Value::Object(nested)) = fields.get_mut(parent) {
            nested.entry(field).or_insert(Value::Null);
        }
    }
    Ok(Value::Object(fields))
}

fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == code)
}

#[async_trait]
impl AssessmentStore for KubeAssessmentStore {
    async fn get(&self, name: &str) -> Result<Option<Assessment>, StoreError> {
        let object = self
            .api
            .get_opt(name)
            .await
            .with_context(|| format!("failed to get assessment {name:?}"))?;
        Ok(object.map(decode_assessment).transpose()?)
    }

    async fn list(&self) -> Result<Vec<Assessment>, StoreError> {
        let objects = self
            .api
            .list(&ListParams::default())
            .await
            .context("failed to list assessments")?;
        let mut assessments = Vec::with_capacity(objects.items.len());
        for object in objects.items {
            match decode_assessment(object) {
                Ok(assessment) => assessments.push(assessment),
                Err(err) => tracing::warn!(error = %format!("{err:#}"), "skipping undecodable assessment"),
            }
        }
        Ok(assessments)
    }

    async fn update_status(&self, assessment: &Assessment) -> Result<Assessment, StoreError> {
        let patch = status_patch(assessment)?;
        match self
            .api
            .patch_status(&assessment.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(object) => Ok(decode_assessment(object)?),
            Err(err) if is_status(&err, 409) => Err(StoreError::Conflict {
                name: assessment.name.clone(),
            }),
            Err(err) if is_status(&err, 404) => Err(StoreError::NotFound {
                name: assessment.name.clone(),
            }),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!(
                    "failed to update status of assessment {:?}",
                    assessment.name
                ))
                .into()),
        }
    }
}

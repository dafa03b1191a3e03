use std::sync::Arc;

use async_trait::async_trait;

use assayer_domain::{Finding, FindingStatus, Resource, ResourceKind};
use assayer_ports::{ValidationContext, Validator, ValidatorError, ValidatorRegistration};

pub const NAME: &str = "rbac-cluster-admin";
const CATEGORY: &str = "security";
const CLUSTER_ADMIN: &str = "cluster-admin";
const ANONYMOUS_SUBJECTS: [&str; 2] = ["system:anonymous", "system:unauthenticated"];

/// Counts non-system bindings to `cluster-admin` and flags any that grant
/// it to unauthenticated users.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterAdminValidator;

pub(crate) fn factory() -> Arc<dyn Validator> {
    Arc::new(ClusterAdminValidator)
}

inventory::submit! { ValidatorRegistration::new(factory) }

fn grants_cluster_admin(binding: &Resource) -> bool {
    binding.nested_str(&["roleRef", "kind"]) == Some("ClusterRole")
        && binding.nested_str(&["roleRef", "name"]) == Some(CLUSTER_ADMIN)
}

fn subject_names(binding: &Resource) -> Vec<&str> {
    binding
        .nested_slice(&["subjects"])
        .unwrap_or_default()
        .iter()
        .filter_map(|subject| subject.get("name").and_then(|name| name.as_str()))
        .collect()
}

#[async_trait]
impl Validator for ClusterAdminValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn category(&self) -> &str {
        CATEGORY
    }

    fn description(&self) -> &str {
        "Limits how many identities hold cluster-admin"
    }

    async fn validate(&self, ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        let bindings = ctx
            .reader
            .list(&ctx.cancel, &ResourceKind::cluster_role_bindings(), None)
            .await?;
        let admin: Vec<&Resource> = bindings
            .iter()
            .filter(|binding| grants_cluster_admin(binding))
            .filter(|binding| !binding.name().starts_with("system:"))
            .collect();

        let mut findings = Vec::new();
        let max = ctx.profile.thresholds.max_cluster_admin_bindings as usize;
        let names: Vec<&str> = admin.iter().map(|binding| binding.name()).collect();
        findings.push(if admin.len() > max {
            Finding::new(
                "rbac-cluster-admin-bindings",
                NAME,
                CATEGORY,
                FindingStatus::Fail,
                "Too many cluster-admin bindings",
            )
            .with_description(format!(
                "{} binding(s) grant cluster-admin ({}); profile {} allows {max}.",
                admin.len(),
                names.join(", "),
                ctx.profile.name
            ))
            .with_impact("Every cluster-admin identity can read every secret and change any workload.")
            .with_recommendation("Replace broad bindings with namespaced Roles scoped to what each identity needs.")
            .with_reference("https://kubernetes.io/docs/concepts/security/rbac-good-practices/")
        } else {
            Finding::new(
                "rbac-cluster-admin-bindings",
                NAME,
                CATEGORY,
                FindingStatus::Pass,
                "cluster-admin bindings are within limits",
            )
            .with_description(format!("{} non-system binding(s) grant cluster-admin.", admin.len()))
        });

        for binding in &admin {
            let anonymous = subject_names(binding)
                .into_iter()
                .any(|subject| ANONYMOUS_SUBJECTS.contains(&subject));
            if anonymous {
                findings.push(
                    Finding::new(
                        format!("rbac-cluster-admin-anonymous-{}", binding.name()),
                        NAME,
                        CATEGORY,
                        FindingStatus::Fail,
                        "cluster-admin granted to unauthenticated users",
                    )
                    .with_resource(None, binding.name())
                    .with_impact("Anyone who can reach the API server controls the cluster.")
                    .with_recommendation("Delete the binding immediately."),
                );
            }
        }
        Ok(findings)
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use assayer_domain::{Finding, FindingStatus, ResourceKind};
use assayer_ports::{ValidationContext, Validator, ValidatorError, ValidatorRegistration};

pub const NAME: &str = "network-policies";
const CATEGORY: &str = "networking";
const SYSTEM_NAMESPACES: [&str; 3] = ["kube-system", "kube-public", "kube-node-lease"];

/// Every user namespace should have at least one NetworkPolicy when the
/// profile requires them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkPolicyValidator;

pub(crate) fn factory() -> Arc<dyn Validator> {
    Arc::new(NetworkPolicyValidator)
}

inventory::submit! { ValidatorRegistration::new(factory) }

#[async_trait]
impl Validator for NetworkPolicyValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn category(&self) -> &str {
        CATEGORY
    }

    fn description(&self) -> &str {
        "Reports namespaces without any NetworkPolicy"
    }

    async fn validate(&self, ctx: &ValidationContext) -> Result<Vec<Finding>, ValidatorError> {
        if !ctx.profile.thresholds.require_network_policies {
            return Ok(vec![Finding::new(
                "network-policies-not-required",
                NAME,
                CATEGORY,
                FindingStatus::Info,
                "NetworkPolicies are not required by this profile",
            )]);
        }

        let namespaces = ctx
            .reader
            .list(&ctx.cancel, &ResourceKind::namespaces(), None)
            .await?;
        ctx.cancel.check()?;
        let policies = ctx
            .reader
            .list(&ctx.cancel, &ResourceKind::network_policies(), None)
            .await?;
        let covered: BTreeSet<&str> = policies
            .iter()
            .filter_map(|policy| policy.namespace())
            .collect();

        let uncovered: Vec<&str> = namespaces
            .iter()
            .map(|namespace| namespace.name())
            .filter(|name| !SYSTEM_NAMESPACES.contains(name) && !covered.contains(name))
            .collect();

        if uncovered.is_empty() {
            return Ok(vec![Finding::new(
                "network-policies-coverage",
                NAME,
                CATEGORY,
                FindingStatus::Pass,
                "Every namespace has a NetworkPolicy",
            )]);
        }

        Ok(uncovered
            .into_iter()
            .map(|namespace| {
                Finding::new(
                    format!("network-policies-missing-{namespace}"),
                    NAME,
                    CATEGORY,
                    FindingStatus::Warn,
                    "Namespace has no NetworkPolicy",
                )
                .with_resource(Some(namespace), namespace)
                .with_description(format!(
                    "Namespace {namespace} accepts traffic from every pod in the cluster."
                ))
                .with_recommendation("Add a default-deny NetworkPolicy and allow required flows explicitly.")
                .with_reference("https://kubernetes.io/docs/concepts/services-networking/network-policies/")
            })
            .collect())
    }
}

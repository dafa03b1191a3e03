use serde_json::json;

use assayer_domain::{FindingStatus, Profile, ResourceKind};
use assayer_ports::Validator;

use crate::rbac::ClusterAdminValidator;
use crate::test_support::{StaticReader, cluster_admin_binding};

#[tokio::test]
async fn counts_only_non_system_cluster_admin_bindings() {
    let ctx = StaticReader::default()
        .with(
            ResourceKind::cluster_role_bindings(),
            vec![
                cluster_admin_binding("system:masters-admin", "system:masters"),
                cluster_admin_binding("alice-admin", "alice"),
                cluster_admin_binding("bob-admin", "bob"),
                json!({
                    "metadata": {"name": "viewers"},
                    "roleRef": {"kind": "ClusterRole", "name": "view"},
                    "subjects": [{"kind": "Group", "name": "devs"}]
                }),
            ],
        )
        .context(Profile::strict());

    let findings = ClusterAdminValidator.validate(&ctx).await.unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].status, FindingStatus::Fail);
    assert!(findings[0].description.contains("alice-admin"));
    assert!(!findings[0].description.contains("system:masters"));
}

#[tokio::test]
async fn within_limit_passes_and_anonymous_grant_fails() {
    let ctx = StaticReader::default()
        .with(
            ResourceKind::cluster_role_bindings(),
            vec![cluster_admin_binding("open-door", "system:anonymous")],
        )
        .context(Profile::production());

    let findings = ClusterAdminValidator.validate(&ctx).await.unwrap();

    assert_eq!(findings[0].status, FindingStatus::Pass);
    let anonymous = &findings[1];
    assert_eq!(anonymous.id, "rbac-cluster-admin-anonymous-open-door");
    assert_eq!(anonymous.status, FindingStatus::Fail);
    assert_eq!(anonymous.resource.as_deref(), Some("open-door"));
}

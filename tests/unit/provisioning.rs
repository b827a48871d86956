//! Unit tests for create, delete, retract, and connection lookup

use std::time::{Duration, Instant};

use db_provisioner::provisioner::IdentityPoll;
use db_provisioner::{CreateClusterRequest, Error, Orchestrator, ProvisionStep};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::core::ObjectMeta;
use serde_json::json;

use crate::common::*;

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_mysql_with_defaults() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "mysql").with_namespace("ns1");

        let record = provisioner.create(&request).await.unwrap();
        assert_eq!(record.name, "db1");
        assert_eq!(record.namespace, "ns1");
        assert_eq!(
            record.steps(),
            &[
                ProvisionStep::ServiceAccount,
                ProvisionStep::Role,
                ProvisionStep::RoleBinding,
                ProvisionStep::Cluster
            ]
        );

        let clusters = provisioner.orchestrator().clusters("ns1");
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster["metadata"]["name"], "db1");
        assert_eq!(cluster["spec"]["clusterDefinitionRef"], "apecloud-mysql");
        assert_eq!(cluster["spec"]["clusterVersionRef"], "ac-mysql-8.0.30-1");

        let components = cluster["spec"]["componentSpecs"].as_array().unwrap();
        assert_eq!(components.len(), 1);
        let component = &components[0];
        assert_eq!(component["name"], "mysql");
        assert_eq!(component["replicas"], 1);
        assert_eq!(component["serviceAccountName"], "db1");
        assert_eq!(
            component["resources"],
            json!({
                "limits": {"cpu": "1000m", "memory": "1024Mi"},
                "requests": {"cpu": "100m", "memory": "102Mi"}
            })
        );
        assert_eq!(
            component["volumeClaimTemplates"][0]["spec"]["resources"]["requests"]["storage"],
            "3Gi"
        );
    }

    #[tokio::test]
    async fn test_calls_are_ordered() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");
        provisioner.create(&request).await.unwrap();

        assert_eq!(
            provisioner.orchestrator().verbs(),
            vec![
                Verb::CreateServiceAccount,
                Verb::CreateRole,
                Verb::CreateRoleBinding,
                Verb::CheckServiceAccount,
                Verb::CreateCluster,
            ]
        );
        assert!(
            provisioner
                .orchestrator()
                .calls()
                .iter()
                .all(|c| c.namespace == "ns1" && c.name == "db1")
        );
    }

    #[tokio::test]
    async fn test_blank_namespace_uses_default() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "redis");
        let record = provisioner.create(&request).await.unwrap();

        assert_eq!(record.namespace, TEST_DEFAULT_NAMESPACE);
        assert_eq!(provisioner.orchestrator().clusters(TEST_DEFAULT_NAMESPACE).len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type_makes_no_calls() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "unsupported-type").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(matches!(failure.error, Error::UnsupportedType(ref t) if t == "unsupported-type"));
        assert!(failure.record.is_empty());
        assert!(provisioner.orchestrator().calls().is_empty());
        assert!(!provisioner.orchestrator().has_service_account("ns1", "db1"));
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_calls() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("Bad_Name", "postgresql");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(failure.error.is_validation());
        assert!(provisioner.orchestrator().calls().is_empty());
    }

    #[tokio::test]
    async fn test_role_failure_stops_sequence() {
        let fake = FakeOrchestrator::new().fail_on(Verb::CreateRole, 403);
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(failure.error.to_string().starts_with("failed to create Role: "));
        assert_eq!(failure.record.steps(), &[ProvisionStep::ServiceAccount]);
        assert_eq!(provisioner.orchestrator().count(Verb::CreateRoleBinding), 0);
        assert_eq!(provisioner.orchestrator().count(Verb::CreateCluster), 0);
        // No rollback by default
        assert!(provisioner.orchestrator().has_service_account("ns1", "db1"));
    }

    #[tokio::test]
    async fn test_existing_service_account_fails_attempt() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");
        provisioner.create(&request).await.unwrap();

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(failure.error.is_conflict());
        assert!(failure.record.is_empty());
    }

    #[tokio::test]
    async fn test_cluster_failure_leaves_access_objects() {
        let fake = FakeOrchestrator::new().fail_on(Verb::CreateCluster, 500);
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "kafka").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(
            failure
                .error
                .to_string()
                .starts_with("failed to create database cluster: ")
        );
        assert_eq!(
            failure.record.steps(),
            &[
                ProvisionStep::ServiceAccount,
                ProvisionStep::Role,
                ProvisionStep::RoleBinding
            ]
        );
        let fake = provisioner.orchestrator();
        assert!(fake.has_service_account("ns1", "db1"));
        assert!(fake.has_role("ns1", "db1"));
        assert!(fake.has_role_binding("ns1", "db1"));
    }

    #[tokio::test]
    async fn test_cluster_failure_retracted_when_enabled() {
        let fake = FakeOrchestrator::new().fail_on(Verb::CreateCluster, 500);
        let provisioner = retracting_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "mongodb").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(failure.record.is_empty());

        let fake = provisioner.orchestrator();
        let deletes: Vec<Verb> = fake
            .verbs()
            .into_iter()
            .filter(|v| {
                matches!(
                    v,
                    Verb::DeleteRoleBinding | Verb::DeleteRole | Verb::DeleteServiceAccount
                )
            })
            .collect();
        assert_eq!(
            deletes,
            vec![
                Verb::DeleteRoleBinding,
                Verb::DeleteRole,
                Verb::DeleteServiceAccount
            ]
        );
        assert!(!fake.has_service_account("ns1", "db1"));
        assert!(!fake.has_role("ns1", "db1"));
        assert!(!fake.has_role_binding("ns1", "db1"));
    }
}

mod readiness_tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_visible_after_retries() {
        let fake = FakeOrchestrator::new().with_identity_visibility(IdentityVisibility::AfterChecks(2));
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "milvus").with_namespace("ns1");

        provisioner.create(&request).await.unwrap();
        assert_eq!(provisioner.orchestrator().count(Verb::CheckServiceAccount), 2);
        assert_eq!(provisioner.orchestrator().count(Verb::CreateCluster), 1);
    }

    #[tokio::test]
    async fn test_identity_never_visible() {
        let fake = FakeOrchestrator::new().with_identity_visibility(IdentityVisibility::Never);
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        match failure.error {
            Error::IdentityNotReady {
                ref name,
                ref namespace,
                attempts,
            } => {
                assert_eq!(name, "db1");
                assert_eq!(namespace, "ns1");
                assert_eq!(attempts, TEST_POLL_ATTEMPTS);
            }
            ref other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            provisioner.orchestrator().count(Verb::CheckServiceAccount),
            TEST_POLL_ATTEMPTS as usize
        );
        assert_eq!(provisioner.orchestrator().count(Verb::CreateCluster), 0);
        assert_eq!(failure.record.steps().len(), 3);
    }

    #[tokio::test]
    async fn test_settle_delay_precedes_first_check() {
        let settle = Duration::from_millis(40);
        let fake = FakeOrchestrator::new();
        let service_account = ServiceAccount {
            metadata: ObjectMeta {
                name: Some("db1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        fake.create_service_account("ns1", &service_account)
            .await
            .unwrap();

        let poll = IdentityPoll::new(TEST_POLL_ATTEMPTS, Duration::from_millis(1)).with_settle(settle);
        let started = Instant::now();
        let reads = poll.wait(&fake, "db1", "ns1").await.unwrap();

        assert_eq!(reads, 1);
        assert!(started.elapsed() >= settle);
        assert_eq!(fake.count(Verb::CheckServiceAccount), 1);
    }

    #[tokio::test]
    async fn test_identity_check_error_is_not_retried() {
        let fake = FakeOrchestrator::new().fail_on(Verb::CheckServiceAccount, 403);
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");

        let failure = provisioner.create(&request).await.unwrap_err();
        assert!(
            failure
                .error
                .to_string()
                .starts_with("failed to check ServiceAccount: ")
        );
        assert_eq!(provisioner.orchestrator().count(Verb::CheckServiceAccount), 1);
    }
}

mod retract_tests {
    use super::*;

    #[tokio::test]
    async fn test_retract_full_record() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "redis").with_namespace("ns1");
        let mut record = provisioner.create(&request).await.unwrap();

        provisioner.retract(&mut record).await.unwrap();
        assert!(record.is_empty());

        let fake = provisioner.orchestrator();
        let tail: Vec<Verb> = fake.verbs().into_iter().skip(5).collect();
        assert_eq!(
            tail,
            vec![
                Verb::DeleteCluster,
                Verb::DeleteRoleBinding,
                Verb::DeleteRole,
                Verb::DeleteServiceAccount
            ]
        );
        assert!(fake.clusters("ns1").is_empty());
        assert!(!fake.has_service_account("ns1", "db1"));
    }

    #[tokio::test]
    async fn test_retract_stops_at_failure() {
        let fake = FakeOrchestrator::new().fail_on(Verb::DeleteRole, 500);
        let provisioner = test_provisioner(fake);
        let request = CreateClusterRequest::new("db1", "redis").with_namespace("ns1");
        let mut record = provisioner.create(&request).await.unwrap();

        let err = provisioner.retract(&mut record).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to delete Role: "));
        assert_eq!(
            record.steps(),
            &[ProvisionStep::ServiceAccount, ProvisionStep::Role]
        );
        assert_eq!(provisioner.orchestrator().count(Verb::DeleteServiceAccount), 0);
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_removes_only_cluster() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let request = CreateClusterRequest::new("db1", "postgresql").with_namespace("ns1");
        provisioner.create(&request).await.unwrap();

        provisioner.delete("db1", Some("ns1")).await.unwrap();

        let fake = provisioner.orchestrator();
        assert!(fake.clusters("ns1").is_empty());
        assert!(fake.has_service_account("ns1", "db1"));
        assert!(fake.has_role("ns1", "db1"));
        assert!(fake.has_role_binding("ns1", "db1"));
    }

    #[tokio::test]
    async fn test_delete_missing_propagates_not_found() {
        let provisioner = test_provisioner(FakeOrchestrator::new());

        let err = provisioner.delete("ghost", Some("ns1")).await.unwrap_err();
        assert!(err.is_not_found());
        match err.kube_error() {
            Some(kube::Error::Api(resp)) => {
                assert_eq!(resp.code, 404);
                assert_eq!(resp.reason, "NotFound");
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_requires_name() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let err = provisioner.delete("  ", None).await.unwrap_err();
        assert!(err.is_validation());
        assert!(provisioner.orchestrator().calls().is_empty());
    }
}

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_info_from_secret() {
        let fake = FakeOrchestrator::new().with_secret(
            "ns1",
            conn_credential_secret(
                "db1",
                &[
                    ("username", "postgres"),
                    ("password", "pw"),
                    ("host", "db1-postgresql.ns1.svc"),
                    ("port", "5432"),
                ],
            ),
        );
        let provisioner = test_provisioner(fake);

        let info = provisioner
            .connection_info("db1", Some("ns1"), Some("postgresql"))
            .await
            .unwrap();
        assert_eq!(
            info.connection_string,
            "postgresql://postgres:pw@db1-postgresql.ns1.svc:5432"
        );
        assert_eq!(
            provisioner.orchestrator().calls()[0].name,
            "db1-conn-credential"
        );
    }

    #[tokio::test]
    async fn test_connection_info_missing_secret() {
        let provisioner = test_provisioner(FakeOrchestrator::new());
        let err = provisioner
            .connection_info("db1", Some("ns1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SecretNotFound(ref s) if s == "db1-conn-credential"));
        assert!(err.is_not_found());
    }
}

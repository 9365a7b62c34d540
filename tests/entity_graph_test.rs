//! Integration tests for the entity graph manager
//!
//! Covers the create/update/delete lifecycle through the public API, custom
//! id assignment and provider account types.

use credo::adapters::database::build_graph_manager;
use credo::config::CredoConfig;
use credo::core::graph::{DeleteOptions, GraphManager};
use credo::domain::models::{
    Address, BillingAccount, PifGroup, PifIndividual, Provider, ProviderAccountType, User,
};
use credo::domain::{Actor, CredoError, DocumentId, EntityKind, LifecycleState};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::{json, Value};
use test_case::test_case;

async fn manager() -> GraphManager {
    build_graph_manager(&CredoConfig::default()).await.unwrap()
}

fn user() -> User {
    serde_json::from_value(json!({
        "firstName": FirstName().fake::<String>(),
        "lastName": LastName().fake::<String>(),
        "contactPhone": "555-0100",
        "email": SafeEmail().fake::<String>(),
        "userType": "billingAdmin"
    }))
    .unwrap()
}

fn address() -> Address {
    Address {
        street_line1: "200 Harbor Blvd".to_string(),
        street_line2: Some("Suite 4".to_string()),
        city: "Tacoma".to_string(),
        state: "WA".to_string(),
        zip_code: "98402".to_string(),
    }
}

fn billing_account(name: &str, address: &DocumentId) -> BillingAccount {
    serde_json::from_value(json!({
        "billingAccountName": name,
        "address": address,
        "secureCredentialKey": "k3y",
        "currentPlan": "trail",
        "currentPlanDue": "2026-01-31T00:00:00Z"
    }))
    .unwrap()
}

fn pif_group() -> PifGroup {
    let postal = json!({
        "street": "100 Lake Rd",
        "city": "Madison",
        "state": "WI",
        "zip": "53703",
        "country": "US"
    });
    serde_json::from_value(json!({
        "legalBusinessName": "Lakeside Medical Group LLC",
        "practiceAddress": postal,
        "mailingAddress": postal,
        "billingAddress": postal
    }))
    .unwrap()
}

fn provider(
    account_type: ProviderAccountType,
    group: Option<&DocumentId>,
    individual: Option<&DocumentId>,
) -> Provider {
    Provider {
        provider_display_name: "Lakeside Family Practice".to_string(),
        provider_account_type: account_type,
        billing_account: None,
        associate_providers: Vec::new(),
        pif_group_or_facility: group.cloned(),
        pif_individual: individual.cloned(),
        multiple_locations: false,
        status: true,
        locations: Vec::new(),
    }
}

async fn acting_user(manager: &GraphManager) -> Actor {
    let record = manager.create(user(), &Actor::System).await.unwrap();
    Actor::User(record.id)
}

#[test_case(ProviderAccountType::Group, true, false, Some(EntityKind::PifGroup) ; "group links group pif")]
#[test_case(ProviderAccountType::GroupWithoutAssociateProviders, true, false, Some(EntityKind::PifGroup) ; "solo group links group pif")]
#[test_case(ProviderAccountType::Individual, false, true, Some(EntityKind::PifIndividual) ; "individual links individual pif")]
#[test_case(ProviderAccountType::Group, false, true, None ; "group with individual pif")]
#[test_case(ProviderAccountType::Individual, true, false, None ; "individual with group pif")]
#[test_case(ProviderAccountType::Individual, true, true, None ; "both pifs")]
#[tokio::test]
async fn test_provider_account_type_matrix(
    account_type: ProviderAccountType,
    with_group: bool,
    with_individual: bool,
    expected: Option<EntityKind>,
) {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let group = manager.create(pif_group(), &Actor::System).await.unwrap();
    let individual = manager
        .create(PifIndividual::default(), &Actor::System)
        .await
        .unwrap();

    let provider = provider(
        account_type,
        with_group.then_some(&group.id),
        with_individual.then_some(&individual.id),
    );

    match expected {
        Some(kind) => {
            let record = manager.create(provider, &actor).await.unwrap();
            let link = manager.resolve_account_type(&record.body).unwrap();
            assert_eq!(link.kind(), kind);
            let expected_id = if kind == EntityKind::PifGroup {
                &group.id
            } else {
                &individual.id
            };
            assert_eq!(link.id(), expected_id);
        }
        None => {
            let err = manager.create(provider, &actor).await.unwrap_err();
            assert!(matches!(
                err,
                CredoError::Validation {
                    kind: EntityKind::Provider,
                    ..
                }
            ));
            assert_eq!(manager.store().count(EntityKind::Provider).await.unwrap(), 0);
        }
    }
}

#[tokio::test]
async fn test_failed_create_does_not_consume_custom_id() {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let sequence = EntityKind::BillingAccount.sequence().unwrap();

    let ghost = DocumentId::generate();
    let err = manager
        .create(billing_account("Northwind Clinics", &ghost), &actor)
        .await
        .unwrap_err();
    match err {
        CredoError::ReferenceNotFound {
            field, target_id, ..
        } => {
            assert_eq!(field, "address");
            assert_eq!(target_id, ghost);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(manager.allocator().current(&sequence).await.unwrap(), None);

    let address = manager.create(address(), &actor).await.unwrap();
    let account = manager
        .create(billing_account("Northwind Clinics", &address.id), &actor)
        .await
        .unwrap();
    assert_eq!(account.custom_id, Some(1));
}

#[tokio::test]
async fn test_duplicate_billing_account_name_rejected() {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let address = manager.create(address(), &actor).await.unwrap();

    manager
        .create(billing_account("Northwind Clinics", &address.id), &actor)
        .await
        .unwrap();
    let err = manager
        .create(billing_account(" Northwind Clinics ", &address.id), &actor)
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            CredoError::Validation {
                kind: EntityKind::BillingAccount,
                ..
            }
        ),
        "got {err:?}"
    );
    assert_eq!(
        manager.store().count(EntityKind::BillingAccount).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_deleted_custom_ids_are_not_reused() {
    let manager = manager().await;

    let mut ids = Vec::new();
    for expected in 1..=3 {
        let record = manager.create(user(), &Actor::System).await.unwrap();
        assert_eq!(record.custom_id, Some(expected));
        ids.push(record.id);
    }

    manager
        .delete(EntityKind::User, &ids[1], &Actor::System, DeleteOptions::default())
        .await
        .unwrap();

    let next = manager.create(user(), &Actor::System).await.unwrap();
    assert_eq!(next.custom_id, Some(4));
    assert_eq!(manager.store().count(EntityKind::User).await.unwrap(), 3);
}

#[tokio::test]
async fn test_update_lifecycle() {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let created = manager.create(address(), &actor).await.unwrap();
    assert_eq!(created.state, LifecycleState::Persisted);

    let updated = manager
        .update::<Address, _>(&created.id, &actor, Some(1), |address| {
            address.city = "  Olympia ".to_string();
        })
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.state, LifecycleState::Updated);
    assert_eq!(updated.body.city, "Olympia");
    assert_eq!(updated.audit.created_at, created.audit.created_at);
    assert!(updated.audit.updated_at >= created.audit.updated_at);

    let stale = manager
        .update::<Address, _>(&created.id, &actor, Some(1), |address| {
            address.zip_code = "98501".to_string();
        })
        .await
        .unwrap_err();
    assert!(matches!(
        stale,
        CredoError::Conflict {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn test_json_round_trip_through_wire_form() {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let address = manager.create(address(), &actor).await.unwrap();

    let created = manager
        .create_json(
            EntityKind::Payer,
            json!({
                "payerName": "Medicaid of Washington",
                "payerType": "federal",
                "address": address.id
            }),
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(created["customId"], json!(1));

    let id: DocumentId = serde_json::from_value(created["id"].clone()).unwrap();
    let patched = manager
        .update_json_kind(
            EntityKind::Payer,
            &id,
            &json!({"payerWebsite": "https://hca.wa.gov"}),
            &actor,
            None,
        )
        .await
        .unwrap();
    assert_eq!(patched["payerWebsite"], json!("https://hca.wa.gov"));
    assert_eq!(patched["payerName"], json!("Medicaid of Washington"));

    let fetched: Value = manager.get_json(EntityKind::Payer, &id).await.unwrap();
    assert_eq!(fetched, patched);
}

#[tokio::test]
async fn test_deleted_document_is_not_found() {
    let manager = manager().await;
    let actor = acting_user(&manager).await;
    let address = manager.create(address(), &actor).await.unwrap();

    let report = manager
        .delete(EntityKind::Address, &address.id, &actor, DeleteOptions::default())
        .await
        .unwrap();
    assert_eq!(report.deleted.len(), 1);

    let err = manager.get::<Address>(&address.id).await.unwrap_err();
    assert!(matches!(err, CredoError::NotFound { .. }));

    let again = manager
        .delete(EntityKind::Address, &address.id, &actor, DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(again, CredoError::NotFound { .. }));
}

//! Entity graph manager
//!
//! The single entry point for writes. Creation runs normalise, validate,
//! reference resolution and only then draws a custom id, so a rejected
//! payload never consumes one. Updates are optimistic: every replace carries
//! the version that was read. Deletes are planned over the reference graph
//! and committed as one batch.

use super::delete::{AffectedDocument, DeleteOptions, DeletePlanner, DeleteReport};
use super::patch;
use super::registry::{self, with_entity};
use super::relationships::RelationshipCatalog;
use crate::adapters::database::traits::{DocumentStore, WriteBatch, WriteOp};
use crate::core::sequence::SequenceAllocator;
use crate::domain::errors::CredoError;
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::models::{PifLink, Provider};
use crate::domain::record::{Actor, Audit, LifecycleState, Record};
use crate::domain::{Entity, Reference, Result};
use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Creates, reads, updates and deletes entity documents
pub struct GraphManager {
    store: Arc<dyn DocumentStore>,
    allocator: Arc<SequenceAllocator>,
    catalog: RelationshipCatalog,
}

impl GraphManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        allocator: Arc<SequenceAllocator>,
        catalog: RelationshipCatalog,
    ) -> Self {
        Self {
            store,
            allocator,
            catalog,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn allocator(&self) -> &Arc<SequenceAllocator> {
        &self.allocator
    }

    pub fn catalog(&self) -> &RelationshipCatalog {
        &self.catalog
    }

    /// Validates and stores a new entity
    ///
    /// # Errors
    ///
    /// - [`CredoError::Validation`] for field, enum or domain rule violations
    /// - [`CredoError::ReferenceNotFound`] when a reference or the acting user
    ///   does not exist
    /// - [`CredoError::Allocation`] when no custom id could be drawn
    pub async fn create<E: Entity>(&self, mut body: E, actor: &Actor) -> Result<Record<E>> {
        body.normalize();
        body.validate()?;
        self.check_actor(E::KIND, actor, "createdBy").await?;
        self.resolve_references(E::KIND, body.references()).await?;

        let custom_id = match E::KIND.sequence() {
            Some(sequence) => Some(self.allocator.next(&sequence).await?),
            None => None,
        };

        let record = Record {
            id: DocumentId::generate(),
            custom_id,
            version: 1,
            state: LifecycleState::Persisted,
            audit: Audit::stamp(actor, Utc::now()),
            body,
        };

        if let Err(e) = self.store.insert(record.to_stored()?).await {
            if let Some(custom_id) = custom_id {
                tracing::warn!(
                    kind = %E::KIND,
                    custom_id,
                    error = %e,
                    "Insert failed after allocation; custom id is discarded"
                );
            }
            return Err(e);
        }

        crate::log_entity_created!(E::KIND, &record.id, record.custom_id);
        Ok(record)
    }

    /// [`GraphManager::create`] from an untyped payload; returns the wire form
    pub async fn create_json(&self, kind: EntityKind, payload: Value, actor: &Actor) -> Result<Value> {
        patch::ensure_writable(kind, &payload)?;
        with_entity!(kind, E => {
            let body: E = parse_body(kind, payload)?;
            self.create(body, actor).await?.to_json()
        })
    }

    /// Fetches a live entity
    pub async fn get<E: Entity>(&self, id: &DocumentId) -> Result<Record<E>> {
        let document = self
            .store
            .get(E::KIND, id)
            .await?
            .ok_or_else(|| CredoError::NotFound {
                kind: E::KIND,
                id: id.clone(),
            })?;
        Record::from_stored(document)
    }

    pub async fn get_json(&self, kind: EntityKind, id: &DocumentId) -> Result<Value> {
        let document = self
            .store
            .get(kind, id)
            .await?
            .ok_or_else(|| CredoError::NotFound {
                kind,
                id: id.clone(),
            })?;
        registry::to_json(document)
    }

    /// Applies `mutate` to the stored body and replaces the document
    ///
    /// With `expected_version`, the update fails with
    /// [`CredoError::Conflict`] unless it matches the stored version. Either
    /// way the replace is conditional on the version read here.
    pub async fn update<E, F>(
        &self,
        id: &DocumentId,
        actor: &Actor,
        expected_version: Option<u64>,
        mutate: F,
    ) -> Result<Record<E>>
    where
        E: Entity,
        F: FnOnce(&mut E) + Send,
    {
        let current = self.get::<E>(id).await?;
        check_version(&current, expected_version)?;

        let mut body = current.body.clone();
        mutate(&mut body);
        self.replace(current, body, actor).await
    }

    /// Applies a JSON merge patch to the stored body
    pub async fn update_json<E: Entity>(
        &self,
        id: &DocumentId,
        patch: &Value,
        actor: &Actor,
        expected_version: Option<u64>,
    ) -> Result<Record<E>> {
        patch::ensure_writable(E::KIND, patch)?;
        let current = self.get::<E>(id).await?;
        check_version(&current, expected_version)?;

        let mut value = serde_json::to_value(&current.body)?;
        patch::merge(&mut value, patch);
        let body: E = parse_body(E::KIND, value)?;
        self.replace(current, body, actor).await
    }

    /// [`GraphManager::update_json`] by kind; returns the wire form
    pub async fn update_json_kind(
        &self,
        kind: EntityKind,
        id: &DocumentId,
        patch: &Value,
        actor: &Actor,
        expected_version: Option<u64>,
    ) -> Result<Value> {
        with_entity!(kind, E => {
            self.update_json::<E>(id, patch, actor, expected_version)
                .await?
                .to_json()
        })
    }

    async fn replace<E: Entity>(
        &self,
        current: Record<E>,
        mut body: E,
        actor: &Actor,
    ) -> Result<Record<E>> {
        body.normalize();
        body.validate()?;
        self.check_actor(E::KIND, actor, "updatedBy").await?;

        let existing: HashSet<(EntityKind, DocumentId)> = current
            .body
            .references()
            .into_iter()
            .map(|r| (r.target, r.id))
            .collect();
        let added = body
            .references()
            .into_iter()
            .filter(|r| !existing.contains(&(r.target, r.id.clone())))
            .collect();
        self.resolve_references(E::KIND, added).await?;

        let mut audit = current.audit.clone();
        audit.touch(actor, Utc::now());
        let record = Record {
            id: current.id.clone(),
            custom_id: current.custom_id,
            version: current.version + 1,
            state: LifecycleState::Updated,
            audit,
            body,
        };

        self.store
            .replace(record.to_stored()?, current.version)
            .await?;

        tracing::debug!(
            kind = %E::KIND,
            id = %record.id,
            version = record.version,
            "Entity updated"
        );
        Ok(record)
    }

    /// Deletes a document, applying delete policies to its referencers
    ///
    /// # Errors
    ///
    /// - [`CredoError::NotFound`] if the document does not exist
    /// - [`CredoError::ReferentialIntegrity`] listing every blocking document
    /// - [`CredoError::Conflict`] if a planned document changed before commit
    /// - [`CredoError::Validation`] if a system actor would have to detach a
    ///   document whose kind requires an acting user
    pub async fn delete(
        &self,
        kind: EntityKind,
        id: &DocumentId,
        actor: &Actor,
        options: DeleteOptions,
    ) -> Result<DeleteReport> {
        self.check_actor(kind, actor, "updatedBy").await?;

        let root = self
            .store
            .get(kind, id)
            .await?
            .ok_or_else(|| CredoError::NotFound {
                kind,
                id: id.clone(),
            })?;

        let plan = DeletePlanner::new(self.store.as_ref(), &self.catalog, options)
            .plan(root)
            .await?;

        // Detaching rewrites updatedBy on documents of other kinds
        let detached_kinds: BTreeSet<EntityKind> =
            plan.detach.values().map(|(source, _)| source.kind).collect();
        for source_kind in detached_kinds.into_iter().filter(|k| *k != kind) {
            self.check_actor(source_kind, actor, "updatedBy").await?;
        }

        let now = Utc::now();
        let mut batch = WriteBatch::new();
        let mut report = DeleteReport::default();

        for (source, targets) in plan.detach.values() {
            let updated = registry::detach(source, targets, actor, now)?;
            report.detached.push(AffectedDocument {
                kind: source.kind,
                id: source.id.clone(),
            });
            batch.push(WriteOp::Replace {
                document: updated,
                expected_version: source.version,
            });
        }
        for document in &plan.doomed {
            report.deleted.push(AffectedDocument {
                kind: document.kind,
                id: document.id.clone(),
            });
            batch.push(WriteOp::Remove {
                kind: document.kind,
                id: document.id.clone(),
                expected_version: document.version,
            });
        }

        self.store.commit(batch).await?;

        tracing::info!(
            kind = %kind,
            id = %id,
            deleted = report.deleted.len(),
            detached = report.detached.len(),
            cascade = options.cascade,
            "Entity deleted"
        );
        Ok(report)
    }

    /// Resolves which information form a provider links to
    ///
    /// Group accounts (with or without associates) need a PifGroup,
    /// individual accounts a PifIndividual; exactly one may be set.
    pub fn resolve_account_type(&self, provider: &Provider) -> Result<PifLink> {
        provider.pif_link()
    }

    /// Checks the acting user exists, or that the kind accepts system writes
    async fn check_actor(&self, kind: EntityKind, actor: &Actor, field: &str) -> Result<()> {
        match actor {
            Actor::User(user_id) => {
                if self.store.exists(EntityKind::User, user_id).await? {
                    Ok(())
                } else {
                    Err(CredoError::ReferenceNotFound {
                        kind,
                        field: field.to_string(),
                        target_kind: EntityKind::User,
                        target_id: user_id.clone(),
                    })
                }
            }
            Actor::System if kind.requires_actor() => Err(CredoError::validation(
                kind,
                format!("{field} requires an acting user"),
            )),
            Actor::System => Ok(()),
        }
    }

    /// Fails with the first reference whose target does not exist
    async fn resolve_references(&self, kind: EntityKind, references: Vec<Reference>) -> Result<()> {
        let mut seen = HashSet::new();
        let unique: Vec<Reference> = references
            .into_iter()
            .filter(|r| seen.insert((r.target, r.id.clone())))
            .collect();

        let found = try_join_all(
            unique
                .iter()
                .map(|r| self.store.exists(r.target, &r.id)),
        )
        .await?;

        match unique.into_iter().zip(found).find(|(_, exists)| !exists) {
            Some((missing, _)) => Err(CredoError::ReferenceNotFound {
                kind,
                field: missing.field.to_string(),
                target_kind: missing.target,
                target_id: missing.id,
            }),
            None => Ok(()),
        }
    }
}

fn check_version<E>(current: &Record<E>, expected_version: Option<u64>) -> Result<()>
where
    E: Entity,
{
    match expected_version {
        Some(expected) if expected != current.version => Err(CredoError::Conflict {
            kind: E::KIND,
            id: current.id.clone(),
            expected,
            found: current.version,
        }),
        _ => Ok(()),
    }
}

/// Deserializes a body, reporting type and enum errors as validation errors
fn parse_body<E: Entity>(kind: EntityKind, value: Value) -> Result<E> {
    serde_json::from_value(value).map_err(|e| CredoError::validation(kind, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::database::traits::CounterStore;
    use crate::config::{RetryConfig, SequenceConfig};
    use crate::domain::errors::StoreError;
    use crate::domain::ids::SequenceName;
    use crate::domain::models::{Address, Payer, ProviderAccountType, User};
    use serde_json::json;

    fn manager() -> GraphManager {
        let store = Arc::new(MemoryStore::new());
        let allocator = Arc::new(SequenceAllocator::new(
            store.clone(),
            &SequenceConfig::default(),
        ));
        GraphManager::new(store, allocator, RelationshipCatalog::default())
    }

    fn user(email: &str) -> User {
        serde_json::from_value(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "contactPhone": "555-0100",
            "email": email,
            "userType": "billingAdmin"
        }))
        .unwrap()
    }

    fn address() -> Address {
        Address {
            street_line1: "1 Main St".to_string(),
            street_line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        }
    }

    fn payer(address: &DocumentId) -> Payer {
        serde_json::from_value(json!({
            "payerName": " Aetna ",
            "payerType": "commercial",
            "address": address
        }))
        .unwrap()
    }

    async fn acting_user(manager: &GraphManager) -> Actor {
        let record = manager
            .create(user("admin@example.com"), &Actor::System)
            .await
            .unwrap();
        Actor::User(record.id)
    }

    #[tokio::test]
    async fn test_create_assigns_custom_ids_in_order() {
        let manager = manager();
        let first = manager.create(user("a@example.com"), &Actor::System).await.unwrap();
        let second = manager.create(user("b@example.com"), &Actor::System).await.unwrap();

        assert_eq!(first.custom_id, Some(1));
        assert_eq!(second.custom_id, Some(2));
        assert_eq!(first.version, 1);
        assert_eq!(first.state, LifecycleState::Persisted);
    }

    #[tokio::test]
    async fn test_create_normalizes_body() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();
        let payer = manager.create(payer(&address.id), &actor).await.unwrap();

        assert_eq!(payer.body.payer_name, "Aetna");
        assert_eq!(payer.custom_id, Some(1));
        assert_eq!(payer.audit.created_by, actor.user_id().cloned());
    }

    #[tokio::test]
    async fn test_missing_reference_consumes_no_custom_id() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let missing = DocumentId::generate();

        let err = manager.create(payer(&missing), &actor).await.unwrap_err();
        match err {
            CredoError::ReferenceNotFound { field, target_id, .. } => {
                assert_eq!(field, "address");
                assert_eq!(target_id, missing);
            }
            other => panic!("unexpected error: {other}"),
        }

        let sequence = EntityKind::Payer.sequence().unwrap();
        assert_eq!(manager.allocator().current(&sequence).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_system_actor_rejected_where_user_required() {
        let manager = manager();
        let address = manager.create(address(), &Actor::System).await.unwrap();
        let err = manager
            .create(payer(&address.id), &Actor::System)
            .await
            .unwrap_err();
        assert!(matches!(err, CredoError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_actor_is_reference_not_found() {
        let manager = manager();
        let ghost = Actor::User(DocumentId::generate());
        let err = manager.create(address(), &ghost).await.unwrap_err();
        assert!(matches!(
            err,
            CredoError::ReferenceNotFound { ref field, .. } if field == "createdBy"
        ));
    }

    #[tokio::test]
    async fn test_create_json_rejects_reserved_and_bad_enums() {
        let manager = manager();
        let reserved = manager
            .create_json(
                EntityKind::Address,
                json!({"streetLine1": "1 Main", "city": "A", "state": "B", "zipCode": "1", "version": 7}),
                &Actor::System,
            )
            .await
            .unwrap_err();
        assert!(matches!(reserved, CredoError::Validation { .. }));

        let bad_enum = manager
            .create_json(
                EntityKind::User,
                json!({
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "contactPhone": "555-0100",
                    "email": "ada@example.com",
                    "userType": "owner"
                }),
                &Actor::System,
            )
            .await
            .unwrap_err();
        assert!(matches!(bad_enum, CredoError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_json_returns_wire_form() {
        let manager = manager();
        let value = manager
            .create_json(
                EntityKind::User,
                json!({
                    "firstName": "ada",
                    "lastName": "lovelace",
                    "contactPhone": "555-0100",
                    "email": "ada@example.com",
                    "userType": "superAdmin"
                }),
                &Actor::System,
            )
            .await
            .unwrap();

        assert_eq!(value["customUserId"], json!(1));
        assert_eq!(value["displayName"], json!("Ada Lovelace"));
        let id = DocumentId::new(value["id"].as_str().unwrap()).unwrap();
        assert_eq!(manager.get_json(EntityKind::User, &id).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_detects_stale_writes() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();

        let updated = manager
            .update::<Address, _>(&address.id, &actor, Some(1), |a| {
                a.city = "Shelbyville".to_string();
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.state, LifecycleState::Updated);
        assert!(updated.audit.updated_at >= updated.audit.created_at);

        let err = manager
            .update::<Address, _>(&address.id, &actor, Some(1), |a| {
                a.city = "Capital City".to_string();
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CredoError::Conflict { expected: 1, found: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_update_json_merges_patch() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();

        let updated = manager
            .update_json::<Address>(
                &address.id,
                &json!({"streetLine2": "Suite 4", "zipCode": " 62702 "}),
                &actor,
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.body.street_line2.as_deref(), Some("Suite 4"));
        assert_eq!(updated.body.zip_code, "62702");
        assert_eq!(updated.body.city, "Springfield");
    }

    #[tokio::test]
    async fn test_update_rejects_new_dangling_reference() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();
        let payer = manager.create(payer(&address.id), &actor).await.unwrap();

        let err = manager
            .update::<Payer, _>(&payer.id, &actor, None, |p| {
                p.uploads.push(DocumentId::generate());
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CredoError::ReferenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_referenced_address_is_blocked() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();
        let payer = manager.create(payer(&address.id), &actor).await.unwrap();

        let err = manager
            .delete(EntityKind::Address, &address.id, &actor, DeleteOptions::default())
            .await
            .unwrap_err();
        match err {
            CredoError::ReferentialIntegrity { blockers, .. } => {
                assert_eq!(blockers.len(), 1);
                assert_eq!(blockers[0].id, payer.id);
                assert_eq!(blockers[0].field, "address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_deleted_document_is_not_found() {
        let manager = manager();
        let actor = acting_user(&manager).await;
        let address = manager.create(address(), &actor).await.unwrap();

        let report = manager
            .delete(EntityKind::Address, &address.id, &actor, DeleteOptions::default())
            .await
            .unwrap();
        assert_eq!(report.deleted.len(), 1);

        let err = manager.get::<Address>(&address.id).await.unwrap_err();
        assert!(matches!(err, CredoError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_account_type() {
        let manager = manager();
        let pif = DocumentId::generate();
        let provider: Provider = serde_json::from_value(json!({
            "providerDisplayName": "Solo Practice",
            "providerAccountType": "individual",
            "pifIndividual": pif
        }))
        .unwrap();

        assert_eq!(provider.provider_account_type, ProviderAccountType::Individual);
        assert_eq!(
            manager.resolve_account_type(&provider).unwrap(),
            PifLink::Individual(pif)
        );
    }

    struct UnavailableCounters {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl CounterStore for UnavailableCounters {
        async fn increment(&self, _name: &SequenceName) -> Result<Option<u64>> {
            Err(StoreError::Unavailable("counter table offline".to_string()).into())
        }

        async fn seed(&self, name: &SequenceName, value: u64) -> Result<bool> {
            self.inner.seed(name, value).await
        }

        async fn max_existing(&self, kind: EntityKind) -> Result<u64> {
            self.inner.max_existing(kind).await
        }

        async fn current(&self, name: &SequenceName) -> Result<Option<u64>> {
            self.inner.current(name).await
        }

        async fn counters(&self) -> Result<Vec<(SequenceName, u64)>> {
            self.inner.counters().await
        }
    }

    #[tokio::test]
    async fn test_allocation_failure_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let config = SequenceConfig {
            bootstrap_from_existing: true,
            retry: RetryConfig {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 4,
                backoff_multiplier: 2.0,
            },
        };
        let counters = Arc::new(UnavailableCounters {
            inner: MemoryStore::new(),
        });
        let allocator = Arc::new(SequenceAllocator::new(counters, &config));
        let manager = GraphManager::new(store.clone(), allocator, RelationshipCatalog::default());

        let err = manager
            .create(user("a@example.com"), &Actor::System)
            .await
            .unwrap_err();
        assert!(matches!(err, CredoError::Allocation { .. }));

        assert_eq!(store.count(EntityKind::User).await.unwrap(), 0);
        let sequence = EntityKind::User.sequence().unwrap();
        assert_eq!(manager.allocator().current(&sequence).await.unwrap(), None);
    }
}

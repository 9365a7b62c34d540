//! Delete planning
//!
//! A delete walks the documents that reference the target, breadth first,
//! and decides per reference whether it blocks, gets cleared, or pulls the
//! referencing document into the delete. Nothing is written while planning;
//! the finished plan is committed as one batch, with expected versions on
//! every op so a plan made stale by a concurrent write is rejected whole.

use super::relationships::{OnDelete, RelationshipCatalog, AUDIT_FIELDS};
use crate::adapters::database::traits::DocumentStore;
use crate::domain::errors::{Blocker, CredoError};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::{Result, StoredDocument};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// How far a delete may reach
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Apply each relationship's delete policy. Without it, required and
    /// restricted references block and the rest are cleared.
    pub cascade: bool,
    /// Also delete addresses, uploads and comments that only deleted
    /// documents referenced
    pub prune_shared: bool,
}

impl DeleteOptions {
    pub fn cascade() -> Self {
        Self {
            cascade: true,
            prune_shared: false,
        }
    }

    pub fn with_prune_shared(mut self) -> Self {
        self.prune_shared = true;
        self
    }
}

/// A document touched by a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedDocument {
    pub kind: EntityKind,
    pub id: DocumentId,
}

/// Outcome of a committed delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Removed documents, the requested one first
    pub deleted: Vec<AffectedDocument>,
    /// Documents whose references to removed documents were cleared
    pub detached: Vec<AffectedDocument>,
}

/// Writes a delete will perform
#[derive(Debug, Default)]
pub(crate) struct DeletePlan {
    /// Documents to remove, the requested one first
    pub doomed: Vec<StoredDocument>,
    /// Surviving documents and the removed ids they must stop referencing
    pub detach: BTreeMap<DocumentId, (StoredDocument, BTreeSet<DocumentId>)>,
}

pub(crate) struct DeletePlanner<'a> {
    store: &'a dyn DocumentStore,
    catalog: &'a RelationshipCatalog,
    options: DeleteOptions,
}

impl<'a> DeletePlanner<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        catalog: &'a RelationshipCatalog,
        options: DeleteOptions,
    ) -> Self {
        Self {
            store,
            catalog,
            options,
        }
    }

    fn policy(&self, source: EntityKind, field: &str) -> OnDelete {
        if AUDIT_FIELDS.contains(&field) {
            OnDelete::Restrict
        } else if self.options.cascade {
            self.catalog.policy(source, field)
        } else if self.catalog.is_required(source, field)
            || self.catalog.policy(source, field) == OnDelete::Restrict
        {
            OnDelete::Restrict
        } else {
            OnDelete::Nullify
        }
    }

    /// Plans the removal of `root`
    ///
    /// # Errors
    ///
    /// [`CredoError::ReferentialIntegrity`] listing every document that
    /// blocks the delete.
    pub async fn plan(&self, root: StoredDocument) -> Result<DeletePlan> {
        let mut plan = DeletePlan::default();
        let mut doomed_ids: HashSet<DocumentId> = HashSet::from([root.id.clone()]);
        let mut blockers: Vec<Blocker> = Vec::new();
        let mut queue: VecDeque<StoredDocument> = VecDeque::from([root.clone()]);
        plan.doomed.push(root.clone());

        while let Some(target) = queue.pop_front() {
            for source in self.store.referencing(target.kind, &target.id).await? {
                if source.id == target.id {
                    continue;
                }

                let fields: Vec<String> = source
                    .fields_referencing(&target.id)
                    .filter(|edge| edge.target_kind == target.kind)
                    .map(|edge| edge.field.clone())
                    .collect();

                for field in fields {
                    match self.policy(source.kind, &field) {
                        OnDelete::Restrict => blockers.push(Blocker {
                            kind: source.kind,
                            id: source.id.clone(),
                            field,
                        }),
                        OnDelete::Nullify => {
                            plan.detach
                                .entry(source.id.clone())
                                .or_insert_with(|| (source.clone(), BTreeSet::new()))
                                .1
                                .insert(target.id.clone());
                        }
                        OnDelete::Cascade => {
                            if doomed_ids.insert(source.id.clone()) {
                                tracing::debug!(
                                    kind = %source.kind,
                                    id = %source.id,
                                    via = %field,
                                    "Cascading delete"
                                );
                                plan.doomed.push(source.clone());
                                queue.push_back(source.clone());
                            }
                        }
                    }
                }
            }
        }

        if self.options.prune_shared {
            self.prune_shared(&mut plan, &mut doomed_ids).await?;
        }

        // Documents that are themselves removed neither block nor need clearing
        blockers.retain(|blocker| !doomed_ids.contains(&blocker.id));
        plan.detach.retain(|id, _| !doomed_ids.contains(id));

        if !blockers.is_empty() {
            blockers.sort_by(|a, b| (a.kind, &a.id, &a.field).cmp(&(b.kind, &b.id, &b.field)));
            blockers.dedup();
            return Err(CredoError::ReferentialIntegrity {
                kind: root.kind,
                id: root.id,
                blockers,
            });
        }

        Ok(plan)
    }

    /// Adds shared documents referenced only from doomed documents
    async fn prune_shared(
        &self,
        plan: &mut DeletePlan,
        doomed_ids: &mut HashSet<DocumentId>,
    ) -> Result<()> {
        let candidates: BTreeSet<(EntityKind, DocumentId)> = plan
            .doomed
            .iter()
            .flat_map(|doc| doc.references.iter())
            .filter(|edge| edge.target_kind.is_shared() && !doomed_ids.contains(&edge.target_id))
            .map(|edge| (edge.target_kind, edge.target_id.clone()))
            .collect();

        for (kind, id) in candidates {
            let referencers = self.store.referencing(kind, &id).await?;
            if referencers.iter().any(|doc| !doomed_ids.contains(&doc.id)) {
                continue;
            }
            if let Some(document) = self.store.get(kind, &id).await? {
                tracing::debug!(kind = %kind, id = %id, "Pruning orphaned shared document");
                doomed_ids.insert(id);
                plan.doomed.push(document);
            }
        }

        Ok(())
    }
}

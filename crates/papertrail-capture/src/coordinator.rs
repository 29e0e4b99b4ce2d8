//! The two-phase change-capture coordinator.
//!
//! The persistence layer invokes [`ChangeCaptureCoordinator::pre_commit`]
//! when pending mutations are known and
//! [`ChangeCaptureCoordinator::post_commit`] once they are durable. The
//! coordinator classifies every qualifying mutation, delivers records to the
//! transport at both phases, and triggers at most one secondary commit to
//! persist records it learns about only after the original commit closes.
//!
//! The coordinator is single-threaded and bound to the caller's commit
//! cycle. Its transient queues and the reentrancy flag live in interior
//! mutability scoped to the instance; they never outlive a cycle.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use papertrail_core::{AuditAction, AuditRecord, Auditable, DiffGenerator, DiffOptions, FieldMap};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::contract::{
    ActorResolver, AuditPolicy, AuditTransport, CommitPhase, DeliveryContext, UnitOfWork,
};
use crate::error::CaptureResult;

/// A record produced at pre-commit time, awaiting post-commit re-delivery
/// with the live entity (for generated-identifier backfill).
struct ScheduledRecord {
    entity: Arc<dyn Auditable>,
    record: AuditRecord,
}

/// A scheduled deletion whose classification is deferred to post-commit,
/// with the pre-mutation snapshot captured before the row disappears.
struct PendingDeletion {
    entity: Arc<dyn Auditable>,
    snapshot: FieldMap,
}

/// Hooks a two-phase commit lifecycle and synthesizes audit records.
pub struct ChangeCaptureCoordinator {
    transport: Arc<dyn AuditTransport>,
    policy: Arc<dyn AuditPolicy>,
    actors: Arc<dyn ActorResolver>,
    diff: DiffGenerator,
    config: CaptureConfig,

    // Per-cycle state. Cleared at the start of pre-commit and drained
    // up-front at post-commit so a downstream failure cannot leave stale
    // entries for the next cycle.
    scheduled: RefCell<Vec<ScheduledRecord>>,
    pending_deletions: RefCell<Vec<PendingDeletion>>,
    cycle_hash: RefCell<Option<String>>,
    // Set only around the self-triggered secondary commit. Not a lock:
    // it stops that commit from re-running the capture hooks.
    flushing: Cell<bool>,
}

impl ChangeCaptureCoordinator {
    /// Build a coordinator from its collaborators.
    pub fn new(
        transport: Arc<dyn AuditTransport>,
        policy: Arc<dyn AuditPolicy>,
        actors: Arc<dyn ActorResolver>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            transport,
            policy,
            actors,
            diff: DiffGenerator::new(),
            config,
            scheduled: RefCell::new(Vec::new()),
            pending_deletions: RefCell::new(Vec::new()),
            cycle_hash: RefCell::new(None),
            flushing: Cell::new(false),
        }
    }

    /// Pre-commit hook: classify scheduled insertions and updates, deliver
    /// their records, and capture snapshots for scheduled deletions.
    ///
    /// Insertions are processed before updates, matching scheduling order.
    /// Deletions are only snapshotted here; their classification must wait
    /// for post-commit tracked status, because a competing soft-delete
    /// mechanism may intercept them.
    ///
    /// # Errors
    ///
    /// Any transport or registration failure propagates and should abort
    /// the enclosing transaction.
    pub fn pre_commit(&self, uow: &dyn UnitOfWork) -> CaptureResult<()> {
        if self.flushing.get() {
            return Ok(());
        }

        // Fresh cycle: drop anything a previously aborted cycle left behind.
        self.scheduled.borrow_mut().clear();
        self.pending_deletions.borrow_mut().clear();
        let tx_hash = Uuid::new_v4().simple().to_string();
        *self.cycle_hash.borrow_mut() = Some(tx_hash.clone());

        for entity in uow.scheduled_insertions() {
            if !self.qualifies(&*entity) {
                continue;
            }

            let snapshot = uow.snapshot(&*entity);
            let changed_fields = snapshot.keys().cloned().collect();
            let record = self.build_record(
                &*entity,
                AuditAction::Create,
                None,
                Some(snapshot),
                changed_fields,
                &tx_hash,
            );

            debug!(
                entity_class = entity.entity_class(),
                "captured insertion"
            );
            uow.register(&record)?;
            self.deliver(&record, CommitPhase::PreCommit, Some(&*entity), uow)?;
            self.scheduled.borrow_mut().push(ScheduledRecord {
                entity: Arc::clone(&entity),
                record,
            });
        }

        for entity in uow.scheduled_updates() {
            if !self.qualifies(&*entity) {
                continue;
            }

            let transitions = uow.change_set(&*entity);
            let mut old_values = FieldMap::new();
            let mut new_values = FieldMap::new();
            for transition in &transitions {
                old_values.insert(transition.field.clone(), transition.old.clone());
                new_values.insert(transition.field.clone(), transition.new.clone());
            }

            // Normalized comparison drops no-op fields; timestamps stay in
            // because the soft-delete marker is itself a timestamp column.
            let diff = self.diff.generate(
                Some(&old_values),
                Some(&new_values),
                &DiffOptions::full_raw(),
            );
            if diff.is_empty() {
                trace!(
                    entity_class = entity.entity_class(),
                    "update changed nothing, skipping"
                );
                continue;
            }

            let action = self.classify_update(&diff);
            let mut filtered_old = FieldMap::new();
            let mut filtered_new = FieldMap::new();
            for (field, change) in diff.iter() {
                filtered_old.insert(field.to_string(), change.old.clone());
                filtered_new.insert(field.to_string(), change.new.clone());
            }

            let record = self.build_record(
                &*entity,
                action,
                Some(filtered_old),
                Some(filtered_new),
                diff.fields(),
                &tx_hash,
            );

            debug!(
                entity_class = entity.entity_class(),
                action = %action,
                "captured update"
            );
            uow.register(&record)?;
            self.deliver(&record, CommitPhase::PreCommit, Some(&*entity), uow)?;
            self.scheduled.borrow_mut().push(ScheduledRecord {
                entity: Arc::clone(&entity),
                record,
            });
        }

        for entity in uow.scheduled_deletions() {
            if !self.qualifies(&*entity) {
                continue;
            }

            // Only chance to see the row's fields; classification deferred.
            let snapshot = uow.snapshot(&*entity);
            trace!(
                entity_class = entity.entity_class(),
                "deferring deletion classification"
            );
            self.pending_deletions.borrow_mut().push(PendingDeletion {
                entity: Arc::clone(&entity),
                snapshot,
            });
        }

        Ok(())
    }

    /// Post-commit hook: classify deferred deletions against live tracked
    /// status, re-deliver pre-commit records with the live entity, and run
    /// the secondary commit if any post-commit record was produced.
    ///
    /// # Errors
    ///
    /// Any transport, registration, or commit failure propagates. Both
    /// queues are drained before delivery starts, so a retried commit never
    /// re-delivers.
    pub fn post_commit(&self, uow: &dyn UnitOfWork) -> CaptureResult<()> {
        if self.flushing.get() {
            return Ok(());
        }

        let tx_hash = self
            .cycle_hash
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        // Drain both queues up-front: clearing must survive any failure.
        let pending = std::mem::take(&mut *self.pending_deletions.borrow_mut());
        let scheduled = std::mem::take(&mut *self.scheduled.borrow_mut());

        let mut produced_post_commit = false;

        for PendingDeletion { entity, snapshot } in pending {
            let action = if uow.contains(&*entity) {
                // Still tracked: the deletion was intercepted and converted
                // into a marker update elsewhere.
                self.config
                    .enable_soft_delete
                    .then_some(AuditAction::SoftDelete)
            } else {
                self.config.enable_hard_delete.then_some(AuditAction::Delete)
            };

            let Some(action) = action else {
                trace!(
                    entity_class = entity.entity_class(),
                    "deletion auditing disabled, skipping"
                );
                continue;
            };

            // A soft delete gets a fresh snapshot carrying the now-set
            // deletion marker; a hard delete has no after-state.
            let new_values =
                (action == AuditAction::SoftDelete).then(|| uow.snapshot(&*entity));
            let changed_fields = self
                .diff
                .generate(Some(&snapshot), new_values.as_ref(), &DiffOptions::full_raw())
                .fields();

            let record = self.build_record(
                &*entity,
                action,
                Some(snapshot),
                new_values,
                changed_fields,
                &tx_hash,
            );

            debug!(
                entity_class = entity.entity_class(),
                action = %action,
                "classified deferred deletion"
            );
            // The main commit has already closed; this record needs an
            // explicit write.
            uow.register(&record)?;
            self.deliver(&record, CommitPhase::PostCommit, Some(&*entity), uow)?;
            produced_post_commit = true;
        }

        for ScheduledRecord { entity, mut record } in scheduled {
            // Generated identifiers exist now; backfill the delivered copy.
            if record.entity_id.is_none() {
                record.entity_id = entity.entity_id();
            }
            self.deliver(&record, CommitPhase::PostCommit, Some(&*entity), uow)?;
        }

        if produced_post_commit {
            self.flushing.set(true);
            let outcome = uow.commit();
            // Release on every exit path so a failed commit never leaves
            // capture permanently disabled.
            self.flushing.set(false);
            outcome?;
        }

        Ok(())
    }

    /// Whether the engine is currently inside its own secondary commit.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    fn qualifies(&self, entity: &dyn Auditable) -> bool {
        !entity.is_audit_record() && self.policy.should_audit(entity)
    }

    /// UPDATE, unless the soft-delete marker transitions non-null to null,
    /// which is a RESTORE.
    fn classify_update(&self, diff: &papertrail_core::Diff) -> AuditAction {
        if self.config.enable_soft_delete {
            if let Some(change) = diff.get(&self.config.soft_delete_field) {
                if !change.old.is_null() && change.new.is_null() {
                    return AuditAction::Restore;
                }
            }
        }
        AuditAction::Update
    }

    fn build_record(
        &self,
        entity: &dyn Auditable,
        action: AuditAction,
        old_values: Option<FieldMap>,
        new_values: Option<FieldMap>,
        changed_fields: Vec<String>,
        tx_hash: &str,
    ) -> AuditRecord {
        AuditRecord::new(
            entity.entity_class(),
            entity.entity_id(),
            action,
            old_values,
            new_values,
            changed_fields,
            self.actors.current_actor(),
            tx_hash,
        )
    }

    fn deliver(
        &self,
        record: &AuditRecord,
        phase: CommitPhase,
        entity: Option<&dyn Auditable>,
        uow: &dyn UnitOfWork,
    ) -> CaptureResult<()> {
        if !self.transport.supports(phase) {
            trace!(phase = %phase, "transport does not participate in phase");
            return Ok(());
        }
        let context = DeliveryContext {
            phase,
            entity,
            uow,
        };
        self.transport.send(record, &context)
    }
}

//! Shared test harness for integration tests.
//!
//! [`InMemoryDb`] plays the persistence layer: it stages mutations, applies
//! them on flush, and exposes the staged state through the [`UnitOfWork`]
//! contract. [`CaptureRig`] wires a coordinator to it, records every
//! transport delivery, and persists post-commit deliveries into a
//! [`MemoryAuditStore`] so the read side can be exercised end to end.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use papertrail_capture::{
    ActorResolver, AuditPolicy, AuditTransport, CaptureConfig, CaptureError, CaptureResult,
    ChangeCaptureCoordinator, CommitPhase, DeliveryContext, FieldTransition, UnitOfWork,
};
use papertrail_core::{Actor, AuditRecord, Auditable, FieldMap};
use papertrail_query::{AuditQuery, AuditRecordStore, AuditReader, MemoryAuditStore};
use serde_json::Value;

/// A persisted row's live handle. The id appears only once the insertion
/// has been flushed, mirroring generated primary keys.
pub struct TrackedEntity {
    class: &'static str,
    id: RefCell<Option<String>>,
}

#[allow(dead_code)]
impl TrackedEntity {
    pub fn new(class: &'static str) -> Arc<Self> {
        Arc::new(Self {
            class,
            id: RefCell::new(None),
        })
    }

    pub fn with_id(class: &'static str, id: &str) -> Arc<Self> {
        Arc::new(Self {
            class,
            id: RefCell::new(Some(id.to_string())),
        })
    }

    pub fn id(&self) -> Option<String> {
        self.id.borrow().clone()
    }
}

impl Auditable for TrackedEntity {
    fn entity_class(&self) -> &str {
        self.class
    }

    fn entity_id(&self) -> Option<String> {
        self.id.borrow().clone()
    }
}

// The unit-of-work contract hands out `&dyn Auditable`; the harness finds
// its way back to the staged handle by data-pointer identity.
fn is_same(entity: &dyn Auditable, candidate: &Arc<TrackedEntity>) -> bool {
    std::ptr::eq(
        (entity as *const dyn Auditable).cast::<()>(),
        Arc::as_ptr(candidate).cast::<()>(),
    )
}

struct Row {
    entity: Arc<TrackedEntity>,
    fields: FieldMap,
    tracked: bool,
}

struct StagedDeletion {
    entity: Arc<TrackedEntity>,
    /// A competing mechanism converts the deletion into a marker update.
    intercepted_by: Option<(String, Value)>,
}

/// In-memory stand-in for a transactional persistence layer.
#[derive(Default)]
pub struct InMemoryDb {
    rows: RefCell<Vec<Row>>,
    staged_insertions: RefCell<Vec<Arc<TrackedEntity>>>,
    staged_updates: RefCell<Vec<Arc<TrackedEntity>>>,
    staged_deletions: RefCell<Vec<StagedDeletion>>,
    change_sets: RefCell<Vec<(Arc<TrackedEntity>, Vec<FieldTransition>)>>,
    registered: RefCell<Vec<AuditRecord>>,
    committed_audit_rows: RefCell<Vec<AuditRecord>>,
    next_id: Cell<i64>,
    secondary_commits: Cell<usize>,
}

#[allow(dead_code)]
impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insertion. The entity has no id until the flush.
    pub fn insert(&self, class: &'static str, fields: FieldMap) -> Arc<TrackedEntity> {
        let entity = TrackedEntity::new(class);
        self.rows.borrow_mut().push(Row {
            entity: Arc::clone(&entity),
            fields,
            tracked: true,
        });
        self.staged_insertions.borrow_mut().push(Arc::clone(&entity));
        entity
    }

    /// Stage an update with an explicit field-level changeset.
    pub fn update(&self, entity: &Arc<TrackedEntity>, transitions: Vec<FieldTransition>) {
        self.staged_updates.borrow_mut().push(Arc::clone(entity));
        self.change_sets
            .borrow_mut()
            .push((Arc::clone(entity), transitions));
    }

    /// Stage a hard deletion.
    pub fn delete(&self, entity: &Arc<TrackedEntity>) {
        self.staged_deletions.borrow_mut().push(StagedDeletion {
            entity: Arc::clone(entity),
            intercepted_by: None,
        });
    }

    /// Stage a deletion that a competing soft-delete mechanism will
    /// intercept at flush time: the row stays tracked and only the marker
    /// field is written.
    pub fn delete_intercepted(&self, entity: &Arc<TrackedEntity>, marker: &str, value: Value) {
        self.staged_deletions.borrow_mut().push(StagedDeletion {
            entity: Arc::clone(entity),
            intercepted_by: Some((marker.to_string(), value)),
        });
    }

    /// The main commit: assign generated ids, apply changesets, execute
    /// deletions, and make registered audit records durable.
    pub fn flush(&self) {
        for entity in self.staged_insertions.borrow().iter() {
            // The secondary commit flushes again before the cycle is
            // cleared; ids are assigned once.
            if entity.id.borrow().is_some() {
                continue;
            }
            let id = self.next_id.get().saturating_add(1);
            self.next_id.set(id);
            *entity.id.borrow_mut() = Some(id.to_string());
        }

        let mut rows = self.rows.borrow_mut();
        for (entity, transitions) in self.change_sets.borrow().iter() {
            if let Some(row) = rows.iter_mut().find(|row| is_same(&**entity, &row.entity)) {
                for transition in transitions {
                    row.fields
                        .insert(transition.field.clone(), transition.new.clone());
                }
            }
        }

        for staged in self.staged_deletions.borrow().iter() {
            let Some(row) = rows
                .iter_mut()
                .find(|row| is_same(&*staged.entity, &row.entity))
            else {
                continue;
            };
            match &staged.intercepted_by {
                Some((marker, value)) => {
                    row.fields.insert(marker.clone(), value.clone());
                }
                None => row.tracked = false,
            }
        }
        drop(rows);

        self.committed_audit_rows
            .borrow_mut()
            .append(&mut self.registered.borrow_mut());
    }

    /// Drop staged mutations once a cycle has fully completed.
    pub fn clear_cycle(&self) {
        self.staged_insertions.borrow_mut().clear();
        self.staged_updates.borrow_mut().clear();
        self.staged_deletions.borrow_mut().clear();
        self.change_sets.borrow_mut().clear();
    }

    /// One full commit cycle: pre-commit hook, main flush, post-commit
    /// hook.
    pub fn run_cycle(&self, coordinator: &ChangeCaptureCoordinator) -> CaptureResult<()> {
        coordinator.pre_commit(self)?;
        self.flush();
        coordinator.post_commit(self)?;
        self.clear_cycle();
        Ok(())
    }

    /// Current field values of a row.
    pub fn row_fields(&self, entity: &Arc<TrackedEntity>) -> Option<FieldMap> {
        self.rows
            .borrow()
            .iter()
            .find(|row| is_same(&**entity, &row.entity))
            .map(|row| row.fields.clone())
    }

    /// Audit records that rode a commit, in write order.
    pub fn committed_audit_rows(&self) -> Vec<AuditRecord> {
        self.committed_audit_rows.borrow().clone()
    }

    /// How many secondary commits the coordinator triggered.
    pub fn secondary_commits(&self) -> usize {
        self.secondary_commits.get()
    }
}

impl UnitOfWork for InMemoryDb {
    fn scheduled_insertions(&self) -> Vec<Arc<dyn Auditable>> {
        self.staged_insertions
            .borrow()
            .iter()
            .map(|entity| Arc::clone(entity) as Arc<dyn Auditable>)
            .collect()
    }

    fn scheduled_updates(&self) -> Vec<Arc<dyn Auditable>> {
        self.staged_updates
            .borrow()
            .iter()
            .map(|entity| Arc::clone(entity) as Arc<dyn Auditable>)
            .collect()
    }

    fn scheduled_deletions(&self) -> Vec<Arc<dyn Auditable>> {
        self.staged_deletions
            .borrow()
            .iter()
            .map(|staged| Arc::clone(&staged.entity) as Arc<dyn Auditable>)
            .collect()
    }

    fn change_set(&self, entity: &dyn Auditable) -> Vec<FieldTransition> {
        self.change_sets
            .borrow()
            .iter()
            .find(|(candidate, _)| is_same(entity, candidate))
            .map(|(_, transitions)| transitions.clone())
            .unwrap_or_default()
    }

    fn snapshot(&self, entity: &dyn Auditable) -> FieldMap {
        self.rows
            .borrow()
            .iter()
            .find(|row| is_same(entity, &row.entity))
            .map(|row| row.fields.clone())
            .unwrap_or_default()
    }

    fn contains(&self, entity: &dyn Auditable) -> bool {
        self.rows
            .borrow()
            .iter()
            .find(|row| is_same(entity, &row.entity))
            .is_some_and(|row| row.tracked)
    }

    fn register(&self, record: &AuditRecord) -> CaptureResult<()> {
        self.registered.borrow_mut().push(record.clone());
        Ok(())
    }

    fn commit(&self) -> CaptureResult<()> {
        self.secondary_commits
            .set(self.secondary_commits.get().saturating_add(1));
        self.flush();
        Ok(())
    }
}

/// Transport that records every delivery and persists the post-commit ones
/// into the query store, where generated identifiers are already
/// backfilled.
pub struct RecordingTransport {
    pub deliveries: RefCell<Vec<(CommitPhase, AuditRecord)>>,
    store: Arc<MemoryAuditStore>,
}

impl AuditTransport for RecordingTransport {
    fn send(&self, record: &AuditRecord, context: &DeliveryContext<'_>) -> CaptureResult<()> {
        self.deliveries
            .borrow_mut()
            .push((context.phase, record.clone()));
        if context.phase == CommitPhase::PostCommit {
            self.store
                .insert(record.clone())
                .map_err(|err| CaptureError::Transport(err.to_string()))?;
        }
        Ok(())
    }
}

/// Audits everything.
pub struct AuditEverything;

impl AuditPolicy for AuditEverything {
    fn should_audit(&self, _entity: &dyn Auditable) -> bool {
        true
    }
}

/// Resolves to one fixed test user.
pub struct FixedActor;

impl ActorResolver for FixedActor {
    fn current_actor(&self) -> Actor {
        Actor {
            user_id: Some(7),
            username: Some("alice".to_string()),
            ip_address: Some("10.0.0.1".to_string()),
        }
    }
}

/// Everything wired together: database, coordinator, delivery log, and
/// query store.
pub struct CaptureRig {
    pub db: InMemoryDb,
    pub coordinator: ChangeCaptureCoordinator,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<MemoryAuditStore>,
}

#[allow(dead_code)]
impl CaptureRig {
    pub fn new() -> Self {
        Self::with_config(CaptureConfig::default())
    }

    pub fn with_config(config: CaptureConfig) -> Self {
        let store = Arc::new(MemoryAuditStore::new());
        let transport = Arc::new(RecordingTransport {
            deliveries: RefCell::new(Vec::new()),
            store: Arc::clone(&store),
        });
        let coordinator = ChangeCaptureCoordinator::new(
            Arc::clone(&transport) as Arc<dyn AuditTransport>,
            Arc::new(AuditEverything),
            Arc::new(FixedActor),
            config,
        );
        Self {
            db: InMemoryDb::new(),
            coordinator,
            transport,
            store,
        }
    }

    /// Run one commit cycle through the coordinator.
    pub fn commit(&self) -> CaptureResult<()> {
        self.db.run_cycle(&self.coordinator)
    }

    pub fn reader(&self) -> AuditReader {
        AuditReader::new(Arc::clone(&self.store) as Arc<dyn AuditRecordStore>)
    }

    pub fn query(&self) -> AuditQuery {
        AuditQuery::new(Arc::clone(&self.store) as Arc<dyn AuditRecordStore>)
    }
}

/// Build a field map from literal pairs.
#[allow(dead_code)]
pub fn fields(pairs: &[(&str, Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

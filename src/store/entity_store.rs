use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::PagingConfig;
use crate::logic::edit::clean_entity;
use crate::model::{
    Action, ActionRecord, CollectionState, Command, Entity, EntityMeta, Id, Intent, Operation,
    Outcome, PageRequest,
};
use crate::store::traits::{Transport, TransportError};

/// Most recent dispatched actions kept per store
pub const JOURNAL_CAPACITY: usize = 256;

/// Owner of one entity type's collection state.
///
/// Every intent is dispatched as a request action, awaited on the transport,
/// then settled with a success or failure action. Commands emitted by a
/// settled action run before the call returns.
pub struct EntityStore<E: Entity, T: Transport> {
    transport: Arc<T>,
    state: Arc<RwLock<CollectionState<E>>>,
    journal: Arc<Mutex<VecDeque<ActionRecord>>>,
    paging: PagingConfig,
    /// Last page successfully folded into the collection
    current_page: Arc<Mutex<Option<PageRequest>>>,
    list_sequence: Arc<AtomicU64>,
}

impl<E: Entity, T: Transport> Clone for EntityStore<E, T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            journal: Arc::clone(&self.journal),
            paging: self.paging.clone(),
            current_page: Arc::clone(&self.current_page),
            list_sequence: Arc::clone(&self.list_sequence),
        }
    }
}

impl<E: Entity, T: Transport> EntityStore<E, T> {
    pub fn new(transport: Arc<T>, paging: PagingConfig) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(CollectionState::default())),
            journal: Arc::new(Mutex::new(VecDeque::with_capacity(JOURNAL_CAPACITY))),
            paging,
            current_page: Arc::new(Mutex::new(None)),
            list_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn meta(&self) -> &'static EntityMeta {
        E::meta()
    }

    pub fn snapshot(&self) -> CollectionState<E> {
        self.state.read().clone()
    }

    /// Read-only view of the state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&CollectionState<E>) -> R) -> R {
        f(&self.state.read())
    }

    /// Up to `JOURNAL_CAPACITY` most recent dispatched actions, oldest first
    pub fn journal(&self) -> Vec<ActionRecord> {
        self.journal.lock().iter().cloned().collect()
    }

    /// Take the journal, leaving it empty
    pub fn drain_journal(&self) -> Vec<ActionRecord> {
        self.journal.lock().drain(..).collect()
    }

    /// Apply one action to the state. Returned commands are not executed.
    pub fn dispatch(&self, action: Action<E>) -> Vec<Command> {
        {
            let mut journal = self.journal.lock();
            if journal.len() == JOURNAL_CAPACITY {
                journal.pop_front();
            }
            journal.push_back(ActionRecord::from(&action));
        }
        self.state.write().apply(action)
    }

    pub async fn run(&self, intent: Intent<E>) -> Result<(), TransportError> {
        match intent {
            Intent::FetchList(page) => self.get_entities(page).await,
            Intent::FetchOne(id) => self.get_entity(id).await.map(|_| ()),
            Intent::Create(entity) => self.create_entity(entity).await.map(|_| ()),
            Intent::Update(entity) => self.update_entity(entity).await.map(|_| ()),
            Intent::Delete(id) => self.delete_entity(id).await,
            Intent::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Fetch a page (the configured first page when `None`) and fold it into
    /// the collection
    pub async fn get_entities(&self, page: Option<PageRequest>) -> Result<(), TransportError> {
        let page = page.unwrap_or_else(|| self.paging.first_page());
        let ticket = self.list_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(Action::Request(Operation::FetchList));

        let result = match self.transport.list(E::meta().resource, &page).await {
            Ok(response) => response
                .rows
                .into_iter()
                .map(serde_json::from_value::<E>)
                .collect::<Result<Vec<E>, _>>()
                .map(|rows| (rows, response.links, response.total_items))
                .map_err(TransportError::from),
            Err(error) => Err(error),
        };

        if self.paging.discard_stale && ticket != self.list_sequence.load(Ordering::SeqCst) {
            warn!(
                "{}: discarding stale page {} (request {})",
                E::meta().name,
                page.page,
                ticket
            );
            return result.map(|_| ());
        }

        match result {
            Ok((rows, links, total_items)) => {
                self.dispatch(Action::Success(Outcome::Page {
                    rows,
                    links,
                    total_items,
                }));
                *self.current_page.lock() = Some(page);
                Ok(())
            }
            Err(error) => {
                self.fail(Operation::FetchList, &error);
                Err(error)
            }
        }
    }

    /// Fetch the page after the last one held. Returns `false` when the last
    /// page is already held.
    pub async fn load_more(&self) -> Result<bool, TransportError> {
        let current = self.current_page.lock().clone();
        let next = match current {
            Some(current) if current.page < self.state.read().links.last => current.next(),
            Some(_) => return Ok(false),
            None => self.paging.first_page(),
        };
        self.get_entities(Some(next)).await.map(|_| true)
    }

    pub async fn get_entity(&self, id: Id) -> Result<E, TransportError> {
        self.dispatch(Action::Request(Operation::FetchOne));
        let result = match self.transport.get(E::meta().resource, id).await {
            Ok(row) => serde_json::from_value::<E>(row).map_err(TransportError::from),
            Err(error) => Err(error),
        };
        self.settle(Operation::FetchOne, result, |row| Outcome::Fetched(row.clone()))
            .await
    }

    pub async fn create_entity(&self, entity: E) -> Result<E, TransportError> {
        self.dispatch(Action::Request(Operation::Create));
        let result = match serde_json::to_value(&entity) {
            Ok(body) => self.transport.create(E::meta().resource, clean_entity(body)).await,
            Err(error) => Err(error.into()),
        }
        .and_then(|row| serde_json::from_value::<E>(row).map_err(TransportError::from));
        self.settle(Operation::Create, result, |row| Outcome::Created(row.clone()))
            .await
    }

    pub async fn update_entity(&self, entity: E) -> Result<E, TransportError> {
        self.dispatch(Action::Request(Operation::Update));
        let result = match serde_json::to_value(&entity) {
            Ok(body) => self.transport.update(E::meta().resource, clean_entity(body)).await,
            Err(error) => Err(error.into()),
        }
        .and_then(|row| serde_json::from_value::<E>(row).map_err(TransportError::from));
        self.settle(Operation::Update, result, |row| Outcome::Updated(row.clone()))
            .await
    }

    pub async fn delete_entity(&self, id: Id) -> Result<(), TransportError> {
        self.dispatch(Action::Request(Operation::Delete));
        let result = self.transport.delete(E::meta().resource, id).await;
        self.settle(Operation::Delete, result, |_| Outcome::Deleted)
            .await
    }

    /// Restore the initial state, as a "create new" form does on mount
    pub fn reset(&self) {
        self.dispatch(Action::Reset);
        *self.current_page.lock() = None;
    }

    async fn settle<R>(
        &self,
        operation: Operation,
        result: Result<R, TransportError>,
        outcome: impl FnOnce(&R) -> Outcome<E> + Send,
    ) -> Result<R, TransportError> {
        match result {
            Ok(value) => {
                let commands = self.dispatch(Action::Success(outcome(&value)));
                self.follow_up(commands).await;
                Ok(value)
            }
            Err(error) => {
                self.fail(operation, &error);
                Err(error)
            }
        }
    }

    fn fail(&self, operation: Operation, error: &TransportError) {
        warn!("{}: {:?} failed: {}", E::meta().name, operation, error);
        self.dispatch(Action::Failure {
            operation,
            message: error.to_string(),
        });
    }

    async fn follow_up(&self, commands: Vec<Command>) {
        for command in commands {
            debug!("{}: running {:?}", E::meta().name, command);
            match command {
                Command::RefetchList => {
                    *self.current_page.lock() = None;
                    // the failure is already recorded on the state
                    let _ = self.get_entities(None).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobHistory, Language, Task};
    use crate::store::memory::MemoryTransport;
    use std::time::Duration;

    fn new_store<E: Entity>(transport: &Arc<MemoryTransport>, page_size: u32) -> EntityStore<E, MemoryTransport> {
        EntityStore::new(
            Arc::clone(transport),
            PagingConfig {
                page_size,
                ..Default::default()
            },
        )
    }

    fn tasks(count: usize) -> Vec<Task> {
        (0..count)
            .map(|index| Task {
                title: Some(format!("task-{index}")),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_triggers_refetch() {
        let transport = Arc::new(MemoryTransport::new());
        let histories = new_store::<JobHistory>(&transport, 20);

        let created = histories
            .create_entity(JobHistory {
                language: Some(Language::Dutch),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id, Some(1));

        // the refetch request clears the success flag again
        let state = histories.snapshot();
        assert!(!state.updating);
        assert!(!state.update_success);
        assert!(!state.loading);
        assert_eq!(state.entity, created);
        assert_eq!(state.entities, vec![created]);

        assert_eq!(
            histories.journal(),
            vec![
                ActionRecord::Request { operation: Operation::Create },
                ActionRecord::Success { operation: Operation::Create },
                ActionRecord::Request { operation: Operation::FetchList },
                ActionRecord::Success { operation: Operation::FetchList },
            ]
        );
    }

    #[test]
    fn test_dispatched_create_success_sets_update_success() {
        let transport = Arc::new(MemoryTransport::new());
        let histories = new_store::<JobHistory>(&transport, 20);
        assert!(!histories.snapshot().update_success);

        histories.dispatch(Action::Request(Operation::Create));
        let state = histories.snapshot();
        assert!(state.updating);
        assert!(!state.update_success);

        let created = JobHistory {
            id: Some(3),
            language: Some(Language::French),
            ..Default::default()
        };
        let commands = histories.dispatch(Action::Success(Outcome::Created(created.clone())));
        assert_eq!(commands, vec![Command::RefetchList]);
        let state = histories.snapshot();
        assert!(!state.updating);
        assert!(state.update_success);
        assert_eq!(state.entity, created);
    }

    #[tokio::test]
    async fn test_failed_refetch_after_create_is_recorded() {
        let transport = Arc::new(MemoryTransport::new());
        let store = new_store::<Task>(&transport, 20);
        transport.fail_next(
            "tasks",
            Operation::FetchList,
            TransportError::status(503, "Service Unavailable"),
        );

        let created = store.create_entity(tasks(1).remove(0)).await.unwrap();
        assert!(created.id.is_some());

        let state = store.snapshot();
        assert!(!state.loading);
        assert!(!state.updating);
        assert_eq!(state.entity, created);
        assert!(state.entities.is_empty());
        assert_eq!(state.error_message.as_deref(), Some("503 Service Unavailable"));
        assert_eq!(
            store.journal().last(),
            Some(&ActionRecord::Failure {
                operation: Operation::FetchList,
                message: "503 Service Unavailable".to_string(),
            })
        );
        assert_eq!(transport.rows("tasks").len(), 1);
    }

    #[test]
    fn test_journal_keeps_most_recent_actions() {
        let transport = Arc::new(MemoryTransport::new());
        let store = new_store::<Task>(&transport, 20);

        for _ in 0..JOURNAL_CAPACITY {
            store.dispatch(Action::Request(Operation::FetchOne));
        }
        store.dispatch(Action::Reset);

        let journal = store.journal();
        assert_eq!(journal.len(), JOURNAL_CAPACITY);
        assert_eq!(journal.last(), Some(&ActionRecord::Reset));

        assert_eq!(store.drain_journal().len(), JOURNAL_CAPACITY);
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_entity() {
        let transport = Arc::new(MemoryTransport::new());
        let seeded = transport.seed(&tasks(1));
        let store = new_store::<Task>(&transport, 20);
        let fetched = store.get_entity(seeded[0].id.unwrap()).await.unwrap();

        let error = store.delete_entity(404).await.unwrap_err();
        assert_eq!(error, TransportError::not_found());

        let state = store.snapshot();
        assert!(!state.updating);
        assert!(!state.update_success);
        assert_eq!(state.error_message.as_deref(), Some("404 Not Found"));
        assert_eq!(state.entity, fetched);
        // no refetch after a failed mutation
        assert!(!store
            .journal()
            .contains(&ActionRecord::Request { operation: Operation::FetchList }));
    }

    #[tokio::test]
    async fn test_load_more_appends_until_last_page() {
        let transport = Arc::new(MemoryTransport::new());
        transport.seed(&tasks(5));
        let store = new_store::<Task>(&transport, 2);

        store.get_entities(None).await.unwrap();
        assert_eq!(store.snapshot().entities.len(), 2);
        assert_eq!(store.snapshot().links.last, 2);

        assert!(store.load_more().await.unwrap());
        assert!(store.load_more().await.unwrap());
        assert!(!store.load_more().await.unwrap());

        let titles: Vec<_> = store
            .snapshot()
            .entities
            .into_iter()
            .filter_map(|task| task.title)
            .collect();
        assert_eq!(titles, (0..5).map(|i| format!("task-{i}")).collect::<Vec<_>>());
        assert_eq!(store.snapshot().total_items, 5);
    }

    #[tokio::test]
    async fn test_mutation_refetch_replaces_scrolled_collection() {
        let transport = Arc::new(MemoryTransport::new());
        transport.seed(&tasks(4));
        let store = new_store::<Task>(&transport, 2);

        store.get_entities(None).await.unwrap();
        store.load_more().await.unwrap();
        assert_eq!(store.snapshot().entities.len(), 4);

        store.delete_entity(1).await.unwrap();
        let ids: Vec<_> = store.snapshot().entities.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_reset_twice() {
        let transport = Arc::new(MemoryTransport::new());
        transport.seed(&tasks(3));
        let store = new_store::<Task>(&transport, 20);
        store.get_entities(None).await.unwrap();

        store.run(Intent::Reset).await.unwrap();
        let first = store.snapshot();
        store.run(Intent::Reset).await.unwrap();
        assert_eq!(first, CollectionState::default());
        assert_eq!(store.snapshot(), first);
    }

    #[tokio::test]
    async fn test_last_completion_wins_by_default() {
        let transport = Arc::new(MemoryTransport::new());
        transport.seed(&tasks(3));
        let store = new_store::<Task>(&transport, 1);

        transport.delay_next("tasks", Operation::FetchList, Duration::from_millis(50));
        let slow = store.get_entities(Some(PageRequest::new(0, 1, "id,asc")));
        let fast = store.get_entities(Some(PageRequest::new(0, 3, "id,asc")));
        let (slow, fast) = tokio::join!(slow, fast);
        slow.unwrap();
        fast.unwrap();

        // the older, slower response overwrote the newer one
        assert_eq!(store.snapshot().entities.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_completion_discarded_when_enabled() {
        let transport = Arc::new(MemoryTransport::new());
        transport.seed(&tasks(3));
        let store = EntityStore::<Task, _>::new(
            Arc::clone(&transport),
            PagingConfig {
                discard_stale: true,
                ..Default::default()
            },
        );

        transport.delay_next("tasks", Operation::FetchList, Duration::from_millis(50));
        let slow = store.get_entities(Some(PageRequest::new(0, 1, "id,asc")));
        let fast = store.get_entities(Some(PageRequest::new(0, 3, "id,asc")));
        let (slow, fast) = tokio::join!(slow, fast);
        slow.unwrap();
        fast.unwrap();

        let state = store.snapshot();
        assert_eq!(state.entities.len(), 3);
        assert!(!state.loading);
    }
}

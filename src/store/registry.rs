use log::warn;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::PagingConfig;
use crate::model::{
    meta_by_name, Country, Department, Employee, Entity, EntityMeta, Job, JobHistory, Location,
    PageRequest, Region, Task,
};
use crate::store::entity_store::EntityStore;
use crate::store::traits::{Transport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown entity type '{0}'")]
    UnknownEntity(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Root container: one store per entity type over a shared transport.
///
/// Stores only write their own state; forms read other stores' collections
/// (e.g. the department list behind an employee's department picker).
pub struct AdminStore<T: Transport> {
    pub region: EntityStore<Region, T>,
    pub country: EntityStore<Country, T>,
    pub location: EntityStore<Location, T>,
    pub department: EntityStore<Department, T>,
    pub employee: EntityStore<Employee, T>,
    pub job: EntityStore<Job, T>,
    pub task: EntityStore<Task, T>,
    pub job_history: EntityStore<JobHistory, T>,
}

impl<T: Transport> AdminStore<T> {
    pub fn new(transport: Arc<T>, paging: PagingConfig) -> Self {
        Self {
            region: EntityStore::new(Arc::clone(&transport), paging.clone()),
            country: EntityStore::new(Arc::clone(&transport), paging.clone()),
            location: EntityStore::new(Arc::clone(&transport), paging.clone()),
            department: EntityStore::new(Arc::clone(&transport), paging.clone()),
            employee: EntityStore::new(Arc::clone(&transport), paging.clone()),
            job: EntityStore::new(Arc::clone(&transport), paging.clone()),
            task: EntityStore::new(Arc::clone(&transport), paging.clone()),
            job_history: EntityStore::new(transport, paging),
        }
    }

    /// Fetch a page of the named entity (entity name or resource path) and
    /// return the held collection in wire form
    pub async fn fetch_list_by_name(
        &self,
        name: &str,
        page: Option<PageRequest>,
    ) -> Result<Vec<Value>, RegistryError> {
        let meta =
            meta_by_name(name).ok_or_else(|| RegistryError::UnknownEntity(name.to_string()))?;
        match meta.name {
            "region" => fetch_rows(&self.region, page).await,
            "country" => fetch_rows(&self.country, page).await,
            "location" => fetch_rows(&self.location, page).await,
            "department" => fetch_rows(&self.department, page).await,
            "employee" => fetch_rows(&self.employee, page).await,
            "job" => fetch_rows(&self.job, page).await,
            "task" => fetch_rows(&self.task, page).await,
            "jobHistory" => fetch_rows(&self.job_history, page).await,
            other => Err(RegistryError::UnknownEntity(other.to_string())),
        }
    }

    /// Load every collection the relation pickers of `meta` read from.
    ///
    /// All targets are requested even when one fails; the first failure is
    /// returned and each failure stays recorded on its own store.
    pub async fn prefetch_relations(&self, meta: &EntityMeta) -> Result<(), RegistryError> {
        let mut first_error = None;
        for target in meta.relation_targets() {
            if let Err(error) = self.fetch_list_by_name(target, None).await {
                warn!("{}: prefetching {} failed: {}", meta.name, target, error);
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reset every store to its initial state
    pub fn reset_all(&self) {
        self.region.reset();
        self.country.reset();
        self.location.reset();
        self.department.reset();
        self.employee.reset();
        self.job.reset();
        self.task.reset();
        self.job_history.reset();
    }
}

async fn fetch_rows<E: Entity, T: Transport>(
    store: &EntityStore<E, T>,
    page: Option<PageRequest>,
) -> Result<Vec<Value>, RegistryError> {
    store.get_entities(page).await?;
    store.read(|state| {
        state
            .entities
            .iter()
            .map(|row| serde_json::to_value(row).map_err(TransportError::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(RegistryError::from)
    })
}

use crate::model::{Entity, Links};

/// Per-entity-type collection state, mutated only through `apply`
/// (see `logic::lifecycle`).
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<E: Entity> {
    pub loading: bool,
    pub error_message: Option<String>,
    pub entities: Vec<E>,
    /// Entity under edit; `E::default()` when empty
    pub entity: E,
    pub links: Links,
    pub updating: bool,
    pub total_items: u64,
    pub update_success: bool,
}

impl<E: Entity> Default for CollectionState<E> {
    fn default() -> Self {
        Self {
            loading: false,
            error_message: None,
            entities: Vec::new(),
            entity: E::default(),
            links: Links::default(),
            updating: false,
            total_items: 0,
            update_success: false,
        }
    }
}

impl<E: Entity> CollectionState<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        !self.loading && !self.updating
    }
}

use log::debug;

use crate::logic::pagination::merge;
use crate::model::{Action, CollectionState, Command, Entity, Links, Outcome};

impl<E: Entity> CollectionState<E> {
    /// Apply one action and return the follow-up commands it emits.
    ///
    /// Mutation successes always emit `Command::RefetchList`; the held
    /// collection is never patched locally.
    pub fn apply(&mut self, action: Action<E>) -> Vec<Command> {
        debug!("{}: {:?}", E::meta().name, crate::model::ActionRecord::from(&action));

        match action {
            Action::Request(operation) => {
                self.error_message = None;
                self.update_success = false;
                if operation.is_mutation() {
                    self.updating = true;
                } else {
                    self.loading = true;
                }
                Vec::new()
            }
            Action::Failure { message, .. } => {
                self.loading = false;
                self.updating = false;
                self.update_success = false;
                self.error_message = Some(message);
                Vec::new()
            }
            Action::Success(Outcome::Page {
                rows,
                links,
                total_items,
            }) => {
                self.links = Links { last: links.last };
                self.loading = false;
                self.total_items = total_items;
                self.entities = merge(&self.entities, rows, &links);
                Vec::new()
            }
            Action::Success(Outcome::Fetched(entity)) => {
                self.loading = false;
                self.entity = entity;
                Vec::new()
            }
            Action::Success(Outcome::Created(entity) | Outcome::Updated(entity)) => {
                self.updating = false;
                self.update_success = true;
                self.entity = entity;
                vec![Command::RefetchList]
            }
            Action::Success(Outcome::Deleted) => {
                self.updating = false;
                self.update_success = true;
                self.entity = E::default();
                vec![Command::RefetchList]
            }
            Action::Reset => {
                *self = Self::default();
                Vec::new()
            }
        }
    }
}

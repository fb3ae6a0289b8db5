use serde::{Deserialize, Serialize};

use crate::logic::pagination::LinkInfo;
use crate::model::{Entity, Id, PageRequest};

/// The five transport-backed intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    FetchList,
    FetchOne,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete
        )
    }
}

/// Result payload of a completed intent
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<E: Entity> {
    Page {
        rows: Vec<E>,
        links: LinkInfo,
        total_items: u64,
    },
    Fetched(E),
    Created(E),
    Updated(E),
    Deleted,
}

impl<E: Entity> Outcome<E> {
    pub fn operation(&self) -> Operation {
        match self {
            Outcome::Page { .. } => Operation::FetchList,
            Outcome::Fetched(_) => Operation::FetchOne,
            Outcome::Created(_) => Operation::Create,
            Outcome::Updated(_) => Operation::Update,
            Outcome::Deleted => Operation::Delete,
        }
    }
}

/// Everything the collection state can react to. Each intent goes through
/// `Request`, then exactly one of `Success` or `Failure`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<E: Entity> {
    Request(Operation),
    Success(Outcome<E>),
    Failure { operation: Operation, message: String },
    Reset,
}

/// Follow-up work returned by a state transition, executed by the owning store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Refetch the first page of the collection, replacing what is held
    RefetchList,
}

/// Journal record of a dispatched action, without its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ActionRecord {
    Request { operation: Operation },
    Success { operation: Operation },
    Failure { operation: Operation, message: String },
    Reset,
}

impl<E: Entity> From<&Action<E>> for ActionRecord {
    fn from(action: &Action<E>) -> Self {
        match action {
            Action::Request(operation) => ActionRecord::Request {
                operation: *operation,
            },
            Action::Success(outcome) => ActionRecord::Success {
                operation: outcome.operation(),
            },
            Action::Failure { operation, message } => ActionRecord::Failure {
                operation: *operation,
                message: message.clone(),
            },
            Action::Reset => ActionRecord::Reset,
        }
    }
}

/// A user-level intent, before it is split into request/completion phases
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<E: Entity> {
    FetchList(Option<PageRequest>),
    FetchOne(Id),
    Create(E),
    Update(E),
    Delete(Id),
    Reset,
}

use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::logic::pagination::LinkInfo;
use crate::model::{Entity, Id, Operation, PageRequest};
use crate::store::traits::{PageResponse, Transport, TransportError};

/// Scripted behaviour for the next call of one operation on one resource
#[derive(Debug, Clone, PartialEq)]
pub enum Scripted {
    Fail(TransportError),
    Delay(Duration),
}

/// In-process REST double with the same paging and CRUD semantics as the
/// server: ids are assigned on create, pages carry link metadata, unknown ids
/// answer 404.
#[derive(Debug)]
pub struct MemoryTransport {
    inner: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    next_id: Id,
    scripts: HashMap<(String, Operation), VecDeque<Scripted>>,
    calls: Vec<(String, Operation)>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                tables: HashMap::new(),
                next_id: 1,
                scripts: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Insert rows as if they had been created, assigning ids where missing
    pub fn seed<E: Entity>(&self, rows: &[E]) -> Vec<E> {
        let mut state = self.inner.lock();
        let resource = E::meta().resource.to_string();
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let mut value = match serde_json::to_value(row) {
                Ok(value) => value,
                Err(_) => continue,
            };
            let id = match row.id() {
                Some(id) => {
                    state.next_id = state.next_id.max(id + 1);
                    id
                }
                None => state.allocate_id(),
            };
            value["id"] = Value::from(id);
            state.tables.entry(resource.clone()).or_default().push(value.clone());
            if let Ok(row) = serde_json::from_value(value) {
                stored.push(row);
            }
        }
        stored
    }

    pub fn rows(&self, resource: &str) -> Vec<Value> {
        self.inner
            .lock()
            .tables
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next `operation` on `resource` fail with `error`
    pub fn fail_next(&self, resource: &str, operation: Operation, error: TransportError) {
        self.script(resource, operation, Scripted::Fail(error));
    }

    /// Hold the next `operation` on `resource` for `delay` before answering
    pub fn delay_next(&self, resource: &str, operation: Operation, delay: Duration) {
        self.script(resource, operation, Scripted::Delay(delay));
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<(String, Operation)> {
        self.inner.lock().calls.clone()
    }

    fn script(&self, resource: &str, operation: Operation, scripted: Scripted) {
        self.inner
            .lock()
            .scripts
            .entry((resource.to_string(), operation))
            .or_default()
            .push_back(scripted);
    }

    // Records the call and plays its script. The lock is released before any
    // delay is awaited.
    async fn enter(&self, resource: &str, operation: Operation) -> Result<(), TransportError> {
        let scripted = {
            let mut state = self.inner.lock();
            state.calls.push((resource.to_string(), operation));
            state
                .scripts
                .get_mut(&(resource.to_string(), operation))
                .and_then(|queue| queue.pop_front())
        };

        match scripted {
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn position(&self, resource: &str, id: Id) -> Option<usize> {
        self.tables
            .get(resource)?
            .iter()
            .position(|row| row_id(row) == Some(id))
    }
}

fn row_id(row: &Value) -> Option<Id> {
    row.get("id").and_then(Value::as_i64)
}

fn bad_request() -> TransportError {
    TransportError::status(400, "Bad Request")
}

fn compare_field(left: &Value, right: &Value, field: &str) -> Ordering {
    match (left.get(field), right.get(field)) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn list(&self, resource: &str, page: &PageRequest) -> Result<PageResponse, TransportError> {
        self.enter(resource, Operation::FetchList).await?;

        let mut rows = self.rows(resource);
        let (field, direction) = page.sort.split_once(',').unwrap_or((page.sort.as_str(), "asc"));
        if !field.is_empty() {
            rows.sort_by(|a, b| compare_field(a, b, field));
            if direction.eq_ignore_ascii_case("desc") {
                rows.reverse();
            }
        }

        let size = page.size.max(1) as usize;
        let total_items = rows.len() as u64;
        let total_pages = rows.len().div_ceil(size) as u32;
        let rows = rows
            .into_iter()
            .skip(page.page as usize * size)
            .take(size)
            .collect();

        Ok(PageResponse {
            rows,
            links: LinkInfo::for_page(page.page, total_pages),
            total_items,
        })
    }

    async fn get(&self, resource: &str, id: Id) -> Result<Value, TransportError> {
        self.enter(resource, Operation::FetchOne).await?;
        let state = self.inner.lock();
        state
            .position(resource, id)
            .and_then(|index| state.tables.get(resource).map(|rows| rows[index].clone()))
            .ok_or_else(TransportError::not_found)
    }

    async fn create(&self, resource: &str, mut body: Value) -> Result<Value, TransportError> {
        self.enter(resource, Operation::Create).await?;
        if !body.is_object() || body.get("id").is_some_and(|id| !id.is_null()) {
            return Err(bad_request());
        }

        let mut state = self.inner.lock();
        body["id"] = Value::from(state.allocate_id());
        state
            .tables
            .entry(resource.to_string())
            .or_default()
            .push(body.clone());
        Ok(body)
    }

    async fn update(&self, resource: &str, body: Value) -> Result<Value, TransportError> {
        self.enter(resource, Operation::Update).await?;
        let id = row_id(&body).ok_or_else(bad_request)?;

        let mut state = self.inner.lock();
        let index = state
            .position(resource, id)
            .ok_or_else(TransportError::not_found)?;
        if let Some(rows) = state.tables.get_mut(resource) {
            rows[index] = body.clone();
        }
        Ok(body)
    }

    async fn delete(&self, resource: &str, id: Id) -> Result<(), TransportError> {
        self.enter(resource, Operation::Delete).await?;
        let mut state = self.inner.lock();
        let index = state
            .position(resource, id)
            .ok_or_else(TransportError::not_found)?;
        if let Some(rows) = state.tables.get_mut(resource) {
            rows.remove(index);
        }
        Ok(())
    }
}

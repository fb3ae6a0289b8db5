use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;

use crate::logic::relation::{resolve_single, ForeignKey, MultiDraft};
use crate::model::{Entity, Id, RelationDef, RelationKind};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("{entity} has no relation named '{field}'")]
    UnknownRelation { entity: &'static str, field: String },
    #[error("relation '{field}' is not {expected}")]
    WrongRelationKind { field: String, expected: &'static str },
    #[error("form values do not fit {entity}: {source}")]
    Payload {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Relation picker state of one create/edit form.
///
/// Scalar attributes come in with the submitted form values; relations are
/// tracked here between picker changes and folded in by `build`.
#[derive(Debug, Clone)]
pub struct EditSession<E: Entity> {
    is_new: bool,
    singles: HashMap<&'static str, ForeignKey>,
    multis: HashMap<&'static str, MultiDraft>,
    _entity: PhantomData<E>,
}

impl<E: Entity> EditSession<E> {
    /// `None` opens a create form, `Some(id)` an edit form for that row
    pub fn open(id: Option<Id>) -> Self {
        Self {
            is_new: id.is_none(),
            singles: HashMap::new(),
            multis: HashMap::new(),
            _entity: PhantomData,
        }
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Record a belongs-to picker change. A value matching no candidate leaves
    /// the previous selection in place.
    pub fn select_single<T: Entity>(
        &mut self,
        field: &str,
        selection: &str,
        candidates: &[T],
    ) -> Result<ForeignKey, EditError> {
        let relation = Self::relation(field)?;
        if relation.kind != RelationKind::Single {
            return Err(EditError::WrongRelationKind {
                field: field.to_string(),
                expected: "single",
            });
        }

        let current = self.singles.entry(relation.field).or_default();
        if let Some(resolved) = resolve_single(selection, candidates) {
            *current = resolved;
        }
        Ok(*current)
    }

    pub fn single(&self, field: &str) -> ForeignKey {
        self.singles.get(field).copied().unwrap_or_default()
    }

    /// Record a many-to-many picker change from the selected natural keys
    pub fn select_multi<T: Entity, S: AsRef<str>>(
        &mut self,
        field: &str,
        keys: &[S],
        candidates: &[T],
    ) -> Result<(), EditError> {
        let (field, natural_key) = Self::multi_relation(field)?;
        self.multis
            .entry(field)
            .or_default()
            .select(keys, candidates, natural_key);
        Ok(())
    }

    /// Keys the picker shows for `field`, seeded from the nested rows of
    /// `entity` until the user edits the selection
    pub fn displayed_keys<T: Entity>(
        &mut self,
        field: &str,
        entity: &E,
        candidates: &[T],
    ) -> Result<Vec<String>, EditError> {
        let (field, natural_key) = Self::multi_relation(field)?;
        let server_rows: Vec<T> = if self.is_new {
            Vec::new()
        } else {
            nested_rows(entity, field)
        };
        Ok(self
            .multis
            .entry(field)
            .or_default()
            .displayed_keys(&server_rows, candidates, natural_key))
    }

    /// Merge the base entity, the submitted scalar values and the relation
    /// selections into the entity to send.
    ///
    /// Form values outside the entity's field list are ignored; the id always
    /// comes from `base`.
    pub fn build(&self, base: &E, form_values: &Map<String, Value>) -> Result<E, EditError> {
        let meta = E::meta();
        let mut payload = match serde_json::to_value(base) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(source) => {
                return Err(EditError::Payload {
                    entity: meta.name,
                    source,
                })
            }
        };
        if self.is_new {
            payload.remove("id");
        }

        for (field, value) in form_values {
            if meta.has_field(field) {
                payload.insert(field.clone(), value.clone());
            }
        }

        for (field, selection) in &self.singles {
            if let Some(value) = selection.payload_value() {
                payload.insert(field.to_string(), value);
            }
        }

        for (field, draft) in &self.multis {
            if draft.is_edited() || !draft.is_empty() {
                payload.insert(field.to_string(), draft.payload());
            }
        }

        let mut entity: E = serde_json::from_value(Value::Object(payload)).map_err(|source| {
            EditError::Payload {
                entity: meta.name,
                source,
            }
        })?;
        entity.apply_defaults();
        Ok(entity)
    }

    fn relation(field: &str) -> Result<&'static RelationDef, EditError> {
        E::meta()
            .relation(field)
            .ok_or_else(|| EditError::UnknownRelation {
                entity: E::meta().name,
                field: field.to_string(),
            })
    }

    fn multi_relation(field: &str) -> Result<(&'static str, &'static str), EditError> {
        let relation = Self::relation(field)?;
        match relation.kind {
            RelationKind::Multi { natural_key } => Ok((relation.field, natural_key)),
            RelationKind::Single => Err(EditError::WrongRelationKind {
                field: field.to_string(),
                expected: "multi",
            }),
        }
    }
}

fn nested_rows<E: Entity, T: Entity>(entity: &E, field: &str) -> Vec<T> {
    serde_json::to_value(entity)
        .ok()
        .and_then(|value| value.get(field).cloned())
        .and_then(|rows| serde_json::from_value(rows).ok())
        .unwrap_or_default()
}

/// Drop nested object attributes that only carry a placeholder id (`""` or
/// `-1`) before a payload is sent.
pub fn clean_entity(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, attribute)| !is_placeholder_reference(attribute))
                .collect(),
        ),
        other => other,
    }
}

fn is_placeholder_reference(attribute: &Value) -> bool {
    match attribute.as_object().and_then(|object| object.get("id")) {
        Some(Value::String(id)) => id.is_empty(),
        Some(Value::Number(id)) => id.as_i64() == Some(-1),
        _ => false,
    }
}

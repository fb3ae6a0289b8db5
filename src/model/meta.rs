use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::model::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One foreign key field holding the related id
    Single,
    /// A set of related entities identified by a natural key instead of the id
    Multi { natural_key: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// Attribute name on the wire (e.g. `departmentId`, `tasks`)
    pub field: &'static str,
    /// `EntityMeta::name` of the related entity type
    pub target: &'static str,
    pub kind: RelationKind,
}

impl RelationDef {
    pub const fn single(field: &'static str, target: &'static str) -> Self {
        Self {
            field,
            target,
            kind: RelationKind::Single,
        }
    }

    pub const fn multi(
        field: &'static str,
        target: &'static str,
        natural_key: &'static str,
    ) -> Self {
        Self {
            field,
            target,
            kind: RelationKind::Multi { natural_key },
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.kind, RelationKind::Multi { .. })
    }
}

/// Static description of an entity type. The generic state machine, stores and
/// edit sessions read nothing else about an entity.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityMeta {
    pub name: &'static str,
    /// Path segment under `/api/`
    pub resource: &'static str,
    /// Editable scalar attributes, wire names
    pub fields: &'static [&'static str],
    pub relations: &'static [RelationDef],
}

impl EntityMeta {
    pub fn relation(&self, field: &str) -> Option<&'static RelationDef> {
        self.relations.iter().find(|relation| relation.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Distinct entity names this type points at, in declaration order
    pub fn relation_targets(&self) -> Vec<&'static str> {
        let mut targets: Vec<&'static str> = Vec::new();
        for relation in self.relations {
            if !targets.contains(&relation.target) {
                targets.push(relation.target);
            }
        }
        targets
    }
}

pub trait Entity:
    Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn meta() -> &'static EntityMeta;

    fn id(&self) -> Option<Id>;

    /// Fill attributes that have a value when the user left them unset
    fn apply_defaults(&mut self) {}

    /// String form of a top-level attribute, used for natural-key lookups.
    /// Numbers are rendered in their JSON form; nulls and objects yield `None`.
    fn field_text(&self, field: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(field)? {
            serde_json::Value::String(text) => Some(text.clone()),
            serde_json::Value::Number(number) => Some(number.to_string()),
            serde_json::Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }
}

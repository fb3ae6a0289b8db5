use serde_json::Value;

use crate::model::{Entity, Id, CLEARED_SENTINEL, UNTOUCHED_SENTINEL};

/// Local state of a single-valued relation picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKey {
    /// Never touched in this editing session, the entity keeps its value
    #[default]
    Untouched,
    /// The blank option was picked, the relation is removed on save
    Cleared,
    Id(Id),
}

impl ForeignKey {
    /// Numeric encoding: 0 untouched, -1 cleared, otherwise the id
    pub fn raw(&self) -> Id {
        match self {
            ForeignKey::Untouched => UNTOUCHED_SENTINEL,
            ForeignKey::Cleared => CLEARED_SENTINEL,
            ForeignKey::Id(id) => *id,
        }
    }

    pub fn from_raw(raw: Id) -> Self {
        match raw {
            UNTOUCHED_SENTINEL => ForeignKey::Untouched,
            CLEARED_SENTINEL => ForeignKey::Cleared,
            id => ForeignKey::Id(id),
        }
    }

    /// Value written into the save payload; `None` leaves the attribute alone
    pub fn payload_value(&self) -> Option<Value> {
        match self {
            ForeignKey::Untouched => None,
            ForeignKey::Cleared => Some(Value::Null),
            ForeignKey::Id(id) => Some(Value::from(*id)),
        }
    }
}

/// Resolve a picker value against the candidate rows.
///
/// `""` is an explicit clear whatever the candidates are. Otherwise the first
/// candidate whose id prints as `selection` wins. `None` means nothing matched
/// and the caller keeps its previous selection.
pub fn resolve_single<E: Entity>(selection: &str, candidates: &[E]) -> Option<ForeignKey> {
    if selection.is_empty() {
        return Some(ForeignKey::Cleared);
    }

    candidates
        .iter()
        .filter_map(|candidate| candidate.id())
        .find(|id| id.to_string() == selection)
        .map(ForeignKey::Id)
}

/// Map natural keys to the candidate rows carrying them, in selection order.
/// Keys without a candidate are dropped.
pub fn resolve_multi<E: Entity, S: AsRef<str>>(
    selected_keys: &[S],
    candidates: &[E],
    natural_key: &str,
) -> Vec<E> {
    selected_keys
        .iter()
        .filter_map(|key| {
            candidates
                .iter()
                .find(|candidate| candidate.field_text(natural_key).as_deref() == Some(key.as_ref()))
                .cloned()
        })
        .collect()
}

/// Local state of a multi-valued relation picker during one editing session.
///
/// Rows are kept in wire form so one session can hold drafts of several
/// related entity types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiDraft {
    selected: Vec<Value>,
    keys: Vec<String>,
    edited: bool,
}

impl MultiDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with the rows the picker keys resolve to
    pub fn select<T: Entity, S: AsRef<str>>(
        &mut self,
        keys: &[S],
        candidates: &[T],
        natural_key: &str,
    ) {
        self.store(resolve_multi(keys, candidates, natural_key), natural_key);
        self.edited = true;
    }

    /// Keys the picker should show as selected.
    ///
    /// Local state wins once it holds anything or the user has edited it.
    /// Before that the draft is seeded from the server-supplied nested rows.
    pub fn displayed_keys<T: Entity>(
        &mut self,
        server_rows: &[T],
        candidates: &[T],
        natural_key: &str,
    ) -> Vec<String> {
        if self.edited || !self.selected.is_empty() {
            return self.keys.clone();
        }

        let server_keys: Vec<String> = server_rows
            .iter()
            .filter_map(|row| row.field_text(natural_key))
            .collect();
        if !server_keys.is_empty() {
            // keep every server key on display, even ones no candidate carries yet
            self.store(resolve_multi(&server_keys, candidates, natural_key), natural_key);
            self.keys = server_keys;
        }
        self.keys.clone()
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected rows in the shape the server expects for the relation
    pub fn payload(&self) -> Value {
        Value::Array(self.selected.clone())
    }

    pub fn selected_as<T: Entity>(&self) -> Vec<T> {
        self.selected
            .iter()
            .filter_map(|row| serde_json::from_value(row.clone()).ok())
            .collect()
    }

    fn store<T: Entity>(&mut self, rows: Vec<T>, natural_key: &str) {
        self.keys = rows
            .iter()
            .filter_map(|row| row.field_text(natural_key))
            .collect();
        self.selected = rows
            .iter()
            .filter_map(|row| serde_json::to_value(row).ok())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Employee, Task};

    fn employees(ids: &[Id]) -> Vec<Employee> {
        ids.iter()
            .map(|id| Employee {
                id: Some(*id),
                ..Default::default()
            })
            .collect()
    }

    fn tasks(titles: &[&str]) -> Vec<Task> {
        titles
            .iter()
            .enumerate()
            .map(|(index, title)| Task {
                id: Some(index as Id + 1),
                title: Some(title.to_string()),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_resolve_single_matches_id_text() {
        let candidates = employees(&[3, 7, 11]);
        assert_eq!(resolve_single("7", &candidates), Some(ForeignKey::Id(7)));
        assert_eq!(resolve_single("7", &candidates).unwrap().raw(), 7);
        assert_eq!(resolve_single("42", &candidates), None);
    }

    #[test]
    fn test_resolve_single_blank_clears() {
        assert_eq!(resolve_single::<Employee>("", &[]), Some(ForeignKey::Cleared));
        let cleared = resolve_single("", &employees(&[1])).unwrap();
        assert_eq!(cleared.raw(), -1);
        assert_eq!(ForeignKey::default().raw(), 0);
        assert_ne!(ForeignKey::Cleared, ForeignKey::Untouched);
    }

    #[test]
    fn test_foreign_key_raw_round_trip() {
        for key in [ForeignKey::Untouched, ForeignKey::Cleared, ForeignKey::Id(5)] {
            assert_eq!(ForeignKey::from_raw(key.raw()), key);
        }
        assert_eq!(ForeignKey::Untouched.payload_value(), None);
        assert_eq!(ForeignKey::Cleared.payload_value(), Some(Value::Null));
        assert_eq!(ForeignKey::Id(4).payload_value(), Some(Value::from(4)));
    }

    #[test]
    fn test_resolve_multi_keeps_selection_order() {
        let candidates = tasks(&["Build", "Test", "Ship"]);
        let resolved = resolve_multi(&["Ship", "Build"], &candidates, "title");
        let ids: Vec<_> = resolved.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![Some(3), Some(1)]);
    }

    #[test]
    fn test_resolve_multi_drops_unknown_keys() {
        let candidates = tasks(&["Build", "Test"]);
        let resolved = resolve_multi(&["", "Deploy", "Test"], &candidates, "title");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].title.as_deref(), Some("Test"));

        // repeated keys repeat, nothing more
        let repeated = resolve_multi(&["Test", "Test"], &candidates, "title");
        assert_eq!(repeated.len(), 2);
    }

    #[test]
    fn test_draft_seeds_from_server_rows_until_edited() {
        let candidates = tasks(&["Build", "Test", "Ship"]);
        let server_rows = vec![candidates[1].clone()];
        let mut draft = MultiDraft::new();

        let shown = draft.displayed_keys(&server_rows, &candidates, "title");
        assert_eq!(shown, vec!["Test".to_string()]);
        assert!(!draft.is_edited());
        assert_eq!(draft.selected_as::<Task>(), vec![candidates[1].clone()]);

        draft.select(&["Ship", "Build"], &candidates, "title");
        let shown = draft.displayed_keys(&server_rows, &candidates, "title");
        assert_eq!(shown, vec!["Ship".to_string(), "Build".to_string()]);
    }

    #[test]
    fn test_seeded_keys_stay_stable_across_calls() {
        let candidates = tasks(&["Build", "Test"]);
        let server_rows = tasks(&["Test", "Archive"]);
        let mut draft = MultiDraft::new();

        let first = draft.displayed_keys(&server_rows, &candidates, "title");
        let second = draft.displayed_keys(&server_rows, &candidates, "title");
        assert_eq!(first, vec!["Test".to_string(), "Archive".to_string()]);
        assert_eq!(second, first);
        // only rows a candidate carries go into the payload
        assert_eq!(draft.selected_as::<Task>(), vec![candidates[1].clone()]);
    }

    #[test]
    fn test_edited_empty_selection_is_not_reseeded() {
        let candidates = tasks(&["Build", "Test"]);
        let server_rows = candidates.clone();
        let mut draft = MultiDraft::new();

        draft.select::<Task, &str>(&[], &candidates, "title");
        assert!(draft.is_empty());
        assert!(draft.displayed_keys(&server_rows, &candidates, "title").is_empty());
        assert_eq!(draft.payload(), Value::Array(Vec::new()));
    }
}

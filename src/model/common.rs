use serde::{Deserialize, Serialize};

/// Server-assigned numeric identity. `None` on an entity means "not yet created".
pub type Id = i64;

/// Raw encoding of a single-valued relation that was explicitly cleared.
pub const CLEARED_SENTINEL: Id = -1;

/// Raw encoding of a single-valued relation that was never touched.
pub const UNTOUCHED_SENTINEL: Id = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    #[default]
    French,
    English,
    Spanish,
    Dutch,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::French,
        Language::English,
        Language::Spanish,
        Language::Dutch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::French => "FRENCH",
            Language::English => "ENGLISH",
            Language::Spanish => "SPANISH",
            Language::Dutch => "DUTCH",
        }
    }
}

/// Pagination summary kept on the collection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Links {
    pub last: u32,
}

/// Query parameters of a list fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: String,
}

impl PageRequest {
    pub fn new(page: u32, size: u32, sort: impl Into<String>) -> Self {
        Self {
            page,
            size,
            sort: sort.into(),
        }
    }

    /// First page of a fresh query, used for refetches after a mutation
    pub fn first(size: u32, sort: impl Into<String>) -> Self {
        Self::new(0, size, sort)
    }

    /// The page that follows this one, same size and sort
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            size: self.size,
            sort: self.sort.clone(),
        }
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> String {
        format!("page={}&size={}&sort={}", self.page, self.size, self.sort)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(20, "id,asc")
    }
}

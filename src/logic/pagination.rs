use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page numbers advertised by a paginated list response.
///
/// Built from a `Link` header of the form
/// `<http://host/api/jobs?page=1&size=20>; rel="next",<...?page=0&size=20>; rel="first"`.
/// A response without a header is a single page: `first == last == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkInfo {
    pub first: u32,
    pub last: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkParseError {
    #[error("link header must not be empty")]
    Empty,
    #[error("link section could not be split on ';': {0}")]
    Section(String),
    #[error("link section has no page parameter: {0}")]
    MissingPage(String),
}

/// Whether a fetched page starts a new listing or continues the held one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageContext {
    Fresh,
    Continuation,
}

impl LinkInfo {
    pub fn single_page() -> Self {
        Self::default()
    }

    /// Links a paging server would advertise for `page` out of `total_pages`
    pub fn for_page(page: u32, total_pages: u32) -> Self {
        let last = total_pages.max(1) - 1;
        Self {
            first: 0,
            last,
            prev: (page > 0).then(|| page - 1),
            next: (page < last).then(|| page + 1),
        }
    }

    /// Page the response carrying these links was for
    pub fn current_page(&self) -> u32 {
        match (self.prev, self.next) {
            (Some(prev), _) => prev.saturating_add(1),
            (None, Some(next)) => next.saturating_sub(1),
            (None, None) => self.first,
        }
    }

    /// Render as a `Link` header value against `url`, the inverse of
    /// `parse_link_header`
    pub fn to_header(&self, url: &str, size: u32) -> String {
        let mut sections = Vec::new();
        if let Some(next) = self.next {
            sections.push(format!("<{url}?page={next}&size={size}>; rel=\"next\""));
        }
        if let Some(prev) = self.prev {
            sections.push(format!("<{url}?page={prev}&size={size}>; rel=\"prev\""));
        }
        sections.push(format!("<{url}?page={}&size={size}>; rel=\"last\"", self.last));
        sections.push(format!("<{url}?page={}&size={size}>; rel=\"first\"", self.first));
        sections.join(",")
    }
}

/// Parse a `Link` header into page numbers. Unknown relations are ignored.
pub fn parse_link_header(header: &str) -> Result<LinkInfo, LinkParseError> {
    if header.trim().is_empty() {
        return Err(LinkParseError::Empty);
    }

    let mut links = LinkInfo::default();
    for section in split_sections(header) {
        let parts: Vec<&str> = section.split(';').collect();
        if parts.len() != 2 {
            return Err(LinkParseError::Section(section.clone()));
        }

        let url = parts[0]
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        let page = page_param(url).ok_or_else(|| LinkParseError::MissingPage(section.clone()))?;

        let rel = parts[1]
            .trim()
            .trim_start_matches("rel=")
            .trim_matches('"');
        match rel {
            "first" => links.first = page,
            "last" => links.last = page,
            "prev" => links.prev = Some(page),
            "next" => links.next = Some(page),
            _ => {}
        }
    }

    Ok(links)
}

// Sections are comma separated, but a sort parameter ("sort=id,asc") can put
// commas inside a URL, so only a comma followed by '<' starts a new section.
fn split_sections(header: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    for piece in header.split(',') {
        match sections.last_mut() {
            Some(current) if !piece.trim_start().starts_with('<') => {
                current.push(',');
                current.push_str(piece);
            }
            _ => sections.push(piece.trim().to_string()),
        }
    }
    sections
}

fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Decide how a page relates to what is already held. A page is a
/// continuation only when rows are held, the listing spans several pages and
/// the page is past the first one.
pub fn page_context<E>(existing: &[E], links: &LinkInfo) -> PageContext {
    if existing.is_empty() || links.first == links.last || links.current_page() <= links.first {
        PageContext::Fresh
    } else {
        PageContext::Continuation
    }
}

/// Fold a fetched page into the held collection: a fresh page replaces it, a
/// continuation is appended in order. Ids are not de-duplicated.
pub fn merge<E: Clone>(existing: &[E], incoming: Vec<E>, links: &LinkInfo) -> Vec<E> {
    merge_with_context(existing, incoming, page_context(existing, links))
}

pub fn merge_with_context<E: Clone>(
    existing: &[E],
    incoming: Vec<E>,
    context: PageContext,
) -> Vec<E> {
    match context {
        PageContext::Fresh => incoming,
        PageContext::Continuation => {
            let mut merged = Vec::with_capacity(existing.len() + incoming.len());
            merged.extend_from_slice(existing);
            merged.extend(incoming);
            merged
        }
    }
}

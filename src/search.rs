use anyhow::Result;

use crate::api::{JobSource, SearchRequest};
use crate::identity::dedupe;
use crate::models::JobResult;
use crate::params::SearchFilters;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Page or result count for display. The board sometimes withholds the
/// total, in which case only a lower bound (the buffer) is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    Exact(usize),
    AtLeast(usize),
}

impl std::fmt::Display for PageCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageCount::Exact(n) => write!(f, "{}", n),
            PageCount::AtLeast(n) => write!(f, "{}+", n),
        }
    }
}

/// State of one logical search: the inputs it was started with, the
/// deduplicated result buffer accumulated across fetched pages, and what is
/// known about the total.
#[derive(Debug)]
pub struct SearchSession {
    query: String,
    location: String,
    filters: SearchFilters,
    results: Vec<JobResult>,
    page: usize, // 1-based display page
    page_size: usize,
    known_total: Option<usize>,
    fetched_pages: usize, // raw pages pulled from the source; dedupe makes this diverge from `page`
}

impl SearchSession {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn known_total(&self) -> Option<usize> {
        self.known_total
    }

    pub fn buffered(&self) -> &[JobResult] {
        &self.results
    }

    /// The slice of the buffer shown for the current page.
    pub fn current_slice(&self) -> &[JobResult] {
        let start = (self.page - 1) * self.page_size;
        if start >= self.results.len() {
            return &[];
        }
        let end = (start + self.page_size).min(self.results.len());
        &self.results[start..end]
    }

    pub fn page_count(&self) -> PageCount {
        match self.known_total {
            Some(total) => PageCount::Exact(pages_for(total, self.page_size)),
            None => PageCount::AtLeast(pages_for(self.results.len().max(1), self.page_size)),
        }
    }

    pub fn result_count(&self) -> PageCount {
        match self.known_total {
            Some(total) => PageCount::Exact(total),
            None => PageCount::AtLeast(self.results.len()),
        }
    }
}

fn pages_for(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size)
}

/// Drives a `SearchSession` against a `JobSource`. All mutation of the
/// session goes through these operations; a failed fetch leaves the session
/// exactly as it was, so retrying is safe.
pub struct SearchController<S> {
    source: S,
    filters: SearchFilters,
    session: Option<SearchSession>,
    page_size: usize,
}

impl<S: JobSource> SearchController<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: usize) -> Self {
        Self {
            source,
            filters: SearchFilters::default(),
            session: None,
            page_size,
        }
    }

    pub fn session(&self) -> Option<&SearchSession> {
        self.session.as_ref()
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    /// Start a fresh search. A blank query or location makes this a no-op
    /// (the UI disables the action); returns whether a session was started.
    pub fn start_search(&mut self, query: &str, location: &str) -> Result<bool> {
        let query = query.trim();
        let location = location.trim();
        if query.is_empty() || location.is_empty() {
            return Ok(false);
        }

        let request = SearchRequest {
            query: query.to_string(),
            location: location.to_string(),
            filters: self.filters.clone(),
            page: 1,
            size: self.page_size,
        };
        let fetched = self.source.fetch_page(&request)?;

        let results = dedupe(fetched.results);
        let known_total = match fetched.total {
            Some(total) => Some(total as usize),
            // A first page shorter than a full page is proof there is no
            // more data; a full page leaves the total unknown.
            None if results.len() < self.page_size => Some(results.len()),
            None => None,
        };

        self.session = Some(SearchSession {
            query: query.to_string(),
            location: location.to_string(),
            filters: self.filters.clone(),
            results,
            page: 1,
            page_size: self.page_size,
            known_total,
            fetched_pages: 1,
        });
        Ok(true)
    }

    /// Advance one page, fetching from the source only when the buffer does
    /// not already cover the requested page. Returns whether the page moved.
    pub fn next_page(&mut self) -> Result<bool> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };

        if let Some(total) = session.known_total {
            if session.page >= pages_for(total, session.page_size) {
                return Ok(false);
            }
        }

        let wanted = session.page + 1;
        if wanted * session.page_size <= session.results.len() {
            session.page = wanted;
            return Ok(true);
        }

        let raw_page = session.fetched_pages + 1;
        let request = SearchRequest {
            query: session.query.clone(),
            location: session.location.clone(),
            filters: session.filters.clone(),
            page: raw_page,
            size: session.page_size,
        };
        let fetched = self.source.fetch_page(&request)?;

        let fetched_count = fetched.results.len();
        let before = session.results.len();
        let mut merged = std::mem::take(&mut session.results);
        merged.extend(fetched.results);
        session.results = dedupe(merged);
        let new_items = session.results.len().saturating_sub(before);

        if let Some(total) = fetched.total {
            session.known_total = Some(total as usize);
        } else if session.known_total.is_none() {
            if new_items == 0 {
                // A page of nothing but duplicates means the source has
                // started repeating itself: the buffer is the total.
                session.known_total = Some(session.results.len());
            } else if fetched_count < session.page_size {
                // Last partial page reached.
                session.known_total =
                    Some((raw_page - 1) * session.page_size + fetched_count);
            }
        }

        session.fetched_pages = raw_page;
        session.page = wanted;
        Ok(true)
    }

    /// Step back one page. Prior pages are already buffered, so this never
    /// fetches. Returns whether the page moved.
    pub fn previous_page(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.page <= 1 {
            return false;
        }
        session.page -= 1;
        true
    }

    /// Replace the filters. If a search is live, restart it immediately with
    /// the new filters; otherwise they just apply to the next search.
    pub fn change_filters(&mut self, filters: SearchFilters) -> Result<bool> {
        self.filters = filters;
        let live = self
            .session
            .as_ref()
            .map(|s| (s.query.clone(), s.location.clone()));
        match live {
            Some((query, location)) => self.start_search(&query, &location),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchPage;
    use anyhow::anyhow;

    fn job(id: &str) -> JobResult {
        JobResult {
            title: format!("Job {}", id),
            employer: "Acme".to_string(),
            location: "Berlin".to_string(),
            external_id: Some(id.to_string()),
            link: None,
            distance_km: None,
            offer_category: None,
            start_date: None,
        }
    }

    fn jobs(range: std::ops::Range<usize>) -> Vec<JobResult> {
        range.map(|i| job(&format!("r{}", i))).collect()
    }

    /// Scripted source: raw page N comes from `pages[N-1]`; records every
    /// request; can fail the next fetch on demand.
    struct ScriptedSource {
        pages: Vec<SearchPage>,
        requests: Vec<SearchRequest>,
        fail_next: bool,
    }

    impl ScriptedSource {
        fn new(pages: Vec<SearchPage>) -> Self {
            Self {
                pages,
                requests: Vec::new(),
                fail_next: false,
            }
        }
    }

    impl JobSource for ScriptedSource {
        fn fetch_page(&mut self, request: &SearchRequest) -> Result<SearchPage> {
            self.requests.push(request.clone());
            if self.fail_next {
                self.fail_next = false;
                return Err(anyhow!("network down"));
            }
            Ok(self
                .pages
                .get(request.page - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn page(results: Vec<JobResult>, total: Option<u64>) -> SearchPage {
        SearchPage { results, total }
    }

    #[test]
    fn test_blank_inputs_are_a_no_op() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), None)]);
        let mut controller = SearchController::new(source);

        assert!(!controller.start_search("", "Berlin").unwrap());
        assert!(!controller.start_search("Verkäufer", "   ").unwrap());
        assert!(controller.session().is_none());
        assert!(controller.source.requests.is_empty());
    }

    #[test]
    fn test_full_first_page_without_total_stays_unknown() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), None)]);
        let mut controller = SearchController::new(source);

        assert!(controller.start_search("Verkäufer", "Berlin").unwrap());
        let session = controller.session().unwrap();
        // Exactly one full page is ambiguous: could be 20, could be more.
        assert_eq!(session.known_total(), None);
        assert_eq!(session.page(), 1);
        assert_eq!(session.current_slice().len(), 20);
        assert_eq!(session.page_count(), PageCount::AtLeast(1));
        assert_eq!(session.page_count().to_string(), "1+");
    }

    #[test]
    fn test_short_first_page_fixes_total() {
        let source = ScriptedSource::new(vec![page(jobs(0..7), None)]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        let session = controller.session().unwrap();
        assert_eq!(session.known_total(), Some(7));
        assert_eq!(session.page_count(), PageCount::Exact(1));
        assert_eq!(session.page_count().to_string(), "1");
    }

    #[test]
    fn test_reported_total_is_adopted() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), Some(137))]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        let session = controller.session().unwrap();
        assert_eq!(session.known_total(), Some(137));
        assert_eq!(session.page_count(), PageCount::Exact(7));
        assert_eq!(session.result_count(), PageCount::Exact(137));
    }

    #[test]
    fn test_next_page_fetches_and_accumulates() {
        let source = ScriptedSource::new(vec![
            page(jobs(0..20), None),
            page(jobs(20..40), None),
        ]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        assert!(controller.next_page().unwrap());

        let session = controller.session().unwrap();
        assert_eq!(session.page(), 2);
        assert_eq!(session.buffered().len(), 40);
        assert_eq!(session.current_slice()[0].external_id.as_deref(), Some("r20"));
        assert_eq!(session.known_total(), None);
        assert_eq!(session.page_count().to_string(), "2+");
    }

    #[test]
    fn test_previous_then_next_uses_buffer_without_refetch() {
        let source = ScriptedSource::new(vec![
            page(jobs(0..20), None),
            page(jobs(20..40), None),
        ]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.next_page().unwrap();
        assert!(controller.previous_page());
        assert_eq!(controller.session().unwrap().page(), 1);
        assert!(controller.next_page().unwrap());
        assert_eq!(controller.session().unwrap().page(), 2);

        // One request for page 1, one for page 2; the round trip back and
        // forward came from the buffer.
        assert_eq!(controller.source.requests.len(), 2);
    }

    #[test]
    fn test_previous_page_is_a_no_op_at_page_one() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), None)]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        assert!(!controller.previous_page());
        assert_eq!(controller.session().unwrap().page(), 1);
    }

    #[test]
    fn test_all_duplicate_page_fixes_total_and_stops_pagination() {
        let source = ScriptedSource::new(vec![
            page(jobs(0..20), None),
            page(jobs(0..20), None), // the source repeats itself
        ]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        assert!(controller.next_page().unwrap());

        let session = controller.session().unwrap();
        assert_eq!(session.known_total(), Some(20));
        assert_eq!(session.buffered().len(), 20);

        // Total is now known and exhausted: further calls do not move or fetch.
        let requests_before = controller.source.requests.len();
        assert!(!controller.next_page().unwrap());
        assert_eq!(controller.source.requests.len(), requests_before);
    }

    #[test]
    fn test_short_followup_page_computes_arithmetic_total() {
        let source = ScriptedSource::new(vec![
            page(jobs(0..20), None),
            page(jobs(20..27), None),
        ]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.next_page().unwrap();

        let session = controller.session().unwrap();
        // (raw_page - 1) * page_size + fetched_count = 20 + 7
        assert_eq!(session.known_total(), Some(27));
        assert_eq!(session.page(), 2);
        assert_eq!(session.current_slice().len(), 7);
        assert_eq!(session.page_count(), PageCount::Exact(2));
    }

    #[test]
    fn test_partially_duplicate_page_keeps_total_unknown() {
        let mut second = jobs(15..20); // 5 repeats of page one
        second.extend(jobs(20..35)); // 15 new
        let source = ScriptedSource::new(vec![page(jobs(0..20), None), page(second, None)]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.next_page().unwrap();

        let session = controller.session().unwrap();
        assert_eq!(session.buffered().len(), 35);
        // A full page with new items proves nothing about the total.
        assert_eq!(session.known_total(), None);
    }

    #[test]
    fn test_known_total_bounds_next_page() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), Some(20))]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        assert!(!controller.next_page().unwrap());
        assert_eq!(controller.session().unwrap().page(), 1);
        assert_eq!(controller.source.requests.len(), 1);
    }

    #[test]
    fn test_fetch_failure_leaves_state_untouched_and_retry_works() {
        let mut source = ScriptedSource::new(vec![
            page(jobs(0..20), None),
            page(jobs(20..40), None),
        ]);
        source.fail_next = false;
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.source.fail_next = true;

        assert!(controller.next_page().is_err());
        let session = controller.session().unwrap();
        assert_eq!(session.page(), 1);
        assert_eq!(session.buffered().len(), 20);
        assert_eq!(session.known_total(), None);

        // Same operation again succeeds and picks up where it left off.
        assert!(controller.next_page().unwrap());
        let session = controller.session().unwrap();
        assert_eq!(session.page(), 2);
        assert_eq!(session.buffered().len(), 40);
    }

    #[test]
    fn test_start_search_failure_keeps_previous_session() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), Some(57))]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.source.fail_next = true;
        assert!(controller.start_search("Pfleger", "Hamburg").is_err());

        // The old session survives the failed replacement.
        let session = controller.session().unwrap();
        assert_eq!(session.query(), "Verkäufer");
        assert_eq!(session.known_total(), Some(57));
    }

    #[test]
    fn test_change_filters_restarts_a_live_search() {
        let source = ScriptedSource::new(vec![page(jobs(0..20), None)]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.next_page().unwrap();

        let filters = SearchFilters {
            category: Some("internship".to_string()),
            distance_km: Some(10),
        };
        assert!(controller.change_filters(filters.clone()).unwrap());

        let session = controller.session().unwrap();
        assert_eq!(session.page(), 1);
        assert_eq!(session.buffered().len(), 20);

        let last = controller.source.requests.last().unwrap();
        assert_eq!(last.filters, filters);
        assert_eq!(last.page, 1);
    }

    #[test]
    fn test_change_filters_without_session_only_records() {
        let source = ScriptedSource::new(vec![]);
        let mut controller = SearchController::new(source);

        let filters = SearchFilters {
            category: Some("apprenticeship".to_string()),
            distance_km: None,
        };
        assert!(!controller.change_filters(filters.clone()).unwrap());
        assert!(controller.session().is_none());
        assert!(controller.source.requests.is_empty());
        assert_eq!(controller.filters(), &filters);
    }

    #[test]
    fn test_dedupe_spans_pages() {
        let mut second = jobs(0..5); // all repeats
        second.extend(jobs(20..35));
        let source = ScriptedSource::new(vec![page(jobs(0..20), Some(35)), page(second, Some(35))]);
        let mut controller = SearchController::new(source);

        controller.start_search("Verkäufer", "Berlin").unwrap();
        controller.next_page().unwrap();

        let session = controller.session().unwrap();
        assert_eq!(session.buffered().len(), 35);
        let ids: Vec<_> = session
            .buffered()
            .iter()
            .filter_map(|r| r.external_id.as_deref())
            .collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }
}

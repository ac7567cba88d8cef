//! Mapping between UI-level filter values and the job board's parameter
//! vocabulary.

/// Category code for "any regular job offer". The board's own default is
/// narrower than "no filter", so an unfiltered search must send this code
/// explicitly or the displayed totals drift from what the board reports.
pub const DEFAULT_OFFER_CATEGORY: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub category: Option<String>, // UI-level value, e.g. "internship"
    pub distance_km: Option<u32>,
}

/// UI category selection -> the board's `angebotsart` code.
/// Unknown selections map to None; an empty/unselected value gets the
/// default code.
pub fn map_offer_category(ui: &str) -> Option<u32> {
    match ui.trim() {
        "" => Some(DEFAULT_OFFER_CATEGORY),
        "full-time" | "part-time" | "working-student" => Some(1),
        "freelance" => Some(2),
        "apprenticeship" => Some(4),
        "internship" => Some(34),
        _ => None,
    }
}

/// UI category selection -> the board's `arbeitszeit` code. Only a subset of
/// categories carries a work-time dimension.
pub fn map_work_time(ui: &str) -> Option<&'static str> {
    match ui.trim() {
        "full-time" => Some("vz"),
        "part-time" => Some("tz"),
        "working-student" => Some("mj"),
        _ => None,
    }
}

/// Display label for a raw category code. Unknown codes fall back to a
/// humanized form of the raw value.
pub fn category_label(raw: &str) -> String {
    match raw.trim() {
        "1" => "Arbeit".to_string(),
        "2" => "Selbstständigkeit".to_string(),
        "4" => "Ausbildung/Duales Studium".to_string(),
        "34" => "Praktikum/Trainee".to_string(),
        other => humanize(other),
    }
}

fn humanize(raw: &str) -> String {
    let cleaned = raw.trim().replace(['_', '-'], " ");
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => cleaned,
    }
}

/// Assemble the search endpoint's query parameters. The category parameter is
/// always present for an unselected category (see DEFAULT_OFFER_CATEGORY);
/// distance is dropped unless a location is given, since distance without a
/// location is meaningless to the board.
pub fn build_query_params(
    query: &str,
    location: &str,
    filters: &SearchFilters,
    page: usize,
    size: usize,
) -> Vec<(String, String)> {
    let mut params = vec![("was".to_string(), query.trim().to_string())];

    let location = location.trim();
    if !location.is_empty() {
        params.push(("wo".to_string(), location.to_string()));
        if let Some(km) = filters.distance_km {
            params.push(("umkreis".to_string(), km.to_string()));
        }
    }

    let category = filters.category.as_deref().unwrap_or("");
    if let Some(code) = map_offer_category(category) {
        params.push(("angebotsart".to_string(), code.to_string()));
    }
    if let Some(code) = map_work_time(category) {
        params.push(("arbeitszeit".to_string(), code.to_string()));
    }

    params.push(("page".to_string(), page.to_string()));
    params.push(("size".to_string(), size.to_string()));
    params
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub location: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>, // "jobboerse", "manual", etc.
    pub status: String,         // "saved", "applied", "interview", "offer", "rejected", "withdrawn"
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: i64,
    pub application_id: i64,
    pub scheduled_on: String,
    pub kind: String, // "phone", "video", "onsite", ...
    pub notes: Option<String>,
    pub created_at: String,
}

/// One hit from the external job board search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub title: String,    // may be empty for sparse rows
    pub employer: String, // may be empty for anonymized postings
    pub location: String,
    pub external_id: Option<String>,
    pub link: Option<String>,
    pub distance_km: Option<f64>,
    pub offer_category: Option<String>, // raw category code as sent by the board
    pub start_date: Option<String>,     // a real date or free text like "ab sofort"
}

impl JobResult {
    /// Start date for display. The board sends either an ISO date or a
    /// free-text phrase; only the former gets reformatted.
    pub fn start_date_display(&self) -> String {
        let Some(raw) = &self.start_date else {
            return "-".to_string();
        };
        if let Ok(re) = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}") {
            if let Some(m) = re.find(raw.trim()) {
                if let Ok(date) = chrono::NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d") {
                    return date.format("%d.%m.%Y").to_string();
                }
            }
        }
        raw.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_start(start: Option<&str>) -> JobResult {
        JobResult {
            title: "Verkäufer".to_string(),
            employer: "Example GmbH".to_string(),
            location: "Berlin".to_string(),
            external_id: None,
            link: None,
            distance_km: None,
            offer_category: None,
            start_date: start.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_start_date_display_iso_date() {
        let result = result_with_start(Some("2026-09-01"));
        assert_eq!(result.start_date_display(), "01.09.2026");

        // Timestamps are common too; the date prefix is enough
        let result = result_with_start(Some("2026-09-01T00:00:00.000Z"));
        assert_eq!(result.start_date_display(), "01.09.2026");
    }

    #[test]
    fn test_start_date_display_free_text() {
        let result = result_with_start(Some("ab sofort"));
        assert_eq!(result.start_date_display(), "ab sofort");
    }

    #[test]
    fn test_start_date_display_missing() {
        let result = result_with_start(None);
        assert_eq!(result.start_date_display(), "-");
    }
}

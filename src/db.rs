use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::models::{Application, Interview, JobResult};

pub const STATUSES: &[&str] = &["saved", "applied", "interview", "offer", "rejected", "withdrawn"];

// Two titles at the same company this similar are the same posting.
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.9;

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "pirsch") {
            Ok(proj_dirs.data_dir().join("pirsch.db"))
        } else {
            // Fallback to current directory
            Ok(PathBuf::from("pirsch.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                title TEXT NOT NULL,
                location TEXT,
                url TEXT,
                source TEXT,
                status TEXT NOT NULL DEFAULT 'saved' CHECK (status IN ('saved', 'applied', 'interview', 'offer', 'rejected', 'withdrawn')),
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS interviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id INTEGER NOT NULL REFERENCES applications(id),
                scheduled_on TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'phone',
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            CREATE INDEX IF NOT EXISTS idx_interviews_application ON interviews(application_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'pirsch init' first."));
        }
        Ok(())
    }

    // --- Application operations ---

    pub fn add_application(
        &self,
        company: &str,
        title: &str,
        location: Option<&str>,
        url: Option<&str>,
        source: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO applications (company, title, location, url, source, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![company, title, location, url, source, notes],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_applications(
        &self,
        status: Option<&str>,
        company: Option<&str>,
    ) -> Result<Vec<Application>> {
        let mut sql = String::from(
            "SELECT id, company, title, location, url, source, status, notes, created_at, updated_at
             FROM applications WHERE 1=1",
        );

        let mut params: Vec<String> = vec![];

        if let Some(s) = status {
            sql.push_str(&format!(" AND status = ?{}", params.len() + 1));
            params.push(s.to_string());
        }

        if let Some(c) = company {
            sql.push_str(&format!(" AND LOWER(company) = LOWER(?{})", params.len() + 1));
            params.push(c.to_string());
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;

        let rows = match params.len() {
            0 => stmt.query_map([], Self::row_to_application)?,
            1 => stmt.query_map([&params[0]], Self::row_to_application)?,
            2 => stmt.query_map([&params[0], &params[1]], Self::row_to_application)?,
            _ => return Err(anyhow!("Too many parameters")),
        };

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    pub fn get_application(&self, id: i64) -> Result<Option<Application>> {
        let result = self.conn.query_row(
            "SELECT id, company, title, location, url, source, status, notes, created_at, updated_at
             FROM applications WHERE id = ?1",
            [id],
            Self::row_to_application,
        );
        match result {
            Ok(app) => Ok(Some(app)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_status(&self, id: i64, status: &str) -> Result<()> {
        if !STATUSES.contains(&status) {
            return Err(anyhow!(
                "Unknown status '{}'. Valid: {}",
                status,
                STATUSES.join(", ")
            ));
        }
        let changed = self.conn.execute(
            "UPDATE applications SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(anyhow!("Application #{} not found", id));
        }
        Ok(())
    }

    pub fn set_notes(&self, id: i64, notes: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE applications SET notes = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![notes, id],
        )?;
        if changed == 0 {
            return Err(anyhow!("Application #{} not found", id));
        }
        Ok(())
    }

    pub fn delete_application(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM interviews WHERE application_id = ?1", [id])?;
        let changed = self
            .conn
            .execute("DELETE FROM applications WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(anyhow!("Application #{} not found", id));
        }
        Ok(())
    }

    /// Find an already-tracked application that looks like the same posting:
    /// same URL, or same company with a near-identical title.
    pub fn find_duplicate(
        &self,
        company: &str,
        title: &str,
        url: Option<&str>,
    ) -> Result<Option<i64>> {
        if let Some(url) = url {
            let url = url.trim();
            if !url.is_empty() {
                let existing: Option<i64> = self
                    .conn
                    .query_row("SELECT id FROM applications WHERE url = ?1", [url], |row| {
                        row.get(0)
                    })
                    .ok();
                if existing.is_some() {
                    return Ok(existing);
                }
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, title FROM applications WHERE LOWER(company) = LOWER(?1)",
        )?;
        let rows = stmt.query_map([company], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let title_lower = title.to_lowercase();
        for row in rows {
            let (id, existing_title) = row?;
            let similarity = strsim::jaro_winkler(&title_lower, &existing_title.to_lowercase());
            if similarity >= TITLE_SIMILARITY_THRESHOLD {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Track a search hit as a saved application.
    pub fn save_search_result(&self, result: &JobResult) -> Result<i64> {
        let company = if result.employer.trim().is_empty() {
            "Unknown"
        } else {
            result.employer.as_str()
        };
        let location = if result.location.trim().is_empty() {
            None
        } else {
            Some(result.location.as_str())
        };
        self.add_application(
            company,
            &result.title,
            location,
            result.link.as_deref(),
            Some("jobboerse"),
            None,
        )
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
        Ok(Application {
            id: row.get(0)?,
            company: row.get(1)?,
            title: row.get(2)?,
            location: row.get(3)?,
            url: row.get(4)?,
            source: row.get(5)?,
            status: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    // --- Interview operations ---

    pub fn add_interview(
        &self,
        application_id: i64,
        date: &str,
        kind: &str,
        notes: Option<&str>,
    ) -> Result<i64> {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;

        if self.get_application(application_id)?.is_none() {
            return Err(anyhow!("Application #{} not found", application_id));
        }

        self.conn.execute(
            "INSERT INTO interviews (application_id, scheduled_on, kind, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![application_id, date, kind, notes],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_interviews(&self, application_id: i64) -> Result<Vec<Interview>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, scheduled_on, kind, notes, created_at
             FROM interviews WHERE application_id = ?1 ORDER BY scheduled_on",
        )?;
        let rows = stmt.query_map([application_id], Self::row_to_interview)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list interviews")
    }

    fn row_to_interview(row: &rusqlite::Row) -> rusqlite::Result<Interview> {
        Ok(Interview {
            id: row.get(0)?,
            application_id: row.get(1)?,
            scheduled_on: row.get(2)?,
            kind: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

use crate::db::{self, MARKSHEETS_KEY, STUDENT_RESULTS_KEY};
use crate::sheet::Row;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marksheet {
    pub id: i64,
    pub data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<String>,
}

/// Student-visible copy of a marksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResult {
    pub id: i64,
    pub data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSource {
    pub name: Option<String>,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShareOutcome {
    /// Student entries now carrying this id; repeat shares stack up.
    pub copies: usize,
    pub shared_count: usize,
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("No data found in the uploaded file.")]
    NoData,
    #[error("Marksheets not found.")]
    NotFound(i64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PortalError {
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::NoData => "no_data",
            PortalError::NotFound(_) => "not_found",
            PortalError::Store(_) => "store_failed",
        }
    }
}

/// Staff-side marksheet list, mirrored to the `marksheets` key after every change.
#[derive(Debug, Default)]
pub struct StaffPortal {
    marksheets: Vec<Marksheet>,
}

impl StaffPortal {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let marksheets = db::kv_get_json::<Vec<Marksheet>>(conn, MARKSHEETS_KEY)?.unwrap_or_default();
        Ok(Self { marksheets })
    }

    pub fn list(&self) -> &[Marksheet] {
        &self.marksheets
    }

    pub fn find(&self, id: i64) -> Option<&Marksheet> {
        self.marksheets.iter().find(|m| m.id == id)
    }

    pub fn find_by_sha256(&self, sha256: &str) -> Option<&Marksheet> {
        self.marksheets
            .iter()
            .find(|m| m.source_sha256.as_deref() == Some(sha256))
    }

    pub fn add(
        &mut self,
        conn: &Connection,
        data: Vec<Row>,
        source: ImportSource,
    ) -> Result<&Marksheet, PortalError> {
        if data.is_empty() {
            return Err(PortalError::NoData);
        }
        let now = chrono::Utc::now();
        let id = self.next_id(now.timestamp_millis());
        self.marksheets.push(Marksheet {
            id,
            data,
            source_name: source.name,
            source_sha256: source.sha256,
            imported_at: Some(now.to_rfc3339()),
        });
        if let Err(e) = self.persist(conn) {
            self.marksheets.pop();
            return Err(e.into());
        }
        Ok(&self.marksheets[self.marksheets.len() - 1])
    }

    pub fn remove(&mut self, conn: &Connection, id: i64) -> Result<Marksheet, PortalError> {
        let Some(idx) = self.marksheets.iter().position(|m| m.id == id) else {
            return Err(PortalError::NotFound(id));
        };
        let removed = self.marksheets.remove(idx);
        if let Err(e) = self.persist(conn) {
            self.marksheets.insert(idx, removed);
            return Err(e.into());
        }
        Ok(removed)
    }

    /// Appends a copy of the marksheet to the student bucket. Every share
    /// adds a new entry; `unshare` drops all of them at once.
    pub fn share(&self, conn: &Connection, id: i64) -> Result<ShareOutcome, PortalError> {
        let Some(marksheet) = self.find(id) else {
            return Err(PortalError::NotFound(id));
        };
        let mut results = student_results(conn)?;
        results.push(SharedResult {
            id,
            data: marksheet.data.clone(),
            shared_at: Some(chrono::Utc::now().to_rfc3339()),
        });
        db::kv_set_json(conn, STUDENT_RESULTS_KEY, &results)?;
        Ok(ShareOutcome {
            copies: results.iter().filter(|r| r.id == id).count(),
            shared_count: results.len(),
        })
    }

    fn next_id(&self, candidate: i64) -> i64 {
        let mut id = candidate;
        while self.marksheets.iter().any(|m| m.id == id) {
            id += 1;
        }
        id
    }

    fn persist(&self, conn: &Connection) -> anyhow::Result<()> {
        db::kv_set_json(conn, MARKSHEETS_KEY, &self.marksheets)
    }
}

pub fn student_results(conn: &Connection) -> anyhow::Result<Vec<SharedResult>> {
    Ok(db::kv_get_json::<Vec<SharedResult>>(conn, STUDENT_RESULTS_KEY)?.unwrap_or_default())
}

pub fn is_shared(results: &[SharedResult], id: i64) -> bool {
    results.iter().any(|r| r.id == id)
}

/// Drops every student entry for `id`. Absent ids are not an error.
pub fn unshare(conn: &Connection, id: i64) -> anyhow::Result<usize> {
    let mut results = student_results(conn)?;
    let before = results.len();
    results.retain(|r| r.id != id);
    db::kv_set_json(conn, STUDENT_RESULTS_KEY, &results)?;
    Ok(before - results.len())
}

pub fn clear_student_results(conn: &Connection) -> anyhow::Result<bool> {
    db::kv_remove(conn, STUDENT_RESULTS_KEY)
}

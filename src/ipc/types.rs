use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

use crate::db;
use crate::portal::StaffPortal;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub portal: StaffPortal,
}

impl AppState {
    /// Opens (or creates) the workspace store and reloads the staff list from it.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        let portal = StaffPortal::load(&conn)?;
        tracing::info!(
            workspace = %path.display(),
            marksheets = portal.list().len(),
            "workspace opened"
        );
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        self.portal = portal;
        Ok(())
    }
}

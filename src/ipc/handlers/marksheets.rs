use super::{marksheet_id_param, success_notice};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::portal::{self, ImportSource, PortalError};
use crate::sheet;
use crate::table::{self, TableView};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::Path;

fn portal_err(req: &Request, e: PortalError) -> serde_json::Value {
    let details = match &e {
        PortalError::NotFound(id) => Some(json!({ "marksheetId": id })),
        _ => None,
    };
    err(&req.id, e.code(), format!("{e:#}"), details)
}

fn handle_marksheets_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let path = match req.params.get("path").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "No file selected.", None),
    };

    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "upload unreadable");
            return err(
                &req.id,
                "read_failed",
                "Error reading file.",
                Some(json!({ "path": path, "reason": e.to_string() })),
            );
        }
    };
    let source_name = Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string());

    let data = match sheet::read_first_sheet_from_bytes(&bytes, source_name.as_deref()) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "upload failed to parse");
            return err(
                &req.id,
                "import_failed",
                format!("Error processing file: {e}"),
                Some(json!({ "path": path })),
            );
        }
    };

    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let duplicate_of = state.portal.find_by_sha256(&sha256).map(|m| m.id);

    let source = ImportSource {
        name: source_name,
        sha256: Some(sha256),
    };
    match state.portal.add(conn, data, source) {
        Ok(m) => {
            tracing::info!(marksheet = m.id, rows = m.data.len(), "marksheet imported");
            ok(
                &req.id,
                json!({
                    "marksheetId": m.id,
                    "sourceName": m.source_name,
                    "rowCount": m.data.len(),
                    "columnCount": table::column_count(&m.data),
                    "importedAt": m.imported_at,
                    "duplicateOf": duplicate_of,
                }),
            )
        }
        Err(e) => portal_err(req, e),
    }
}

fn handle_marksheets_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let shared = match portal::student_results(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "store_failed", format!("{e:#}"), None),
    };
    let marksheets: Vec<serde_json::Value> = state
        .portal
        .list()
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "sourceName": m.source_name,
                "rowCount": m.data.len(),
                "columnCount": table::column_count(&m.data),
                "importedAt": m.imported_at,
                "shared": portal::is_shared(&shared, m.id),
            })
        })
        .collect();
    ok(&req.id, json!({ "marksheets": marksheets }))
}

fn handle_marksheets_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let id = match marksheet_id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(m) = state.portal.find(id) else {
        return portal_err(req, PortalError::NotFound(id));
    };
    ok(
        &req.id,
        json!({
            "id": m.id,
            "sourceName": m.source_name,
            "table": TableView::from_rows(&m.data),
        }),
    )
}

fn handle_marksheets_share(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match marksheet_id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.portal.share(conn, id) {
        Ok(outcome) => {
            tracing::info!(marksheet = id, copies = outcome.copies, "marksheet shared");
            let mut result = success_notice("Results are now visible to all students!");
            result["marksheetId"] = json!(id);
            result["copies"] = json!(outcome.copies);
            result["sharedCount"] = json!(outcome.shared_count);
            ok(&req.id, result)
        }
        Err(e) => portal_err(req, e),
    }
}

fn handle_marksheets_unshare(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match marksheet_id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match portal::unshare(conn, id) {
        Ok(removed) => {
            tracing::info!(marksheet = id, removed, "marksheet withdrawn from students");
            let mut result =
                success_notice("Results have been deleted from the student portal!");
            result["marksheetId"] = json!(id);
            result["removed"] = json!(removed);
            ok(&req.id, result)
        }
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

fn handle_marksheets_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match marksheet_id_param(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.portal.remove(conn, id) {
        Ok(removed) => {
            tracing::info!(marksheet = removed.id, "marksheet deleted from staff");
            let mut result = success_notice("Marksheets deleted from the staff portal!");
            result["marksheetId"] = json!(removed.id);
            ok(&req.id, result)
        }
        Err(e) => portal_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marksheets.import" => Some(handle_marksheets_import(state, req)),
        "marksheets.list" => Some(handle_marksheets_list(state, req)),
        "marksheets.open" => Some(handle_marksheets_open(state, req)),
        "marksheets.share" => Some(handle_marksheets_share(state, req)),
        "marksheets.unshare" => Some(handle_marksheets_unshare(state, req)),
        "marksheets.delete" => Some(handle_marksheets_delete(state, req)),
        _ => None,
    }
}

use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::portal::StaffPortal;
use serde_json::json;
use std::path::PathBuf;

fn path_param(req: &Request, key: &str) -> Option<PathBuf> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn handle_backup_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(out) = path_param(req, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    match backup::export_bundle(conn, &out) {
        Ok(bundle) => {
            tracing::info!(path = %out.display(), marksheets = bundle.marksheets.len(), "bundle exported");
            ok(
                &req.id,
                json!({
                    "path": out.to_string_lossy(),
                    "bundleFormat": backup::BUNDLE_FORMAT,
                    "marksheetCount": bundle.marksheets.len(),
                    "studentResultCount": bundle.student_results.len()
                }),
            )
        }
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out.to_string_lossy() })),
        ),
    }
}

/// Restores into the open workspace. The store and the in-memory list are
/// only touched once the whole bundle has been read and checked.
fn handle_backup_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(src) = path_param(req, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        );
    }

    let bundle = match backup::read_bundle(&src) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %src.display(), error = %format!("{e:#}"), "bundle rejected");
            return err(
                &req.id,
                "bad_bundle",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    if let Err(e) = backup::restore_bundle(conn, &bundle) {
        return err(&req.id, "store_failed", format!("{e:#}"), None);
    }
    match StaffPortal::load(conn) {
        Ok(portal) => state.portal = portal,
        Err(e) => return err(&req.id, "store_failed", format!("{e:#}"), None),
    }

    tracing::info!(path = %src.display(), marksheets = bundle.marksheets.len(), "bundle restored");
    ok(
        &req.id,
        json!({
            "bundleFormat": backup::BUNDLE_FORMAT,
            "marksheetCount": state.portal.list().len(),
            "studentResultCount": bundle.student_results.len()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_backup_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_backup_import_bundle(state, req)),
        _ => None,
    }
}

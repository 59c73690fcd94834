use super::success_notice;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::portal;
use crate::table::TableView;
use serde_json::json;

fn handle_student_results_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let results = match portal::student_results(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "store_failed", format!("{e:#}"), None),
    };
    let results: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "sharedAt": r.shared_at,
                "table": TableView::from_rows(&r.data),
            })
        })
        .collect();
    ok(&req.id, json!({ "results": results }))
}

fn handle_student_results_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match portal::clear_student_results(conn) {
        Ok(existed) => {
            tracing::info!(existed, "student results cleared");
            ok(
                &req.id,
                success_notice("All results have been cleared from the student portal!"),
            )
        }
        Err(e) => err(&req.id, "store_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "studentResults.list" => Some(handle_student_results_list(state, req)),
        "studentResults.clear" => Some(handle_student_results_clear(state, req)),
        _ => None,
    }
}

pub mod backup;
pub mod core;
pub mod marksheets;
pub mod student_results;

use crate::ipc::error::err;
use crate::ipc::types::Request;

/// Reads `params.marksheetId`, accepting either a JSON number or a numeric string.
pub(crate) fn marksheet_id_param(req: &Request) -> Result<i64, serde_json::Value> {
    let Some(v) = req.params.get("marksheetId") else {
        return Err(err(&req.id, "bad_params", "missing marksheetId", None));
    };
    let parsed = v
        .as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()));
    parsed.ok_or_else(|| err(&req.id, "bad_params", "marksheetId must be an integer", None))
}

pub(crate) fn success_notice(message: &str) -> serde_json::Value {
    serde_json::json!({ "message": message, "kind": "success" })
}

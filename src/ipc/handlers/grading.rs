use serde_json::json;

use crate::grades::{Grade, GradeError, GRADE_ORDER};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn parse_grade(req: &Request) -> Result<Grade, serde_json::Value> {
    let name = required_str(req, "grade")?;
    Grade::parse(&name).map_err(|e| err(&req.id, &e.code, e.message, None))
}

/// The full dashboard payload the UI re-renders from: one row per grade in
/// rank order, the rounded MGPA, and the plot title.
pub fn dashboard_view(state: &AppState) -> Result<serde_json::Value, GradeError> {
    let Some(course) = state.course.as_ref() else {
        return Err(GradeError::new("no_course", "load a course first"));
    };

    let stats = state.ledger.recompute(&course.histogram)?;
    let mgpa = (stats.mgpa * 100.0).round() / 100.0;

    let mut grades = Vec::with_capacity(GRADE_ORDER.len());
    for g in GRADE_ORDER {
        let entry = state.ledger.entry(g);
        let mut row = json!({
            "grade": g.as_str(),
            "enabled": entry.enabled,
            "weight": entry.weight,
            "cutoff": entry.cutoff,
            // The cutoff marker sits on the left edge of the cutoff's bin.
            "markerLocation": entry.cutoff as f64 - 0.5,
        });
        if let Some(count) = stats.counts.get(&g) {
            row["count"] = json!(count);
        }
        grades.push(row);
    }

    Ok(json!({
        "grades": grades,
        "mgpa": mgpa,
        "title": format!("{} MGPA:{:.2}", course.title, mgpa),
    }))
}

fn view_response(state: &AppState, req: &Request) -> serde_json::Value {
    match dashboard_view(state) {
        Ok(view) => ok(&req.id, view),
        Err(e) => err(&req.id, &e.code, e.message, None),
    }
}

fn handle_set_cutoff(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match parse_grade(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(value) = req.params.get("value").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing integer value", None);
    };
    let max_marks = match state.course.as_ref() {
        Some(c) => c.max_marks,
        None => return err(&req.id, "no_course", "load a course first", None),
    };

    state.ledger.set_cutoff(grade, value, max_marks);
    view_response(state, req)
}

fn handle_set_enabled(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade = match parse_grade(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(enabled) = req.params.get("enabled").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing boolean enabled", None);
    };
    if state.course.is_none() {
        return err(&req.id, "no_course", "load a course first", None);
    }

    state.ledger.set_enabled(grade, enabled);
    view_response(state, req)
}

fn handle_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    view_response(state, req)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.setCutoff" => Some(handle_set_cutoff(state, req)),
        "grades.setEnabled" => Some(handle_set_enabled(state, req)),
        "grades.view" => Some(handle_view(state, req)),
        _ => None,
    }
}

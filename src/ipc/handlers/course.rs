use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::grading;
use crate::histogram::{self, HistogramSummary};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, CourseState, Request};

const ALLOWED_MAX_MARKS: [u32; 3] = [100, 200, 300];

/// Accept either a roster file or a folder holding one. Folders are scanned
/// for `.csv` entries with a deterministic pick if several exist.
fn resolve_roster_path(path: &std::path::Path) -> anyhow::Result<std::path::PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let mut best: Option<std::path::PathBuf> = None;
    for ent in std::fs::read_dir(path)? {
        let ent = ent?;
        let p = ent.path();
        if !p.is_file() {
            continue;
        }
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if name.to_ascii_lowercase().ends_with(".csv") {
            if best.as_ref().map(|b| p < *b).unwrap_or(true) {
                best = Some(p);
            }
        }
    }
    match best {
        Some(p) => Ok(p),
        None => anyhow::bail!("no .csv roster found in folder"),
    }
}

fn handle_course_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let Some(title) = req.params.get("title").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.title", None);
    };
    let max_marks = match req.params.get("maxMarks").and_then(|v| v.as_u64()) {
        Some(v) => v as u32,
        None => return err(&req.id, "bad_params", "missing params.maxMarks", None),
    };
    if !ALLOWED_MAX_MARKS.contains(&max_marks) {
        return err(
            &req.id,
            "bad_params",
            "maxMarks must be one of 100, 200, 300",
            None,
        );
    }

    // Everything fallible happens before any state is touched; a bad roster
    // leaves the previous course, histogram and cutoffs exactly as they were.
    let roster = match resolve_roster_path(std::path::Path::new(path)) {
        Ok(p) => p,
        Err(e) => {
            return err(
                &req.id,
                "data_load",
                format!("cannot resolve {}: {}", path, e),
                None,
            )
        }
    };
    let bytes = match std::fs::read(&roster) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "data_load",
                format!("cannot read {}: {}", roster.to_string_lossy(), e),
                None,
            )
        }
    };
    let scores = match histogram::read_total_scores(&bytes) {
        Ok(s) => s,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };
    if scores.is_empty() {
        return err(&req.id, "data_load", "roster has no student rows", None);
    }
    let hist = HistogramSummary::from_scores(&scores, max_marks);

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let source_sha256 = format!("{:x}", hasher.finalize());

    let dataset_id = Uuid::new_v4().to_string();
    let loaded_at = Utc::now().to_rfc3339();
    let total_students = hist.total_students;
    let mean_score = hist.mean_score;
    let first_score_bin = hist.first_occupied_bin();

    state.ledger.reset_cutoffs(max_marks);
    state.course = Some(CourseState {
        title: title.to_string(),
        max_marks,
        histogram: hist,
        dataset_id: dataset_id.clone(),
        source_sha256: source_sha256.clone(),
        loaded_at: loaded_at.clone(),
    });

    let view = match grading::dashboard_view(state) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, None),
    };

    ok(
        &req.id,
        json!({
            "datasetId": dataset_id,
            "sourceSha256": source_sha256,
            "loadedAt": loaded_at,
            "title": title,
            "maxMarks": max_marks,
            "totalStudents": total_students,
            "meanScore": mean_score,
            "firstScoreBin": first_score_bin,
            "view": view,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "course.load" => Some(handle_course_load(state, req)),
        _ => None,
    }
}

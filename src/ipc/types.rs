use serde::Deserialize;

use crate::grades::GradeLedger;
use crate::histogram::HistogramSummary;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything tied to the currently loaded dataset. Replaced wholesale on a
/// successful `course.load`, never mutated in place.
pub struct CourseState {
    pub title: String,
    pub max_marks: u32,
    pub histogram: HistogramSummary,
    pub dataset_id: String,
    pub source_sha256: String,
    pub loaded_at: String,
}

pub struct AppState {
    pub course: Option<CourseState>,
    pub ledger: GradeLedger,
}

impl AppState {
    pub fn new() -> Self {
        // The ledger exists from process start; 100 is the pre-load scale.
        AppState {
            course: None,
            ledger: GradeLedger::new(100),
        }
    }
}

use serde::Serialize;

/// Per-dataset score summary: one-point bins over `[-0.5, max_marks + 0.5)`
/// (bin `i` holds scores that round to `i`), plus the roster-wide totals.
/// Built once per load and read-only afterwards.
#[derive(Debug, Clone)]
pub struct HistogramSummary {
    pub bin_counts: Vec<u64>,
    pub total_students: u64,
    pub mean_score: f64,
    pub max_marks: u32,
}

impl HistogramSummary {
    /// Bin a column of raw total scores. Scores that round outside
    /// `[0, max_marks]` fall off the histogram but still count toward
    /// `total_students` and the mean, the same way the plotted histogram
    /// clips while the summary stats come from the full column.
    pub fn from_scores(scores: &[f64], max_marks: u32) -> HistogramSummary {
        let mut bin_counts = vec![0_u64; max_marks as usize + 1];
        let mut sum = 0.0_f64;
        for &score in scores {
            sum += score;
            let rounded = round_half_even(score);
            if rounded >= 0.0 && rounded <= max_marks as f64 {
                bin_counts[rounded as usize] += 1;
            }
        }

        let total_students = scores.len() as u64;
        let mean_score = if total_students > 0 {
            sum / total_students as f64
        } else {
            0.0
        };

        HistogramSummary {
            bin_counts,
            total_students,
            mean_score,
            max_marks,
        }
    }

    /// Index of the lowest occupied bin. The dashboard uses it to pin the
    /// plot's x-origin just below the weakest student.
    pub fn first_occupied_bin(&self) -> Option<usize> {
        self.bin_counts.iter().position(|&c| c > 0)
    }
}

/// Round half to even, matching the numeric library the original histogram
/// was binned with (plain `f64::round` would send 0.5 ties away from zero).
fn round_half_even(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        (x / 2.0).round() * 2.0
    } else {
        x.round()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadError {
    pub code: String,
    pub message: String,
}

impl LoadError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Pull the `Total` column out of a delimited roster. Any structural or
/// numeric problem fails the whole load; the caller replaces state only on
/// success.
pub fn read_total_scores(bytes: &[u8]) -> Result<Vec<f64>, LoadError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| LoadError::new("data_load", format!("unreadable roster: {}", e)))?;
    let Some(total_idx) = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("total"))
    else {
        return Err(LoadError::new("data_load", "roster has no Total column"));
    };

    let mut scores = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| LoadError::new("data_load", format!("row {}: {}", row + 2, e)))?;
        let Some(field) = record.get(total_idx) else {
            return Err(LoadError::new(
                "data_load",
                format!("row {}: missing Total value", row + 2),
            ));
        };
        let value: f64 = field.trim().parse().map_err(|_| {
            LoadError::new(
                "data_load",
                format!("row {}: bad Total value '{}'", row + 2, field.trim()),
            )
        })?;
        scores.push(value);
    }

    Ok(scores)
}

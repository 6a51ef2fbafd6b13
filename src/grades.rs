use serde::Serialize;
use std::collections::HashMap;

use crate::histogram::HistogramSummary;

/// The eight letter grades in descending academic rank. This order is the
/// basis of cutoff reconciliation and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    A,
    AMinus,
    B,
    BMinus,
    C,
    CMinus,
    D,
    E,
}

pub const GRADE_ORDER: [Grade; 8] = [
    Grade::A,
    Grade::AMinus,
    Grade::B,
    Grade::BMinus,
    Grade::C,
    Grade::CMinus,
    Grade::D,
    Grade::E,
];

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::D => "D",
            Grade::E => "E",
        }
    }

    pub fn parse(name: &str) -> Result<Grade, GradeError> {
        match name.trim() {
            "A" => Ok(Grade::A),
            "A-" => Ok(Grade::AMinus),
            "B" => Ok(Grade::B),
            "B-" => Ok(Grade::BMinus),
            "C" => Ok(Grade::C),
            "C-" => Ok(Grade::CMinus),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            other => Err(GradeError::new(
                "invalid_grade",
                format!("unknown grade: {}", other),
            )),
        }
    }

    /// Grade-point value used for the MGPA. Note the jump from D=4 to E=2.
    pub fn weight(self) -> u32 {
        match self {
            Grade::A => 10,
            Grade::AMinus => 9,
            Grade::B => 8,
            Grade::BMinus => 7,
            Grade::C => 6,
            Grade::CMinus => 5,
            Grade::D => 4,
            Grade::E => 2,
        }
    }

    fn default_percent(self) -> u32 {
        match self {
            Grade::A => 80,
            Grade::AMinus => 70,
            Grade::B => 60,
            Grade::BMinus => 50,
            Grade::C => 40,
            Grade::CMinus => 30,
            Grade::D => 20,
            Grade::E => 10,
        }
    }

    fn default_enabled(self) -> bool {
        matches!(self, Grade::A | Grade::B | Grade::C | Grade::D)
    }

    /// Dataset-scaled default cutoff, truncated like the original percentages.
    pub fn default_cutoff(self, max_marks: u32) -> u32 {
        self.default_percent() * max_marks / 100
    }

    fn rank(self) -> usize {
        GRADE_ORDER
            .iter()
            .position(|g| *g == self)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeError {
    pub code: String,
    pub message: String,
}

impl GradeError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GradeEntry {
    pub enabled: bool,
    pub weight: u32,
    pub cutoff: u32,
}

/// Counts for every enabled grade plus the weighted mean grade-point average.
#[derive(Debug, Clone)]
pub struct GradeStats {
    pub counts: HashMap<Grade, u64>,
    pub mgpa: f64,
}

/// The ordered set of grade bands. Entries are created once and live for the
/// whole process; only `enabled` and `cutoff` ever change.
///
/// Invariant: cutoffs are non-strictly descending in rank order. A single
/// `set_cutoff` call may break this transiently and always repairs it before
/// returning.
#[derive(Debug, Clone)]
pub struct GradeLedger {
    entries: [GradeEntry; 8],
}

impl GradeLedger {
    pub fn new(max_marks: u32) -> Self {
        let mut entries = [GradeEntry {
            enabled: false,
            weight: 0,
            cutoff: 0,
        }; 8];
        for (idx, g) in GRADE_ORDER.iter().enumerate() {
            entries[idx] = GradeEntry {
                enabled: g.default_enabled(),
                weight: g.weight(),
                cutoff: g.default_cutoff(max_marks),
            };
        }
        Self { entries }
    }

    pub fn entry(&self, grade: Grade) -> GradeEntry {
        self.entries[grade.rank()]
    }

    /// Move one cutoff and repair the ordering around it. Out-of-range values
    /// are clamped to `[0, max_marks]`, never rejected. Disabled grades take
    /// part in both repair passes so that re-enabling one finds a sane value.
    pub fn set_cutoff(&mut self, grade: Grade, value: i64, max_marks: u32) {
        let clamped = value.clamp(0, max_marks as i64) as u32;
        let rank = grade.rank();
        self.entries[rank].cutoff = clamped;
        self.cascade_down(rank);
        self.cascade_up(rank, max_marks);
    }

    /// Forward pass: walk toward lower-ranked grades. Any grade whose cutoff
    /// sits above the (post-repair) cutoff of the grade ranked just above it
    /// is pushed down to 2 points below, floored at 0.
    fn cascade_down(&mut self, from: usize) {
        let mut higher = self.entries[from].cutoff;
        for idx in from + 1..self.entries.len() {
            let lower = self.entries[idx].cutoff;
            if higher < lower {
                let fixed = higher.saturating_sub(2);
                self.entries[idx].cutoff = fixed;
                higher = fixed;
            } else {
                higher = lower;
            }
        }
    }

    /// Backward pass: walk toward higher-ranked grades, pushing each
    /// inconsistent ancestor to 2 points above, capped at `max_marks`.
    fn cascade_up(&mut self, from: usize, max_marks: u32) {
        let mut lower = self.entries[from].cutoff;
        for idx in (0..from).rev() {
            let higher = self.entries[idx].cutoff;
            if higher < lower {
                let fixed = (lower + 2).min(max_marks);
                self.entries[idx].cutoff = fixed;
                lower = fixed;
            } else {
                lower = higher;
            }
        }
    }

    /// Toggle a grade's participation in statistics. Its cutoff stays frozen
    /// at the last set value; no reconciliation runs.
    pub fn set_enabled(&mut self, grade: Grade, enabled: bool) {
        self.entries[grade.rank()].enabled = enabled;
    }

    /// Re-apply the dataset-scaled default cutoffs after a new dataset load.
    /// Enabled flags are left alone.
    pub fn reset_cutoffs(&mut self, max_marks: u32) {
        for (idx, g) in GRADE_ORDER.iter().enumerate() {
            self.entries[idx].cutoff = g.default_cutoff(max_marks);
        }
    }

    /// Count students per enabled band and compute the MGPA.
    ///
    /// Bands are assigned top-down: the top enabled band is
    /// `[cutoff, max_marks + 1)` and each band's upper limit is the cutoff of
    /// the enabled grade above it. A disabled grade does not advance the
    /// upper limit, so its score range is absorbed by the next enabled grade
    /// below it. That absorption matches the dashboard this replaces and is
    /// intentional.
    pub fn recompute(&self, hist: &HistogramSummary) -> Result<GradeStats, GradeError> {
        if hist.total_students == 0 {
            return Err(GradeError::new(
                "no_students",
                "cannot compute MGPA over zero students",
            ));
        }

        let mut counts: HashMap<Grade, u64> = HashMap::new();
        let mut weighted_sum = 0.0_f64;
        let mut upper = hist.max_marks as usize + 1;

        for (idx, g) in GRADE_ORDER.iter().enumerate() {
            let entry = &self.entries[idx];
            if !entry.enabled {
                continue;
            }

            let lower = entry.cutoff as usize;
            let count: u64 = if lower < upper {
                let end = upper.min(hist.bin_counts.len());
                hist.bin_counts[lower.min(end)..end].iter().sum()
            } else {
                0
            };

            weighted_sum += count as f64 * entry.weight as f64;
            counts.insert(*g, count);
            upper = lower;
        }

        Ok(GradeStats {
            counts,
            mgpa: weighted_sum / hist.total_students as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutoffs(ledger: &GradeLedger) -> Vec<u32> {
        GRADE_ORDER.iter().map(|g| ledger.entry(*g).cutoff).collect()
    }

    fn assert_descending(ledger: &GradeLedger) {
        let c = cutoffs(ledger);
        for pair in c.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "cutoff ordering violated: {:?}",
                c
            );
        }
    }

    fn hist_from_bins(bin_counts: Vec<u64>, max_marks: u32) -> HistogramSummary {
        let total: u64 = bin_counts.iter().sum();
        HistogramSummary {
            bin_counts,
            total_students: total,
            mean_score: 0.0,
            max_marks,
        }
    }

    #[test]
    fn defaults_scale_with_max_marks() {
        let ledger = GradeLedger::new(200);
        assert_eq!(cutoffs(&ledger), vec![160, 140, 120, 100, 80, 60, 40, 20]);
        assert!(ledger.entry(Grade::A).enabled);
        assert!(!ledger.entry(Grade::AMinus).enabled);
        assert!(ledger.entry(Grade::D).enabled);
        assert!(!ledger.entry(Grade::E).enabled);
    }

    #[test]
    fn lowering_a_cascades_down_until_consistent() {
        let mut ledger = GradeLedger::new(100);
        ledger.set_cutoff(Grade::A, 55, 100);

        // Literal application of the forward pass: A- (70) and B (60) get
        // pushed to 53 and 51; B- at 50 is already below 51 and the cascade
        // stops there.
        assert_eq!(cutoffs(&ledger), vec![55, 53, 51, 50, 40, 30, 20, 10]);
        assert_descending(&ledger);
    }

    #[test]
    fn raising_e_cascades_up_capped_at_max() {
        let mut ledger = GradeLedger::new(100);
        ledger.set_cutoff(Grade::E, 95, 100);

        assert_eq!(cutoffs(&ledger), vec![100, 100, 100, 100, 100, 99, 97, 95]);
        assert_descending(&ledger);
    }

    #[test]
    fn set_cutoff_is_idempotent() {
        let mut once = GradeLedger::new(100);
        once.set_cutoff(Grade::B, 72, 100);

        let mut twice = GradeLedger::new(100);
        twice.set_cutoff(Grade::B, 72, 100);
        twice.set_cutoff(Grade::B, 72, 100);

        assert_eq!(cutoffs(&once), cutoffs(&twice));
    }

    #[test]
    fn ordering_holds_under_arbitrary_move_sequences() {
        let mut ledger = GradeLedger::new(100);
        let moves: [(Grade, i64); 9] = [
            (Grade::C, 90),
            (Grade::A, 12),
            (Grade::E, 70),
            (Grade::BMinus, 0),
            (Grade::A, 100),
            (Grade::D, 55),
            (Grade::AMinus, 3),
            (Grade::CMinus, 88),
            (Grade::B, 41),
        ];
        for (grade, value) in moves {
            ledger.set_cutoff(grade, value, 100);
            assert_descending(&ledger);
        }
    }

    #[test]
    fn out_of_range_values_clamp_silently() {
        let mut ledger = GradeLedger::new(100);
        ledger.set_cutoff(Grade::A, 250, 100);
        assert_eq!(ledger.entry(Grade::A).cutoff, 100);

        ledger.set_cutoff(Grade::E, -40, 100);
        assert_eq!(ledger.entry(Grade::E).cutoff, 0);
        assert_descending(&ledger);
    }

    #[test]
    fn set_enabled_freezes_cutoff_without_reconciliation() {
        let mut ledger = GradeLedger::new(100);
        let before = cutoffs(&ledger);
        ledger.set_enabled(Grade::AMinus, true);
        ledger.set_enabled(Grade::B, false);
        assert_eq!(cutoffs(&ledger), before);
    }

    #[test]
    fn counts_conserve_students_when_bottom_band_reaches_zero() {
        let mut ledger = GradeLedger::new(100);
        for g in GRADE_ORDER {
            ledger.set_enabled(g, true);
        }
        ledger.set_cutoff(Grade::E, 0, 100);

        // 3 students at every score 0..=100.
        let hist = hist_from_bins(vec![3; 101], 100);
        let stats = ledger.recompute(&hist).expect("recompute");

        let total: u64 = stats.counts.values().sum();
        assert_eq!(total, hist.total_students);
        assert_eq!(stats.counts.len(), 8);
    }

    #[test]
    fn disabled_grade_band_is_absorbed_by_next_enabled_grade() {
        let mut ledger = GradeLedger::new(100);
        ledger.set_cutoff(Grade::A, 80, 100);
        ledger.set_cutoff(Grade::B, 60, 100);
        ledger.set_enabled(Grade::AMinus, false);
        ledger.set_enabled(Grade::C, false);
        ledger.set_enabled(Grade::D, false);

        // 20 students spread across [80, 100], 30 across [60, 79].
        let mut bins = vec![0_u64; 101];
        for s in 80..100 {
            bins[s] += 1;
        }
        for s in 60..75 {
            bins[s] += 2;
        }
        let hist = hist_from_bins(bins, 100);

        let stats = ledger.recompute(&hist).expect("recompute");
        assert_eq!(stats.counts.get(&Grade::A), Some(&20));
        // A- is disabled, so B's band is [60, 80), not [60, 70).
        assert_eq!(stats.counts.get(&Grade::B), Some(&30));
        assert_eq!(stats.counts.len(), 2);

        let expected_mgpa = (20.0 * 10.0 + 30.0 * 8.0) / 50.0;
        assert!((stats.mgpa - expected_mgpa).abs() < 1e-9);
    }

    #[test]
    fn zero_students_is_an_explicit_error() {
        let ledger = GradeLedger::new(100);
        let hist = hist_from_bins(vec![0; 101], 100);
        let e = ledger.recompute(&hist).expect_err("must fail");
        assert_eq!(e.code, "no_students");
    }

    #[test]
    fn unknown_grade_name_is_rejected() {
        let e = Grade::parse("F").expect_err("must fail");
        assert_eq!(e.code, "invalid_grade");
        assert_eq!(Grade::parse(" B- ").expect("parse"), Grade::BMinus);
    }
}

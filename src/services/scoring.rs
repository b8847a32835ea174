/// Points taken for a tanbeeh, a warning that is always cheap regardless of history.
pub(crate) const TANBEEH_DEDUCTION: f64 = 0.5;

/// Ceiling for a single non-tanbeeh mistake.
pub(crate) const MAX_DEDUCTION: f64 = 5.0;

pub(crate) const MAX_SCORE: f64 = 100.0;

/// Points deducted for one mistake given how often the student had already made it.
///
/// A first-time mistake costs one point and every earlier occurrence adds another,
/// capped at [`MAX_DEDUCTION`]. The result depends only on the stored
/// `previous_error_count`, so a recorded deduction can always be recomputed.
pub(crate) fn deduction(previous_error_count: i32, is_tanbeeh: bool) -> f64 {
    if is_tanbeeh {
        return TANBEEH_DEDUCTION;
    }

    (1.0 + f64::from(previous_error_count.max(0))).min(MAX_DEDUCTION)
}

/// Score out of [`MAX_SCORE`] after subtracting the deductions of completed questions.
pub(crate) fn final_score(completed_deductions: &[f64]) -> f64 {
    let total: f64 = completed_deductions.iter().sum();
    (MAX_SCORE - total).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tanbeeh_is_flat_half_point() {
        for previous in [0, 1, 4, 40] {
            assert_eq!(deduction(previous, true), 0.5);
        }
    }

    #[test]
    fn repeated_mistakes_cost_more_up_to_the_cap() {
        assert_eq!(deduction(0, false), 1.0);
        assert_eq!(deduction(1, false), 2.0);
        assert_eq!(deduction(3, false), 4.0);
        assert_eq!(deduction(4, false), 5.0);
        assert_eq!(deduction(12, false), 5.0);
    }

    #[test]
    fn deduction_never_decreases_with_history() {
        let mut last = deduction(0, false);
        for previous in 1..20 {
            let current = deduction(previous, false);
            assert!(current >= last, "deduction dropped at {previous}");
            last = current;
        }
    }

    #[test]
    fn final_score_is_clamped_at_zero() {
        assert_eq!(final_score(&[]), 100.0);
        assert_eq!(final_score(&[1.0, 2.5]), 96.5);
        assert_eq!(final_score(&[5.0; 30]), 0.0);
    }
}

//! Utility functions for the crate.

/// Return the median of the given values, reordering them in the process.
///
/// For an even number of values this is the upper of the two middle values,
/// so the result is always one of the inputs. The selection runs in expected
/// linear time.
///
/// This will return `None` if the given slice is empty.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        let mid = values.len() / 2;
        let (_, &mut m, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
        Some(m)
    }
}

/// Whether the value is finite and non-negative.
pub(crate) fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    #[test_case(&[5.0], 5.0 ; "single")]
    #[test_case(&[3.0, 1.0, 2.0], 2.0 ; "odd")]
    #[test_case(&[4.0, 1.0, 3.0, 2.0], 3.0 ; "even takes upper")]
    #[test_case(&[1.0, 1.0, 1.0, 9.0], 1.0 ; "repeated")]
    fn median(values: &[f64], expected: f64) {
        let mut values = values.to_vec();
        assert_eq!(super::median(&mut values), Some(expected));
    }
}

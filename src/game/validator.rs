use super::pattern::Signal;

/// Verdict for one inbound button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Matches the next expected element.
    Accepted,
    /// Does not match the next expected element.
    Mismatch,
    /// Nothing left to match (stale press after the round filled up).
    OutOfRange,
}

/// Check `event` against the element at position `so_far.len()`.
pub fn validate(pattern: &[Signal], so_far: &[Signal], event: Signal) -> Validation {
    match pattern.get(so_far.len()) {
        None => Validation::OutOfRange,
        Some(expected) if *expected == event => Validation::Accepted,
        Some(_) => Validation::Mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(v: i64) -> Signal {
        Signal::new(v).unwrap()
    }

    #[test]
    fn accepts_expected_element() {
        let pattern = [sig(1), sig(3)];
        assert_eq!(validate(&pattern, &[], sig(1)), Validation::Accepted);
        assert_eq!(validate(&pattern, &[sig(1)], sig(3)), Validation::Accepted);
    }

    #[test]
    fn flags_mismatch() {
        let pattern = [sig(1), sig(3)];
        assert_eq!(validate(&pattern, &[sig(1)], sig(2)), Validation::Mismatch);
    }

    #[test]
    fn full_input_is_out_of_range() {
        let pattern = [sig(1), sig(3)];
        assert_eq!(
            validate(&pattern, &[sig(1), sig(3)], sig(1)),
            Validation::OutOfRange
        );
    }

    #[test]
    fn empty_pattern_is_out_of_range() {
        assert_eq!(validate(&[], &[], sig(2)), Validation::OutOfRange);
    }
}

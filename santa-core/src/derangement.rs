use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::random::RandomSource;

/// Giver name to receiver name.
pub type Assignments = BTreeMap<String, String>;

/// Smallest roster that admits a meaningful derangement.
pub const MIN_PARTICIPANTS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("need at least 3 participants, got {count}")]
    TooFewNames { count: usize },
    #[error("duplicate participant name: {0}")]
    DuplicateName(String),
    #[error("derangement failed: {0} was assigned to themselves")]
    SelfAssigned(String),
}

impl AssignmentError {
    /// Only a self-assignment is worth another draw; bad input stays bad.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssignmentError::SelfAssigned(_))
    }
}

/// Assign every name a different name, forming one single cycle.
///
/// `names` must already be trimmed and deduplicated. The receivers come from
/// a Sattolo shuffle, so no name can be drawn for itself; the result is
/// still checked once before it is returned.
pub fn generate<R>(names: &[String], rng: &mut R) -> Result<Assignments, AssignmentError>
where
    R: RandomSource + ?Sized,
{
    if names.len() < MIN_PARTICIPANTS {
        return Err(AssignmentError::TooFewNames { count: names.len() });
    }

    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(AssignmentError::DuplicateName(name.clone()));
        }
    }

    let receivers = sattolo_shuffle(names, rng);
    let assignments: Assignments = names.iter().cloned().zip(receivers).collect();

    if let Some(giver) = first_fixed_point(&assignments) {
        return Err(AssignmentError::SelfAssigned(giver.clone()));
    }

    Ok(assignments)
}

fn sattolo_shuffle<T, R>(items: &[T], rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: RandomSource + ?Sized,
{
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = draw_below(rng.next_unit(), i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// Map a unit draw onto `0..bound`, never `bound` itself.
fn draw_below(unit: f64, bound: usize) -> usize {
    let j = (unit * bound as f64).floor() as usize;
    j.min(bound - 1)
}

fn first_fixed_point(assignments: &Assignments) -> Option<&String> {
    assignments
        .iter()
        .find(|(giver, receiver)| giver == receiver)
        .map(|(giver, _)| giver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ReplaySource;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn mapping(pairs: &[(&str, &str)]) -> Assignments {
        pairs
            .iter()
            .map(|(g, r)| (g.to_string(), r.to_string()))
            .collect()
    }

    fn assert_single_cycle(roster: &[String], result: &Assignments) {
        let mut current = &roster[0];
        for _ in 0..roster.len() {
            current = &result[current];
        }
        assert_eq!(current, &roster[0]);

        let mut current = &roster[0];
        for step in 1..roster.len() {
            current = &result[current];
            assert_ne!(current, &roster[0], "cycle closed early at step {step}");
        }
    }

    #[test]
    fn low_draws_rotate_forward() {
        let roster = names(&["Alice", "Bob", "Carol"]);
        let result = generate(&roster, &mut ReplaySource::new(vec![0.0])).unwrap();
        assert_eq!(
            result,
            mapping(&[("Alice", "Bob"), ("Bob", "Carol"), ("Carol", "Alice")])
        );
    }

    #[test]
    fn high_draws_rotate_backward() {
        let roster = names(&["Alice", "Bob", "Carol"]);
        let result = generate(&roster, &mut ReplaySource::new(vec![0.99])).unwrap();
        assert_eq!(
            result,
            mapping(&[("Alice", "Carol"), ("Bob", "Alice"), ("Carol", "Bob")])
        );
    }

    #[test]
    fn three_names_only_ever_produce_the_two_cycles() {
        let roster = names(&["Alice", "Bob", "Carol"]);
        let forward = mapping(&[("Alice", "Bob"), ("Bob", "Carol"), ("Carol", "Alice")]);
        let backward = mapping(&[("Alice", "Carol"), ("Bob", "Alice"), ("Carol", "Bob")]);

        let (mut saw_forward, mut saw_backward) = (0, 0);
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = generate(&roster, &mut rng).unwrap();
            if result == forward {
                saw_forward += 1;
            } else if result == backward {
                saw_backward += 1;
            } else {
                panic!("unexpected mapping {result:?}");
            }
        }
        assert!(saw_forward > 0 && saw_backward > 0);
        assert_eq!(saw_forward + saw_backward, 200);
    }

    #[test]
    fn same_draws_same_mapping() {
        let roster = names(&["a", "b", "c", "d", "e", "f", "g"]);
        let draws = vec![0.42, 0.07, 0.93, 0.5, 0.31, 0.88];
        let first = generate(&roster, &mut ReplaySource::new(draws.clone())).unwrap();
        let second = generate(&roster, &mut ReplaySource::new(draws)).unwrap();
        assert_eq!(first, second);

        let first = generate(&roster, &mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        let second = generate(&roster, &mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn consumes_one_draw_per_swap() {
        let roster = names(&["a", "b", "c", "d", "e"]);
        let mut source = ReplaySource::new(vec![0.3]);
        generate(&roster, &mut source).unwrap();
        assert_eq!(source.consumed(), roster.len() - 1);
    }

    #[test]
    fn misbehaving_draws_are_clamped() {
        let roster = names(&["a", "b", "c", "d"]);
        let mut source = ReplaySource::new(vec![1.0, -3.0, f64::NAN, 7.5]);
        let result = generate(&roster, &mut source).unwrap();
        assert!(roster.iter().all(|n| &result[n] != n));
        assert_single_cycle(&roster, &result);
    }

    #[test]
    fn rejects_short_rosters() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cases: [&[&str]; 3] = [&[], &["solo"], &["one", "two"]];
        for list in cases {
            let err = generate(&names(list), &mut rng).unwrap_err();
            assert_eq!(err, AssignmentError::TooFewNames { count: list.len() });
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn rejects_duplicates_case_sensitively() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = generate(&names(&["Ann", "Bob", "Ann"]), &mut rng).unwrap_err();
        assert_eq!(err, AssignmentError::DuplicateName("Ann".into()));

        // Names that differ only by case are distinct keys here.
        assert!(generate(&names(&["ann", "Ann", "ANN"]), &mut rng).is_ok());
    }

    #[test]
    fn fixed_point_is_detected() {
        let broken = mapping(&[("a", "b"), ("b", "b"), ("c", "a")]);
        assert_eq!(first_fixed_point(&broken).map(String::as_str), Some("b"));
        assert!(AssignmentError::SelfAssigned("b".into()).is_retryable());

        let fine = mapping(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(first_fixed_point(&fine), None);
    }

    proptest! {
        #[test]
        fn every_roster_gets_a_cyclic_derangement(
            roster in prop::collection::hash_set("[A-Za-z][a-z]{0,7}", 3..40),
            seed in any::<u64>(),
        ) {
            let roster: Vec<String> = roster.into_iter().collect();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = generate(&roster, &mut rng).unwrap();

            prop_assert_eq!(result.len(), roster.len());
            for name in &roster {
                prop_assert_ne!(&result[name], name);
            }

            let mut receivers: Vec<&String> = result.values().collect();
            receivers.sort();
            let mut expected: Vec<&String> = roster.iter().collect();
            expected.sort();
            prop_assert_eq!(receivers, expected);

            assert_single_cycle(&roster, &result);
        }
    }
}

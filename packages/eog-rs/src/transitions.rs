//! Step-transition structure of a stimulus channel.

use serde::{Deserialize, Serialize};

/// Direction of a stimulus step or an eye movement.
///
/// The same mapping serves both channels: an increasing value is `Left`,
/// a decreasing value is `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Same,
}

impl Direction {
    /// Direction of a move from `from` to `to`.
    pub fn between(from: f64, to: f64) -> Self {
        if to > from {
            Direction::Left
        } else if to < from {
            Direction::Right
        } else {
            Direction::Same
        }
    }
}

/// One stimulus step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// 1-based ordinal of the step within the channel.
    pub index: usize,
    /// First sample carrying the new stimulus value.
    pub position: usize,
    pub direction: Direction,
}

/// Governing transition of a sample position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionLookup {
    pub index: usize,
    /// The change sample.
    pub position: usize,
    /// The change-before sample, `position - 1`.
    pub previous_position: usize,
    pub direction: Direction,
}

impl TransitionLookup {
    /// Returned when no transition governs a position.
    pub const NONE: TransitionLookup = TransitionLookup {
        index: 0,
        position: 0,
        previous_position: 0,
        direction: Direction::Same,
    };

    pub fn is_none(&self) -> bool {
        self.index == 0
    }
}

/// Precomputed transitions of a stimulus channel, in sample order.
#[derive(Debug, Clone, Default)]
pub struct StimulusTransitions {
    transitions: Vec<Transition>,
}

impl StimulusTransitions {
    /// Scan `stimulus` once and record every sample whose value differs
    /// from its predecessor.
    pub fn new(stimulus: &[f64]) -> Self {
        let transitions = stimulus
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1] != pair[0])
            .enumerate()
            .map(|(ordinal, (i, pair))| Transition {
                index: ordinal + 1,
                position: i + 1,
                direction: Direction::between(pair[0], pair[1]),
            })
            .collect();

        Self { transitions }
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// Latest transition at or before `position`.
    ///
    /// Positions before the first transition, and every position of a
    /// transition-less stimulus, yield [`TransitionLookup::NONE`].
    pub fn lookup(&self, position: usize) -> TransitionLookup {
        let after = self.transitions.partition_point(|t| t.position <= position);
        match after.checked_sub(1).map(|i| &self.transitions[i]) {
            Some(t) => TransitionLookup {
                index: t.index,
                position: t.position,
                previous_position: t.position - 1,
                direction: t.direction,
            },
            None => TransitionLookup::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<f64> {
        let mut stimulus = vec![0.0; 10];
        stimulus.extend(vec![1.0; 10]);
        stimulus.extend(vec![-1.0; 10]);
        stimulus
    }

    #[test]
    fn test_transitions_found_with_direction() {
        let transitions = StimulusTransitions::new(&square());
        let found: Vec<_> = transitions.iter().copied().collect();
        assert_eq!(
            found,
            vec![
                Transition {
                    index: 1,
                    position: 10,
                    direction: Direction::Left
                },
                Transition {
                    index: 2,
                    position: 20,
                    direction: Direction::Right
                },
            ]
        );
    }

    #[test]
    fn test_lookup_returns_latest_transition() {
        let transitions = StimulusTransitions::new(&square());

        let at_change = transitions.lookup(10);
        assert_eq!(at_change.index, 1);
        assert_eq!(at_change.position, 10);
        assert_eq!(at_change.previous_position, 9);
        assert_eq!(at_change.direction, Direction::Left);

        assert_eq!(transitions.lookup(19).index, 1);
        assert_eq!(transitions.lookup(20).index, 2);
        assert_eq!(transitions.lookup(1000).index, 2);
    }

    #[test]
    fn test_lookup_before_first_transition_is_sentinel() {
        let transitions = StimulusTransitions::new(&square());
        assert_eq!(transitions.lookup(0), TransitionLookup::NONE);
        assert_eq!(transitions.lookup(9), TransitionLookup::NONE);
    }

    #[test]
    fn test_flat_stimulus_has_no_transitions() {
        let transitions = StimulusTransitions::new(&[0.5; 100]);
        assert!(transitions.is_empty());
        assert!(transitions.lookup(50).is_none());
        assert!(StimulusTransitions::new(&[]).lookup(0).is_none());
    }

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between(0.0, 2.0), Direction::Left);
        assert_eq!(Direction::between(2.0, 0.0), Direction::Right);
        assert_eq!(Direction::between(1.0, 1.0), Direction::Same);
    }
}

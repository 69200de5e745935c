//! Saccade / antisaccade labelling and the correction-pairing filter.

use crate::impulses::{Impulse, Size};
use crate::models::{Annotation, AnnotationKind};
use crate::transitions::StimulusTransitions;

/// Labels one impulse against the transition governing its onset.
///
/// A movement in the direction of the stimulus step is a `Saccade`;
/// anything else is an `AntiSaccade`. An impulse with no governing
/// transition is labelled against the sentinel lookup and comes out as an
/// `AntiSaccade` with `transition_index` 0; [`classify_all`] drops those.
pub fn classify(impulse: &Impulse, transitions: &StimulusTransitions, angle: f64) -> Annotation {
    let transition = transitions.lookup(impulse.onset);
    let kind = if impulse.direction == transition.direction {
        AnnotationKind::Saccade
    } else {
        AnnotationKind::AntiSaccade
    };
    Annotation::new(kind, impulse, &transition, angle)
}

/// Labels every impulse made after the first stimulus change, ordered by
/// increasing onset. Earlier impulses answer no stimulus and are dropped.
pub fn classify_all(impulses: &[Impulse], transitions: &StimulusTransitions, angle: f64) -> Vec<Annotation> {
    let mut annotations: Vec<Annotation> = impulses
        .iter()
        .filter(|impulse| !transitions.lookup(impulse.onset).is_none())
        .map(|impulse| classify(impulse, transitions, angle))
        .collect();
    annotations.sort_by_key(|a| (a.onset, a.offset));
    annotations
}

/// Keeps the events an antisaccadic task scores.
///
/// Large antisaccades are always kept. A small saccade is kept only when
/// the very next event (in onset order) is a large antisaccade on the same
/// transition, i.e. an erroneous glance followed by its correction. Every
/// other event is dropped.
///
/// `annotations` must be sorted by onset.
pub fn correction_pairing(annotations: &[Annotation]) -> Vec<Annotation> {
    let is_correct = |a: &Annotation| a.is_antisaccade() && a.size == Size::Large;

    annotations
        .iter()
        .enumerate()
        .filter(|(idx, annotation)| {
            if is_correct(annotation) {
                return true;
            }
            if !(annotation.is_saccade() && annotation.size == Size::Small) {
                return false;
            }
            annotations.get(idx + 1).is_some_and(|next| {
                next.transition_index == annotation.transition_index && is_correct(next)
            })
        })
        .map(|(_, annotation)| annotation.clone())
        .collect()
}

/// Keeps the large saccades a saccadic task scores.
pub fn large_saccades(annotations: &[Annotation]) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|a| a.is_saccade() && a.size == Size::Large)
        .cloned()
        .collect()
}

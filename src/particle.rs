//! Content-model particles and the matching algorithm that checks a
//! sequence of child element names against a compiled content model.
//!
//! A particle tree is built once per element declaration (by the DTD/XSD
//! back-ends) and reused for every instance of that element in the
//! document. Matching walks the particle tree alongside the list of
//! actual child element names, consuming names as it goes.

use crate::errors::{Error, Result};

/// Occurrence bound for a particle. `Unbounded` is a named sentinel
/// rather than a magic `-1`, matching `maxOccurs="unbounded"` directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occurs {
    Bounded(u32),
    Unbounded,
}

impl Occurs {
    fn allows(self, count: u32) -> bool {
        match self {
            Occurs::Bounded(max) => count <= max,
            Occurs::Unbounded => true,
        }
    }
}

/// A node in a compiled content model. Defaults to `Empty`, the neutral
/// element for a type with no declared content model yet.
#[derive(Clone, Debug, Default)]
pub enum Particle {
    /// Matches exactly one child element with this name (already resolved
    /// to its substitution-group head, if any — substitution-group
    /// members are expanded into a `Choice` by the grammar back-end before
    /// the particle is stored here).
    ElementRef { name: Vec<u8>, min: u32, max: Occurs },
    /// All children must match, in order.
    Sequence { children: Vec<Particle>, min: u32, max: Occurs },
    /// Exactly one child alternative must match.
    Choice { alternatives: Vec<Particle>, min: u32, max: Occurs },
    /// Every child must match, in any order, each at most once (XSD `all`).
    All { children: Vec<Particle>, min: u32, max: Occurs },
    /// Matches any single element regardless of name (XSD wildcard / DTD
    /// `ANY`).
    Any { min: u32, max: Occurs },
    /// `#PCDATA`-only or empty content; never matches an element child.
    #[default]
    Empty,
    /// Mixed content: character data interspersed with any of the named
    /// elements, each occurring any number of times, in any order.
    Mixed { allowed: Vec<Vec<u8>> },
}

impl Particle {
    /// Validates that `children` (element names in document order) is a
    /// legal instance of this content model. `resolve_substitutes` maps an
    /// element name to the set of names that may appear in its place
    /// (itself plus any members of its substitution group); pass a
    /// closure returning a single-element slice when substitution groups
    /// are not in play.
    pub fn validate(&self, children: &[Vec<u8>]) -> Result<()> {
        match self {
            Particle::Mixed { allowed } => {
                for child in children {
                    if !allowed.iter().any(|n| n == child) {
                        return Err(Error::ContentModelViolation(format!(
                            "element {:?} not allowed in mixed content",
                            String::from_utf8_lossy(child)
                        )));
                    }
                }
                Ok(())
            }
            Particle::Empty => {
                if children.is_empty() {
                    Ok(())
                } else {
                    Err(Error::ContentModelViolation("element declared EMPTY has children".to_string()))
                }
            }
            _ => {
                if self.reachable_lengths(children).contains(&children.len()) {
                    Ok(())
                } else {
                    Err(Error::ContentModelViolation(format!(
                        "child sequence does not satisfy the declared content model: {:?}",
                        children.iter().map(|c| String::from_utf8_lossy(c)).collect::<Vec<_>>()
                    )))
                }
            }
        }
    }

    /// Returns every prefix length of `children` reachable by matching
    /// this particle, honoring its own `min`/`max` occurrence bounds. This
    /// is the full set of splits a sound matcher can choose among, not
    /// just the greedy longest one: a component later in a `Sequence` (or
    /// a sibling alternative inside a `Choice`) may need a *shorter* match
    /// here to leave room for what follows, so every caller composes over
    /// the whole set rather than picking one length up front (the
    /// "increasing prefix lengths" search spec.md §9 calls for).
    fn reachable_lengths(&self, children: &[Vec<u8>]) -> Vec<usize> {
        let (min, max) = self.occurs();
        let mut current = vec![0usize];
        let mut count = 0u32;
        let mut reached_at_or_past_min: Vec<usize> = if min == 0 { vec![0] } else { Vec::new() };

        loop {
            if !max.allows(count + 1) {
                break;
            }
            let mut next: Vec<usize> = Vec::new();
            for &pos in &current {
                for add in self.one_shot_lengths(&children[pos..]) {
                    if add == 0 {
                        // A repeat that consumes nothing never makes progress;
                        // repeating it further cannot reach anything new.
                        continue;
                    }
                    let np = pos + add;
                    if !next.contains(&np) {
                        next.push(np);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            count += 1;
            current = next;
            if count >= min {
                for &p in &current {
                    if !reached_at_or_past_min.contains(&p) {
                        reached_at_or_past_min.push(p);
                    }
                }
            }
        }

        reached_at_or_past_min.sort_unstable();
        reached_at_or_past_min
    }

    /// The reachable prefix lengths for exactly *one* occurrence of this
    /// particle's own content (its `min`/`max` are applied by the caller,
    /// [`Particle::reachable_lengths`], not here).
    fn one_shot_lengths(&self, children: &[Vec<u8>]) -> Vec<usize> {
        match self {
            Particle::ElementRef { name, .. } => {
                if children.first().map(|c| c == name).unwrap_or(false) {
                    vec![1]
                } else {
                    Vec::new()
                }
            }
            Particle::Any { .. } => {
                if children.is_empty() {
                    Vec::new()
                } else {
                    vec![1]
                }
            }
            Particle::Sequence { children: seq, .. } => {
                let mut positions = vec![0usize];
                for p in seq {
                    let mut next = Vec::new();
                    for &pos in &positions {
                        for len in p.reachable_lengths(&children[pos..]) {
                            let np = pos + len;
                            if !next.contains(&np) {
                                next.push(np);
                            }
                        }
                    }
                    positions = next;
                    if positions.is_empty() {
                        break;
                    }
                }
                positions
            }
            Particle::Choice { alternatives, .. } => {
                let mut out = Vec::new();
                for alt in alternatives {
                    for len in alt.reachable_lengths(children) {
                        if !out.contains(&len) {
                            out.push(len);
                        }
                    }
                }
                out
            }
            Particle::All { children: members, .. } => {
                let refs: Vec<&Particle> = members.iter().collect();
                all_group_lengths(&refs, children)
            }
            Particle::Empty | Particle::Mixed { .. } => Vec::new(),
        }
    }

    fn occurs(&self) -> (u32, Occurs) {
        match self {
            Particle::ElementRef { min, max, .. }
            | Particle::Sequence { min, max, .. }
            | Particle::Choice { min, max, .. }
            | Particle::All { min, max, .. }
            | Particle::Any { min, max, .. } => (*min, *max),
            Particle::Empty | Particle::Mixed { .. } => (1, Occurs::Bounded(1)),
        }
    }
}

/// Reachable prefix lengths for an unordered `all`-group: every particle
/// in `remaining` must be matched exactly once, in any order. Explores
/// every ordering via recursion (branching on which remaining particle
/// consumes next), which is exponential in group size but `all` groups
/// are small in practice and this keeps the search sound rather than
/// greedy-and-wrong.
fn all_group_lengths(remaining: &[&Particle], children: &[Vec<u8>]) -> Vec<usize> {
    if remaining.is_empty() {
        return vec![0];
    }
    let mut out = Vec::new();
    for (i, p) in remaining.iter().enumerate() {
        for len in p.reachable_lengths(children) {
            if len == 0 {
                continue;
            }
            let mut rest: Vec<&Particle> = remaining.to_vec();
            rest.remove(i);
            for tail in all_group_lengths(&rest, &children[len..]) {
                let total = len + tail;
                if !out.contains(&total) {
                    out.push(total);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    fn el(name: &str, min: u32, max: Occurs) -> Particle {
        Particle::ElementRef { name: name.as_bytes().to_vec(), min, max }
    }

    #[test]
    fn sequence_matches_exact_order() {
        let model = Particle::Sequence {
            children: vec![
                el("a", 1, Occurs::Bounded(1)),
                el("b", 1, Occurs::Bounded(1)),
            ],
            min: 1,
            max: Occurs::Bounded(1),
        };
        assert!(model.validate(&names(&["a", "b"])).is_ok());
        assert!(model.validate(&names(&["b", "a"])).is_err());
    }

    #[test]
    fn choice_accepts_any_single_alternative() {
        let model = Particle::Choice {
            alternatives: vec![el("a", 1, Occurs::Bounded(1)), el("b", 1, Occurs::Bounded(1))],
            min: 1,
            max: Occurs::Bounded(1),
        };
        assert!(model.validate(&names(&["a"])).is_ok());
        assert!(model.validate(&names(&["b"])).is_ok());
        assert!(model.validate(&names(&["c"])).is_err());
    }

    #[test]
    fn unbounded_repetition_accepts_many_and_zero() {
        let model = el("item", 0, Occurs::Unbounded);
        assert!(model.validate(&names(&[])).is_ok());
        assert!(model.validate(&names(&["item", "item", "item"])).is_ok());
    }

    #[test]
    fn all_group_accepts_any_permutation_exactly_once_each() {
        let model = Particle::All {
            children: vec![el("a", 1, Occurs::Bounded(1)), el("b", 1, Occurs::Bounded(1))],
            min: 1,
            max: Occurs::Bounded(1),
        };
        assert!(model.validate(&names(&["b", "a"])).is_ok());
        assert!(model.validate(&names(&["a", "a"])).is_err());
    }

    #[test]
    fn empty_content_rejects_any_children() {
        assert!(Particle::Empty.validate(&names(&[])).is_ok());
        assert!(Particle::Empty.validate(&names(&["a"])).is_err());
    }

    #[test]
    fn mixed_content_allows_any_order_of_declared_elements() {
        let model = Particle::Mixed { allowed: vec![b"a".to_vec(), b"b".to_vec()] };
        assert!(model.validate(&names(&["b", "a", "a"])).is_ok());
        assert!(model.validate(&names(&["c"])).is_err());
    }

    #[test]
    fn choice_inside_sequence_backtracks_across_repeats() {
        // (a | b)+, c
        let model = Particle::Sequence {
            children: vec![
                Particle::Choice {
                    alternatives: vec![el("a", 1, Occurs::Bounded(1)), el("b", 1, Occurs::Bounded(1))],
                    min: 1,
                    max: Occurs::Unbounded,
                },
                el("c", 1, Occurs::Bounded(1)),
            ],
            min: 1,
            max: Occurs::Bounded(1),
        };
        assert!(model.validate(&names(&["a", "b", "a", "c"])).is_ok());
        assert!(model.validate(&names(&["a", "b", "a"])).is_err());
    }

    #[test]
    fn sequence_gives_back_a_name_the_repeatable_group_greedily_took() {
        // (a | b)+, b — on [a, b] the repeatable choice must stop after
        // consuming just "a" so the trailing "b" is left for the final
        // element particle, instead of greedily swallowing both.
        let model = Particle::Sequence {
            children: vec![
                Particle::Choice {
                    alternatives: vec![el("a", 1, Occurs::Bounded(1)), el("b", 1, Occurs::Bounded(1))],
                    min: 1,
                    max: Occurs::Unbounded,
                },
                el("b", 1, Occurs::Bounded(1)),
            ],
            min: 1,
            max: Occurs::Bounded(1),
        };
        assert!(model.validate(&names(&["a", "b"])).is_ok());
        assert!(model.validate(&names(&["a"])).is_err());
    }
}

//! The grammar contract and the path algebra built on top of it.
//!
//! A grammar plugs into the engine as two traits: [`Syntagm`] (the atomic
//! elements of sentences) and [`Sentence`] (trees of syntagms that decompose
//! into root-to-leaf [`Path`]s and can be rebuilt from them). The engine never
//! looks inside a syntagm beyond hashing, equality, ordering, display, and
//! [`Syntagm::is_variable`].
//!
//! The rest of this module is the path algebra: substitution under an
//! [`Assignment`], one-sided unification of a pattern path against a ground
//! path, and whole-sentence matching with cross-path consistency.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::GrammarError;

/// An atomic element of a sentence. Supplied by the grammar plug-in.
///
/// `Ord` is required so the engine can impose a canonical, grammar-independent
/// order on paths; two syntagms with the same display must be equal and hash
/// equal.
pub trait Syntagm: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display {
    /// Whether this syntagm is a universally quantified variable.
    fn is_variable(&self) -> bool;
}

/// A sentence: a tree of syntagms that decomposes into a set of paths.
///
/// Contracts the engine relies on:
///
/// - `from_paths(s.paths())` reconstructs `s` exactly (round-trip).
/// - `paths()` enumerates in depth-first tree order, without duplicates.
/// - Within one sentence, the non-terminal prefix of a path uniquely
///   identifies the leaf position (grammars encode argument positions in
///   inner syntagms, cf. the role markers of [`crate::triples`]), and
///   non-terminal segments are always ground.
pub trait Sentence: Clone + Eq + Hash + fmt::Debug + fmt::Display + Sized {
    /// The syntagm type this sentence is built from.
    type Syntagm: Syntagm;

    /// Decompose into root-to-leaf paths, in depth-first tree order.
    fn paths(&self) -> Vec<Path<Self::Syntagm>>;

    /// Rebuild a sentence from a path set.
    fn from_paths(paths: &[Path<Self::Syntagm>]) -> Result<Self, GrammarError>;

    /// Whether the sentence contains no variables.
    fn is_ground(&self) -> bool {
        self.paths().iter().all(|p| !p.is_variable())
    }

    /// The set of variables occurring in the sentence.
    fn variables(&self) -> BTreeSet<Self::Syntagm> {
        self.paths()
            .into_iter()
            .filter(Path::is_variable)
            .map(|p| p.value().clone())
            .collect()
    }

    /// Apply an assignment path-wise and rebuild.
    fn substitute(&self, assignment: &Assignment<Self::Syntagm>) -> Result<Self, GrammarError> {
        let paths: Vec<_> = self
            .paths()
            .iter()
            .map(|p| p.substitute(assignment))
            .collect();
        Self::from_paths(&paths)
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// A root-to-leaf tuple of syntagms within a sentence's tree.
///
/// Segments are shared (`Arc<[S]>`) so that clones are pointer copies: paths
/// are the unit of branching in the discrimination trees and get copied into
/// every node choice. A path is *variable* iff its final syntagm is a
/// variable; variables never appear in non-terminal positions, enforced at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path<S: Syntagm> {
    segments: Arc<[S]>,
}

impl<S: Syntagm> Path<S> {
    /// Build a path from its segments.
    ///
    /// Rejects empty paths and variables in non-terminal positions.
    pub fn new(segments: Vec<S>) -> Result<Self, GrammarError> {
        let Some((_, prefix)) = segments.split_last() else {
            return Err(GrammarError::EmptyPath);
        };
        if let Some(var) = prefix.iter().find(|s| s.is_variable()) {
            return Err(GrammarError::InteriorVariable {
                segment: var.to_string(),
            });
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    /// All segments, root first.
    pub fn segments(&self) -> &[S] {
        &self.segments
    }

    /// The leaf syntagm.
    pub fn value(&self) -> &S {
        self.segments.last().expect("paths are never empty")
    }

    /// The non-terminal segments (everything but the leaf).
    pub fn prefix(&self) -> &[S] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: paths are non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the leaf syntagm is a variable.
    pub fn is_variable(&self) -> bool {
        self.value().is_variable()
    }

    /// A copy of this path with the leaf replaced.
    pub fn with_value(&self, value: S) -> Path<S> {
        let mut segments: Vec<S> = self.segments.to_vec();
        *segments.last_mut().expect("paths are never empty") = value;
        Path {
            segments: segments.into(),
        }
    }

    /// Replace the leaf by its image under `assignment`, if bound.
    ///
    /// Non-terminal segments are ground by construction, so only the leaf can
    /// change; unbound leaves pass through untouched.
    pub fn substitute(&self, assignment: &Assignment<S>) -> Path<S> {
        match assignment.get(self.value()) {
            Some(image) => self.with_value(image.clone()),
            None => self.clone(),
        }
    }
}

impl<S: Syntagm> fmt::Display for Path<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// The canonical path order: segment-wise by `Ord`, except that a variable
/// segment orders after any ground segment at the same position, and a prefix
/// orders before its extensions.
///
/// Ground prefixes therefore discriminate first when tree insertions and
/// queries walk paths in sorted order; the variable zone comes last. All tree
/// code sorts with this order, and it is the `Ord` of `Path`.
impl<S: Syntagm> Ord for Path<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut pairs = self.segments.iter().zip(other.segments.iter());
        loop {
            match pairs.next() {
                None => return self.segments.len().cmp(&other.segments.len()),
                Some((a, b)) => {
                    match (a.is_variable(), b.is_variable()) {
                        (true, false) => return Ordering::Greater,
                        (false, true) => return Ordering::Less,
                        _ => {}
                    }
                    match a.cmp(b) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                }
            }
        }
    }
}

impl<S: Syntagm> PartialOrd for Path<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// A finite mapping from variable syntagms to syntagms (possibly themselves
/// variables), produced by unification.
///
/// Backed by a `BTreeMap` so iteration and display are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<S: Syntagm> {
    bindings: BTreeMap<S, S>,
}

impl<S: Syntagm> Assignment<S> {
    /// The empty assignment.
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The image of `variable`, if bound.
    pub fn get(&self, variable: &S) -> Option<&S> {
        self.bindings.get(variable)
    }

    /// Bind `variable` to `value`.
    ///
    /// Returns `false` (and leaves the assignment untouched) when the
    /// variable is already bound to a different value.
    pub fn bind(&mut self, variable: S, value: S) -> bool {
        debug_assert!(variable.is_variable(), "only variables can be bound");
        match self.bindings.get(&variable) {
            Some(existing) => *existing == value,
            None => {
                self.bindings.insert(variable, value);
                true
            }
        }
    }

    /// Merge two assignments; `None` when they bind a variable to two
    /// distinct values.
    pub fn merge(&self, other: &Assignment<S>) -> Option<Assignment<S>> {
        let mut merged = self.clone();
        for (variable, value) in &other.bindings {
            if !merged.bind(variable.clone(), value.clone()) {
                return None;
            }
        }
        Some(merged)
    }

    /// Iterate bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &S)> {
        self.bindings.iter()
    }
}

impl<S: Syntagm> Default for Assignment<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Syntagm> fmt::Display for Assignment<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (variable, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{variable} -> {value}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unification
// ---------------------------------------------------------------------------

/// One-sided unification of a single pattern path against a ground path.
///
/// Both paths must have identical length. At every position a non-variable
/// pattern syntagm must equal the fact syntagm; a variable contributes a
/// binding, and a repeated variable must agree with its earlier binding.
pub fn unify<S: Syntagm>(pattern: &Path<S>, fact: &Path<S>) -> Option<Assignment<S>> {
    if pattern.len() != fact.len() {
        return None;
    }
    let mut assignment = Assignment::new();
    for (p, f) in pattern.segments().iter().zip(fact.segments()) {
        if p.is_variable() {
            if !assignment.bind(p.clone(), f.clone()) {
                return None;
            }
        } else if p != f {
            return None;
        }
    }
    Some(assignment)
}

/// One-sided unification of a whole pattern sentence against a ground fact.
///
/// Variables are leaf-only, so a pattern and any fact it matches have the
/// same tree shape; pairing the two `paths()` enumerations positionally is
/// therefore the path-wise bijection. Per-path assignments are merged with
/// cross-path consistency: a variable bound to two distinct values fails the
/// whole match.
pub fn matches<S: Sentence>(pattern: &S, fact: &S) -> Option<Assignment<S::Syntagm>> {
    let pattern_paths = pattern.paths();
    let fact_paths = fact.paths();
    if pattern_paths.len() != fact_paths.len() {
        return None;
    }
    let mut assignment = Assignment::new();
    for (p, f) in pattern_paths.iter().zip(&fact_paths) {
        assignment = assignment.merge(&unify(p, f)?)?;
    }
    Some(assignment)
}

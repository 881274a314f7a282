//! The facts tree: a ground-only discrimination tree with pattern queries.
//!
//! Structurally the same n-ary tree as the rules tree, but only ground paths
//! are ever inserted (facts carry no variables), so there is a single child
//! map per node. Queries come from two directions: exact membership checks
//! for deduplication, and pattern queries where the variables sit in the
//! *query* and fan out over the stored children at the matching position.

use indexmap::IndexMap;

use crate::error::TreeError;
use crate::grammar::{Assignment, Path, Sentence};

#[derive(Debug)]
struct FactNode<S: Sentence> {
    children: IndexMap<Path<S::Syntagm>, FactNode<S>>,
    /// Set at the terminal node of an installed fact.
    fact: Option<S>,
}

impl<S: Sentence> Default for FactNode<S> {
    fn default() -> Self {
        Self {
            children: IndexMap::new(),
            fact: None,
        }
    }
}

/// The discrimination tree over asserted facts.
#[derive(Debug)]
pub struct FactTree<S: Sentence> {
    root: FactNode<S>,
    len: usize,
}

impl<S: Sentence> FactTree<S> {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            root: FactNode::default(),
            len: 0,
        }
    }

    /// Number of installed facts.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no fact has been installed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Install a fact. Idempotent; returns `false` when already present.
    ///
    /// The caller guarantees groundness; a variable path here means the
    /// engine's own invariants broke.
    pub fn insert(&mut self, fact: &S) -> Result<bool, TreeError> {
        let mut paths = fact.paths();
        paths.sort();
        if paths.iter().any(Path::is_variable) {
            return Err(TreeError::Corrupt {
                detail: format!("variable path reached the facts tree: {fact}"),
            });
        }

        let mut node = &mut self.root;
        for path in paths {
            node = node.children.entry(path).or_default();
        }
        if node.fact.is_some() {
            Ok(false)
        } else {
            node.fact = Some(fact.clone());
            self.len += 1;
            Ok(true)
        }
    }

    /// Exact membership: a pure hash walk, no variable handling.
    pub fn contains(&self, fact: &S) -> bool {
        let mut paths = fact.paths();
        paths.sort();

        let mut node = &self.root;
        for path in &paths {
            match node.children.get(path) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.fact.is_some()
    }

    /// All stored facts the pattern unifies with, each with the assignment
    /// of the pattern's variables.
    ///
    /// A bound variable path substitutes its value and degenerates to an
    /// exact lookup; an unbound one enumerates every child sharing its
    /// non-terminal prefix, in insertion order.
    pub fn query(&self, pattern: &S) -> Vec<(S, Assignment<S::Syntagm>)> {
        let mut paths = pattern.paths();
        paths.sort();

        let mut out = Vec::new();
        Self::walk(&self.root, &paths, &Assignment::new(), &mut out);
        out
    }

    fn walk(
        node: &FactNode<S>,
        paths: &[Path<S::Syntagm>],
        binding: &Assignment<S::Syntagm>,
        out: &mut Vec<(S, Assignment<S::Syntagm>)>,
    ) {
        let Some((first, rest)) = paths.split_first() else {
            if let Some(fact) = &node.fact {
                out.push((fact.clone(), binding.clone()));
            }
            return;
        };

        if !first.is_variable() {
            if let Some(child) = node.children.get(first) {
                Self::walk(child, rest, binding, out);
            }
            return;
        }

        let variable = first.value();
        if let Some(bound) = binding.get(variable) {
            let concrete = first.with_value(bound.clone());
            if let Some(child) = node.children.get(&concrete) {
                Self::walk(child, rest, binding, out);
            }
            return;
        }

        for (choice, child) in &node.children {
            if choice.prefix() != first.prefix() {
                continue;
            }
            let mut extended = binding.clone();
            extended.bind(variable.clone(), choice.value().clone());
            Self::walk(child, rest, &extended, out);
        }
    }
}

impl<S: Sentence> Default for FactTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

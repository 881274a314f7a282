//! Rules and the rules tree.
//!
//! A [`Rule`] is an ordered tuple of condition sentences and an ordered tuple
//! of consequence sentences, validated at construction. The [`RuleTree`] is
//! the discrimination tree that indexes outstanding rule premises: internal
//! nodes branch on the next path via hash lookup, ground branches separate
//! from variable branches, and terminal nodes accumulate `(rule, condition
//! index)` references with set semantics.
//!
//! Matching a ground fact against the tree yields every premise the fact
//! unifies with, each paired with the variable assignment collected along the
//! walk. Consuming such a match either specializes the rule (some premises
//! left) or grounds its consequences (none left); see [`Rule::fire`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{RamusResult, RuleError};
use crate::grammar::{Assignment, Path, Sentence};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A production rule: conditions on the left, consequences on the right.
///
/// Invariants enforced by [`Rule::new`]: at least one condition, and every
/// variable mentioned by a consequence bound by some condition. A `Rule`
/// value is therefore always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule<S: Sentence> {
    conditions: Vec<S>,
    consequences: Vec<S>,
}

impl<S: Sentence> Rule<S> {
    /// Validate and build a rule.
    pub fn new(conditions: Vec<S>, consequences: Vec<S>) -> Result<Self, RuleError> {
        if conditions.is_empty() {
            return Err(RuleError::NoConditions);
        }
        let bound: BTreeSet<S::Syntagm> =
            conditions.iter().flat_map(Sentence::variables).collect();
        for consequence in &consequences {
            if let Some(unbound) = consequence
                .variables()
                .into_iter()
                .find(|v| !bound.contains(v))
            {
                return Err(RuleError::UnboundVariable {
                    variable: unbound.to_string(),
                    consequence: consequence.to_string(),
                });
            }
        }
        Ok(Self {
            conditions,
            consequences,
        })
    }

    /// The condition sentences, in order.
    pub fn conditions(&self) -> &[S] {
        &self.conditions
    }

    /// The consequence sentences, in order.
    pub fn consequences(&self) -> &[S] {
        &self.consequences
    }

    /// Consume condition `condition` under `binding`.
    ///
    /// Substitutes the binding through the remaining conditions and the
    /// consequences. With no conditions left the consequences are returned
    /// ready to assert (all ground, guaranteed by rule validation plus the
    /// groundness of the matched fact); otherwise the result is the
    /// specialized rule, which may still carry variables.
    pub(crate) fn fire(
        &self,
        condition: usize,
        binding: &Assignment<S::Syntagm>,
    ) -> RamusResult<Fired<S>> {
        let mut remaining = Vec::with_capacity(self.conditions.len() - 1);
        for (i, c) in self.conditions.iter().enumerate() {
            if i == condition {
                continue;
            }
            remaining.push(c.substitute(binding)?);
        }
        let mut consequences = Vec::with_capacity(self.consequences.len());
        for c in &self.consequences {
            consequences.push(c.substitute(binding)?);
        }

        if remaining.is_empty() {
            if let Some(open) = consequences.iter().find(|c| !c.is_ground()) {
                let variable = open
                    .variables()
                    .into_iter()
                    .next()
                    .expect("a non-ground sentence has a variable");
                return Err(RuleError::UnboundVariable {
                    variable: variable.to_string(),
                    consequence: open.to_string(),
                }
                .into());
            }
            Ok(Fired::Facts(consequences))
        } else {
            Ok(Fired::Specialized(Rule::new(remaining, consequences)?))
        }
    }
}

/// What consuming one matched premise produced.
#[derive(Debug)]
pub(crate) enum Fired<S: Sentence> {
    /// All premises consumed: ground consequences, ready to assert.
    Facts(Vec<S>),
    /// Premises left: the rule rewritten with the match substituted through.
    Specialized(Rule<S>),
}

/// Rules display as `c1; c2 -> k1; k2`.
impl<S: Sentence> fmt::Display for Rule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, " -> ")?;
        for (i, c) in self.consequences.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// The rules tree
// ---------------------------------------------------------------------------

/// A premise reference matched by a fact: the rule, the condition index,
/// and the assignment the walk to it collected.
pub type Match<S> = (
    Arc<Rule<S>>,
    usize,
    Assignment<<S as Sentence>::Syntagm>,
);

#[derive(Debug)]
struct RuleNode<S: Sentence> {
    /// Ground branches: next path, exact hash lookup.
    children: IndexMap<Path<S::Syntagm>, RuleNode<S>>,
    /// Variable branches, tried after the ground branch, in insertion order.
    var_children: IndexMap<Path<S::Syntagm>, RuleNode<S>>,
    /// Premises ending here: `(rule, condition index)`, set semantics.
    payload: Vec<(Arc<Rule<S>>, usize)>,
}

impl<S: Sentence> Default for RuleNode<S> {
    fn default() -> Self {
        Self {
            children: IndexMap::new(),
            var_children: IndexMap::new(),
            payload: Vec::new(),
        }
    }
}

/// The discrimination tree over rule premises.
#[derive(Debug)]
pub struct RuleTree<S: Sentence> {
    root: RuleNode<S>,
}

impl<S: Sentence> RuleTree<S> {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            root: RuleNode::default(),
        }
    }

    /// Index one premise of a rule.
    ///
    /// Paths are walked in canonical order, creating nodes as needed; the
    /// terminal node records `(rule, index)`. Idempotent: re-inserting an
    /// already-present reference returns `false` and changes nothing.
    pub fn insert(&mut self, pattern: &S, rule: &Arc<Rule<S>>, index: usize) -> bool {
        let mut paths = pattern.paths();
        paths.sort();

        let mut node = &mut self.root;
        for path in paths {
            let branch = if path.is_variable() {
                &mut node.var_children
            } else {
                &mut node.children
            };
            node = branch.entry(path).or_default();
        }

        let reference = (Arc::clone(rule), index);
        if node.payload.contains(&reference) {
            false
        } else {
            node.payload.push(reference);
            true
        }
    }

    /// Every premise the ground fact unifies with, with its assignment.
    ///
    /// At each node the ground branch is followed first (one hash lookup),
    /// then every compatible variable branch in insertion order; a variable
    /// branch is compatible when its choice shares the query path's prefix
    /// and its variable is unbound or already bound to the query leaf. The
    /// result order is thus deterministic and pinned.
    pub fn matches(&self, fact: &S) -> Vec<Match<S>> {
        let mut paths = fact.paths();
        paths.sort();

        let mut out = Vec::new();
        Self::walk(&self.root, &paths, &Assignment::new(), &mut out);
        out
    }

    fn walk(
        node: &RuleNode<S>,
        paths: &[Path<S::Syntagm>],
        binding: &Assignment<S::Syntagm>,
        out: &mut Vec<Match<S>>,
    ) {
        let Some((first, rest)) = paths.split_first() else {
            for (rule, index) in &node.payload {
                out.push((Arc::clone(rule), *index, binding.clone()));
            }
            return;
        };

        if let Some(child) = node.children.get(first) {
            Self::walk(child, rest, binding, out);
        }
        for (choice, child) in &node.var_children {
            if choice.prefix() != first.prefix() {
                continue;
            }
            let variable = choice.value();
            match binding.get(variable) {
                Some(bound) if bound == first.value() => {
                    Self::walk(child, rest, binding, out);
                }
                Some(_) => {}
                None => {
                    let mut extended = binding.clone();
                    extended.bind(variable.clone(), first.value().clone());
                    Self::walk(child, rest, &extended, out);
                }
            }
        }
    }
}

impl<S: Sentence> Default for RuleTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triples::{Triple, Word};

    fn t(text: &str) -> Triple {
        text.parse().unwrap()
    }

    fn rule(conditions: &[&str], consequences: &[&str]) -> Rule<Triple> {
        Rule::new(
            conditions.iter().map(|c| t(c)).collect(),
            consequences.iter().map(|c| t(c)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn rule_requires_conditions() {
        let result = Rule::new(vec![], vec![t("a is b")]);
        assert!(matches!(result, Err(RuleError::NoConditions)));
    }

    #[test]
    fn rule_rejects_unbound_consequence_variable() {
        let result = Rule::new(vec![t("X1 is X2")], vec![t("X1 is X3")]);
        match result {
            Err(RuleError::UnboundVariable { variable, .. }) => assert_eq!(variable, "X3"),
            other => panic!("expected UnboundVariable, got {other:?}"),
        }
    }

    #[test]
    fn rule_displays_with_arrow() {
        let r = rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"]);
        assert_eq!(r.to_string(), "X1 is X2; X2 is X3 -> X1 is X3");
    }

    #[test]
    fn fire_with_remaining_conditions_specializes() {
        let r = rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"]);
        let binding = crate::grammar::matches(&t("X1 is X2"), &t("a is b")).unwrap();
        match r.fire(0, &binding).unwrap() {
            Fired::Specialized(s) => {
                assert_eq!(s.to_string(), "b is X3 -> a is X3");
            }
            other => panic!("expected specialization, got {other:?}"),
        }
    }

    #[test]
    fn fire_with_no_remaining_conditions_grounds_consequences() {
        let r = rule(&["b is X3"], &["a is X3"]);
        let binding = crate::grammar::matches(&t("b is X3"), &t("b is c")).unwrap();
        match r.fire(0, &binding).unwrap() {
            Fired::Facts(facts) => assert_eq!(facts, vec![t("a is c")]),
            other => panic!("expected facts, got {other:?}"),
        }
    }

    #[test]
    fn tree_insert_is_idempotent() {
        let mut tree = RuleTree::new();
        let r = Arc::new(rule(&["X1 is X2"], &["X2 is X1"]));
        assert!(tree.insert(&r.conditions()[0], &r, 0));
        assert!(!tree.insert(&r.conditions()[0], &r, 0));
    }

    #[test]
    fn tree_matches_ground_premise_exactly() {
        let mut tree = RuleTree::new();
        let r = Arc::new(rule(&["a is b"], &["b is a"]));
        tree.insert(&r.conditions()[0], &r, 0);

        let found = tree.matches(&t("a is b"));
        assert_eq!(found.len(), 1);
        assert!(found[0].2.is_empty());
        assert!(tree.matches(&t("a is c")).is_empty());
    }

    #[test]
    fn tree_matches_variable_premise_with_binding() {
        let mut tree = RuleTree::new();
        let r = Arc::new(rule(&["X1 is X2"], &["X2 is X1"]));
        tree.insert(&r.conditions()[0], &r, 0);

        let found = tree.matches(&t("a is b"));
        assert_eq!(found.len(), 1);
        let (_, index, binding) = &found[0];
        assert_eq!(*index, 0);
        assert_eq!(binding.get(&Word::new("X1")), Some(&Word::new("a")));
        assert_eq!(binding.get(&Word::new("X2")), Some(&Word::new("b")));
    }

    #[test]
    fn tree_enforces_repeated_variable_consistency() {
        let mut tree = RuleTree::new();
        let r = Arc::new(rule(&["X1 likes X1"], &["X1 likes X1"]));
        tree.insert(&r.conditions()[0], &r, 0);

        assert_eq!(tree.matches(&t("a likes a")).len(), 1);
        assert!(tree.matches(&t("a likes b")).is_empty());
    }

    #[test]
    fn tree_yields_ground_branch_before_variable_branches() {
        let mut tree = RuleTree::new();
        let ground = Arc::new(rule(&["a is b"], &["b is a"]));
        let var = Arc::new(rule(&["X1 is X2"], &["X2 is X1"]));
        // Insert the variable premise first to show order comes from the
        // walk, not from insertion across branches.
        tree.insert(&var.conditions()[0], &var, 0);
        tree.insert(&ground.conditions()[0], &ground, 0);

        let found = tree.matches(&t("a is b"));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, ground);
        assert_eq!(found[1].0, var);
    }

    #[test]
    fn tree_keeps_premises_of_distinct_rules_apart() {
        let mut tree = RuleTree::new();
        let r1 = Arc::new(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"]));
        let r2 = Arc::new(rule(&["X1 isa X2", "X2 is X3"], &["X1 isa X3"]));
        for (r, i) in [(&r1, 0), (&r1, 1), (&r2, 0), (&r2, 1)] {
            tree.insert(&r.conditions()[i], r, i);
        }

        // "a is b" unifies with both conditions of r1 and the second
        // condition of r2, but not with "X1 isa X2".
        let found = tree.matches(&t("a is b"));
        let premises: Vec<(bool, usize)> =
            found.iter().map(|(r, i, _)| (*r == r1, *i)).collect();
        assert_eq!(found.len(), 3);
        assert!(premises.contains(&(true, 0)));
        assert!(premises.contains(&(true, 1)));
        assert!(premises.contains(&(false, 1)));
    }
}

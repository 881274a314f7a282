//! The knowledge base: both trees, the activation queue, and `tell`.
//!
//! `tell` is synchronous: it does not return until the full cascade of
//! activations has drained, so between calls the knowledge base is always at
//! fixpoint. Activations are processed strictly FIFO, which makes the
//! derivation order (and the emitted log) deterministic: the engine logs
//! `adding fact "<fact>"` and `adding rule "<rule>"` at info level, in the
//! same format for user-told and engine-derived sentences.
//!
//! The engine is single-threaded by construction: `tell` takes `&mut self`,
//! queries take `&self`, and the borrow checker provides the serialization
//! boundary the design requires.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{GrammarError, RamusResult};
use crate::facts::FactTree;
use crate::grammar::{Assignment, Sentence};
use crate::rules::{Fired, Rule, RuleTree};

/// Anything the user can tell: a ground fact or a rule.
#[derive(Debug, Clone)]
pub enum Statement<S: Sentence> {
    Fact(S),
    Rule(Rule<S>),
}

impl<S: Sentence> From<S> for Statement<S> {
    fn from(fact: S) -> Self {
        Statement::Fact(fact)
    }
}

impl<S: Sentence> From<Rule<S>> for Statement<S> {
    fn from(rule: Rule<S>) -> Self {
        Statement::Rule(rule)
    }
}

/// A unit of pending work in the cascade.
#[derive(Debug)]
enum Activation<S: Sentence> {
    /// A bare new-fact insertion: dedup, match against all premises, install.
    Assert(S),
    /// A fact already installed matched one premise while the rule was being
    /// indexed; fire just that premise.
    Fire {
        fact: S,
        rule: Arc<Rule<S>>,
        condition: usize,
        binding: Assignment<S::Syntagm>,
    },
}

/// A forward-chaining knowledge base over one grammar.
///
/// Owns the facts tree, the rules tree (premises), the consequences tree
/// (goal queries), and the FIFO activation queue. All state lives here;
/// independent knowledge bases coexist freely.
pub struct KnowledgeBase<S: Sentence> {
    facts: FactTree<S>,
    premises: RuleTree<S>,
    conclusions: RuleTree<S>,
    queue: VecDeque<Activation<S>>,
    fact_order: Vec<S>,
    rule_order: Vec<Arc<Rule<S>>>,
    activations: u64,
}

impl<S: Sentence> KnowledgeBase<S> {
    /// An empty knowledge base.
    pub fn new() -> Self {
        Self {
            facts: FactTree::new(),
            premises: RuleTree::new(),
            conclusions: RuleTree::new(),
            queue: VecDeque::new(),
            fact_order: Vec::new(),
            rule_order: Vec::new(),
            activations: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Telling
    // -----------------------------------------------------------------------

    /// Add a sentence (fact or rule) and run the cascade to fixpoint.
    ///
    /// Errors abort the `tell`; user-facing validation (groundness of facts,
    /// well-formedness of rules) happens before any mutation, so a failed
    /// `tell` leaves the knowledge base unchanged.
    pub fn tell(&mut self, statement: impl Into<Statement<S>>) -> RamusResult<()> {
        match statement.into() {
            Statement::Fact(fact) => {
                if !fact.is_ground() {
                    return Err(GrammarError::NonGroundFact {
                        sentence: fact.to_string(),
                    }
                    .into());
                }
                self.queue.push_back(Activation::Assert(fact));
            }
            Statement::Rule(rule) => {
                self.insert_rule(Arc::new(rule))?;
            }
        }
        self.drain()
    }

    /// Index a rule's premises and pre-populate activations from facts
    /// already present. No-op for a rule that is already indexed.
    fn insert_rule(&mut self, rule: Arc<Rule<S>>) -> RamusResult<()> {
        let mut newly_indexed = false;
        for (index, condition) in rule.conditions().iter().enumerate() {
            newly_indexed |= self.premises.insert(condition, &rule, index);
        }
        if !newly_indexed {
            tracing::debug!(rule = %rule, "rule already indexed, skipping");
            return Ok(());
        }
        for (index, consequence) in rule.consequences().iter().enumerate() {
            self.conclusions.insert(consequence, &rule, index);
        }

        tracing::info!("adding rule \"{rule}\"");
        self.rule_order.push(Arc::clone(&rule));

        for (index, condition) in rule.conditions().iter().enumerate() {
            for (fact, binding) in self.facts.query(condition) {
                self.queue.push_back(Activation::Fire {
                    fact,
                    rule: Arc::clone(&rule),
                    condition: index,
                    binding,
                });
            }
        }
        Ok(())
    }

    /// Process activations FIFO until the queue is empty.
    ///
    /// On error the queue is cleared: the knowledge base stays at the
    /// fixpoint of the activations processed so far.
    fn drain(&mut self) -> RamusResult<()> {
        while let Some(activation) = self.queue.pop_front() {
            self.activations += 1;
            let step = match activation {
                Activation::Assert(fact) => self.assert_fact(fact),
                Activation::Fire {
                    fact,
                    rule,
                    condition,
                    binding,
                } => {
                    tracing::debug!(
                        fact = %fact,
                        rule = %rule,
                        condition,
                        "firing pre-populated premise match"
                    );
                    self.fire(&rule, condition, &binding)
                }
            };
            if let Err(error) = step {
                self.queue.clear();
                return Err(error);
            }
        }
        Ok(())
    }

    /// Process a bare new-fact activation.
    ///
    /// Dedup first: an already-known fact never produces activations. The
    /// fact is installed *before* its premise matches fire, so that a
    /// specialized rule's own pre-population sees it (a fact can satisfy two
    /// premises of one rule at once); the premise matches themselves are
    /// snapshotted before any firing adds new rules to the tree, so each
    /// (fact, premise) pair fires exactly once.
    fn assert_fact(&mut self, fact: S) -> RamusResult<()> {
        if self.facts.contains(&fact) {
            tracing::debug!(fact = %fact, "duplicate fact dropped");
            return Ok(());
        }
        tracing::info!("adding fact \"{fact}\"");

        self.facts.insert(&fact)?;
        self.fact_order.push(fact.clone());

        let matched = self.premises.matches(&fact);
        for (rule, condition, binding) in matched {
            self.fire(&rule, condition, &binding)?;
        }
        Ok(())
    }

    /// Consume one matched premise: specialize, or enqueue consequences.
    fn fire(
        &mut self,
        rule: &Arc<Rule<S>>,
        condition: usize,
        binding: &Assignment<S::Syntagm>,
    ) -> RamusResult<()> {
        match rule.fire(condition, binding)? {
            Fired::Specialized(specialized) => self.insert_rule(Arc::new(specialized)),
            Fired::Facts(facts) => {
                for fact in facts {
                    self.queue.push_back(Activation::Assert(fact));
                }
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Querying
    // -----------------------------------------------------------------------

    /// All facts the pattern unifies with, each with its assignment.
    ///
    /// A pure read: no activations, no mutation.
    pub fn query(&self, pattern: &S) -> Vec<(S, Assignment<S::Syntagm>)> {
        self.facts.query(pattern)
    }

    /// Exact membership check for a ground fact.
    pub fn contains(&self, fact: &S) -> bool {
        self.facts.contains(fact)
    }

    /// Which premises would a ground goal need?
    ///
    /// Matches the goal against rule *consequences*; for every rule that
    /// concludes it, reports the conditions not currently satisfiable from
    /// the facts tree, with bindings from satisfiable conditions propagated
    /// through. An empty inner list means the goal is one firing away; an
    /// empty outer list means no rule concludes it.
    pub fn goal(&self, goal: &S) -> RamusResult<Vec<Vec<S>>> {
        if !goal.is_ground() {
            return Err(GrammarError::NonGroundFact {
                sentence: goal.to_string(),
            }
            .into());
        }

        let mut out: Vec<Vec<S>> = Vec::new();
        for (rule, _, binding) in self.conclusions.matches(goal) {
            let mut conditions = Vec::with_capacity(rule.conditions().len());
            for condition in rule.conditions() {
                conditions.push(condition.substitute(&binding)?);
            }

            // Each branch is a consistent extension of the bindings plus the
            // conditions it could not satisfy.
            let mut branches: Vec<(Assignment<S::Syntagm>, Vec<S>)> =
                vec![(Assignment::new(), Vec::new())];
            for condition in &conditions {
                let mut next = Vec::new();
                for (bound, missing) in &branches {
                    let condition = condition.substitute(bound)?;
                    let answers = self.facts.query(&condition);
                    if answers.is_empty() {
                        let mut missing = missing.clone();
                        missing.push(condition);
                        next.push((bound.clone(), missing));
                    } else {
                        for (_, answer) in answers {
                            if let Some(merged) = bound.merge(&answer) {
                                next.push((merged, missing.clone()));
                            }
                        }
                    }
                }
                branches = next;
            }

            for (bound, missing) in branches {
                let mut resolved = Vec::with_capacity(missing.len());
                for m in missing {
                    resolved.push(m.substitute(&bound)?);
                }
                if !out.contains(&resolved) {
                    out.push(resolved);
                }
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Installed facts, in first-insertion order.
    pub fn facts(&self) -> impl Iterator<Item = &S> {
        self.fact_order.iter()
    }

    /// Indexed rules (user-told and engine-derived), in first-insertion order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule<S>> {
        self.rule_order.iter().map(Arc::as_ref)
    }

    /// Number of installed facts.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of indexed rules.
    pub fn rule_count(&self) -> usize {
        self.rule_order.len()
    }

    /// Number of activations processed over the lifetime of this knowledge
    /// base. Useful for benchmarking per-activation cost.
    pub fn activation_count(&self) -> u64 {
        self.activations
    }
}

impl<S: Sentence> Default for KnowledgeBase<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sentence> std::fmt::Debug for KnowledgeBase<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("facts", &self.fact_count())
            .field("rules", &self.rule_count())
            .field("activations", &self.activations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RamusError;
    use crate::triples::Triple;

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
    fn tell_fact_then_query() {
        let mut kb = KnowledgeBase::new();
        kb.tell(t("a is b")).unwrap();
        assert!(kb.contains(&t("a is b")));
        assert_eq!(kb.fact_count(), 1);
    }

    #[test]
    fn tell_rejects_non_ground_fact() {
        let mut kb = KnowledgeBase::new();
        let result = kb.tell(t("X1 is b"));
        assert!(matches!(
            result,
            Err(RamusError::Grammar(GrammarError::NonGroundFact { .. }))
        ));
        assert_eq!(kb.fact_count(), 0);
    }

    #[test]
    fn duplicate_tell_is_a_no_op() {
        let mut kb = KnowledgeBase::new();
        kb.tell(t("a is b")).unwrap();
        let activations = kb.activation_count();
        kb.tell(t("a is b")).unwrap();
        assert_eq!(kb.fact_count(), 1);
        // The duplicate costs one activation (the dedup check) and nothing else.
        assert_eq!(kb.activation_count(), activations + 1);
    }

    #[test]
    fn rule_then_facts_derives_consequence() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        kb.tell(t("a is b")).unwrap();
        kb.tell(t("b is c")).unwrap();
        assert!(kb.contains(&t("a is c")));
    }

    #[test]
    fn facts_then_rule_derives_consequence() {
        let mut kb = KnowledgeBase::new();
        kb.tell(t("a is b")).unwrap();
        kb.tell(t("b is c")).unwrap();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        assert!(kb.contains(&t("a is c")));
    }

    #[test]
    fn partial_match_specializes_the_rule() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        kb.tell(t("a is b")).unwrap();
        let specialized: Vec<String> = kb.rules().map(|r| r.to_string()).collect();
        assert!(specialized.contains(&"b is X3 -> a is X3".to_string()));
        assert!(!kb.contains(&t("a is c")));
    }

    #[test]
    fn self_overlapping_fact_fires_both_premises() {
        // "a is a" satisfies both premises of the transitivity rule at once;
        // the closure must include the (trivial) consequence.
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        kb.tell(t("a is a")).unwrap();
        assert!(kb.contains(&t("a is a")));
        assert_eq!(kb.fact_count(), 1);
        let specialized: Vec<String> = kb.rules().map(|r| r.to_string()).collect();
        assert!(specialized.contains(&"a is X3 -> a is X3".to_string()));
        assert!(specialized.contains(&"X1 is a -> X1 is a".to_string()));
    }

    #[test]
    fn retelling_a_rule_does_not_refire() {
        let mut kb = KnowledgeBase::new();
        kb.tell(t("a is b")).unwrap();
        let r = rule(&["X1 is X2"], &["X2 isa X1"]);
        kb.tell(r.clone()).unwrap();
        assert!(kb.contains(&t("b isa a")));
        let rules_before = kb.rule_count();
        let activations_before = kb.activation_count();
        kb.tell(r).unwrap();
        assert_eq!(kb.rule_count(), rules_before);
        assert_eq!(kb.activation_count(), activations_before);
    }

    #[test]
    fn query_returns_bindings() {
        let mut kb = KnowledgeBase::new();
        kb.tell(t("a is b")).unwrap();
        kb.tell(t("c is b")).unwrap();
        let found = kb.query(&t("X1 is b"));
        assert_eq!(found.len(), 2);
        let subjects: Vec<String> =
            found.iter().map(|(_, a)| a.to_string()).collect();
        assert_eq!(subjects, vec!["X1 -> a", "X1 -> c"]);
    }

    #[test]
    fn query_does_not_mutate() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2"], &["X2 isa X1"])).unwrap();
        kb.tell(t("a is b")).unwrap();
        let activations = kb.activation_count();
        let _ = kb.query(&t("X1 isa X2"));
        assert_eq!(kb.activation_count(), activations);
        assert_eq!(kb.fact_count(), 2);
    }

    #[test]
    fn goal_reports_missing_premises() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        kb.tell(t("a is b")).unwrap();
        // To conclude "a is z" the engine still needs "b is z" (via X2 = b);
        // the fully unsatisfiable branch where neither premise is known is
        // reported with the remaining variables pinned by the goal.
        let needed = kb.goal(&t("a is z")).unwrap();
        assert!(needed.iter().any(|branch| branch == &vec![t("b is z")]));
    }

    #[test]
    fn goal_with_no_concluding_rule_is_empty() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2"], &["X1 is X2"])).unwrap();
        let needed = kb.goal(&t("a isa b")).unwrap();
        assert!(needed.is_empty());
    }

    #[test]
    fn monotonicity_under_tells() {
        let mut kb = KnowledgeBase::new();
        kb.tell(rule(&["X1 is X2", "X2 is X3"], &["X1 is X3"])).unwrap();
        kb.tell(t("a is b")).unwrap();
        let before: Vec<Triple> = kb.facts().cloned().collect();
        kb.tell(t("b is c")).unwrap();
        for fact in &before {
            assert!(kb.contains(fact));
        }
        assert!(kb.fact_count() > before.len());
    }
}

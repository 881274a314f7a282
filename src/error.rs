//! Diagnostic error types for the ramus engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text, and a top-level [`RamusError`]
//! wraps them transparently so the full diagnostic chain survives `?`.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ramus engine.
#[derive(Debug, Error, Diagnostic)]
pub enum RamusError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),
}

// ---------------------------------------------------------------------------
// Grammar errors
// ---------------------------------------------------------------------------

/// Errors reported by the grammar layer: invalid paths, failed sentence
/// reconstructions, and sentences that are not well-formed for the position
/// they are used in.
#[derive(Debug, Error, Diagnostic)]
pub enum GrammarError {
    #[error("a path must contain at least one syntagm")]
    #[diagnostic(
        code(ramus::grammar::empty_path),
        help("Paths are root-to-leaf tuples of syntagms; an empty tuple names no position.")
    )]
    EmptyPath,

    #[error("variable \"{segment}\" in a non-terminal path position")]
    #[diagnostic(
        code(ramus::grammar::interior_variable),
        help(
            "Variables may only appear as the final syntagm of a path. \
             Check the grammar's `paths()` implementation: inner segments \
             must be ground position markers."
        )
    )]
    InteriorVariable { segment: String },

    #[error("cannot rebuild a sentence from the given path set: {detail}")]
    #[diagnostic(
        code(ramus::grammar::reconstruction),
        help(
            "The grammar's `from_paths` rejected the path set. This usually \
             means a substitution produced paths the grammar cannot assemble, \
             or the path set is missing a required position."
        )
    )]
    Reconstruction { detail: String },

    #[error("sentence \"{sentence}\" contains variables but was used as a fact")]
    #[diagnostic(
        code(ramus::grammar::non_ground_fact),
        help(
            "Facts are ground sentences. To match against stored facts use \
             `query`; to state a general truth use a rule."
        )
    )]
    NonGroundFact { sentence: String },

    #[error("cannot parse \"{input}\": {detail}")]
    #[diagnostic(
        code(ramus::grammar::parse),
        help("Check the sentence against the grammar's textual form.")
    )]
    Parse { input: String, detail: String },
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

/// Errors detected while validating a rule.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("a rule must have at least one condition")]
    #[diagnostic(
        code(ramus::rule::no_conditions),
        help("A rule with no conditions is just its consequences: tell them as facts.")
    )]
    NoConditions,

    #[error("variable \"{variable}\" in consequence \"{consequence}\" is not bound by any condition")]
    #[diagnostic(
        code(ramus::rule::unbound_variable),
        help(
            "Every variable in a consequence must appear in at least one \
             condition, so that a full match always grounds it."
        )
    )]
    UnboundVariable {
        variable: String,
        consequence: String,
    },
}

// ---------------------------------------------------------------------------
// Tree errors
// ---------------------------------------------------------------------------

/// Internal discrimination-tree invariant violations. Should be unreachable;
/// seeing one of these is a bug in ramus, not in the caller's rules.
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("discrimination tree invariant broken: {detail}")]
    #[diagnostic(
        code(ramus::tree::corrupt),
        help("This is an internal error. Please file a bug report with the tell sequence that produced it.")
    )]
    Corrupt { detail: String },
}

/// Convenience alias for functions returning ramus results.
pub type RamusResult<T> = std::result::Result<T, RamusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_error_converts_to_ramus_error() {
        let err = GrammarError::EmptyPath;
        let top: RamusError = err.into();
        assert!(matches!(top, RamusError::Grammar(GrammarError::EmptyPath)));
    }

    #[test]
    fn rule_error_display_names_the_variable() {
        let err = RuleError::UnboundVariable {
            variable: "X3".into(),
            consequence: "X1 is X3".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("X3"));
        assert!(msg.contains("X1 is X3"));
    }

    #[test]
    fn tree_error_converts_to_ramus_error() {
        let err = TreeError::Corrupt {
            detail: "test".into(),
        };
        let top: RamusError = err.into();
        assert!(matches!(top, RamusError::Tree(TreeError::Corrupt { .. })));
    }
}

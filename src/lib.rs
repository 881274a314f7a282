//! # ramus
//!
//! A forward-chaining production rule engine whose match cost scales
//! sub-logarithmically with the size of the knowledge base. Sentences are
//! trees of syntagms; the engine indexes both asserted facts and outstanding
//! rule premises in hash-branching discrimination trees keyed by root-to-leaf
//! *paths*, so every branching decision during matching is a single hash
//! lookup. Rules fire by partial unification: a fact that satisfies some but
//! not all premises rewrites the rule into a more specialized one, which
//! keeps the engine purely forward-chaining without beta-memory joins.
//!
//! ## Architecture
//!
//! - **Grammar contract** (`grammar`): the [`grammar::Syntagm`] and
//!   [`grammar::Sentence`] traits, paths, assignments, and unification
//! - **Facts tree** (`facts`): ground discrimination tree with pattern queries
//! - **Rules** (`rules`): validated rules and the premise discrimination tree
//! - **Knowledge base** (`kb`): FIFO activation engine, `tell`/`query`/`goal`
//! - **Triples** (`triples`): bundled `subject predicate object` demo grammar
//!
//! ## Library usage
//!
//! ```
//! use ramus::kb::KnowledgeBase;
//! use ramus::rules::Rule;
//! use ramus::triples::Triple;
//!
//! let mut kb = KnowledgeBase::new();
//! let transitive = Rule::new(
//!     vec!["X1 is X2".parse()?, "X2 is X3".parse()?],
//!     vec!["X1 is X3".parse()?],
//! )?;
//! kb.tell(transitive)?;
//! kb.tell("mammal is animal".parse::<Triple>()?)?;
//! kb.tell("human is mammal".parse::<Triple>()?)?;
//! assert!(kb.contains(&"human is animal".parse()?));
//! # Ok::<(), ramus::error::RamusError>(())
//! ```

pub mod error;
pub mod facts;
pub mod grammar;
pub mod kb;
pub mod rules;
pub mod triples;

//! A bundled demonstration grammar: word triples `subject predicate object`.
//!
//! This is the reference implementation of the grammar contract and the
//! grammar the integration tests and benchmarks speak. A [`Word`] is a
//! variable when its name begins with a capital `X`; a [`Triple`] decomposes
//! into three two-segment paths whose first segments are the role markers
//! `__subj`, `__pred`, `__obj`, so every leaf position has a distinct ground
//! prefix.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::GrammarError;
use crate::grammar::{Path, Sentence, Syntagm};

/// A word: the syntagm of the triples grammar.
///
/// Serializes as its bare name; variable-ness is re-derived on the way in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Word {
    name: Arc<str>,
    variable: bool,
}

impl Word {
    /// Build a word; names beginning with a capital `X` are variables.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self {
            name: name.into(),
            variable: name.starts_with('X'),
        }
    }

    /// The word's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Syntagm for Word {
    fn is_variable(&self) -> bool {
        self.variable
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<String> for Word {
    fn from(name: String) -> Self {
        Word::new(name)
    }
}

impl From<Word> for String {
    fn from(word: Word) -> Self {
        word.name.to_string()
    }
}

fn subj_marker() -> &'static Word {
    static MARKER: OnceLock<Word> = OnceLock::new();
    MARKER.get_or_init(|| Word::new("__subj"))
}

fn pred_marker() -> &'static Word {
    static MARKER: OnceLock<Word> = OnceLock::new();
    MARKER.get_or_init(|| Word::new("__pred"))
}

fn obj_marker() -> &'static Word {
    static MARKER: OnceLock<Word> = OnceLock::new();
    MARKER.get_or_init(|| Word::new("__obj"))
}

/// A `subject predicate object` sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    subject: Word,
    predicate: Word,
    object: Word,
}

impl Triple {
    pub fn new(subject: Word, predicate: Word, object: Word) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn subject(&self) -> &Word {
        &self.subject
    }

    pub fn predicate(&self) -> &Word {
        &self.predicate
    }

    pub fn object(&self) -> &Word {
        &self.object
    }
}

impl Sentence for Triple {
    type Syntagm = Word;

    fn paths(&self) -> Vec<Path<Word>> {
        let role = |marker: &Word, value: &Word| {
            Path::new(vec![marker.clone(), value.clone()])
                .expect("role-marker paths are statically well-formed")
        };
        vec![
            role(subj_marker(), &self.subject),
            role(pred_marker(), &self.predicate),
            role(obj_marker(), &self.object),
        ]
    }

    fn from_paths(paths: &[Path<Word>]) -> Result<Self, GrammarError> {
        let mut subject = None;
        let mut predicate = None;
        let mut object = None;
        for path in paths {
            let slot = match path.prefix() {
                [marker] if marker == subj_marker() => &mut subject,
                [marker] if marker == pred_marker() => &mut predicate,
                [marker] if marker == obj_marker() => &mut object,
                _ => {
                    return Err(GrammarError::Reconstruction {
                        detail: format!("unknown role prefix in path \"{path}\""),
                    })
                }
            };
            if slot.replace(path.value().clone()).is_some() {
                return Err(GrammarError::Reconstruction {
                    detail: format!("duplicate role in path \"{path}\""),
                });
            }
        }
        match (subject, predicate, object) {
            (Some(subject), Some(predicate), Some(object)) => {
                Ok(Triple::new(subject, predicate, object))
            }
            _ => Err(GrammarError::Reconstruction {
                detail: "a triple needs subject, predicate and object paths".into(),
            }),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

impl FromStr for Triple {
    type Err = GrammarError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut words = text.split_whitespace().map(Word::new);
        match (words.next(), words.next(), words.next(), words.next()) {
            (Some(subject), Some(predicate), Some(object), None) => {
                Ok(Triple::new(subject, predicate, object))
            }
            _ => Err(GrammarError::Parse {
                input: text.into(),
                detail: "expected exactly three whitespace-separated words".into(),
            }),
        }
    }
}

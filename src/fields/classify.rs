use std::fmt;

use crate::models::FieldRecord;

/// One of the two input images together with the front-face fields read from it.
#[derive(Debug, Clone)]
pub struct Candidate<I> {
    pub source: I,
    pub fields: FieldRecord,
}

/// Why the pair could not be split into front and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    NeitherHasGender,
    BothHaveGender,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::NeitherHasGender => f.write_str("neither image shows a gender"),
            Ambiguity::BothHaveGender => f.write_str("both images show a gender"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Classification<I> {
    Resolved {
        front: Candidate<I>,
        back: Candidate<I>,
    },
    Ambiguous(Ambiguity),
}

impl<I> Classification<I> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Classification::Resolved { .. })
    }
}

/// The front face is the one image whose fields include a gender.
pub fn classify<I>(first: Candidate<I>, second: Candidate<I>) -> Classification<I> {
    match (first.fields.gender.is_some(), second.fields.gender.is_some()) {
        (true, false) => Classification::Resolved {
            front: first,
            back: second,
        },
        (false, true) => Classification::Resolved {
            front: second,
            back: first,
        },
        (false, false) => Classification::Ambiguous(Ambiguity::NeitherHasGender),
        (true, true) => Classification::Ambiguous(Ambiguity::BothHaveGender),
    }
}

use std::fmt;

use thiserror::Error;

/// 1-based source position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("{0}: unexpected character {1:?}")]
    UnexpectedChar(Pos, char),

    #[error("{0}: unterminated {1}")]
    Unterminated(Pos, &'static str),

    #[error("{pos}: expected {expected}, found {found}")]
    Expected {
        pos: Pos,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input, expected {0}")]
    Eof(String),

    #[error("{0}: invalid number {1:?}")]
    BadNumber(Pos, String),

    #[error("{0}: field number {1} out of range")]
    FieldNumber(Pos, i128),

    #[error("{0}: groups are not supported")]
    Group(Pos),

    #[error("bitmap enum {name} has {count} values, at most {max} fit in uint64")]
    TooManyFlags {
        name: String,
        count: usize,
        max: usize,
    },

    #[error("bitmap enum {0} declares `None`, which is reserved for the empty set")]
    ReservedNone(String),

    #[error("default {value:?} of field {field} is not a flag of bitmap {bitmap}")]
    BadDefault {
        field: String,
        bitmap: String,
        value: String,
    },

    #[error("enum {0} has no values")]
    EmptyEnum(String),

    #[error("cannot resolve type {ty:?} of field {field}")]
    UnresolvedType {
        field: String,
        ty: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

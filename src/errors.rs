//! Definition of errors.

use core::fmt;

#[cfg(feature = "train")]
use alloc::string::String;

#[cfg(feature = "std")]
use std::error::Error;

/// Error used when the argument is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArgumentError {
    msg: &'static str,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}", self.msg)
    }
}

#[cfg(feature = "std")]
impl Error for InvalidArgumentError {}

/// Error used when a dimension of the input disagrees with the model or with
/// another input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatchError {
    /// Name of the mismatching dimension.
    pub what: &'static str,

    /// Size required by the model or by the other inputs.
    pub expected: usize,

    /// Size actually given.
    pub actual: usize,
}

impl fmt::Display for ShapeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ShapeMismatchError: {} must be {}, got {}",
            self.what, self.expected, self.actual,
        )
    }
}

#[cfg(feature = "std")]
impl Error for ShapeMismatchError {}

/// Error used when a tag index is not smaller than the number of tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutOfRangeError {
    /// Position of the offending tag in the sequence.
    pub position: usize,

    /// The offending tag.
    pub tag: usize,

    /// Number of tags of the model.
    pub num_tags: usize,
}

impl fmt::Display for TagOutOfRangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "TagOutOfRangeError: tag {} at position {} is not in [0, {})",
            self.tag, self.position, self.num_tags,
        )
    }
}

#[cfg(feature = "std")]
impl Error for TagOutOfRangeError {}

/// Error used when an optimizer fails.
#[cfg(feature = "train")]
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerError {
    msg: String,
}

#[cfg(feature = "train")]
impl fmt::Display for OptimizerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "OptimizerError: {}", self.msg)
    }
}

#[cfg(feature = "train")]
impl Error for OptimizerError {}

/// The error type for chaincrf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrfError {
    /// The argument is invalid.
    InvalidArgument(InvalidArgumentError),

    /// A dimension of the input is wrong.
    ShapeMismatch(ShapeMismatchError),

    /// A tag index is out of range.
    TagOutOfRange(TagOutOfRangeError),

    /// A sequence has no positions.
    EmptySequence,

    /// The optimizer failed.
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    Optimizer(OptimizerError),
}

impl CrfError {
    /// Creates a new [`InvalidArgumentError`].
    pub const fn invalid_argument(msg: &'static str) -> Self {
        Self::InvalidArgument(InvalidArgumentError { msg })
    }

    /// Creates a new [`ShapeMismatchError`].
    pub const fn shape_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch(ShapeMismatchError {
            what,
            expected,
            actual,
        })
    }

    /// Creates a new [`TagOutOfRangeError`].
    pub const fn tag_out_of_range(position: usize, tag: usize, num_tags: usize) -> Self {
        Self::TagOutOfRange(TagOutOfRangeError {
            position,
            tag,
            num_tags,
        })
    }

    /// Creates a new [`OptimizerError`].
    #[cfg(feature = "train")]
    pub fn optimizer<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Optimizer(OptimizerError { msg: msg.into() })
    }
}

impl fmt::Display for CrfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::ShapeMismatch(e) => e.fmt(f),
            Self::TagOutOfRange(e) => e.fmt(f),
            Self::EmptySequence => f.write_str("EmptySequenceError: sequence length must not be 0"),
            #[cfg(feature = "train")]
            Self::Optimizer(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl Error for CrfError {}

/// A specialized Result type.
pub type Result<T, E = CrfError> = core::result::Result<T, E>;

//! Shape and configuration errors.

use std::error::Error;
use std::fmt;

use crate::id::ShapeId;

/// Errors raised when registering or updating shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeError {
    /// A shape dimension is negative, zero where it must be positive, or
    /// not finite.
    InvalidDimension {
        /// Which parameter was rejected.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
    /// The shape's position or orientation contains a non-finite value.
    NonFiniteTransform,
    /// No shape with this id is registered.
    UnknownShape {
        /// The id that was looked up.
        id: ShapeId,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { name, value } => {
                write!(f, "invalid shape dimension: {name} = {value}")
            }
            Self::NonFiniteTransform => write!(f, "shape transform is not finite"),
            Self::UnknownShape { id } => write!(f, "unknown shape: {id}"),
        }
    }
}

impl Error for ShapeError {}

/// Errors detected while validating tree, query or world configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `max_depth` is above the supported limit.
    DepthTooLarge {
        /// The configured depth.
        configured: u32,
        /// The largest accepted depth.
        max: u32,
    },
    /// `split_tests` is zero.
    NoSplitTests,
    /// `grow_bounds` is negative or not finite.
    InvalidMargin {
        /// The rejected margin.
        value: f32,
    },
    /// `gradient_step` is zero, negative or not finite.
    InvalidGradientStep {
        /// The rejected step.
        value: f32,
    },
    /// A distance table tag is past the last slot.
    TagOutOfRange {
        /// The rejected tag.
        tag: u32,
        /// The largest accepted tag.
        max: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthTooLarge { configured, max } => {
                write!(f, "max_depth {configured} exceeds {max}")
            }
            Self::NoSplitTests => write!(f, "split_tests must be at least 1"),
            Self::InvalidMargin { value } => {
                write!(f, "grow_bounds must be finite and >= 0, got {value}")
            }
            Self::InvalidGradientStep { value } => {
                write!(f, "gradient_step must be finite and positive, got {value}")
            }
            Self::TagOutOfRange { tag, max } => write!(f, "shape tag {tag} exceeds {max}"),
        }
    }
}

impl Error for ConfigError {}

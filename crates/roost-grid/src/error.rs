//! Grid error types.

use std::error::Error;
use std::fmt;

use roost_core::CapacityError;
use roost_sort::SortError;

use crate::kernels::GridPhase;

/// Errors that can occur while configuring or rebuilding a grid.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// A configuration value is out of range.
    InvalidConfig {
        /// Human-readable description.
        reason: String,
    },
    /// The agent record layout cannot hold a position.
    InvalidLayout {
        /// Record stride in `f32` words.
        stride: usize,
        /// Word offset of the position within a record.
        position_offset: usize,
    },
    /// The kernel set cannot run one of the phases. The grid has
    /// disabled itself.
    KernelMissing {
        /// The phase that could not be resolved.
        phase: GridPhase,
        /// Name of the kernel set.
        kernels: String,
    },
    /// The grid is disabled and skipped this rebuild.
    Disabled,
    /// Alive-count mode is on but no counter is attached.
    AliveCounterMissing,
    /// A working buffer could not grow.
    Capacity {
        /// The underlying growth error.
        error: CapacityError,
    },
    /// The sort-based index rejected its input.
    Sort {
        /// The underlying sort error.
        error: SortError,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid grid configuration: {reason}"),
            Self::InvalidLayout {
                stride,
                position_offset,
            } => {
                write!(
                    f,
                    "agent layout cannot hold a position: stride {stride}, position offset {position_offset}"
                )
            }
            Self::KernelMissing { phase, kernels } => {
                write!(f, "kernel set '{kernels}' cannot run phase {phase}")
            }
            Self::Disabled => write!(f, "grid is disabled"),
            Self::AliveCounterMissing => {
                write!(f, "alive-count mode is enabled but no counter is attached")
            }
            Self::Capacity { error } => write!(f, "grid buffer growth failed: {error}"),
            Self::Sort { error } => write!(f, "sorted cell index failed: {error}"),
        }
    }
}

impl Error for GridError {}

impl From<CapacityError> for GridError {
    fn from(error: CapacityError) -> Self {
        Self::Capacity { error }
    }
}

impl From<SortError> for GridError {
    fn from(error: SortError) -> Self {
        Self::Sort { error }
    }
}

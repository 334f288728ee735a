//! Tree build, query and collision world configuration.

use tracing::warn;

use crate::error::ConfigError;

/// Configuration for a [`BoundsTree`](crate::BoundsTree) build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Deepest level a node may be split at. The root is depth 0.
    ///
    /// Default: 8. At most [`MAX_SUPPORTED_DEPTH`](Self::MAX_SUPPORTED_DEPTH).
    pub max_depth: u32,

    /// Candidate split positions tested per axis.
    ///
    /// Candidates sit at `t = (i + 1) / (split_tests + 1)` of the node's
    /// extent, so they never coincide with its faces. Default: 5.
    pub split_tests: u32,
}

impl TreeConfig {
    /// Default maximum depth.
    pub const DEFAULT_MAX_DEPTH: u32 = 8;

    /// Default number of split candidates per axis.
    pub const DEFAULT_SPLIT_TESTS: u32 = 5;

    /// Upper bound on `max_depth`.
    pub const MAX_SUPPORTED_DEPTH: u32 = 32;

    /// Create a config with the default depth and split count.
    pub fn new() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            split_tests: Self::DEFAULT_SPLIT_TESTS,
        }
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth > Self::MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::DepthTooLarge {
                configured: self.max_depth,
                max: Self::MAX_SUPPORTED_DEPTH,
            });
        }
        if self.split_tests == 0 {
            return Err(ConfigError::NoSplitTests);
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for a single [`BoundsTree::nearest`](crate::BoundsTree::nearest) query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryOptions {
    /// Index of the root node within the node buffer.
    ///
    /// Child indices stored in nodes are relative to this offset, which
    /// lets several trees share one packed node buffer. Default: 0.
    pub root_offset: u32,

    /// Estimate the normal by finite differences instead of taking the
    /// nearest shape's analytic normal.
    pub gradient_normal: bool,

    /// Probe distance used for the finite-difference normal. Default: 0.01.
    pub gradient_step: f32,

    /// Hard cap on traversal iterations. Default: 1024.
    pub max_iterations: u32,
}

impl QueryOptions {
    /// Default finite-difference probe distance.
    pub const DEFAULT_GRADIENT_STEP: f32 = 0.01;

    /// Default traversal iteration cap.
    pub const DEFAULT_MAX_ITERATIONS: u32 = 1024;

    /// Options with analytic normals and the default iteration cap.
    pub fn new() -> Self {
        Self {
            root_offset: 0,
            gradient_normal: false,
            gradient_step: Self::DEFAULT_GRADIENT_STEP,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// The same options with finite-difference normals switched on.
    pub fn with_gradient_normal(mut self) -> Self {
        self.gradient_normal = true;
        self
    }

    /// The same options with finite-difference normals probed at `step`.
    pub fn with_gradient_step(mut self, step: f32) -> Result<Self, ConfigError> {
        self.gradient_normal = true;
        self.gradient_step = step;
        self.validate()?;
        Ok(self)
    }

    /// Check that the probe distance is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gradient_step.is_finite() || self.gradient_step <= 0.0 {
            return Err(ConfigError::InvalidGradientStep {
                value: self.gradient_step,
            });
        }
        Ok(())
    }

    /// The probe distance a query uses: `gradient_step`, or the default
    /// when it fails [`validate`](Self::validate).
    pub fn effective_gradient_step(&self) -> f32 {
        if self.validate().is_ok() {
            self.gradient_step
        } else {
            warn!(
                step = self.gradient_step,
                "unusable gradient_step, probing at the default"
            );
            Self::DEFAULT_GRADIENT_STEP
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a [`CollisionWorld`](crate::CollisionWorld).
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionConfig {
    /// Tree build parameters.
    pub tree: TreeConfig,

    /// Margin added on every side of each shape's bounds before the build.
    ///
    /// Default: 0.0. Must be finite and non-negative.
    pub grow_bounds: f32,
}

impl CollisionConfig {
    /// Default bounds margin.
    pub const DEFAULT_GROW_BOUNDS: f32 = 0.0;

    /// Create a config with default tree parameters and no margin.
    pub fn new() -> Self {
        Self {
            tree: TreeConfig::new(),
            grow_bounds: Self::DEFAULT_GROW_BOUNDS,
        }
    }

    /// Check the tree config and the margin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tree.validate()?;
        if !self.grow_bounds.is_finite() || self.grow_bounds < 0.0 {
            return Err(ConfigError::InvalidMargin {
                value: self.grow_bounds,
            });
        }
        Ok(())
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let tree = TreeConfig::default();
        assert_eq!(tree.max_depth, 8);
        assert_eq!(tree.split_tests, 5);
        let q = QueryOptions::default();
        assert_eq!(q.max_iterations, 1024);
        assert_eq!(q.root_offset, 0);
        assert!(!q.gradient_normal);
        assert!(q.with_gradient_normal().gradient_normal);
    }

    #[test]
    fn tree_config_rejects_zero_split_tests() {
        let cfg = TreeConfig {
            split_tests: 0,
            ..TreeConfig::new()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoSplitTests));
    }

    #[test]
    fn tree_config_rejects_excessive_depth() {
        let cfg = TreeConfig {
            max_depth: 40,
            ..TreeConfig::new()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DepthTooLarge {
                configured: 40,
                max: 32
            })
        );
    }

    #[test]
    fn gradient_step_must_be_positive_and_finite() {
        assert!(QueryOptions::new().validate().is_ok());
        for step in [0.0, -0.01, f32::NAN, f32::INFINITY] {
            let options = QueryOptions {
                gradient_step: step,
                ..QueryOptions::new()
            };
            assert!(matches!(
                options.validate(),
                Err(ConfigError::InvalidGradientStep { .. })
            ));
            assert!(QueryOptions::new().with_gradient_step(step).is_err());
            assert_eq!(
                options.effective_gradient_step(),
                QueryOptions::DEFAULT_GRADIENT_STEP
            );
        }
        let options = QueryOptions::new().with_gradient_step(0.05).unwrap();
        assert!(options.gradient_normal);
        assert_eq!(options.effective_gradient_step(), 0.05);
    }

    #[test]
    fn collision_config_rejects_negative_margin() {
        let cfg = CollisionConfig {
            grow_bounds: -0.5,
            ..CollisionConfig::new()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidMargin { value: -0.5 }));
        assert!(CollisionConfig::new().validate().is_ok());
    }
}

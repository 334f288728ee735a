//! Nearest-shape point queries against a built [`BoundsTree`].

use glam::Vec3;
use smallvec::SmallVec;
use tracing::warn;

use crate::config::QueryOptions;
use crate::distance::{unit_or_default, DistanceField, DEFAULT_NORMAL};
use crate::tree::BoundsTree;

/// Result of a nearest query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryHit {
    /// Number of evaluated shapes with distance `<= 0`.
    pub hits: u32,
    /// Smallest signed distance found; `+inf` if nothing was evaluated.
    pub distance: f32,
    /// Normal of the nearest shape, or the finite-difference estimate.
    pub normal: Vec3,
    /// Nodes popped during the traversal.
    pub iterations: u32,
    /// The iteration cap stopped the traversal with work left on the stack.
    pub truncated: bool,
}

impl QueryHit {
    /// The answer for an empty tree.
    pub const MISS: Self = Self {
        hits: 0,
        distance: f32::INFINITY,
        normal: DEFAULT_NORMAL,
        iterations: 0,
        truncated: false,
    };

    /// Whether the point lies inside at least one shape.
    pub fn is_inside(&self) -> bool {
        self.hits > 0
    }
}

impl Default for QueryHit {
    fn default() -> Self {
        Self::MISS
    }
}

struct Accumulator {
    hit: QueryHit,
    probe: Vec3,
    step: f32,
}

impl Accumulator {
    fn new(options: &QueryOptions) -> Self {
        let step = if options.gradient_normal {
            options.effective_gradient_step()
        } else {
            options.gradient_step
        };
        Self {
            hit: QueryHit::MISS,
            probe: Vec3::INFINITY,
            step,
        }
    }

    fn visit<P, F>(&mut self, point: Vec3, payload: &P, field: &F, options: &QueryOptions)
    where
        F: DistanceField<P> + ?Sized,
    {
        let (distance, normal) = field.distance(point, payload);
        if options.gradient_normal {
            let h = self.step;
            self.probe = self.probe.min(Vec3::new(
                field.distance(point + Vec3::X * h, payload).0,
                field.distance(point + Vec3::Y * h, payload).0,
                field.distance(point + Vec3::Z * h, payload).0,
            ));
        }
        if distance < self.hit.distance {
            self.hit.distance = distance;
            self.hit.normal = normal;
        }
        if distance <= 0.0 {
            self.hit.hits += 1;
        }
    }

    fn finish(mut self, options: &QueryOptions) -> QueryHit {
        if options.gradient_normal && self.hit.distance.is_finite() {
            self.hit.normal = unit_or_default(self.probe - Vec3::splat(self.hit.distance));
        }
        self.hit
    }
}

impl<P: Copy> BoundsTree<P> {
    /// Find the shape nearest to `point`.
    ///
    /// The traversal starts at `options.root_offset` and keeps an explicit
    /// stack of node indices. At a leaf every payload is measured with
    /// `field`; at an internal node each child is pushed only if its box
    /// touches the point or is closer than the best distance so far, the
    /// farther child first so the nearer one is visited next. After
    /// `options.max_iterations` pops the walk stops and the result is
    /// flagged as truncated. An unusable `gradient_step` is replaced by
    /// the default.
    pub fn nearest<F>(&self, point: Vec3, field: &F, options: &QueryOptions) -> QueryHit
    where
        F: DistanceField<P> + ?Sized,
    {
        let nodes = self.nodes();
        let payloads = self.payloads();
        if nodes.is_empty() {
            return QueryHit::MISS;
        }
        let base = options.root_offset as usize;
        let mut acc = Accumulator::new(options);
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(0);

        while !stack.is_empty() {
            if acc.hit.iterations >= options.max_iterations {
                acc.hit.truncated = true;
                warn!(
                    cap = options.max_iterations,
                    pending = stack.len(),
                    "nearest query hit the iteration cap"
                );
                break;
            }
            let Some(index) = stack.pop() else { break };
            acc.hit.iterations += 1;
            let Some(node) = nodes.get(base + index as usize) else {
                continue;
            };

            if node.is_leaf() {
                let Some(range) = payloads.get(node.item_range()) else {
                    continue;
                };
                for payload in range {
                    acc.visit(point, payload, field, options);
                }
                continue;
            }

            let left = node.start_index;
            let right = left + 1;
            let (Some(l), Some(r)) = (
                nodes.get(base + left as usize),
                nodes.get(base + right as usize),
            ) else {
                continue;
            };
            let dl = l.bounds().signed_distance(point);
            let dr = r.bounds().signed_distance(point);
            let (near, near_d, far, far_d) = if dl <= dr {
                (left, dl, right, dr)
            } else {
                (right, dr, left, dl)
            };
            // Boxes touching the point may still hold surfaces through it.
            let best = acc.hit.distance;
            if far_d <= 0.0 || far_d < best {
                stack.push(far);
            }
            if near_d <= 0.0 || near_d < best {
                stack.push(near);
            }
        }

        acc.finish(options)
    }

    /// Measure every payload of the last build; the reference answer for
    /// [`nearest`](Self::nearest).
    pub fn nearest_brute_force<F>(&self, point: Vec3, field: &F, options: &QueryOptions) -> QueryHit
    where
        F: DistanceField<P> + ?Sized,
    {
        let mut acc = Accumulator::new(options);
        for payload in self.payloads() {
            acc.visit(point, payload, field, options);
        }
        acc.finish(options)
    }
}

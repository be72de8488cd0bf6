use strata_common::{Aabb, Candidate, SchedError, try_with_capacity};

use crate::frustum::Frustum;

/// Positive-vertex test against all six planes, exiting on the first reject.
///
/// Boxes that straddle a plane are kept.
#[inline]
pub fn aabb_visible(frustum: &Frustum, aabb: &Aabb) -> bool {
    for plane in frustum.planes() {
        let p = aabb.positive_vertex(plane.normal);
        if plane.signed_distance(p) < 0.0 {
            return false;
        }
    }
    true
}

/// Counters from the last [`VisibilityFilter::filter_where`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Candidates that passed the include predicate.
    pub tested: usize,
    pub visible: usize,
    pub culled: usize,
    /// Visible candidates that did not fit in the output array.
    pub dropped: usize,
}

/// Reusable visible-index buffer.
#[derive(Debug)]
pub struct VisibilityFilter {
    visible: Vec<u32>,
    capacity: usize,
    stats: FilterStats,
}

impl VisibilityFilter {
    pub fn with_capacity(capacity: usize) -> Result<Self, SchedError> {
        Ok(Self {
            visible: try_with_capacity(capacity, "visibility output")?,
            capacity,
            stats: FilterStats::default(),
        })
    }

    /// Filter every candidate.
    pub fn filter(&mut self, frustum: &Frustum, candidates: &[Candidate]) -> &[u32] {
        self.filter_where(frustum, candidates, |_| true)
    }

    /// Filter the candidates for which `include` holds, writing visible
    /// candidate indices in ascending order. Indices past capacity are
    /// dropped, so the first `capacity` visible candidates always survive.
    pub fn filter_where<F>(
        &mut self,
        frustum: &Frustum,
        candidates: &[Candidate],
        mut include: F,
    ) -> &[u32]
    where
        F: FnMut(&Candidate) -> bool,
    {
        self.visible.clear();
        let mut stats = FilterStats::default();

        for (index, candidate) in candidates.iter().enumerate() {
            if !include(candidate) {
                continue;
            }
            stats.tested += 1;
            if !candidate.always_visible && !aabb_visible(frustum, &candidate.bounds) {
                stats.culled += 1;
                continue;
            }
            stats.visible += 1;
            if self.visible.len() < self.capacity {
                self.visible.push(index as u32);
            } else {
                stats.dropped += 1;
            }
        }

        self.stats = stats;
        &self.visible
    }

    pub fn visible(&self) -> &[u32] {
        &self.visible
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

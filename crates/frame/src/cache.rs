use glam::Mat4;
use strata_common::{SchedError, try_with_capacity};
use strata_sort::DrawCommand;

/// Everything a cached static list depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub revision: u64,
    /// Bit patterns, so `-0.0` and NaN compare exactly.
    pub view_proj: [u32; 16],
    pub cascades: usize,
}

impl CacheKey {
    pub fn new(revision: u64, view_proj: &Mat4, cascades: usize) -> Self {
        Self {
            revision,
            view_proj: view_proj.to_cols_array().map(f32::to_bits),
            cascades,
        }
    }
}

/// Counts for static candidates that a cache hit does not re-test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticTally {
    pub visible: usize,
    pub culled: usize,
    pub unknown: u32,
}

/// Sorted static commands of one view, replayed while its key holds.
///
/// A view owns one list per pool it fills: one for a shadow cascade, two
/// (opaque, transparent) for the main camera.
#[derive(Debug)]
pub struct StaticCommandCache {
    key: Option<CacheKey>,
    lists: Vec<Vec<DrawCommand>>,
    tally: StaticTally,
}

impl StaticCommandCache {
    /// A zero `capacity` makes a cache that is never stored into.
    pub fn with_capacity(lists: usize, capacity: usize) -> Result<Self, SchedError> {
        let lists = (0..lists)
            .map(|_| try_with_capacity(capacity, "static command cache"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            key: None,
            lists,
            tally: StaticTally::default(),
        })
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        self.key.as_ref() == Some(key)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        for list in &mut self.lists {
            list.clear();
        }
    }

    /// Keep the static subsequence of a fully sorted list. The list must
    /// not exceed the capacity the cache was built with.
    pub fn store(&mut self, list: usize, sorted: &[DrawCommand]) {
        let Some(out) = self.lists.get_mut(list) else {
            return;
        };
        out.clear();
        out.extend(sorted.iter().filter(|c| c.is_static).copied());
    }

    /// Mark the stored lists valid for `key`.
    pub fn commit(&mut self, key: CacheKey, tally: StaticTally) {
        self.key = Some(key);
        self.tally = tally;
    }

    pub fn list(&self, list: usize) -> &[DrawCommand] {
        self.lists.get(list).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tally(&self) -> StaticTally {
        self.tally
    }

    pub fn is_valid(&self) -> bool {
        self.key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(source: u32, is_static: bool) -> DrawCommand {
        DrawCommand {
            source,
            is_static,
            ..DrawCommand::default()
        }
    }

    #[test]
    fn key_compares_matrix_bits() {
        let a = CacheKey::new(1, &Mat4::IDENTITY, 0);
        let mut m = Mat4::IDENTITY;
        m.w_axis.x = -0.0;
        assert_eq!(a, CacheKey::new(1, &Mat4::IDENTITY, 0));
        assert_ne!(a, CacheKey::new(1, &m, 0));
        assert_ne!(a, CacheKey::new(2, &Mat4::IDENTITY, 0));
        assert_ne!(a, CacheKey::new(1, &Mat4::IDENTITY, 1));
    }

    #[test]
    fn stores_only_static_commands_in_order() {
        let mut cache = StaticCommandCache::with_capacity(2, 8).unwrap();
        let sorted = [cmd(4, true), cmd(1, false), cmd(2, true)];
        cache.store(0, &sorted);
        let sources: Vec<u32> = cache.list(0).iter().map(|c| c.source).collect();
        assert_eq!(sources, [4, 2]);
        assert!(cache.list(1).is_empty());
        assert!(cache.list(7).is_empty());
    }

    #[test]
    fn valid_only_after_commit() {
        let mut cache = StaticCommandCache::with_capacity(1, 4).unwrap();
        let key = CacheKey::new(3, &Mat4::IDENTITY, 0);
        cache.store(0, &[cmd(0, true)]);
        assert!(!cache.matches(&key));
        cache.commit(
            key,
            StaticTally {
                visible: 1,
                ..StaticTally::default()
            },
        );
        assert!(cache.matches(&key));
        assert_eq!(cache.tally().visible, 1);

        cache.invalidate();
        assert!(!cache.is_valid());
        assert!(cache.list(0).is_empty());
    }
}

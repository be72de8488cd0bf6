use strata_common::{SchedError, try_with_capacity};

use crate::key::RenderKey;
use crate::pool::DrawCommand;

pub const DIGIT_BITS: u32 = 8;
pub const BUCKETS: usize = 1 << DIGIT_BITS;
/// Digit passes for a 64-bit key.
pub const PASSES: usize = 64 / DIGIT_BITS as usize;

/// Something the radix sorter can order.
pub trait SortKey {
    fn sort_key(&self) -> u64;

    /// Secondary order used only when merging two presorted runs.
    fn tie_break(&self) -> u32 {
        0
    }
}

impl SortKey for DrawCommand {
    #[inline]
    fn sort_key(&self) -> u64 {
        self.key.0
    }

    #[inline]
    fn tie_break(&self) -> u32 {
        self.source
    }
}

impl SortKey for RenderKey {
    #[inline]
    fn sort_key(&self) -> u64 {
        self.0
    }
}

/// Stable least-significant-digit radix sort with a preallocated auxiliary buffer.
#[derive(Debug)]
pub struct RadixSorter<T> {
    aux: Vec<T>,
    histograms: [[u32; BUCKETS]; PASSES],
}

impl<T: SortKey + Copy + Default> RadixSorter<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self, SchedError> {
        let mut aux = try_with_capacity(capacity, "sort auxiliary buffer")?;
        aux.resize(capacity, T::default());
        Ok(Self {
            aux,
            histograms: [[0; BUCKETS]; PASSES],
        })
    }

    pub fn capacity(&self) -> usize {
        self.aux.len()
    }

    /// Sort `items` ascending by key. Equal keys keep their relative order.
    pub fn sort(&mut self, items: &mut [T]) -> Result<(), SchedError> {
        let n = items.len();
        self.check_capacity(n)?;
        if n < 2 {
            return Ok(());
        }
        let Self { aux, histograms } = self;
        let aux = &mut aux[..n];

        // One read of the input fills every pass's histogram.
        for h in histograms.iter_mut() {
            h.fill(0);
        }
        for item in items.iter() {
            let key = item.sort_key();
            for (pass, h) in histograms.iter_mut().enumerate() {
                h[digit(key, pass)] += 1;
            }
        }

        for (pass, offsets) in histograms.iter_mut().enumerate() {
            let mut sum = 0u32;
            for slot in offsets.iter_mut() {
                let count = *slot;
                *slot = sum;
                sum += count;
            }
            if pass % 2 == 0 {
                scatter(items, aux, offsets, pass);
            } else {
                scatter(aux, items, offsets, pass);
            }
        }

        // An odd pass count leaves the result in the auxiliary buffer.
        if PASSES % 2 == 1 {
            items.copy_from_slice(aux);
        }
        Ok(())
    }

    /// Merge the presorted runs `items[..split]` and `items[split..]` by
    /// `(key, tie_break)`, taking from the left run on full ties.
    pub fn merge(&mut self, items: &mut [T], split: usize) -> Result<(), SchedError> {
        let n = items.len();
        self.check_capacity(n)?;
        if split == 0 || split >= n {
            return Ok(());
        }
        let out = &mut self.aux[..n];
        let (left, right) = items.split_at(split);
        let (mut i, mut j) = (0, 0);
        for slot in out.iter_mut() {
            let take_left = match (left.get(i), right.get(j)) {
                (Some(l), Some(r)) => {
                    (l.sort_key(), l.tie_break()) <= (r.sort_key(), r.tie_break())
                }
                (Some(_), None) => true,
                _ => false,
            };
            if take_left {
                *slot = left[i];
                i += 1;
            } else {
                *slot = right[j];
                j += 1;
            }
        }
        items.copy_from_slice(out);
        Ok(())
    }

    fn check_capacity(&self, n: usize) -> Result<(), SchedError> {
        if n > self.aux.len() {
            tracing::debug!(capacity = self.aux.len(), requested = n, "sort input exceeds scratch buffer");
            return Err(SchedError::CapacityExceeded {
                what: "sort auxiliary buffer",
                capacity: self.aux.len(),
                requested: n,
            });
        }
        Ok(())
    }
}

#[inline]
fn digit(key: u64, pass: usize) -> usize {
    ((key >> (pass as u32 * DIGIT_BITS)) as usize) & (BUCKETS - 1)
}

#[inline]
fn scatter<T: SortKey + Copy>(src: &[T], dst: &mut [T], offsets: &mut [u32; BUCKETS], pass: usize) {
    for item in src {
        let d = digit(item.sort_key(), pass);
        dst[offsets[d] as usize] = *item;
        offsets[d] += 1;
    }
}

/// Conditions the frame recovers from and reports through `tracing::warn!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recovered {
    CommandOverflow,
    UniformExhausted,
    UnknownId,
    DegenerateFrustum,
    MissingTransform,
    CascadesTruncated,
    PassFailed,
    FinishFailed,
}

const KINDS: usize = 8;

/// Rate limiter for steady-state warnings: the first occurrence is logged,
/// then at most one per `interval` frames for each kind.
#[derive(Debug)]
pub(crate) struct WarnGate {
    interval: u64,
    last: [Option<u64>; KINDS],
}

impl WarnGate {
    pub(crate) fn new(interval: u64) -> Self {
        Self {
            interval,
            last: [None; KINDS],
        }
    }

    pub(crate) fn allow(&mut self, kind: Recovered, frame: u64) -> bool {
        let slot = &mut self.last[kind as usize];
        match *slot {
            Some(prev) if frame.saturating_sub(prev) < self.interval => false,
            _ => {
                *slot = Some(frame);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_then_once_per_interval() {
        let mut gate = WarnGate::new(10);
        assert!(gate.allow(Recovered::CommandOverflow, 3));
        assert!(!gate.allow(Recovered::CommandOverflow, 4));
        assert!(!gate.allow(Recovered::CommandOverflow, 12));
        assert!(gate.allow(Recovered::CommandOverflow, 13));
    }

    #[test]
    fn kinds_are_independent() {
        let mut gate = WarnGate::new(100);
        assert!(gate.allow(Recovered::UnknownId, 0));
        assert!(gate.allow(Recovered::UniformExhausted, 0));
        assert!(!gate.allow(Recovered::UnknownId, 1));
    }
}

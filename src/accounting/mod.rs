//! Allocation accounting
//!
//! Sums object lifecycle events observed inside the activation interval.

mod accumulator;

pub use accumulator::MemoryAccumulator;

/// Running totals for one probe. Every field only grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AccumulatedCounters {
    /// Bytes of objects created while active
    pub allocated_bytes: u64,

    /// Bytes of objects released while active
    pub freed_bytes: u64,

    /// Objects created while active
    pub allocation_count: u64,

    /// Objects released while active
    pub deallocation_count: u64,
}

impl AccumulatedCounters {
    /// `allocated_bytes - freed_bytes`, clamped into `i64`.
    pub fn net_allocated_bytes(&self) -> i64 {
        let net = self.allocated_bytes as i128 - self.freed_bytes as i128;
        net.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// Optional detail collected when growth profiling is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GrowthProfile {
    /// Highest net growth observed at any point while active
    pub peak_net_bytes: i64,

    /// Number of times the activation interval opened
    pub activations: u64,

    /// Object events dropped because the probe was inactive
    pub ignored_events: u64,
}

impl GrowthProfile {
    /// One-line summary.
    pub fn report(&self) -> String {
        format!(
            "peak={}B activations={} ignored={}",
            self.peak_net_bytes, self.activations, self.ignored_events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_may_be_negative() {
        let counters = AccumulatedCounters {
            allocated_bytes: 10,
            freed_bytes: 25,
            allocation_count: 1,
            deallocation_count: 2,
        };
        assert_eq!(counters.net_allocated_bytes(), -15);
    }

    #[test]
    fn test_net_clamps_at_i64_bounds() {
        let huge = AccumulatedCounters {
            allocated_bytes: u64::MAX,
            ..Default::default()
        };
        assert_eq!(huge.net_allocated_bytes(), i64::MAX);

        let drained = AccumulatedCounters {
            freed_bytes: u64::MAX,
            ..Default::default()
        };
        assert_eq!(drained.net_allocated_bytes(), i64::MIN);
    }
}

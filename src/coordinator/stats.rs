use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters describing what the coordinator has done
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Sampler ticks delivered to the coordinator
    pub ticks_observed: u64,
    /// Ticks dropped because the coordinator was not scanning or had no frame
    pub ticks_ignored: u64,
    pub decode_attempts: u64,
    pub decode_misses: u64,
    /// Codes handed to the resolver, decoded or manual
    pub submissions: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
}

impl ScanStats {
    /// Fraction of decode attempts that found a code
    pub fn hit_rate(&self) -> f64 {
        if self.decode_attempts == 0 {
            return 0.0;
        }
        (self.decode_attempts - self.decode_misses) as f64 / self.decode_attempts as f64
    }
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} ignored={} decodes={} misses={} submissions={} sessions={}/{}",
            self.ticks_observed,
            self.ticks_ignored,
            self.decode_attempts,
            self.decode_misses,
            self.submissions,
            self.sessions_opened,
            self.sessions_closed
        )
    }
}

//! Process-lifetime write verifier (spec §5, §9): a value that changes
//! only across server restarts, letting clients detect that an UNSTABLE
//! write must be replayed.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::vfs::StableVerifier;

/// Threaded explicitly through [`crate::context::CallContext`] rather than a
/// hidden global (spec §9's instruction).
#[derive(Debug, Copy, Clone)]
pub struct WriteVerifier(StableVerifier);

impl WriteVerifier {
    /// Seeds from the current time at process startup. Collisions across
    /// restarts within the same second are acceptable: the verifier only
    /// needs to change often enough that clients notice a restart happened.
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        WriteVerifier(StableVerifier(nanos.to_be_bytes()))
    }

    pub fn get(&self) -> StableVerifier {
        self.0
    }
}

impl Default for WriteVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_stable_across_reads() {
        let verifier = WriteVerifier::new();
        assert_eq!(verifier.get(), verifier.get());
    }
}

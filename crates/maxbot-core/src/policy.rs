//! Escalation policy.
//!
//! Pure mapping from an accumulated warning count to an enforcement step.
//! The mute trigger fires only on exact equality with the threshold - a
//! single escalation event per user, preserved from the reference system.

use std::time::Duration;

/// Enforcement step for a freshly incremented warning count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escalation {
    /// Warn the user in-channel; no platform-enforced action.
    Notify,
    /// Platform timeout for the given duration.
    Timeout(Duration),
    /// Platform ban (the orchestrator clears the ledger entry on success).
    Ban,
}

/// Decide the enforcement step. Requires `mute_threshold < ban_threshold`
/// (validated at config load).
pub fn decide(
    count: u32,
    mute_threshold: u32,
    ban_threshold: u32,
    mute_duration: Duration,
) -> Escalation {
    if count >= ban_threshold {
        Escalation::Ban
    } else if count == mute_threshold {
        Escalation::Timeout(mute_duration)
    } else {
        Escalation::Notify
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUTE: u32 = 6;
    const BAN: u32 = 10;
    const DURATION: Duration = Duration::from_secs(600);

    fn decide_default(count: u32) -> Escalation {
        decide(count, MUTE, BAN, DURATION)
    }

    #[test]
    fn decision_table() {
        for count in 0..MUTE {
            assert_eq!(decide_default(count), Escalation::Notify, "count={count}");
        }

        assert_eq!(decide_default(MUTE), Escalation::Timeout(DURATION));

        // Exact-equality trigger: counts between the thresholds drop back to
        // Notify; nothing above the mute threshold re-triggers a timeout.
        for count in MUTE + 1..BAN {
            assert_eq!(decide_default(count), Escalation::Notify, "count={count}");
        }

        for count in BAN..BAN + 20 {
            assert_eq!(decide_default(count), Escalation::Ban, "count={count}");
        }
    }

    #[test]
    fn timeout_carries_the_configured_duration() {
        let d = Duration::from_secs(120);
        assert_eq!(decide(MUTE, MUTE, BAN, d), Escalation::Timeout(d));
    }
}

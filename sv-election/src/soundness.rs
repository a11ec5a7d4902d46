//! The soundness bound of the challenge audit, exposed so callers can
//! size their challenge instead of relying on a baked-in constant.
//!
//! The trade-off: every challenged record is fully opened, revealing that
//! one vote. A larger challenge raises the detection probability and
//! reveals more individual (pseudonymous) votes; the right size depends
//! on how many falsified votes an adversary is assumed to risk.

/// Lower bound on the probability that a uniform challenge of
/// `challenge_size` records (drawn without replacement) hits at least one
/// of `falsified_votes` bad records among `total_votes`:
/// `1 - ((n - k) / n)^c`.
///
/// Zero falsified votes means nothing to detect, so the bound is 0.
pub fn detection_probability(
    total_votes: u64,
    falsified_votes: u64,
    challenge_size: u64,
) -> f64 {
    if total_votes == 0 || falsified_votes == 0 {
        return 0.0;
    }
    if falsified_votes >= total_votes || challenge_size >= total_votes {
        return 1.0;
    }
    let miss = (total_votes - falsified_votes) as f64 / total_votes as f64;
    1.0 - miss.powi(challenge_size as i32)
}

/// Smallest challenge size whose bound reaches `target_probability`
/// against a worst case of `falsified_votes` out of `total_votes`.
/// Saturates at `total_votes` (auditing everything detects any
/// falsification with certainty).
pub fn challenge_size_for(
    total_votes: u64,
    falsified_votes: u64,
    target_probability: f64,
) -> u64 {
    if total_votes == 0 || falsified_votes == 0 || target_probability <= 0.0 {
        return 0;
    }
    if falsified_votes >= total_votes {
        return 1;
    }
    if target_probability >= 1.0 {
        return total_votes;
    }
    let miss = (total_votes - falsified_votes) as f64 / total_votes as f64;
    let c = ((1.0 - target_probability).ln() / miss.ln()).ceil() as u64;
    c.max(1).min(total_votes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_challenge_always_detects() {
        assert_eq!(detection_probability(10, 1, 10), 1.0);
    }

    #[test]
    fn nothing_falsified_nothing_to_detect() {
        assert_eq!(detection_probability(10, 0, 5), 0.0);
        assert_eq!(challenge_size_for(10, 0, 0.99), 0);
    }

    #[test]
    fn bound_matches_closed_form() {
        let p = detection_probability(100, 10, 20);
        let expected = 1.0 - 0.9f64.powi(20);
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn bound_grows_with_challenge_size() {
        let p1 = detection_probability(100, 5, 10);
        let p2 = detection_probability(100, 5, 30);
        assert!(p2 > p1);
    }

    #[test]
    fn sized_challenge_reaches_its_target() {
        for &(n, k, target) in &[(100u64, 1u64, 0.5), (100, 5, 0.99), (1000, 10, 0.999)] {
            let c = challenge_size_for(n, k, target);
            assert!(detection_probability(n, k, c) >= target);
            if c > 1 {
                assert!(detection_probability(n, k, c - 1) < target);
            }
        }
    }

    #[test]
    fn certainty_requires_full_audit() {
        assert_eq!(challenge_size_for(50, 1, 1.0), 50);
    }
}

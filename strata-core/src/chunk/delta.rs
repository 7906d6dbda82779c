//! Timestamp delta transform
//!
//! Replaces every timestamp but the first with its distance from the
//! previous one. Not applied to the chunk body; callers opt in explicitly.

use crate::Sample;

/// Delta-encode timestamps; values are left untouched
pub fn encode_timestamps(samples: &[Sample]) -> Vec<Sample> {
    let mut prev = 0i64;
    samples
        .iter()
        .map(|s| {
            let delta = s.timestamp.wrapping_sub(prev);
            prev = s.timestamp;
            Sample::new(delta, s.value)
        })
        .collect()
}

/// Reverse `encode_timestamps`
pub fn decode_timestamps(samples: &[Sample]) -> Vec<Sample> {
    let mut acc = 0i64;
    samples
        .iter()
        .map(|s| {
            acc = acc.wrapping_add(s.timestamp);
            Sample::new(acc, s.value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(pairs: &[(i64, f64)]) -> Vec<Sample> {
        pairs.iter().map(|&p| Sample::from(p)).collect()
    }

    #[test]
    fn test_encode() {
        let encoded = encode_timestamps(&samples(&[(100, 20.0), (200, 10.0), (201, 15.0), (202, 100.0)]));
        assert_eq!(
            encoded,
            samples(&[(100, 20.0), (100, 10.0), (1, 15.0), (1, 100.0)])
        );
    }

    #[test]
    fn test_decode() {
        let decoded = decode_timestamps(&samples(&[(100, 20.0), (100, 10.0), (1, 15.0), (1, 100.0)]));
        assert_eq!(
            decoded,
            samples(&[(100, 20.0), (200, 10.0), (201, 15.0), (202, 100.0)])
        );
    }

    #[test]
    fn test_extreme_timestamps() {
        let original = samples(&[(i64::MIN, 0.0), (i64::MAX, 1.0), (-5, 2.0)]);
        assert_eq!(decode_timestamps(&encode_timestamps(&original)), original);
        assert!(encode_timestamps(&[]).is_empty());
    }
}

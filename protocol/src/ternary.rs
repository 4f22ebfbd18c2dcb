//! # Balanced Ternary Utilities
//!
//! Conversion between the three representations the protocol juggles:
//! trits (`i8` in {-1, 0, 1}), trytes (27-symbol strings), and plain
//! integers. Everything cryptographic downstream — keys, addresses, bundle
//! hashes, proof-of-work — is defined over trits; trytes exist for humans
//! and the wire.
//!
//! Trit sequences are little-endian: index 0 is the least significant digit.
//!
//! These functions treat malformed input (non-tryte characters, trit buffers
//! whose length is not a multiple of three) as programmer error and panic.
//! Validate untrusted wire data with [`is_trytes`] before converting; the
//! cryptographic core never widens or coerces lengths silently.

use crate::config::{TRITS_PER_TRYTE, TRYTE_ALPHABET};

/// A balanced-ternary digit: -1, 0, or 1.
pub type Trit = i8;

/// Returns `true` if every character of `input` belongs to the tryte
/// alphabet. The empty string is valid (zero trytes).
pub fn is_trytes(input: &str) -> bool {
    input.chars().all(|c| c == '9' || c.is_ascii_uppercase())
}

/// Returns `true` if `input` is a non-empty string of `9`s — the sentinel
/// the bundle layer uses for unfilled signature, hash, and nonce fields.
pub fn is_all_nines(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b == b'9')
}

/// The value a single tryte character carries, in [-13, 13].
///
/// `9` is zero, `A`..`M` count up from 1, `N`..`Z` count up from -13.
/// Panics on characters outside the alphabet.
pub fn tryte_value(tryte: char) -> i8 {
    match tryte {
        '9' => 0,
        'A'..='Z' => {
            let index = (tryte as u8 - b'A' + 1) as i8;
            if index > 13 {
                index - 27
            } else {
                index
            }
        }
        other => panic!("invalid tryte character: {other:?}"),
    }
}

/// Decode a tryte string into trits, three per character, little-endian
/// within each tryte.
pub fn trits_from_trytes(trytes: &str) -> Vec<Trit> {
    let mut trits = Vec::with_capacity(trytes.len() * TRITS_PER_TRYTE);
    for tryte in trytes.chars() {
        let mut value = i64::from(tryte_value(tryte));
        for _ in 0..TRITS_PER_TRYTE {
            let mut rem = value % 3;
            value /= 3;
            if rem > 1 {
                rem -= 3;
                value += 1;
            } else if rem < -1 {
                rem += 3;
                value -= 1;
            }
            trits.push(rem as Trit);
        }
    }
    trits
}

/// Decode a tryte string into exactly `length` trits, zero-padding on the
/// right. Used for seeds and tags, which are defined by their trit width
/// rather than by however many characters the user happened to type.
pub fn trits_padded(trytes: &str, length: usize) -> Vec<Trit> {
    let mut trits = trits_from_trytes(trytes);
    trits.truncate(length);
    trits.resize(length, 0);
    trits
}

/// Encode trits as a tryte string. The slice length must be a multiple
/// of three.
pub fn trytes_from_trits(trits: &[Trit]) -> String {
    assert!(
        trits.len() % TRITS_PER_TRYTE == 0,
        "trit length {} is not a multiple of {TRITS_PER_TRYTE}",
        trits.len()
    );
    let alphabet = TRYTE_ALPHABET.as_bytes();
    trits
        .chunks(TRITS_PER_TRYTE)
        .map(|chunk| {
            let value =
                i32::from(chunk[0]) + 3 * i32::from(chunk[1]) + 9 * i32::from(chunk[2]);
            alphabet[value.rem_euclid(27) as usize] as char
        })
        .collect()
}

/// Encode an integer as `length` balanced-ternary trits, little-endian.
///
/// Values that don't fit in `length` digits are silently truncated at the
/// top — by construction every protocol field is wide enough for its legal
/// range, so overflow here means a caller bug upstream.
pub fn trits_from_value(value: i64, length: usize) -> Vec<Trit> {
    let mut trits = vec![0 as Trit; length];
    let mut remainder = value;
    for trit in trits.iter_mut() {
        if remainder == 0 {
            break;
        }
        let mut rem = remainder % 3;
        remainder /= 3;
        if rem > 1 {
            rem -= 3;
            remainder += 1;
        } else if rem < -1 {
            rem += 3;
            remainder -= 1;
        }
        *trit = rem as Trit;
    }
    trits
}

/// Decode little-endian balanced-ternary trits back into an integer.
pub fn value_from_trits(trits: &[Trit]) -> i64 {
    trits
        .iter()
        .rev()
        .fold(0i64, |acc, &trit| acc * 3 + i64::from(trit))
}

/// Add one to a balanced-ternary counter in place, with carry.
///
/// A digit incremented past 1 wraps to -1 and carries left; when every
/// digit is 1 the whole counter wraps to all -1. This is the "+1 with
/// carry" used both for subseed derivation and the obsolete-tag
/// anti-collision counter.
pub fn increment(trits: &mut [Trit]) {
    for trit in trits.iter_mut() {
        *trit += 1;
        if *trit > 1 {
            *trit = -1;
        } else {
            break;
        }
    }
}

/// Right-pad a tryte string with `9`s to `length` characters.
///
/// Strings already at or beyond `length` are returned untouched — the
/// caller is expected to have chunked oversized input beforehand.
pub fn pad_trytes(trytes: &str, length: usize) -> String {
    let mut padded = String::with_capacity(length.max(trytes.len()));
    padded.push_str(trytes);
    while padded.len() < length {
        padded.push('9');
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tryte_values_span_the_alphabet() {
        assert_eq!(tryte_value('9'), 0);
        assert_eq!(tryte_value('A'), 1);
        assert_eq!(tryte_value('M'), 13);
        assert_eq!(tryte_value('N'), -13);
        assert_eq!(tryte_value('Z'), -1);
    }

    #[test]
    fn single_tryte_trit_patterns() {
        assert_eq!(trits_from_trytes("9"), vec![0, 0, 0]);
        assert_eq!(trits_from_trytes("A"), vec![1, 0, 0]);
        assert_eq!(trits_from_trytes("Z"), vec![-1, 0, 0]);
        assert_eq!(trits_from_trytes("M"), vec![1, 1, 1]);
        assert_eq!(trits_from_trytes("N"), vec![-1, -1, -1]);
    }

    #[test]
    fn trytes_roundtrip() {
        let input = "TRION9PROTOCOL9TEST9VECTOR";
        let trits = trits_from_trytes(input);
        assert_eq!(trits.len(), input.len() * 3);
        assert_eq!(trytes_from_trits(&trits), input);
    }

    #[test]
    fn value_roundtrip_across_sign() {
        for value in [-1_000_000, -14, -13, -1, 0, 1, 13, 14, 1_000_000] {
            let trits = trits_from_value(value, 81);
            assert_eq!(value_from_trits(&trits), value, "value {value}");
        }
    }

    #[test]
    fn value_encoding_matches_tryte_decoding() {
        // The two decode paths (char table vs arithmetic) must agree.
        for (i, tryte) in TRYTE_ALPHABET.chars().enumerate() {
            let expected = i64::from(tryte_value(tryte));
            let via_trits = value_from_trits(&trits_from_trytes(&tryte.to_string()));
            assert_eq!(via_trits, expected, "alphabet index {i}");
        }
    }

    #[test]
    fn increment_carries_and_wraps() {
        let mut counter = vec![0 as Trit; 3];
        increment(&mut counter);
        assert_eq!(counter, vec![1, 0, 0]);
        increment(&mut counter);
        assert_eq!(counter, vec![-1, 1, 0]);

        let mut all_ones = vec![1 as Trit; 3];
        increment(&mut all_ones);
        assert_eq!(all_ones, vec![-1, -1, -1]);
    }

    #[test]
    fn increment_is_plus_one() {
        let mut trits = trits_from_value(41, 9);
        increment(&mut trits);
        assert_eq!(value_from_trits(&trits), 42);
    }

    #[test]
    fn padded_seed_is_full_width() {
        let trits = trits_padded("TRION", 243);
        assert_eq!(trits.len(), 243);
        assert_eq!(&trits[..15], &trits_from_trytes("TRION")[..]);
        assert!(trits[15..].iter().all(|&t| t == 0));
    }

    #[test]
    fn nines_sentinel() {
        assert!(is_all_nines("999999999"));
        assert!(!is_all_nines(""));
        assert!(!is_all_nines("999A99999"));
    }

    #[test]
    fn trytes_validation() {
        assert!(is_trytes("TRION9ABCXYZ"));
        assert!(is_trytes(""));
        assert!(!is_trytes("trion"));
        assert!(!is_trytes("TRION-9"));
    }

    #[test]
    fn pad_trytes_fills_with_nines() {
        assert_eq!(pad_trytes("AB", 5), "AB999");
        assert_eq!(pad_trytes("ABCDE", 5), "ABCDE");
        assert_eq!(pad_trytes("ABCDEF", 5), "ABCDEF");
    }
}

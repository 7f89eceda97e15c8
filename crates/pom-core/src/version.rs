//! Maven version ordering and pre-release detection.
//!
//! Used by the analysis views to order conflicting candidate versions and to
//! count snapshot and pre-release dependencies. Resolution itself never
//! compares versions: nearest wins regardless of which version is newer.

use std::cmp::Ordering;

/// Detects if a Maven version string is a pre-release.
///
/// Maven pre-release qualifiers: SNAPSHOT, alpha, beta, rc, M (milestone).
pub fn is_prerelease(version: &str) -> bool {
    tokens(version)
        .iter()
        .any(|t| matches!(t, Token::Qualifier(q) if qualifier_rank(q) < RELEASE_RANK))
}

pub fn is_snapshot(version: &str) -> bool {
    version.to_uppercase().ends_with("SNAPSHOT")
}

/// Version ranges such as `[1.0,2.0)` are carried verbatim, never resolved.
pub fn is_range(version: &str) -> bool {
    version.starts_with(['[', '('])
}

/// Compares two Maven version strings.
///
/// Numeric segments compare numerically and rank above qualifiers. Known
/// qualifiers order as alpha < beta < milestone < rc < snapshot < release <
/// sp; unknown ones come after and compare lexically. Missing trailing
/// segments count as `0` or release, so `1.0 == 1` and `1.0-alpha < 1.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_tokens = tokens(a);
    let b_tokens = tokens(b);

    let max_len = a_tokens.len().max(b_tokens.len());
    for i in 0..max_len {
        let ord = match (a_tokens.get(i), b_tokens.get(i)) {
            (Some(at), Some(bt)) => compare_tokens(at, bt),
            (Some(at), None) => compare_to_missing(at),
            (None, Some(bt)) => compare_to_missing(bt).reverse(),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(String),
}

const RELEASE_RANK: u8 = 5;

fn qualifier_rank(q: &str) -> u8 {
    match q {
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "ga" | "final" | "release" => RELEASE_RANK,
        "sp" => 6,
        _ => 7,
    }
}

/// Splits on `.` and `-` and on every digit/letter transition.
fn tokens(version: &str) -> Vec<Token> {
    let mut out = Vec::new();
    for part in version.split(['.', '-']).filter(|s| !s.is_empty()) {
        let mut current = String::new();
        let mut digits = false;
        for ch in part.chars() {
            let is_digit = ch.is_ascii_digit();
            if !current.is_empty() && is_digit != digits {
                out.push(token(&current, digits));
                current.clear();
            }
            digits = is_digit;
            current.push(ch);
        }
        if !current.is_empty() {
            out.push(token(&current, digits));
        }
    }
    out
}

fn token(text: &str, digits: bool) -> Token {
    if digits && let Ok(n) = text.parse::<u64>() {
        return Token::Number(n);
    }
    Token::Qualifier(text.to_lowercase())
}

fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Number(an), Token::Number(bn)) => an.cmp(bn),
        (Token::Number(_), Token::Qualifier(_)) => Ordering::Greater,
        (Token::Qualifier(_), Token::Number(_)) => Ordering::Less,
        (Token::Qualifier(aq), Token::Qualifier(bq)) => qualifier_rank(aq)
            .cmp(&qualifier_rank(bq))
            .then_with(|| {
                if qualifier_rank(aq) == 7 {
                    aq.cmp(bq)
                } else {
                    Ordering::Equal
                }
            }),
    }
}

fn compare_to_missing(token: &Token) -> Ordering {
    match token {
        Token::Number(n) => n.cmp(&0),
        Token::Qualifier(q) => qualifier_rank(q).cmp(&RELEASE_RANK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prerelease_detection() {
        assert!(is_prerelease("1.0.0-SNAPSHOT"));
        assert!(is_prerelease("1.0.0-alpha"));
        assert!(is_prerelease("1.0.0-ALPHA"));
        assert!(is_prerelease("1.0.0-beta"));
        assert!(is_prerelease("1.0.0-rc1"));
        assert!(is_prerelease("1.0.0-RC1"));
        assert!(is_prerelease("2.0.0-M1"));
        assert!(is_prerelease("2.0.0-M10"));
    }

    #[test]
    fn test_stable_versions() {
        assert!(!is_prerelease("1.0.0"));
        assert!(!is_prerelease("3.14.0"));
        assert!(!is_prerelease("1.2.3.Final"));
        assert!(!is_prerelease("2.0.RELEASE"));
        assert!(!is_prerelease("1.0-sp1"));
    }

    #[test]
    fn test_snapshot_and_range() {
        assert!(is_snapshot("1.0-SNAPSHOT"));
        assert!(!is_snapshot("1.0-rc1"));
        assert!(is_range("[1.0,2.0)"));
        assert!(is_range("(,1.0]"));
        assert!(!is_range("1.0"));
    }

    #[test]
    fn test_version_comparison() {
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("10.0.0", "9.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_trailing_zeros_equal() {
        assert_eq!(compare_versions("1.0", "1"), Ordering::Equal);
        assert_eq!(compare_versions("1.0-final", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_qualifier_ordering() {
        let ordered = [
            "1.0-alpha1",
            "1.0-alpha2",
            "1.0-beta",
            "1.0-M1",
            "1.0-rc1",
            "1.0-SNAPSHOT",
            "1.0",
            "1.0-sp1",
            "1.0.1",
        ];
        for pair in ordered.windows(2) {
            assert_eq!(
                compare_versions(pair[0], pair[1]),
                Ordering::Less,
                "{} < {}",
                pair[0],
                pair[1]
            );
        }
    }
}

// redact.rs — Sensitive-data scrubbing pass, run before an entry is written.
//
// Replaces credit-card numbers (Luhn-validated), SSNs, and email addresses
// with fixed redaction tokens. The caller hashes the *pre-redaction* text
// for `args_digest` before calling `redact`, preserving chain-of-custody.

use regex::Regex;
use std::sync::OnceLock;

const CARD_TOKEN: &str = "[REDACTED:CARD]";
const SSN_TOKEN: &str = "[REDACTED:SSN]";
const EMAIL_TOKEN: &str = "[REDACTED:EMAIL]";

fn card_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap())
}

fn ssn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap())
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[[:alnum:].+_-]+@[[:alnum:].-]+\.[[:alpha:]]{2,}\b").unwrap())
}

/// Luhn check over a run of digits (spaces/dashes ignored).
fn passes_luhn(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate
        .chars()
        .filter(|c| c.is_ascii_digit())
        .map(|c| c.to_digit(10).unwrap())
        .collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &d in digits.iter().rev() {
        let mut v = d;
        if double {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
        double = !double;
    }
    sum % 10 == 0
}

/// Scrub a text payload, returning the redacted text and the number of
/// replacements made (used for the `policy_evaluated`-style audit note).
pub fn redact(text: &str) -> (String, usize) {
    let mut count = 0;

    let after_cards = card_pattern().replace_all(text, |caps: &regex::Captures| {
        let whole = &caps[0];
        if passes_luhn(whole) {
            count += 1;
            CARD_TOKEN.to_string()
        } else {
            whole.to_string()
        }
    });

    let after_ssn = ssn_pattern().replace_all(&after_cards, |_: &regex::Captures| {
        count += 1;
        SSN_TOKEN.to_string()
    });

    let after_email = email_pattern().replace_all(&after_ssn, |_: &regex::Captures| {
        count += 1;
        EMAIL_TOKEN.to_string()
    });

    (after_email.into_owned(), count)
}

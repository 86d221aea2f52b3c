// screen.rs — Sensitive-data screen over the `/proxy` payload (spec §4.6
// step 3): Luhn-validated credit cards, SSNs, and optional email/phone.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveKind {
    CreditCard,
    Ssn,
    Email,
    Phone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveFinding {
    pub kind: SensitiveKind,
    pub matched: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenResult {
    pub findings: Vec<SensitiveFinding>,
}

impl ScreenResult {
    pub fn has_kind(&self, kind: SensitiveKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }
}

fn card_candidate_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").expect("valid pattern"))
}

fn ssn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid pattern"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[\w.+-]+@[\w-]+\.[A-Za-z]{2,}\b").expect("valid pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:\+?1[ -]?)?\(?\d{3}\)?[ -]?\d{3}[ -]?\d{4}\b").expect("valid pattern")
    })
}

/// Luhn checksum validation over a digit string with separators stripped.
fn passes_luhn(digits: &str) -> bool {
    let cleaned: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if cleaned.len() < 13 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &digit in cleaned.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Screens raw text for sensitive-data patterns. `scan_email_phone`
/// controls whether the optional email/phone checks run (spec §4.6 marks
/// them "optional").
pub fn screen_text(text: &str, scan_email_phone: bool) -> ScreenResult {
    let mut findings = Vec::new();

    for m in card_candidate_pattern().find_iter(text) {
        if passes_luhn(m.as_str()) {
            findings.push(SensitiveFinding {
                kind: SensitiveKind::CreditCard,
                matched: m.as_str().to_string(),
            });
        }
    }

    for m in ssn_pattern().find_iter(text) {
        findings.push(SensitiveFinding {
            kind: SensitiveKind::Ssn,
            matched: m.as_str().to_string(),
        });
    }

    if scan_email_phone {
        for m in email_pattern().find_iter(text) {
            findings.push(SensitiveFinding {
                kind: SensitiveKind::Email,
                matched: m.as_str().to_string(),
            });
        }
        for m in phone_pattern().find_iter(text) {
            findings.push(SensitiveFinding {
                kind: SensitiveKind::Phone,
                matched: m.as_str().to_string(),
            });
        }
    }

    ScreenResult { findings }
}

/// Screens a parsed JSON payload by flattening it to its string content.
pub fn screen_payload(payload: &serde_json::Value, scan_email_phone: bool) -> ScreenResult {
    let mut text = String::new();
    flatten_strings(payload, &mut text);
    screen_text(&text, scan_email_phone)
}

fn flatten_strings(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::String(s) => {
            out.push_str(s);
            out.push(' ');
        }
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                flatten_strings(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_visa_number_passes_luhn() {
        let result = screen_text("card: 4111111111111111", false);
        assert!(result.has_kind(SensitiveKind::CreditCard));
    }

    #[test]
    fn invalid_card_like_number_is_ignored() {
        let result = screen_text("order id 1234567890123", false);
        assert!(!result.has_kind(SensitiveKind::CreditCard));
    }

    #[test]
    fn ssn_pattern_is_detected() {
        let result = screen_text("ssn 123-45-6789 on file", false);
        assert!(result.has_kind(SensitiveKind::Ssn));
    }

    #[test]
    fn email_and_phone_only_scanned_when_enabled() {
        let text = "contact a@b.com at 555-123-4567";
        assert!(!screen_text(text, false).has_kind(SensitiveKind::Email));
        let result = screen_text(text, true);
        assert!(result.has_kind(SensitiveKind::Email));
        assert!(result.has_kind(SensitiveKind::Phone));
    }

    #[test]
    fn screens_nested_json_payload() {
        let payload = json!({"customer": {"ssn": "123-45-6789"}, "notes": ["fine"]});
        let result = screen_payload(&payload, false);
        assert!(result.has_kind(SensitiveKind::Ssn));
    }
}

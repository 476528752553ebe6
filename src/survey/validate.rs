//! Input validation and normalization — pure and deterministic.
//!
//! Free text goes through three stages: length bound, allow-list
//! stripping, unsafe-substring redaction. Choice answers are checked
//! against the question's option set. The redaction step is defense in
//! depth only; it is not the transport layer's injection boundary.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationRejection;

use super::catalog::{Question, QuestionKind, TextRule};

/// Token substituted for each unsafe-substring match.
pub const REDACTION_TOKEN: &str = "(удалено)";

/// Script tags, SQL keyword sequences and comment delimiters. Angle
/// brackets are also stripped by the allow-list, so the tag pattern here
/// only matters for callers that skip stripping.
static UNSAFE_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        <\s*/?\s*script[^>]*>
        | [<>]
        | \b(select|insert|update|delete|drop|union|exec)\s+(from|into|table|set|all|where)\b
        | --
        | /\*
        | \*/
        ",
    )
    .expect("unsafe-substring pattern is valid")
});

/// Stateless input validator, parameterized by the free-text length bound.
#[derive(Debug, Clone)]
pub struct Validator {
    max_text_len: usize,
}

impl Validator {
    pub fn new(max_text_len: usize) -> Self {
        Self { max_text_len }
    }

    /// Validate a raw answer against its question's contract.
    pub fn answer(&self, question: &Question, raw: &str) -> Result<String, ValidationRejection> {
        match question.kind {
            QuestionKind::FreeText => match question.rule {
                Some(TextRule::FullName) => self.full_name(raw),
                Some(TextRule::TabNumber) => self.tab_number(raw),
                None => self.free_text(raw),
            },
            QuestionKind::SingleChoice | QuestionKind::MultiChoice | QuestionKind::Consent => {
                self.choice(raw, question.options).map(str::to_string)
            }
        }
    }

    /// Normalize a free-text answer.
    pub fn free_text(&self, raw: &str) -> Result<String, ValidationRejection> {
        let length = raw.chars().count();
        if length > self.max_text_len {
            return Err(ValidationRejection::TooLong {
                length,
                max: self.max_text_len,
            });
        }

        let stripped = strip_disallowed(raw);
        let normalized = normalize_whitespace(&stripped);
        if normalized.chars().count() < 2 {
            return Err(ValidationRejection::MeaninglessInput);
        }

        Ok(scrub_unsafe(&normalized))
    }

    /// Check a choice answer against the option set. Returns the canonical
    /// option on success.
    pub fn choice<'a>(
        &self,
        raw: &str,
        options: &[&'a str],
    ) -> Result<&'a str, ValidationRejection> {
        let trimmed = raw.trim();
        options
            .iter()
            .find(|opt| **opt == trimmed)
            .copied()
            .ok_or(ValidationRejection::NotInOptionSet)
    }

    /// Validate a full name: ≥2 whitespace-separated parts, each made of
    /// letters/hyphens/periods, 5-100 chars total.
    pub fn full_name(&self, raw: &str) -> Result<String, ValidationRejection> {
        let normalized = normalize_whitespace(&strip_disallowed(raw));

        let length = normalized.chars().count();
        if !(5..=100).contains(&length) {
            return Err(ValidationRejection::InvalidName);
        }

        let parts: Vec<&str> = normalized.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(ValidationRejection::InvalidName);
        }
        for part in &parts {
            let ok = part.chars().all(|c| is_letter(c) || c == '-' || c == '.')
                && part.chars().any(is_letter);
            if !ok {
                return Err(ValidationRejection::InvalidName);
            }
        }

        Ok(normalized)
    }

    /// Validate a personnel tab number: 1-9 digits, whitespace ignored.
    pub fn tab_number(&self, raw: &str) -> Result<String, ValidationRejection> {
        let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty()
            || digits.chars().count() > 9
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationRejection::InvalidNumber);
        }
        Ok(digits)
    }
}

/// Letters we accept: Latin and Cyrillic only.
fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || ('А'..='я').contains(&c) || c == 'Ё' || c == 'ё'
}

fn is_allowed(c: char) -> bool {
    is_letter(c)
        || c.is_ascii_digit()
        || c.is_whitespace()
        || matches!(
            c,
            '.' | ',' | '-' | '!' | '?' | '(' | ')' | '"' | '\'' | ':' | ';' | '№' | '%' | '/'
        )
}

fn strip_disallowed(raw: &str) -> String {
    raw.chars().filter(|c| is_allowed(*c)).collect()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn scrub_unsafe(s: &str) -> String {
    UNSAFE_PATTERNS.replace_all(s, REDACTION_TOKEN).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::catalog::{self, QuestionId};

    fn v() -> Validator {
        Validator::new(1000)
    }

    // ── Free text ───────────────────────────────────────────────────

    #[test]
    fn free_text_passes_plain_answers() {
        assert_eq!(v().free_text("Инженер-технолог").unwrap(), "Инженер-технолог");
        assert_eq!(v().free_text("  Senior   Engineer ").unwrap(), "Senior Engineer");
    }

    #[test]
    fn free_text_too_long() {
        let raw = "б".repeat(1001);
        assert_eq!(
            v().free_text(&raw),
            Err(ValidationRejection::TooLong { length: 1001, max: 1000 })
        );
    }

    #[test]
    fn free_text_exactly_at_limit_passes() {
        let raw = "в".repeat(1000);
        assert!(v().free_text(&raw).is_ok());
    }

    #[test]
    fn free_text_meaningless_after_stripping() {
        // Everything outside the allow-list is dropped first.
        for raw in ["", " ", "a", "@#$%^", "я", "<>", "{ }"] {
            assert_eq!(
                v().free_text(raw),
                Err(ValidationRejection::MeaninglessInput),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn free_text_two_characters_is_the_minimum() {
        assert_eq!(v().free_text("ок").unwrap(), "ок");
        assert_eq!(v().free_text("ок!").unwrap(), "ок!");
        assert_eq!(v().free_text("я"), Err(ValidationRejection::MeaninglessInput));
    }

    #[test]
    fn free_text_strips_disallowed_characters() {
        assert_eq!(v().free_text("при{вет}_мир").unwrap(), "приветмир");
    }

    #[test]
    fn free_text_redacts_sql_sequences() {
        let out = v().free_text("ответ; DROP TABLE users").unwrap();
        assert!(out.contains(REDACTION_TOKEN), "{out}");
        assert!(!out.to_lowercase().contains("drop table"), "{out}");
    }

    #[test]
    fn free_text_redacts_comment_delimiters() {
        let out = v().free_text("нормальный текст -- комментарий").unwrap();
        assert!(out.contains(REDACTION_TOKEN));
        let out = v().free_text("текст /* вставка */ ещё").unwrap();
        assert!(!out.contains("/*") && !out.contains("*/"));
    }

    #[test]
    fn free_text_drops_script_tags() {
        // Angle brackets never survive the allow-list.
        let out = v().free_text("до <script>alert(1)</script> после").unwrap();
        assert!(!out.contains('<') && !out.contains('>'));
    }

    #[test]
    fn free_text_keeps_basic_punctuation() {
        let out = v().free_text("Да, конечно! (Возможно: 50%)").unwrap();
        assert_eq!(out, "Да, конечно! (Возможно: 50%)");
    }

    // ── Choice ──────────────────────────────────────────────────────

    #[test]
    fn choice_accepts_exact_option() {
        assert_eq!(v().choice("Минск", catalog::CITIES).unwrap(), "Минск");
        assert_eq!(v().choice("  Минск ", catalog::CITIES).unwrap(), "Минск");
    }

    #[test]
    fn choice_rejects_anything_else() {
        assert_eq!(
            v().choice("минск", catalog::CITIES),
            Err(ValidationRejection::NotInOptionSet)
        );
        assert_eq!(
            v().choice("Лондон", catalog::CITIES),
            Err(ValidationRejection::NotInOptionSet)
        );
    }

    // ── Full name ───────────────────────────────────────────────────

    #[test]
    fn full_name_accepts_two_and_three_parts() {
        assert_eq!(v().full_name("Иванов Иван").unwrap(), "Иванов Иван");
        assert_eq!(
            v().full_name("  Иванов   Иван  Иванович ").unwrap(),
            "Иванов Иван Иванович"
        );
        assert!(v().full_name("Петрова-Сидорова Анна").is_ok());
        assert!(v().full_name("Smith J. Jr.").is_ok());
    }

    #[test]
    fn full_name_rejects_single_word() {
        assert_eq!(v().full_name("Иванов"), Err(ValidationRejection::InvalidName));
    }

    #[test]
    fn full_name_rejects_digits() {
        assert_eq!(
            v().full_name("Иванов Иван2"),
            Err(ValidationRejection::InvalidName)
        );
    }

    #[test]
    fn full_name_length_bounds() {
        assert_eq!(v().full_name("И И"), Err(ValidationRejection::InvalidName));
        let long = format!("{} {}", "А".repeat(60), "Б".repeat(60));
        assert_eq!(v().full_name(&long), Err(ValidationRejection::InvalidName));
    }

    // ── Tab number ──────────────────────────────────────────────────

    #[test]
    fn tab_number_accepts_one_to_nine_digits() {
        assert_eq!(v().tab_number("7").unwrap(), "7");
        assert_eq!(v().tab_number("123456789").unwrap(), "123456789");
        assert_eq!(v().tab_number(" 42 17 ").unwrap(), "4217");
    }

    #[test]
    fn tab_number_rejects_mixed_and_overlong() {
        assert_eq!(v().tab_number("12a34"), Err(ValidationRejection::InvalidNumber));
        assert_eq!(
            v().tab_number("1234567890"),
            Err(ValidationRejection::InvalidNumber)
        );
        assert_eq!(v().tab_number(""), Err(ValidationRejection::InvalidNumber));
        assert_eq!(v().tab_number("  "), Err(ValidationRejection::InvalidNumber));
    }

    // ── Dispatch by question ────────────────────────────────────────

    #[test]
    fn answer_dispatches_on_kind_and_rule() {
        let val = v();
        let consent = catalog::question(QuestionId::Eligibility);
        assert_eq!(val.answer(consent, catalog::YES).unwrap(), catalog::YES);

        let name = catalog::question(QuestionId::FullName);
        assert!(val.answer(name, "Иванов").is_err());
        assert!(val.answer(name, "Иванов Иван").is_ok());

        let tab = catalog::question(QuestionId::TabNumber);
        assert!(val.answer(tab, "12a34").is_err());

        let free = catalog::question(QuestionId::DesiredPosition);
        assert_eq!(val.answer(free, "Главный технолог").unwrap(), "Главный технолог");
    }

    #[test]
    fn determinism_same_input_same_verdict() {
        let val = v();
        for _ in 0..3 {
            assert_eq!(val.free_text("привет -- мир"), val.free_text("привет -- мир"));
        }
    }
}

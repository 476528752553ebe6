//! Static question catalog — the single source of truth for prompts,
//! answer kinds and option sets.
//!
//! Defined at process start, never mutated. The flow resolver and the
//! submission formatter both index into this table.

use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog question.
///
/// `ALL` lists the ids in canonical survey order; the submission
/// formatter uses that order, not answer-insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    Eligibility,
    WantsReserve,
    DesiredPosition,
    Initiatives,
    ReadyTraining,
    CareerObstacles,
    Improvements,
    ReadyRotation,
    RotationCities,
    StructuralUnit,
    DeclineReasons,
    OtherReasonDetail,
    CurrentLocation,
    CurrentRole,
    Education,
    Institution,
    Age,
    TabNumber,
    FullName,
}

impl QuestionId {
    /// All question ids in canonical survey order.
    pub const ALL: &'static [QuestionId] = &[
        QuestionId::Eligibility,
        QuestionId::WantsReserve,
        QuestionId::DesiredPosition,
        QuestionId::Initiatives,
        QuestionId::ReadyTraining,
        QuestionId::CareerObstacles,
        QuestionId::Improvements,
        QuestionId::ReadyRotation,
        QuestionId::RotationCities,
        QuestionId::StructuralUnit,
        QuestionId::DeclineReasons,
        QuestionId::OtherReasonDetail,
        QuestionId::CurrentLocation,
        QuestionId::CurrentRole,
        QuestionId::Education,
        QuestionId::Institution,
        QuestionId::Age,
        QuestionId::TabNumber,
        QuestionId::FullName,
    ];
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eligibility => "eligibility",
            Self::WantsReserve => "wants_reserve",
            Self::DesiredPosition => "desired_position",
            Self::Initiatives => "initiatives",
            Self::ReadyTraining => "ready_training",
            Self::CareerObstacles => "career_obstacles",
            Self::Improvements => "improvements",
            Self::ReadyRotation => "ready_rotation",
            Self::RotationCities => "rotation_cities",
            Self::StructuralUnit => "structural_unit",
            Self::DeclineReasons => "decline_reasons",
            Self::OtherReasonDetail => "other_reason_detail",
            Self::CurrentLocation => "current_location",
            Self::CurrentRole => "current_role",
            Self::Education => "education",
            Self::Institution => "institution",
            Self::Age => "age",
            Self::TabNumber => "tab_number",
            Self::FullName => "full_name",
        };
        write!(f, "{s}")
    }
}

/// The shape of answer a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    SingleChoice,
    MultiChoice,
    /// Yes/no question rendered with the consent keyboard.
    Consent,
}

/// Validator override for free-text questions with a stricter shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    /// ≥2 whitespace-separated parts, letters/hyphen/period, 5-100 chars.
    FullName,
    /// All digits, 1-9 of them.
    TabNumber,
}

/// One entry of the static question table.
#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: &'static str,
    pub kind: QuestionKind,
    /// Option set for choice kinds; empty for free text.
    pub options: &'static [&'static str],
    /// How many option buttons per keyboard row.
    pub row_width: usize,
    /// Free-text validator override.
    pub rule: Option<TextRule>,
    /// Multi-choice option that requires a free-text elaboration.
    pub detail_option: Option<&'static str>,
}

impl Question {
    /// Keyboard rows for this question's option set, chunked by `row_width`.
    /// Multi-choice questions get a trailing "finish" row.
    pub fn keyboard_rows(&self) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = self
            .options
            .chunks(self.row_width.max(1))
            .map(|chunk| chunk.iter().map(|s| s.to_string()).collect())
            .collect();
        if self.kind == QuestionKind::MultiChoice {
            rows.push(vec![FINISH_SELECTION.to_string()]);
        }
        rows
    }
}

// ── Option sets ─────────────────────────────────────────────────────

pub const YES: &str = "✅ Да";
pub const NO: &str = "❌ Нет";
pub const YES_NO: &[&str] = &[YES, NO];

/// Multi-select "done picking" button.
pub const FINISH_SELECTION: &str = "✅ Завершить выбор";

pub const CITIES: &[&str] = &[
    "Брест",
    "Береза",
    "Барановичи",
    "Пинск",
    "Столин",
    "Орша",
    "Иваново",
    "Минск",
    "Витебск",
    "Гродно",
    "Гомель",
    "Могилёв",
    "ТФ Полесский",
];

pub const DECLINE_REASONS: &[&str] = &[
    "Удовлетворён текущей должностью",
    "Не готов(а) брать на себя ответственность за команду или процессы",
    "Не уверен(а) в своих силах / компетенциях",
    "Психологически не готов(а) к дополнительной ответственности в текущих условиях",
    REASON_OTHER,
];

/// Decline reason that requires a free-text elaboration.
pub const REASON_OTHER: &str = "Другое (укажите)";

pub const EDUCATION_LEVELS: &[&str] = &[
    "Профессионально-техническое",
    "Средне специальное",
    "Высшее",
    EDUCATION_STUDYING,
];

/// Education answer that routes to the institution question.
pub const EDUCATION_STUDYING: &str = "Обучаюсь";

pub const AGE_GROUPS: &[&str] = &["18-25", "26-31", "31-35", "36-40", "Больше 41"];

// ── The table ───────────────────────────────────────────────────────

/// The full catalog, indexed by `QuestionId as usize`.
pub const CATALOG: &[Question] = &[
    Question {
        id: QuestionId::Eligibility,
        prompt: "Являетесь ли вы сотрудником ОАО «Савушкин продукт»?",
        kind: QuestionKind::Consent,
        options: YES_NO,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::WantsReserve,
        prompt: "Хотели бы Вы, чтобы Ваша кандидатура была рассмотрена \
                 для включения в кадровый резерв?",
        kind: QuestionKind::Consent,
        options: YES_NO,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::DesiredPosition,
        prompt: "Какую должность Вы рассматриваете для возможного назначения \
                 в рамках кадрового резерва?",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::Initiatives,
        prompt: "Какие инициативы или программы Вы хотели бы видеть \
                 для развития сотрудников?",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::ReadyTraining,
        prompt: "Готовы ли Вы пройти обучение или стажировку для включения \
                 в кадровый резерв?",
        kind: QuestionKind::Consent,
        options: YES_NO,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::CareerObstacles,
        prompt: "Что, по Вашему мнению, мешает карьерному росту внутри компании?",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::Improvements,
        prompt: "Есть ли у Вас предложения по улучшению работы Вашего филиала \
                 или компании в целом?",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::ReadyRotation,
        prompt: "Готовы ли Вы к ротации или переводу в другое подразделение (филиал)?",
        kind: QuestionKind::Consent,
        options: YES_NO,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::RotationCities,
        prompt: "Укажите предпочтительные города для ротации (можно выбрать несколько):",
        kind: QuestionKind::MultiChoice,
        options: CITIES,
        row_width: 3,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::StructuralUnit,
        prompt: "Укажите структурное подразделение:",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::DeclineReasons,
        prompt: "Пожалуйста, укажите причину, по которой Вы не готовы \
                 рассматривать включение в кадровый резерв:",
        kind: QuestionKind::MultiChoice,
        options: DECLINE_REASONS,
        row_width: 2,
        rule: None,
        detail_option: Some(REASON_OTHER),
    },
    Question {
        id: QuestionId::OtherReasonDetail,
        prompt: "Пожалуйста, укажите Вашу причину:",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::CurrentLocation,
        prompt: "ПП/ТФ, в котором вы работаете:",
        kind: QuestionKind::SingleChoice,
        options: CITIES,
        row_width: 3,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::CurrentRole,
        prompt: "Ваша профессия/должность, которую Вы сейчас занимаете (укажите):",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::Education,
        prompt: "Ваше образование:",
        kind: QuestionKind::SingleChoice,
        options: EDUCATION_LEVELS,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::Institution,
        prompt: "Укажите учебное заведение, в котором обучаетесь:",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::Age,
        prompt: "Ваш возраст:",
        kind: QuestionKind::SingleChoice,
        options: AGE_GROUPS,
        row_width: 2,
        rule: None,
        detail_option: None,
    },
    Question {
        id: QuestionId::TabNumber,
        prompt: "Укажите Ваш табельный номер:",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: Some(TextRule::TabNumber),
        detail_option: None,
    },
    Question {
        id: QuestionId::FullName,
        prompt: "Укажите ФИО:",
        kind: QuestionKind::FreeText,
        options: &[],
        row_width: 0,
        rule: Some(TextRule::FullName),
        detail_option: None,
    },
];

/// Look up a question by id.
pub fn question(id: QuestionId) -> &'static Question {
    &CATALOG[id as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indexed_by_id_discriminant() {
        for (i, q) in CATALOG.iter().enumerate() {
            assert_eq!(q.id as usize, i, "{} out of place", q.id);
        }
        assert_eq!(CATALOG.len(), QuestionId::ALL.len());
    }

    #[test]
    fn all_lists_every_question_once() {
        for q in CATALOG {
            let count = QuestionId::ALL.iter().filter(|id| **id == q.id).count();
            assert_eq!(count, 1, "{} listed {count} times", q.id);
        }
    }

    #[test]
    fn choice_questions_have_options() {
        for q in CATALOG {
            match q.kind {
                QuestionKind::FreeText => assert!(q.options.is_empty(), "{}", q.id),
                _ => {
                    assert!(!q.options.is_empty(), "{}", q.id);
                    assert!(q.row_width > 0, "{}", q.id);
                }
            }
        }
    }

    #[test]
    fn detail_option_is_in_its_option_set() {
        for q in CATALOG {
            if let Some(detail) = q.detail_option {
                assert!(q.options.contains(&detail), "{}", q.id);
            }
        }
    }

    #[test]
    fn multi_choice_keyboard_has_finish_row() {
        let q = question(QuestionId::RotationCities);
        let rows = q.keyboard_rows();
        assert_eq!(rows.last().unwrap(), &vec![FINISH_SELECTION.to_string()]);
        // 13 cities in rows of 3 → 5 option rows + finish
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn single_choice_keyboard_has_no_finish_row() {
        let q = question(QuestionId::Age);
        let rows = q.keyboard_rows();
        assert!(!rows.iter().flatten().any(|s| s == FINISH_SELECTION));
        // 5 age groups in rows of 2
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn display_matches_serde() {
        for id in QuestionId::ALL {
            let display = format!("{id}");
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }
}

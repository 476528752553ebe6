//! Submission formatter — turns a completed session into the canonical
//! result document.
//!
//! Deterministic: the same session and metadata always produce the same
//! document, because the free-form list follows the fixed catalog order
//! rather than answer-insertion order.

use serde::{Deserialize, Serialize};

use crate::survey::catalog::{self, QuestionId};
use crate::survey::engine::RespondentMeta;
use crate::survey::session::Session;

/// Question ids projected into the respondent profile. Everything else
/// lands in the free-form responses list.
const PROFILE_IDS: &[QuestionId] = &[
    QuestionId::Eligibility,
    QuestionId::WantsReserve,
    QuestionId::CurrentLocation,
    QuestionId::CurrentRole,
    QuestionId::Age,
    QuestionId::TabNumber,
    QuestionId::FullName,
];

/// Fixed projection of the identifying answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondentProfile {
    pub full_name: String,
    pub age_group: String,
    pub current_role: String,
    pub current_location: String,
    pub tab_number: String,
    pub is_employee: bool,
    pub wants_reserve: bool,
}

/// One free-form answer, carrying enough context to read the record
/// without the catalog at hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub question_id: QuestionId,
    pub question_text: String,
    pub answer_text: String,
}

/// Platform-side facts about the respondent, captured by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespondentInfo {
    pub display_name: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub platform: String,
}

/// The aggregated survey result posted to the intake service.
/// Built once from a completed session; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDocument {
    pub respondent: RespondentProfile,
    pub source: RespondentInfo,
    pub responses: Vec<ResponseEntry>,
}

impl SubmissionDocument {
    /// Format a completed session plus respondent metadata.
    pub fn from_session(session: &Session, meta: &RespondentMeta) -> Self {
        let answers = session.answers();
        let get = |id: QuestionId| {
            answers
                .get(&id)
                .map(|a| strip_status_marks(a).to_string())
                .unwrap_or_default()
        };

        let respondent = RespondentProfile {
            full_name: get(QuestionId::FullName),
            age_group: get(QuestionId::Age),
            current_role: get(QuestionId::CurrentRole),
            current_location: get(QuestionId::CurrentLocation),
            tab_number: get(QuestionId::TabNumber),
            is_employee: answers.get(&QuestionId::Eligibility).map(String::as_str)
                == Some(catalog::YES),
            wants_reserve: answers.get(&QuestionId::WantsReserve).map(String::as_str)
                == Some(catalog::YES),
        };

        let responses = QuestionId::ALL
            .iter()
            .filter(|id| !PROFILE_IDS.contains(id))
            .filter_map(|id| {
                answers.get(id).map(|answer| ResponseEntry {
                    question_id: *id,
                    question_text: catalog::question(*id).prompt.to_string(),
                    answer_text: strip_status_marks(answer).to_string(),
                })
            })
            .collect();

        Self {
            respondent,
            source: RespondentInfo {
                display_name: meta.display_name.clone(),
                user_id: meta.user_id,
                locale: meta.locale.clone(),
                platform: meta.platform.clone(),
            },
            responses,
        }
    }
}

/// Drop leading status-mark glyphs (the ✅/❌ prefixes on keyboard
/// labels) so stored answers read as plain text.
fn strip_status_marks(s: &str) -> &str {
    s.trim_start_matches(|c: char| matches!(c, '✅' | '❌' | '⏳') || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::flow;

    fn meta() -> RespondentMeta {
        RespondentMeta {
            display_name: "Иван".to_string(),
            user_id: 42,
            locale: Some("ru".to_string()),
            platform: "telegram".to_string(),
        }
    }

    fn completed_session() -> Session {
        let mut s = Session::default();
        s.start();
        let answers: &[(QuestionId, &str)] = &[
            (QuestionId::Eligibility, catalog::YES),
            (QuestionId::WantsReserve, catalog::YES),
            (QuestionId::DesiredPosition, "Инженер"),
            (QuestionId::Initiatives, "Наставничество"),
            (QuestionId::ReadyTraining, catalog::YES),
            (QuestionId::CareerObstacles, "Нет возможностей"),
            (QuestionId::Improvements, "Больше обратной связи"),
            (QuestionId::ReadyRotation, catalog::NO),
            (QuestionId::CurrentLocation, "Минск"),
            (QuestionId::CurrentRole, "Технолог"),
            (QuestionId::Education, "Высшее"),
            (QuestionId::Age, "26-31"),
            (QuestionId::TabNumber, "12345"),
            (QuestionId::FullName, "Иванов Иван"),
        ];
        for (id, answer) in answers {
            s.advance_to(*id);
            s.record_answer(*id, answer.to_string()).unwrap();
        }
        s.advance_to(flow::START);
        s
    }

    #[test]
    fn profile_projection_covers_fixed_fields() {
        let doc = SubmissionDocument::from_session(&completed_session(), &meta());
        assert_eq!(doc.respondent.full_name, "Иванов Иван");
        assert_eq!(doc.respondent.age_group, "26-31");
        assert_eq!(doc.respondent.current_role, "Технолог");
        assert_eq!(doc.respondent.current_location, "Минск");
        assert_eq!(doc.respondent.tab_number, "12345");
        assert!(doc.respondent.is_employee);
        assert!(doc.respondent.wants_reserve);
    }

    #[test]
    fn responses_exclude_profile_ids() {
        let doc = SubmissionDocument::from_session(&completed_session(), &meta());
        for entry in &doc.responses {
            assert!(
                !PROFILE_IDS.contains(&entry.question_id),
                "{} leaked into responses",
                entry.question_id
            );
        }
        let position = doc
            .responses
            .iter()
            .find(|e| e.question_id == QuestionId::DesiredPosition)
            .unwrap();
        assert_eq!(position.answer_text, "Инженер");
        assert!(!position.question_text.is_empty());
    }

    #[test]
    fn responses_follow_canonical_order() {
        let doc = SubmissionDocument::from_session(&completed_session(), &meta());
        let positions: Vec<usize> = doc
            .responses
            .iter()
            .map(|e| {
                QuestionId::ALL
                    .iter()
                    .position(|id| *id == e.question_id)
                    .unwrap()
            })
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn status_marks_are_stripped() {
        let doc = SubmissionDocument::from_session(&completed_session(), &meta());
        let training = doc
            .responses
            .iter()
            .find(|e| e.question_id == QuestionId::ReadyTraining)
            .unwrap();
        assert_eq!(training.answer_text, "Да");
        assert!(doc.respondent.is_employee);
    }

    #[test]
    fn formatting_is_deterministic() {
        let session = completed_session();
        let a = serde_json::to_vec(&SubmissionDocument::from_session(&session, &meta())).unwrap();
        let b = serde_json::to_vec(&SubmissionDocument::from_session(&session, &meta())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_answers_become_empty_fields() {
        let mut s = Session::default();
        s.start();
        s.record_answer(flow::START, catalog::NO.to_string()).unwrap();
        let doc = SubmissionDocument::from_session(&s, &meta());
        assert!(!doc.respondent.is_employee);
        assert!(doc.respondent.full_name.is_empty());
        assert!(doc.responses.is_empty());
    }

    #[test]
    fn strip_status_marks_only_leading() {
        assert_eq!(strip_status_marks("✅ Да"), "Да");
        assert_eq!(strip_status_marks("❌ Нет"), "Нет");
        assert_eq!(strip_status_marks("Минск ✅"), "Минск ✅");
        assert_eq!(strip_status_marks("обычный текст"), "обычный текст");
    }
}

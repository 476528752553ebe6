//! Flow resolver — pure successor function over the question graph.
//!
//! A static adjacency covers the linear stretches; a handful of explicit
//! decision points read recorded answers and the branch tag. Both
//! sub-flows reconverge on the shared tail
//! (location → role → education → age → tab number → full name).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::catalog::{self, QuestionId};

/// Recorded answers, keyed by question id.
pub type AnswerMap = HashMap<QuestionId, String>;

/// Which sub-flow the respondent is on. Set once by the wants-reserve
/// answer, never reset within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Undecided,
    WantsReserve,
    DeclinesReserve,
}

impl Default for Branch {
    fn default() -> Self {
        Self::Undecided
    }
}

/// Outcome of resolving the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Ask this question next.
    Ask(QuestionId),
    /// The survey is complete; aggregate and submit.
    Terminal,
    /// Early exit: the respondent declared non-eligibility.
    Disqualified,
}

/// First question of every survey.
pub const START: QuestionId = QuestionId::Eligibility;

/// Compute the question that follows `current`.
///
/// Pure function of its arguments; total for every id/branch pair.
pub fn next_question(current: QuestionId, answers: &AnswerMap, branch: Branch) -> Step {
    use QuestionId::*;

    match current {
        Eligibility => {
            if answer_is_yes(answers, Eligibility) {
                Step::Ask(WantsReserve)
            } else {
                Step::Disqualified
            }
        }

        // Decision point: the wants-reserve answer selects the sub-flow.
        WantsReserve => match branch {
            Branch::DeclinesReserve => Step::Ask(DeclineReasons),
            _ => Step::Ask(DesiredPosition),
        },

        // Reserve-interested sub-flow.
        DesiredPosition => Step::Ask(Initiatives),
        Initiatives => Step::Ask(ReadyTraining),
        ReadyTraining => Step::Ask(CareerObstacles),

        // Declining sub-flow. An unfinalized reasons answer means the
        // "Other" elaboration is still outstanding.
        DeclineReasons => {
            if answers.contains_key(&DeclineReasons) {
                Step::Ask(CareerObstacles)
            } else {
                Step::Ask(OtherReasonDetail)
            }
        }
        OtherReasonDetail => Step::Ask(CareerObstacles),

        // Shared mid-section; the exit depends on the branch.
        CareerObstacles => Step::Ask(Improvements),
        Improvements => match branch {
            Branch::DeclinesReserve => Step::Ask(CurrentLocation),
            _ => Step::Ask(ReadyRotation),
        },

        ReadyRotation => {
            if answer_is_yes(answers, ReadyRotation) {
                Step::Ask(RotationCities)
            } else {
                Step::Ask(CurrentLocation)
            }
        }
        RotationCities => Step::Ask(StructuralUnit),
        StructuralUnit => Step::Ask(CurrentLocation),

        // Shared tail.
        CurrentLocation => Step::Ask(CurrentRole),
        CurrentRole => Step::Ask(Education),
        Education => {
            if answers.get(&Education).map(String::as_str) == Some(catalog::EDUCATION_STUDYING) {
                Step::Ask(Institution)
            } else {
                Step::Ask(Age)
            }
        }
        Institution => Step::Ask(Age),
        Age => Step::Ask(TabNumber),
        TabNumber => Step::Ask(FullName),
        FullName => Step::Terminal,
    }
}

fn answer_is_yes(answers: &AnswerMap, id: QuestionId) -> bool {
    answers.get(&id).map(String::as_str) == Some(catalog::YES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuestionId::*;

    const BRANCHES: [Branch; 3] = [Branch::Undecided, Branch::WantsReserve, Branch::DeclinesReserve];

    fn with(pairs: &[(QuestionId, &str)]) -> AnswerMap {
        pairs
            .iter()
            .map(|(id, v)| (*id, v.to_string()))
            .collect()
    }

    #[test]
    fn total_for_every_question_and_branch() {
        let empty = AnswerMap::new();
        for id in QuestionId::ALL {
            for branch in BRANCHES {
                // Must not panic for any combination, even with no answers.
                let _ = next_question(*id, &empty, branch);
            }
        }
    }

    /// The full successor table, one row per (question, branch) with the
    /// answers that drive each decision point.
    #[test]
    fn successor_table() {
        let yes = with(&[(Eligibility, catalog::YES), (ReadyRotation, catalog::YES)]);
        let no = with(&[(Eligibility, catalog::NO), (ReadyRotation, catalog::NO)]);
        let reasons_final = with(&[(DeclineReasons, "Удовлетворён текущей должностью")]);
        let studying = with(&[(Education, catalog::EDUCATION_STUDYING)]);
        let graduated = with(&[(Education, "Высшее")]);
        let empty = AnswerMap::new();

        // `WantsReserve` names both a question and a branch; spell the
        // question out where the columns would otherwise collide.
        use Branch::*;
        use Step::*;
        #[rustfmt::skip]
        let table: &[(QuestionId, &AnswerMap, Branch, Step)] = &[
            (Eligibility,              &yes,           Undecided,       Ask(QuestionId::WantsReserve)),
            (Eligibility,              &no,            Undecided,       Disqualified),
            (Eligibility,              &empty,         Undecided,       Disqualified),
            (QuestionId::WantsReserve, &empty,         WantsReserve,    Ask(DesiredPosition)),
            (QuestionId::WantsReserve, &empty,         DeclinesReserve, Ask(DeclineReasons)),
            (DesiredPosition,   &empty,         WantsReserve,    Ask(Initiatives)),
            (Initiatives,       &empty,         WantsReserve,    Ask(ReadyTraining)),
            (ReadyTraining,     &empty,         WantsReserve,    Ask(CareerObstacles)),
            (DeclineReasons,    &reasons_final, DeclinesReserve, Ask(CareerObstacles)),
            (DeclineReasons,    &empty,         DeclinesReserve, Ask(OtherReasonDetail)),
            (OtherReasonDetail, &empty,         DeclinesReserve, Ask(CareerObstacles)),
            (CareerObstacles,   &empty,         WantsReserve,    Ask(Improvements)),
            (CareerObstacles,   &empty,         DeclinesReserve, Ask(Improvements)),
            (Improvements,      &empty,         WantsReserve,    Ask(ReadyRotation)),
            (Improvements,      &empty,         DeclinesReserve, Ask(CurrentLocation)),
            (ReadyRotation,     &yes,           WantsReserve,    Ask(RotationCities)),
            (ReadyRotation,     &no,            WantsReserve,    Ask(CurrentLocation)),
            (RotationCities,    &empty,         WantsReserve,    Ask(StructuralUnit)),
            (StructuralUnit,    &empty,         WantsReserve,    Ask(CurrentLocation)),
            (CurrentLocation,   &empty,         WantsReserve,    Ask(CurrentRole)),
            (CurrentLocation,   &empty,         DeclinesReserve, Ask(CurrentRole)),
            (CurrentRole,       &empty,         WantsReserve,    Ask(Education)),
            (Education,         &studying,      WantsReserve,    Ask(Institution)),
            (Education,         &graduated,     WantsReserve,    Ask(Age)),
            (Education,         &studying,      DeclinesReserve, Ask(Institution)),
            (Institution,       &empty,         WantsReserve,    Ask(Age)),
            (Age,               &empty,         WantsReserve,    Ask(TabNumber)),
            (TabNumber,         &empty,         WantsReserve,    Ask(FullName)),
            (FullName,          &empty,         WantsReserve,    Terminal),
            (FullName,          &empty,         DeclinesReserve, Terminal),
        ];

        for (current, answers, branch, expected) in table {
            assert_eq!(
                next_question(*current, answers, *branch),
                *expected,
                "{current} / {branch:?}"
            );
        }
    }

    #[test]
    fn every_question_is_reachable_from_start() {
        // Walk the graph breadth-first, feeding each decision point both
        // of its outcomes, and require that the whole catalog is visited.
        let mut seen = vec![START];
        let mut frontier = vec![START];
        let variants: [AnswerMap; 4] = [
            with(&[(Eligibility, catalog::YES), (ReadyRotation, catalog::YES),
                   (Education, catalog::EDUCATION_STUDYING)]),
            with(&[(Eligibility, catalog::YES), (ReadyRotation, catalog::NO),
                   (Education, "Высшее"), (DeclineReasons, "x")]),
            with(&[(Eligibility, catalog::YES)]),
            AnswerMap::new(),
        ];

        while let Some(current) = frontier.pop() {
            for answers in &variants {
                for branch in BRANCHES {
                    if let Step::Ask(next) = next_question(current, answers, branch) {
                        if !seen.contains(&next) {
                            seen.push(next);
                            frontier.push(next);
                        }
                    }
                }
            }
        }

        for id in QuestionId::ALL {
            assert!(seen.contains(id), "{id} unreachable from start");
        }
    }
}

//! Per-respondent session state and the in-memory session store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::{FlowError, ValidationRejection};

use super::catalog::QuestionId;
use super::flow::{self, AnswerMap, Branch};

/// Result of a multi-select toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Mutable state of one in-flight survey.
///
/// Owned by exactly one conversation; the store serializes access per
/// respondent, so no operation here needs interior locking.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<QuestionId>,
    branch: Branch,
    answers: AnswerMap,
    pending_selection: Vec<String>,
    other_detail: Option<String>,
}

impl Session {
    /// Begin (or restart) the survey at the first question.
    pub fn start(&mut self) {
        *self = Self::default();
        self.current = Some(flow::START);
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<QuestionId> {
        self.current
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn pending_selection(&self) -> &[String] {
        &self.pending_selection
    }

    pub fn other_detail(&self) -> Option<&str> {
        self.other_detail.as_deref()
    }

    /// Move the cursor to the next active question.
    pub fn advance_to(&mut self, next: QuestionId) {
        self.current = Some(next);
    }

    /// Set the branch tag. Only the first non-undecided write sticks.
    pub fn set_branch(&mut self, branch: Branch) {
        if self.branch == Branch::Undecided {
            self.branch = branch;
        }
    }

    /// Record a validated answer for the active question.
    pub fn record_answer(
        &mut self,
        question: QuestionId,
        answer: String,
    ) -> Result<(), FlowError> {
        self.expect_active(question)?;
        self.answers.insert(question, answer);
        Ok(())
    }

    /// Toggle a multi-select option: add if absent, remove if present.
    /// Removing the detail-flagged option also drops its elaboration.
    pub fn toggle_multi_select(
        &mut self,
        question: QuestionId,
        option: &str,
        requires_detail: bool,
    ) -> Result<Toggled, FlowError> {
        self.expect_active(question)?;
        if let Some(pos) = self.pending_selection.iter().position(|o| o == option) {
            self.pending_selection.remove(pos);
            if requires_detail {
                self.other_detail = None;
            }
            Ok(Toggled::Removed)
        } else {
            self.pending_selection.push(option.to_string());
            Ok(Toggled::Added)
        }
    }

    /// Store the free-text elaboration for the detail-flagged option.
    pub fn set_other_detail(&mut self, detail: String) {
        self.other_detail = Some(detail);
    }

    /// Finalize the pending multi-select: join the chosen options and
    /// write the result into `answers` as a single value.
    ///
    /// If an elaboration was captured, the detail-flagged option label is
    /// replaced by `"<base>: <detail>"`, where `<base>` is the label with
    /// its parenthesized hint removed. No partial writes: `answers` is
    /// untouched until this succeeds.
    pub fn finalize_multi_select(
        &mut self,
        question: QuestionId,
        delimiter: &str,
        detail_option: Option<&str>,
    ) -> Result<String, crate::error::Error> {
        self.expect_active(question)?;
        if self.pending_selection.is_empty() {
            return Err(ValidationRejection::EmptySelection.into());
        }

        let joined = self
            .pending_selection
            .iter()
            .map(|opt| match (detail_option, self.other_detail.as_deref()) {
                (Some(flagged), Some(detail)) if opt == flagged => {
                    format!("{}: {detail}", label_base(flagged))
                }
                _ => opt.clone(),
            })
            .collect::<Vec<_>>()
            .join(delimiter);

        self.answers.insert(question, joined.clone());
        self.pending_selection.clear();
        Ok(joined)
    }

    /// Drop all survey state (completion, disqualification, abandonment).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn expect_active(&self, question: QuestionId) -> Result<(), FlowError> {
        match self.current {
            Some(current) if current == question => Ok(()),
            Some(_) => Err(FlowError::StaleInput),
            None => Err(FlowError::NotStarted),
        }
    }
}

/// Strip the parenthesized hint from an option label:
/// `"Другое (укажите)"` → `"Другое"`.
fn label_base(label: &str) -> &str {
    label.split(" (").next().unwrap_or(label).trim_end()
}

/// In-memory map from respondent id to session.
///
/// Each session sits behind its own `Mutex`, so operations for one
/// respondent are serialized while different respondents proceed in
/// parallel.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the respondent's session, creating an empty one if needed.
    pub async fn get_or_create(&self, respondent_id: &str) -> Arc<Mutex<Session>> {
        {
            let map = self.inner.read().await;
            if let Some(session) = map.get(respondent_id) {
                return Arc::clone(session);
            }
        }
        let mut map = self.inner.write().await;
        Arc::clone(
            map.entry(respondent_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::default()))),
        )
    }

    /// Fetch the respondent's session without creating one. Read-only
    /// paths use this so the map only holds respondents who started.
    pub async fn get(&self, respondent_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.inner.read().await.get(respondent_id).cloned()
    }

    /// Drop the respondent's entry unless the session was restarted in
    /// the meantime. Checked under the map lock: a `start_survey` racing
    /// a completion keeps its fresh session instead of losing it.
    pub async fn remove_if_inactive(&self, respondent_id: &str) {
        let mut map = self.inner.write().await;
        if let Some(entry) = map.get(respondent_id) {
            if !entry.lock().await.is_started() {
                map.remove(respondent_id);
            }
        }
    }
}

//! Event dispatch — routes commands, selections and free text through
//! the validator, the session and the flow resolver, and renders the
//! next prompt.
//!
//! Channels convert their native updates into [`InboundEvent`]s and
//! render the returned [`Prompt`]s; everything in between is
//! channel-agnostic.

use std::sync::Arc;

use crate::config::SurveyConfig;
use crate::error::{Error, FlowError, ValidationRejection};
use crate::intake::{SubmissionDocument, SubmissionSink};

use super::catalog::{self, Question, QuestionId, QuestionKind};
use super::flow::{self, Branch, Step};
use super::session::{Session, SessionStore, Toggled};
use super::validate::Validator;

// ── Event and prompt contracts ──────────────────────────────────────

/// What kind of input arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A slash command, without the leading `/`.
    Command(String),
    /// An interactive button press (inline keyboard callback data).
    Selection(String),
    /// Plain text — either a reply-keyboard button or a typed answer.
    Text(String),
}

/// Platform-side facts about the respondent, used for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondentMeta {
    pub display_name: String,
    pub user_id: i64,
    pub locale: Option<String>,
    pub platform: String,
}

/// One inbound event from a channel.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub respondent_id: String,
    pub kind: EventKind,
    pub meta: RespondentMeta,
    /// Channel-specific reply routing (chat id and the like).
    pub metadata: serde_json::Value,
}

/// How a prompt's options should be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// No keyboard change.
    None,
    /// Remove any visible reply keyboard.
    Remove,
    /// Reply keyboard: rows of option labels.
    Reply(Vec<Vec<String>>),
    /// Inline keyboard: rows of (label, callback data) buttons.
    Inline(Vec<Vec<(String, String)>>),
}

/// One outbound message for the channel to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Prompt {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

// ── Menu callback data ──────────────────────────────────────────────

pub const MENU_START_SURVEY: &str = "start_survey";
pub const MENU_RESERVE_INFO: &str = "reserve_info";
pub const MENU_HELP: &str = "help";
pub const MENU_MAIN: &str = "main_menu";

// ── Static texts ────────────────────────────────────────────────────

const WELCOME_MESSAGE: &str = "Уважаемые коллеги! Настоящий опрос проводится среди сотрудников \
группы компаний ОАО «Савушкин продукт» с целью эффективного планирования карьерного развития, \
формирования кадрового резерва, а также выявления инициативных и целеустремлённых специалистов, \
готовых расти и развиваться вместе с компанией, применяя свои знания и навыки на её \
производственных площадках. Просим вас быть искренними — прежде всего перед самими собой. \
Опрос займёт всего несколько минут.\nБлагодарим за ваше участие и уделённое время!";

const RESERVE_INFO: &str = "📊 О кадровом резерве\n\n\
Кадровый резерв — это программа развития сотрудников компании, направленная на:\n\
• Выявление перспективных специалистов\n\
• Подготовку к руководящим должностям\n\
• Профессиональное развитие и рост\n\
• Формирование пула внутренних кандидатов\n\n\
Участие в программе позволяет:\n\
✅ Получить новые знания и навыки\n\
✅ Рассматриваться на перспективные должности\n\
✅ Участвовать в проектах развития компании\n\
✅ Получить поддержку в карьерном росте";

const HELP_TEXT: &str = "❓ Помощь\n\n\
Доступные команды:\n\
/start - начать работу с ботом\n\
/menu - открыть главное меню\n\
/help - показать эту справку\n\
/status - проверить статус опроса\n\n\
Основные разделы:\n\
📝 Начать опрос - команда на запуск опроса\n\
ℹ️ О кадровом резерве - информация о программе\n\
❓ Помощь - справочная информация\n\n\
Для возврата в главное меню используйте кнопку 🏠 Главное меню";

const INELIGIBLE_MESSAGE: &str = "К сожалению, данный опрос только для сотрудников компании.";
const THANKS_MESSAGE: &str =
    "✅ Спасибо за участие в опросе!\n\nВаши ответы сохранены.\n\nОпрос завершен!";
const USE_BUTTONS_MESSAGE: &str = "Пожалуйста, выберите вариант ответа с помощью кнопок.";
const STALE_INPUT_MESSAGE: &str = "Пожалуйста, ответьте на актуальный вопрос:";

fn main_menu_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![("📝 Начать опрос".to_string(), MENU_START_SURVEY.to_string())],
        vec![("ℹ️ О кадровом резерве".to_string(), MENU_RESERVE_INFO.to_string())],
        vec![("❓ Помощь".to_string(), MENU_HELP.to_string())],
    ])
}

fn back_to_menu_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![(
        "🏠 Главное меню".to_string(),
        MENU_MAIN.to_string(),
    )]])
}

// ── The engine ──────────────────────────────────────────────────────

/// The survey flow engine. One instance serves all respondents; each
/// respondent's session is serialized behind its own lock in the store.
pub struct SurveyEngine {
    validator: Validator,
    sessions: SessionStore,
    sink: Arc<dyn SubmissionSink>,
    config: SurveyConfig,
}

impl SurveyEngine {
    pub fn new(config: SurveyConfig, sink: Arc<dyn SubmissionSink>) -> Self {
        Self {
            validator: Validator::new(config.max_text_len),
            sessions: SessionStore::new(),
            sink,
            config,
        }
    }

    /// Process one inbound event and produce the outbound prompts.
    ///
    /// Never fails outward: validation rejections and stale input become
    /// corrective prompts, submission failures are logged and swallowed.
    pub async fn handle_event(&self, event: InboundEvent) -> Vec<Prompt> {
        match event.kind.clone() {
            EventKind::Command(cmd) => self.handle_command(&cmd, &event).await,
            EventKind::Selection(data) => self.handle_selection(&data, &event).await,
            EventKind::Text(text) => self.handle_text(&text, &event).await,
        }
    }

    // ── Commands and menu selections ────────────────────────────────

    async fn handle_command(&self, command: &str, event: &InboundEvent) -> Vec<Prompt> {
        match command {
            "start" => vec![Prompt::with_keyboard(
                format!(
                    "Добро пожаловать в бот опроса кадрового резерва!\n\n{WELCOME_MESSAGE}"
                ),
                main_menu_keyboard(),
            )],
            "menu" => vec![Prompt::with_keyboard(
                "🏠 Главное меню:",
                main_menu_keyboard(),
            )],
            "help" => vec![Prompt::with_keyboard(HELP_TEXT, back_to_menu_keyboard())],
            "status" => vec![self.status_prompt(&event.respondent_id).await],
            other => {
                tracing::debug!(command = other, "unknown command");
                vec![Prompt::with_keyboard(
                    "Выберите действие:",
                    main_menu_keyboard(),
                )]
            }
        }
    }

    async fn handle_selection(&self, data: &str, event: &InboundEvent) -> Vec<Prompt> {
        match data {
            MENU_START_SURVEY => {
                let session = self.sessions.get_or_create(&event.respondent_id).await;
                let mut session = session.lock().await;
                session.start();
                tracing::info!(respondent = %event.respondent_id, "survey started");
                let mut prompts = vec![Prompt::plain(format!(
                    "{WELCOME_MESSAGE}\n\nДля начала опроса ответьте на первый вопрос:"
                ))];
                prompts.push(question_prompt(catalog::question(flow::START)));
                prompts
            }
            MENU_RESERVE_INFO => vec![Prompt::with_keyboard(
                RESERVE_INFO,
                back_to_menu_keyboard(),
            )],
            MENU_HELP => vec![Prompt::with_keyboard(HELP_TEXT, back_to_menu_keyboard())],
            MENU_MAIN => vec![Prompt::with_keyboard(
                "🏠 Главное меню:",
                main_menu_keyboard(),
            )],
            other => {
                tracing::debug!(data = other, "unknown selection payload");
                vec![]
            }
        }
    }

    async fn status_prompt(&self, respondent_id: &str) -> Prompt {
        let not_started = || {
            Prompt::with_keyboard(
                "📊 Статус опроса:\n\nВы еще не начинали опрос.",
                back_to_menu_keyboard(),
            )
        };
        // Read-only: never materializes a session for the respondent.
        let Some(session) = self.sessions.get(respondent_id).await else {
            return not_started();
        };
        let session = session.lock().await;
        if session.answers().is_empty() {
            return not_started();
        }

        let mut text = String::from("📊 Статус опроса:\n\n");
        for id in QuestionId::ALL {
            if let Some(answer) = session.answers().get(id) {
                text.push_str(&format!("{}: {answer}\n", catalog::question(*id).prompt));
            }
        }
        if session.answers().contains_key(&QuestionId::FullName) {
            text.push_str("\n✅ Опрос завершен!");
        } else {
            text.push_str("\n⏳ Опрос в процессе...");
        }
        Prompt::with_keyboard(text, back_to_menu_keyboard())
    }

    // ── Survey answers ──────────────────────────────────────────────

    async fn handle_text(&self, text: &str, event: &InboundEvent) -> Vec<Prompt> {
        // Text without a live session is menu navigation, not an answer;
        // don't grow the store for it.
        let Some(session) = self.sessions.get(&event.respondent_id).await else {
            return vec![Prompt::with_keyboard(
                "Выберите действие:",
                main_menu_keyboard(),
            )];
        };
        let mut session = session.lock().await;

        let Some(current) = session.current() else {
            return vec![Prompt::with_keyboard(
                "Выберите действие:",
                main_menu_keyboard(),
            )];
        };
        let question = catalog::question(current);

        let outcome = match question.kind {
            QuestionKind::MultiChoice => {
                self.on_multi_choice(&mut session, question, text, &event.meta)
            }
            QuestionKind::SingleChoice | QuestionKind::Consent => {
                self.on_choice(&mut session, question, text, &event.meta)
            }
            QuestionKind::FreeText => self.on_free_text(&mut session, question, text, &event.meta),
        };

        match outcome {
            Ok(Reaction::Prompts(prompts)) => prompts,
            Ok(Reaction::Dismissed(prompts)) => {
                drop(session);
                self.sessions.remove_if_inactive(&event.respondent_id).await;
                prompts
            }
            Ok(Reaction::Completed(prompts, doc)) => {
                // Session is already cleared; release the lock before the
                // network calls so this respondent's queue stays short.
                drop(session);
                self.sessions.remove_if_inactive(&event.respondent_id).await;
                if let Err(e) = self.sink.submit(&doc).await {
                    tracing::error!(
                        respondent = %event.respondent_id,
                        error = %e,
                        "survey submission failed; answers were acknowledged but not delivered"
                    );
                }
                prompts
            }
            Err(e) => rejection_prompts(e, question),
        }
    }

    fn on_choice(
        &self,
        session: &mut Session,
        question: &Question,
        text: &str,
        meta: &RespondentMeta,
    ) -> Result<Reaction, Error> {
        let answer = self.validator.answer(question, text)?;
        session.record_answer(question.id, answer.clone())?;

        if question.id == QuestionId::WantsReserve {
            session.set_branch(if answer == catalog::YES {
                Branch::WantsReserve
            } else {
                Branch::DeclinesReserve
            });
        }

        Ok(self.advance(session, question.id, meta))
    }

    fn on_free_text(
        &self,
        session: &mut Session,
        question: &Question,
        text: &str,
        meta: &RespondentMeta,
    ) -> Result<Reaction, Error> {
        let answer = self.validator.answer(question, text)?;

        // The "other reason" elaboration is not an answer of its own: it
        // feeds the still-pending multi-select, which is then finalized.
        if question.id == QuestionId::OtherReasonDetail {
            session.set_other_detail(answer);
            session.advance_to(QuestionId::DeclineReasons);
            let reasons = catalog::question(QuestionId::DeclineReasons);
            session.finalize_multi_select(
                QuestionId::DeclineReasons,
                &self.config.multi_delimiter,
                reasons.detail_option,
            )?;
            return Ok(self.advance(session, QuestionId::DeclineReasons, meta));
        }

        session.record_answer(question.id, answer)?;
        Ok(self.advance(session, question.id, meta))
    }

    fn on_multi_choice(
        &self,
        session: &mut Session,
        question: &Question,
        text: &str,
        meta: &RespondentMeta,
    ) -> Result<Reaction, Error> {
        if text.trim() == catalog::FINISH_SELECTION {
            let needs_detail = question
                .detail_option
                .is_some_and(|opt| session.pending_selection().iter().any(|s| s == opt))
                && session.other_detail().is_none();

            if needs_detail {
                // Leave the selection pending; the resolver routes to the
                // elaboration question because no answer was recorded.
                return Ok(self.advance(session, question.id, meta));
            }

            session.finalize_multi_select(
                question.id,
                &self.config.multi_delimiter,
                question.detail_option,
            )?;
            return Ok(self.advance(session, question.id, meta));
        }

        let option = self.validator.choice(text, question.options)?;
        let requires_detail = question.detail_option == Some(option);
        let toggled = session.toggle_multi_select(question.id, option, requires_detail)?;

        let count = session.pending_selection().len();
        let feedback = match toggled {
            Toggled::Added => format!(
                "✅ Добавлено: {option}\n\nВыбрано: {count}\nВыберите еще или нажмите \
                 '{}'",
                catalog::FINISH_SELECTION
            ),
            Toggled::Removed => format!(
                "❌ Убрано: {option}\n\nВыбрано: {count}\nВыберите еще или нажмите \
                 '{}'",
                catalog::FINISH_SELECTION
            ),
        };
        Ok(Reaction::Prompts(vec![Prompt::plain(feedback)]))
    }

    /// Run the resolver from `from` and act on the step it returns.
    fn advance(&self, session: &mut Session, from: QuestionId, meta: &RespondentMeta) -> Reaction {
        match flow::next_question(from, session.answers(), session.branch()) {
            Step::Ask(next) => {
                session.advance_to(next);
                Reaction::Prompts(vec![question_prompt(catalog::question(next))])
            }
            Step::Disqualified => {
                tracing::info!("respondent disqualified at eligibility check");
                session.clear();
                Reaction::Dismissed(vec![
                    Prompt::with_keyboard(INELIGIBLE_MESSAGE, Keyboard::Remove),
                    Prompt::with_keyboard(
                        "Вы можете вернуться в главное меню:",
                        back_to_menu_keyboard(),
                    ),
                ])
            }
            Step::Terminal => {
                let doc = SubmissionDocument::from_session(session, meta);
                session.clear();
                Reaction::Completed(
                    vec![Prompt::with_keyboard(THANKS_MESSAGE, back_to_menu_keyboard())],
                    doc,
                )
            }
        }
    }
}

/// Internal outcome of one survey input.
enum Reaction {
    Prompts(Vec<Prompt>),
    /// Early exit without a submission; the session entry is dropped.
    Dismissed(Vec<Prompt>),
    /// Survey finished: acknowledge, then hand the document to the sink.
    Completed(Vec<Prompt>, SubmissionDocument),
}

/// Render a catalog question as an outbound prompt.
fn question_prompt(question: &Question) -> Prompt {
    match question.kind {
        QuestionKind::FreeText => Prompt::with_keyboard(question.prompt, Keyboard::Remove),
        QuestionKind::SingleChoice | QuestionKind::Consent => {
            Prompt::with_keyboard(question.prompt, Keyboard::Reply(question.keyboard_rows()))
        }
        QuestionKind::MultiChoice => Prompt::with_keyboard(
            format!(
                "{}\n\nВыбирайте варианты по одному, затем нажмите '{}'",
                question.prompt,
                catalog::FINISH_SELECTION
            ),
            Keyboard::Reply(question.keyboard_rows()),
        ),
    }
}

/// Map a recoverable error to corrective prompts, leaving state as-is.
fn rejection_prompts(error: Error, question: &Question) -> Vec<Prompt> {
    match error {
        Error::Validation(rejection) => vec![Prompt::plain(rejection_text(&rejection))],
        Error::Flow(FlowError::StaleInput) => vec![
            Prompt::plain(STALE_INPUT_MESSAGE),
            question_prompt(question),
        ],
        Error::Flow(FlowError::NotStarted) => vec![Prompt::with_keyboard(
            "Выберите действие:",
            main_menu_keyboard(),
        )],
        other => {
            tracing::error!(error = %other, "unexpected engine error");
            vec![Prompt::plain(STALE_INPUT_MESSAGE), question_prompt(question)]
        }
    }
}

/// Russian corrective text for each rejection.
fn rejection_text(rejection: &ValidationRejection) -> String {
    match rejection {
        ValidationRejection::TooLong { max, .. } => {
            format!("❌ Ответ слишком длинный. Пожалуйста, уложитесь в {max} символов.")
        }
        ValidationRejection::MeaninglessInput => {
            "❌ Пожалуйста, введите осмысленный ответ (минимум 2 символа).".to_string()
        }
        ValidationRejection::NotInOptionSet => USE_BUTTONS_MESSAGE.to_string(),
        ValidationRejection::InvalidName => {
            "❌ Укажите корректное ФИО (например: Иванов Иван Иванович): имя и фамилия, \
             только буквы, дефисы и точки, от 5 до 100 символов."
                .to_string()
        }
        ValidationRejection::InvalidNumber => {
            "❌ Табельный номер должен состоять из 1-9 цифр.".to_string()
        }
        ValidationRejection::EmptySelection => {
            "❌ Пожалуйста, выберите хотя бы один вариант.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_prompt_removes_keyboard() {
        let p = question_prompt(catalog::question(QuestionId::DesiredPosition));
        assert_eq!(p.keyboard, Keyboard::Remove);
    }

    #[test]
    fn choice_prompt_offers_option_rows() {
        let p = question_prompt(catalog::question(QuestionId::Age));
        let Keyboard::Reply(rows) = &p.keyboard else {
            panic!("expected a reply keyboard, got {:?}", p.keyboard);
        };
        let flat: Vec<&String> = rows.iter().flatten().collect();
        assert_eq!(flat.len(), catalog::AGE_GROUPS.len());
    }

    #[test]
    fn multi_choice_prompt_includes_finish_hint() {
        let p = question_prompt(catalog::question(QuestionId::RotationCities));
        assert!(p.text.contains(catalog::FINISH_SELECTION));
    }

    #[test]
    fn rejection_texts_are_user_readable() {
        let too_long = rejection_text(&ValidationRejection::TooLong { length: 1200, max: 1000 });
        assert!(too_long.contains("1000"));
        assert!(rejection_text(&ValidationRejection::InvalidNumber).contains("цифр"));
        assert!(rejection_text(&ValidationRejection::NotInOptionSet).contains("кнопок"));
    }

    #[test]
    fn stale_input_re_renders_the_active_prompt() {
        let question = catalog::question(QuestionId::Age);
        let prompts = rejection_prompts(FlowError::StaleInput.into(), question);
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].text.contains(question.prompt));
    }

    #[test]
    fn menu_keyboards_route_to_known_payloads() {
        let Keyboard::Inline(rows) = main_menu_keyboard() else {
            panic!("main menu must be inline");
        };
        let payloads: Vec<&str> = rows.iter().flatten().map(|(_, d)| d.as_str()).collect();
        assert_eq!(payloads, [MENU_START_SURVEY, MENU_RESERVE_INFO, MENU_HELP]);
    }
}

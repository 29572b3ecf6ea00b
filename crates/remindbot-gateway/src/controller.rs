//! Dialog Controller: routes inbound events through the dialog and keeps the
//! store and scheduler in step with each user's reminders.

use std::collections::HashMap;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use remindbot_config::DialogConfig;
use remindbot_cron::{JobScheduler, ScheduledJob};
use remindbot_storage::ProfileStore;
use remindbot_types::{InboundEvent, InboundKind, Keyboard, UserProfile, WeekdayCode};

use crate::actions::CallbackAction;
use crate::conversation::{
    DaySelection, DialogError, DialogStep, MessageOutcome, ReminderDraft, TimeParseError,
};
use crate::messenger::Messenger;
use crate::sessions::{ConversationRegistry, UserSession};
use crate::ui;

/// Controller knobs taken from the config.
#[derive(Debug, Clone)]
pub struct DialogSettings {
    /// Lower-cased greeting prefixes.
    pub greetings: Vec<String>,
    /// Timezone reminder triggers are evaluated in.
    pub timezone: Tz,
}

impl DialogSettings {
    pub fn new(config: &DialogConfig, timezone: Tz) -> Self {
        Self {
            greetings: config
                .greetings
                .iter()
                .map(|g| g.trim().to_lowercase())
                .filter(|g| !g.is_empty())
                .collect(),
            timezone,
        }
    }

    /// Whether `text` starts with a greeting word, ignoring case.
    pub fn is_greeting(&self, text: &str) -> bool {
        let text = text.trim_start().to_lowercase();
        self.greetings.iter().any(|g| text.starts_with(g.as_str()))
    }
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self::new(&DialogConfig::default(), chrono_tz::Europe::Rome)
    }
}

/// Where a reply goes: a new message, or an edit of the message whose
/// button was pressed.
#[derive(Debug, Clone, Copy)]
struct ReplyTarget {
    chat_id: i64,
    message_id: Option<i64>,
}

pub struct DialogController {
    store: Arc<dyn ProfileStore>,
    scheduler: Arc<dyn JobScheduler>,
    messenger: Arc<dyn Messenger>,
    sessions: Arc<ConversationRegistry>,
    settings: DialogSettings,
}

impl DialogController {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        scheduler: Arc<dyn JobScheduler>,
        messenger: Arc<dyn Messenger>,
        settings: DialogSettings,
    ) -> Self {
        Self {
            store,
            scheduler,
            messenger,
            sessions: Arc::new(ConversationRegistry::new()),
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<ConversationRegistry> {
        &self.sessions
    }

    /// Handle one inbound event. The user's session stays locked until the
    /// event is fully applied.
    pub async fn handle(&self, event: InboundEvent) -> anyhow::Result<()> {
        let session = self.sessions.session(event.user_id).await;
        let mut session = session.lock().await;
        session.touch();

        let user_id = event.user_id;
        let target = ReplyTarget {
            chat_id: event.chat_id,
            message_id: None,
        };

        match event.kind {
            InboundKind::Command { name } => self.on_command(&mut session, user_id, target, &name).await,
            InboundKind::Text(text) => self.on_text(&mut session, user_id, target, &text).await,
            InboundKind::Photo { file_id, caption } => {
                self.on_photo(&mut session, user_id, target, &file_id, caption.as_deref())
                    .await
            }
            InboundKind::Callback {
                query_id,
                message_id,
                data,
            } => {
                if let Err(e) = self.messenger.answer_callback(&query_id).await {
                    warn!(user_id, "Failed to answer callback query: {e}");
                }
                let target = ReplyTarget { message_id, ..target };
                self.on_callback(&mut session, user_id, target, &data).await
            }
        }
    }

    /// Consume inbound events until the sender side closes.
    ///
    /// Each event runs on its own task. A user's events are chained behind
    /// that user's previous task so they apply in arrival order; different
    /// users run concurrently.
    pub async fn run_inbound_loop(self: Arc<Self>, mut rx: mpsc::Receiver<InboundEvent>) {
        info!("Inbound event loop started");
        let mut in_flight: HashMap<i64, JoinHandle<()>> = HashMap::new();

        while let Some(event) = rx.recv().await {
            in_flight.retain(|_, task| !task.is_finished());

            let user_id = event.user_id;
            let previous = in_flight.remove(&user_id);
            let controller = self.clone();
            let task = tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                if let Err(e) = controller.handle(event).await {
                    warn!(user_id, "Failed to handle inbound event: {e:#}");
                }
            });
            in_flight.insert(user_id, task);
        }

        for (_, task) in in_flight {
            let _ = task.await;
        }
        info!("Inbound event loop stopped");
    }

    // ──────────────────── Event kinds ────────────────────

    async fn on_command(
        &self,
        session: &mut UserSession,
        user_id: i64,
        target: ReplyTarget,
        name: &str,
    ) -> anyhow::Result<()> {
        if name == "start" {
            let profile = self.store.get(user_id).await;
            if profile.as_ref().is_some_and(UserProfile::has_name) {
                session.step = None;
                return self.show_menu(user_id, target).await;
            }
            session.step = Some(DialogStep::AwaitingName);
            return self.reply(target, ui::NAME_PROMPT, None).await;
        }

        debug!(user_id, command = name, "Unknown command, back to menu");
        session.step = None;
        self.show_menu(user_id, target).await
    }

    async fn on_text(
        &self,
        session: &mut UserSession,
        user_id: i64,
        target: ReplyTarget,
        text: &str,
    ) -> anyhow::Result<()> {
        if self.settings.is_greeting(text) {
            return self.show_menu(user_id, target).await;
        }

        let Some(step) = session.step.as_mut() else {
            return self.show_menu(user_id, target).await;
        };

        match step {
            DialogStep::AwaitingName => match step.enter_name(text) {
                Ok(name) => {
                    session.step = None;
                    self.save_name(user_id, target, name).await
                }
                Err(_) => self.reply(target, ui::NAME_PROMPT, None).await,
            },
            DialogStep::AwaitingTime { .. } => match step.enter_time(text) {
                Ok(_) => self.reply(target, ui::MESSAGE_PROMPT, None).await,
                Err(DialogError::InvalidTime(TimeParseError::OutOfRange { .. })) => {
                    self.reply(target, ui::TIME_OUT_OF_RANGE, None).await
                }
                Err(_) => self.reply(target, ui::TIME_INVALID, None).await,
            },
            DialogStep::AwaitingMessage { .. } => match step.enter_message(text) {
                Ok(MessageOutcome::Complete(draft)) => {
                    session.step = None;
                    self.finish_reminder(user_id, target, draft).await
                }
                Ok(MessageOutcome::AwaitPhoto) => self.reply(target, ui::PHOTO_PROMPT, None).await,
                Err(e) => {
                    warn!(user_id, "Unexpected dialog error: {e}");
                    self.show_menu(user_id, target).await
                }
            },
            DialogStep::AwaitingDays { .. } | DialogStep::AwaitingPhoto { .. } => {
                self.show_menu(user_id, target).await
            }
        }
    }

    async fn on_photo(
        &self,
        session: &mut UserSession,
        user_id: i64,
        target: ReplyTarget,
        file_id: &str,
        caption: Option<&str>,
    ) -> anyhow::Result<()> {
        let draft = match &session.step {
            Some(step) => step.receive_photo(file_id, caption),
            None => Err(DialogError::WrongStep),
        };

        match draft {
            Ok(draft) => {
                session.step = None;
                self.finish_reminder(user_id, target, draft).await
            }
            Err(_) => {
                self.reply(
                    target,
                    ui::PHOTO_UNEXPECTED,
                    Some(&ui::menu_button_keyboard()),
                )
                .await
            }
        }
    }

    async fn on_callback(
        &self,
        session: &mut UserSession,
        user_id: i64,
        target: ReplyTarget,
        data: &str,
    ) -> anyhow::Result<()> {
        let Some(action) = CallbackAction::parse(data) else {
            debug!(user_id, data, "Unrecognized callback data");
            return self.show_menu(user_id, target).await;
        };

        match action {
            CallbackAction::Menu => self.show_menu(user_id, target).await,
            CallbackAction::Add(kind) => {
                session.step = Some(DialogStep::start_reminder(kind));
                let keyboard = ui::day_picker(&DaySelection::default());
                self.reply(target, ui::DAYS_PROMPT, Some(&keyboard)).await
            }
            CallbackAction::ToggleDay(day) => self.toggle_day(session, user_id, target, day).await,
            CallbackAction::SubmitDays => {
                let Some(step) = session.step.as_mut() else {
                    return self.show_menu(user_id, target).await;
                };
                // Repeated tap on "Invia" after the days were accepted.
                if matches!(step, DialogStep::AwaitingTime { .. }) {
                    return self.reply(target, ui::TIME_PROMPT, None).await;
                }
                let kind = step.kind();
                match (step.submit_days(), kind) {
                    (Ok(()), _) => self.reply(target, ui::TIME_PROMPT, None).await,
                    (Err(DialogError::NoDaysSelected), Some(kind)) => {
                        self.reply(target, ui::NO_DAYS, Some(&ui::retry_keyboard(kind)))
                            .await
                    }
                    _ => {
                        session.step = None;
                        self.show_menu(user_id, target).await
                    }
                }
            }
            CallbackAction::ListForDeletion => self.list_for_deletion(user_id, target).await,
            CallbackAction::Delete(index) => self.delete_reminder(user_id, target, index).await,
        }
    }

    // ──────────────────── Dialog steps ────────────────────

    async fn toggle_day(
        &self,
        session: &mut UserSession,
        user_id: i64,
        target: ReplyTarget,
        day: WeekdayCode,
    ) -> anyhow::Result<()> {
        let keyboard = match session.step.as_mut().map(|s| s.toggle_day(day)) {
            Some(Ok(selection)) => ui::day_picker(selection),
            _ => return self.show_menu(user_id, target).await,
        };

        match target.message_id {
            Some(message_id) => {
                self.messenger
                    .edit_keyboard(target.chat_id, message_id, &keyboard)
                    .await
            }
            None => self.reply(target, ui::DAYS_PROMPT, Some(&keyboard)).await,
        }
    }

    async fn save_name(&self, user_id: i64, target: ReplyTarget, name: String) -> anyhow::Result<()> {
        let mut profile = self
            .store
            .get(user_id)
            .await
            .unwrap_or_else(|| UserProfile::new(user_id, ""));
        profile.name = name.clone();

        let saved = self.persist(profile).await;
        info!(user_id, name = %name, "Profile name saved");
        self.reply(
            target,
            &ui::with_persist_warning(ui::name_saved(&name), saved),
            Some(&ui::open_menu_keyboard()),
        )
        .await
    }

    /// Fan the draft out into one reminder per day, schedule each, then
    /// store the ones that scheduled.
    async fn finish_reminder(
        &self,
        user_id: i64,
        target: ReplyTarget,
        draft: ReminderDraft,
    ) -> anyhow::Result<()> {
        let (kind, text, time) = (draft.kind, draft.text.clone(), draft.time);
        let mut profile = self
            .store
            .get(user_id)
            .await
            .unwrap_or_else(|| UserProfile::new(user_id, ""));

        let mut scheduled = 0;
        for reminder in draft.into_definitions(user_id, target.chat_id) {
            let job = ScheduledJob::for_reminder(&reminder, self.settings.timezone);
            match self.scheduler.add_job(job).await {
                Ok(()) => {
                    info!(user_id, job_id = %reminder.id, day = %reminder.day, "Reminder scheduled");
                    profile.reminders.push(reminder);
                    scheduled += 1;
                }
                Err(e) => warn!(user_id, job_id = %reminder.id, "Failed to schedule reminder: {e}"),
            }
        }

        if scheduled == 0 {
            return self
                .reply(target, ui::SCHEDULE_FAILED, Some(&ui::back_to_menu_keyboard()))
                .await;
        }

        let saved = self.persist(profile).await;
        self.reply(
            target,
            &ui::with_persist_warning(ui::reminder_saved(kind, &text, time), saved),
            Some(&ui::back_to_menu_keyboard()),
        )
        .await
    }

    async fn list_for_deletion(&self, user_id: i64, target: ReplyTarget) -> anyhow::Result<()> {
        let reminders = self
            .store
            .get(user_id)
            .await
            .map(|p| p.reminders)
            .unwrap_or_default();

        if reminders.is_empty() {
            return self
                .reply(target, ui::NOTHING_TO_DELETE, Some(&ui::menu_button_keyboard()))
                .await;
        }
        self.reply(target, ui::DELETE_PROMPT, Some(&ui::deletion_keyboard(&reminders)))
            .await
    }

    /// Remove the reminder at `index`. The scheduler job is removed first;
    /// a missing job doesn't stop the store edit.
    async fn delete_reminder(
        &self,
        user_id: i64,
        target: ReplyTarget,
        index: usize,
    ) -> anyhow::Result<()> {
        let profile = self
            .store
            .get(user_id)
            .await
            .filter(|p| index < p.reminders.len());
        let Some(mut profile) = profile else {
            debug!(user_id, index, "Delete index out of range");
            return self
                .reply(target, ui::NOT_FOUND, Some(&ui::menu_button_keyboard()))
                .await;
        };

        let removed = profile.reminders.remove(index);
        if let Err(e) = self.scheduler.remove_job(&removed.id).await {
            warn!(user_id, job_id = %removed.id, "Failed to remove reminder job: {e}");
        }

        let saved = self.persist(profile).await;
        info!(user_id, job_id = %removed.id, "Reminder deleted");
        self.reply(
            target,
            &ui::with_persist_warning(ui::DELETED.to_string(), saved),
            Some(&ui::menu_button_keyboard()),
        )
        .await
    }

    // ──────────────────── Helpers ────────────────────

    async fn show_menu(&self, user_id: i64, target: ReplyTarget) -> anyhow::Result<()> {
        let name = self.store.get(user_id).await.map(|p| p.name);
        self.reply(target, &ui::menu_text(name.as_deref()), Some(&ui::menu_keyboard()))
            .await
    }

    /// Save `profile`. Returns false (and logs) when the write didn't stick.
    async fn persist(&self, profile: UserProfile) -> bool {
        let user_id = profile.user_id;
        match self.store.set(profile).await {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id, "Failed to persist profile: {e}");
                false
            }
        }
    }

    async fn reply(
        &self,
        target: ReplyTarget,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> anyhow::Result<()> {
        match target.message_id {
            Some(message_id) => {
                self.messenger
                    .edit_text(target.chat_id, message_id, text, keyboard)
                    .await
            }
            None => self.messenger.send_text(target.chat_id, text, keyboard).await,
        }
    }
}

//! Inline button payloads.

use remindbot_types::{ReminderKind, WeekdayCode};

/// A parsed button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Menu,
    Add(ReminderKind),
    ToggleDay(WeekdayCode),
    SubmitDays,
    ListForDeletion,
    Delete(usize),
}

impl CallbackAction {
    /// Parse callback data such as `giorno_mon` or `del_2`.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "menu" => return Some(CallbackAction::Menu),
            "add_text" => return Some(CallbackAction::Add(ReminderKind::Text)),
            "add_photo" => return Some(CallbackAction::Add(ReminderKind::Photo)),
            "giorni_ok" => return Some(CallbackAction::SubmitDays),
            "cancella" => return Some(CallbackAction::ListForDeletion),
            _ => {}
        }
        if let Some(code) = data.strip_prefix("giorno_") {
            return code.parse().ok().map(CallbackAction::ToggleDay);
        }
        if let Some(index) = data.strip_prefix("del_") {
            return index.parse().ok().map(CallbackAction::Delete);
        }
        None
    }

    /// The callback data this action is sent as.
    pub fn data(&self) -> String {
        match self {
            CallbackAction::Menu => "menu".into(),
            CallbackAction::Add(kind) => format!("add_{kind}"),
            CallbackAction::ToggleDay(day) => format!("giorno_{day}"),
            CallbackAction::SubmitDays => "giorni_ok".into(),
            CallbackAction::ListForDeletion => "cancella".into(),
            CallbackAction::Delete(index) => format!("del_{index}"),
        }
    }
}

//! Per-user reminder-creation dialog.
//!
//! ```text
//! AwaitingName ──name──▶ (profile saved)
//! AwaitingDays ──toggle──▶ AwaitingDays
//!              ──submit (≥1 day)──▶ AwaitingTime
//! AwaitingTime ──H[:.]MM──▶ AwaitingMessage
//! AwaitingMessage ──text (kind=text)──▶ (draft complete)
//!                 ──text (kind=photo)──▶ AwaitingPhoto
//! AwaitingPhoto ──photo──▶ (draft complete)
//! ```

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use remindbot_types::{ReminderDefinition, ReminderKind, ReminderTime, WeekdayCode};

/// Body used when a text reminder's message is blank.
pub const DEFAULT_TEXT: &str = "Promemoria";
/// Caption used when a photo reminder has neither caption nor message.
pub const DEFAULT_PHOTO_CAPTION: &str = "Foto";

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})[:.]?([0-9]{0,2})").expect("valid time pattern"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("no time found in input")]
    NoMatch,
    #[error("time out of range: {hour}:{minute}")]
    OutOfRange { hour: u32, minute: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("event does not apply to the current dialog step")]
    WrongStep,
    #[error("no day selected")]
    NoDaysSelected,
    #[error("invalid time: {0}")]
    InvalidTime(#[from] TimeParseError),
    #[error("empty name")]
    EmptyName,
}

/// Lenient time parsing.
///
/// Takes the first run of one or two digits as the hour, then an optional
/// `:` or `.` and up to two digits as minutes (0 when absent). Digits after
/// the separator are literal minutes: `"7.5"` is 07:05.
pub fn parse_time(input: &str) -> Result<ReminderTime, TimeParseError> {
    let caps = TIME_PATTERN
        .captures(input)
        .ok_or(TimeParseError::NoMatch)?;
    let hour: u32 = caps[1].parse().map_err(|_| TimeParseError::NoMatch)?;
    let minute: u32 = match caps.get(2).map(|m| m.as_str()) {
        Some(m) if !m.is_empty() => m.parse().map_err(|_| TimeParseError::NoMatch)?,
        _ => 0,
    };
    ReminderTime::new(hour, minute).map_err(|_| TimeParseError::OutOfRange { hour, minute })
}

/// First whitespace-separated token, first letter upper-cased, rest lower-cased.
pub fn display_name(input: &str) -> Option<String> {
    let token = input.split_whitespace().next()?;
    let mut chars = token.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

/// Days picked for a reminder.
///
/// The every-day wildcard and individual days are mutually exclusive; order
/// follows selection and entries are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySelection {
    days: Vec<WeekdayCode>,
}

impl DaySelection {
    pub fn toggle(&mut self, day: WeekdayCode) {
        if day.is_every() {
            if self.days == [WeekdayCode::Every] {
                self.days.clear();
            } else {
                self.days = vec![WeekdayCode::Every];
            }
        } else if let Some(pos) = self.days.iter().position(|d| *d == day) {
            self.days.remove(pos);
        } else {
            self.days.retain(|d| !d.is_every());
            self.days.push(day);
        }
    }

    pub fn contains(&self, day: WeekdayCode) -> bool {
        self.days.contains(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> &[WeekdayCode] {
        &self.days
    }
}

/// Where a user is in the dialog. Absent when idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogStep {
    AwaitingName,
    AwaitingDays {
        kind: ReminderKind,
        selection: DaySelection,
    },
    AwaitingTime {
        kind: ReminderKind,
        days: Vec<WeekdayCode>,
    },
    AwaitingMessage {
        kind: ReminderKind,
        days: Vec<WeekdayCode>,
        time: ReminderTime,
    },
    AwaitingPhoto {
        days: Vec<WeekdayCode>,
        time: ReminderTime,
        message: String,
    },
}

/// Result of entering the reminder message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Complete(ReminderDraft),
    AwaitPhoto,
}

impl DialogStep {
    /// Begin a new reminder of `kind` with nothing selected.
    pub fn start_reminder(kind: ReminderKind) -> Self {
        DialogStep::AwaitingDays {
            kind,
            selection: DaySelection::default(),
        }
    }

    pub fn kind(&self) -> Option<ReminderKind> {
        match self {
            DialogStep::AwaitingName => None,
            DialogStep::AwaitingDays { kind, .. }
            | DialogStep::AwaitingTime { kind, .. }
            | DialogStep::AwaitingMessage { kind, .. } => Some(*kind),
            DialogStep::AwaitingPhoto { .. } => Some(ReminderKind::Photo),
        }
    }

    /// Validate the onboarding name, returning its display form.
    pub fn enter_name(&self, input: &str) -> Result<String, DialogError> {
        if *self != DialogStep::AwaitingName {
            return Err(DialogError::WrongStep);
        }
        display_name(input).ok_or(DialogError::EmptyName)
    }

    pub fn toggle_day(&mut self, day: WeekdayCode) -> Result<&DaySelection, DialogError> {
        match self {
            DialogStep::AwaitingDays { selection, .. } => {
                selection.toggle(day);
                Ok(selection)
            }
            _ => Err(DialogError::WrongStep),
        }
    }

    /// Move on to time entry. An empty selection leaves the step unchanged.
    pub fn submit_days(&mut self) -> Result<(), DialogError> {
        let DialogStep::AwaitingDays { kind, selection } = self else {
            return Err(DialogError::WrongStep);
        };
        if selection.is_empty() {
            return Err(DialogError::NoDaysSelected);
        }
        *self = DialogStep::AwaitingTime {
            kind: *kind,
            days: selection.days().to_vec(),
        };
        Ok(())
    }

    /// Parse the time. An invalid time leaves the step unchanged.
    pub fn enter_time(&mut self, input: &str) -> Result<ReminderTime, DialogError> {
        let DialogStep::AwaitingTime { kind, days } = self else {
            return Err(DialogError::WrongStep);
        };
        let time = parse_time(input)?;
        *self = DialogStep::AwaitingMessage {
            kind: *kind,
            days: std::mem::take(days),
            time,
        };
        Ok(time)
    }

    /// Record the reminder text. Text reminders complete here; photo
    /// reminders move on to waiting for the image.
    pub fn enter_message(&mut self, input: &str) -> Result<MessageOutcome, DialogError> {
        let DialogStep::AwaitingMessage { kind, days, time } = self else {
            return Err(DialogError::WrongStep);
        };
        let message = input.trim();
        match *kind {
            ReminderKind::Text => Ok(MessageOutcome::Complete(ReminderDraft {
                kind: ReminderKind::Text,
                days: days.clone(),
                time: *time,
                text: non_blank(message).unwrap_or(DEFAULT_TEXT).to_string(),
                photo_reference: None,
            })),
            ReminderKind::Photo => {
                let (days, time) = (std::mem::take(days), *time);
                *self = DialogStep::AwaitingPhoto {
                    days,
                    time,
                    message: message.to_string(),
                };
                Ok(MessageOutcome::AwaitPhoto)
            }
        }
    }

    /// Complete a photo reminder. The caption wins over the earlier message.
    pub fn receive_photo(
        &self,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<ReminderDraft, DialogError> {
        let DialogStep::AwaitingPhoto {
            days,
            time,
            message,
        } = self
        else {
            return Err(DialogError::WrongStep);
        };
        let text = caption
            .map(str::trim)
            .and_then(non_blank)
            .or_else(|| non_blank(message))
            .unwrap_or(DEFAULT_PHOTO_CAPTION);
        Ok(ReminderDraft {
            kind: ReminderKind::Photo,
            days: days.clone(),
            time: *time,
            text: text.to_string(),
            photo_reference: Some(file_id.to_string()),
        })
    }
}

fn non_blank(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// A finished dialog, ready to fan out into one definition per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub kind: ReminderKind,
    pub days: Vec<WeekdayCode>,
    pub time: ReminderTime,
    pub text: String,
    pub photo_reference: Option<String>,
}

impl ReminderDraft {
    pub fn into_definitions(self, user_id: i64, chat_id: i64) -> Vec<ReminderDefinition> {
        self.days
            .iter()
            .map(|day| ReminderDefinition {
                id: reminder_id(user_id, *day, self.time, self.kind),
                text: self.text.clone(),
                time: self.time,
                kind: self.kind,
                day: *day,
                chat_id,
                photo_reference: self.photo_reference.clone(),
            })
            .collect()
    }
}

/// `{user}_{day}_{hour}_{minute}_{kind}_{random}`.
fn reminder_id(user_id: i64, day: WeekdayCode, time: ReminderTime, kind: ReminderKind) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{user_id}_{day}_{}_{}_{kind}_{}",
        time.hour(),
        time.minute(),
        &suffix[..8]
    )
}

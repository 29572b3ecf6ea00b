use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ──────────────────── Schedule Types ────────────────────

/// A day of the week a reminder fires on, or `Every` for all seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeekdayCode {
    #[serde(rename = "mon")]
    Mon,
    #[serde(rename = "tue")]
    Tue,
    #[serde(rename = "wed")]
    Wed,
    #[serde(rename = "thu")]
    Thu,
    #[serde(rename = "fri")]
    Fri,
    #[serde(rename = "sat")]
    Sat,
    #[serde(rename = "sun")]
    Sun,
    #[serde(rename = "*")]
    Every,
}

impl WeekdayCode {
    /// The seven individual days, Monday first.
    pub const DAYS: [WeekdayCode; 7] = [
        WeekdayCode::Mon,
        WeekdayCode::Tue,
        WeekdayCode::Wed,
        WeekdayCode::Thu,
        WeekdayCode::Fri,
        WeekdayCode::Sat,
        WeekdayCode::Sun,
    ];

    /// Short code used in callback payloads, job ids and the data file.
    pub fn code(self) -> &'static str {
        match self {
            WeekdayCode::Mon => "mon",
            WeekdayCode::Tue => "tue",
            WeekdayCode::Wed => "wed",
            WeekdayCode::Thu => "thu",
            WeekdayCode::Fri => "fri",
            WeekdayCode::Sat => "sat",
            WeekdayCode::Sun => "sun",
            WeekdayCode::Every => "*",
        }
    }

    /// Human label shown on the day picker.
    pub fn label(self) -> &'static str {
        match self {
            WeekdayCode::Mon => "Lunedì",
            WeekdayCode::Tue => "Martedì",
            WeekdayCode::Wed => "Mercoledì",
            WeekdayCode::Thu => "Giovedì",
            WeekdayCode::Fri => "Venerdì",
            WeekdayCode::Sat => "Sabato",
            WeekdayCode::Sun => "Domenica",
            WeekdayCode::Every => "Ogni giorno",
        }
    }

    pub fn is_every(self) -> bool {
        self == WeekdayCode::Every
    }
}

impl fmt::Display for WeekdayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for WeekdayCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" => Ok(WeekdayCode::Every),
            other => WeekdayCode::DAYS
                .into_iter()
                .find(|d| d.code() == other)
                .ok_or_else(|| ParseError::Weekday(other.to_string())),
        }
    }
}

/// Wall-clock time of day a reminder fires at. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    /// Build a time, rejecting hours above 23 and minutes above 59.
    pub fn new(hour: u32, minute: u32) -> Result<Self, ParseError> {
        if hour > 23 || minute > 59 {
            return Err(ParseError::TimeOutOfRange { hour, minute });
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    pub fn minute(&self) -> u32 {
        self.minute as u32
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ReminderTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| ParseError::Time(s.to_string()))?;
        let hour = h.parse().map_err(|_| ParseError::Time(s.to_string()))?;
        let minute = m.parse().map_err(|_| ParseError::Time(s.to_string()))?;
        ReminderTime::new(hour, minute)
    }
}

impl TryFrom<String> for ReminderTime {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReminderTime> for String {
    fn from(value: ReminderTime) -> Self {
        value.to_string()
    }
}

/// Errors from parsing the persisted textual forms of schedule values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown weekday code: {0}")]
    Weekday(String),
    #[error("malformed time (expected HH:MM): {0}")]
    Time(String),
    #[error("time out of range: {hour}:{minute}")]
    TimeOutOfRange { hour: u32, minute: u32 },
}

// ──────────────────── Reminder Types ────────────────────

/// What a reminder re-sends when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Text,
    Photo,
}

impl ReminderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Text => "text",
            ReminderKind::Photo => "photo",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix prepended to every reminder when it is delivered.
pub const FIRING_PREFIX: &str = "⏰ ";

/// One schedulable reminder bound to a single weekday and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDefinition {
    /// Unique id, also used as the scheduler job id.
    pub id: String,
    /// Message body, or photo caption.
    pub text: String,
    pub time: ReminderTime,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub day: WeekdayCode,
    /// Destination chat, captured at creation time.
    pub chat_id: i64,
    /// Transport file reference for photo reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_reference: Option<String>,
}

impl ReminderDefinition {
    /// Build the payload delivered each time this reminder fires.
    pub fn payload(&self) -> ReminderPayload {
        let text = format!("{FIRING_PREFIX}{}", self.text);
        match (&self.kind, &self.photo_reference) {
            (ReminderKind::Photo, Some(photo)) => ReminderPayload::Photo {
                chat_id: self.chat_id,
                photo_reference: photo.clone(),
                caption: text,
            },
            _ => ReminderPayload::Text {
                chat_id: self.chat_id,
                text,
            },
        }
    }
}

/// A user's profile: display name plus reminders in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Filled from the map key when loaded; not stored inside the record.
    #[serde(skip)]
    pub user_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reminders: Vec<ReminderDefinition>,
}

impl UserProfile {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            reminders: Vec::new(),
        }
    }

    /// Whether onboarding captured a display name.
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Message handed to the messenger when a scheduled job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderPayload {
    Text {
        chat_id: i64,
        text: String,
    },
    Photo {
        chat_id: i64,
        photo_reference: String,
        caption: String,
    },
}

impl ReminderPayload {
    pub fn chat_id(&self) -> i64 {
        match self {
            ReminderPayload::Text { chat_id, .. } | ReminderPayload::Photo { chat_id, .. } => {
                *chat_id
            }
        }
    }
}

// ──────────────────── Inbound Types ────────────────────

/// An event received from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: i64,
    pub kind: InboundKind,
}

/// The shape of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// A slash command such as `/start`, without the slash or bot suffix.
    Command { name: String },
    /// Free text.
    Text(String),
    /// A photo upload. `file_id` is the largest available resolution.
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// An inline button press.
    Callback {
        query_id: String,
        message_id: Option<i64>,
        data: String,
    },
}

// ──────────────────── Keyboard Types ────────────────────

/// A single inline button carrying an opaque callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// A keyboard with one button per row.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn single(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::column([Button::new(label, data)])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

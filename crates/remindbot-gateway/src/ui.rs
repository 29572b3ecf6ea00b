//! User-facing texts and inline keyboards.

use remindbot_types::{Button, Keyboard, ReminderDefinition, ReminderKind, ReminderTime, WeekdayCode};

use crate::actions::CallbackAction;
use crate::conversation::DaySelection;

pub const NAME_PROMPT: &str = "Ciao! Come vuoi che ti chiami?\nScrivi il tuo nome (es. Rico Plus)";
pub const DAYS_PROMPT: &str = "Scegli i giorni (puoi selezionarne più di uno):";
pub const NO_DAYS: &str = "Devi selezionare almeno un giorno!";
pub const TIME_PROMPT: &str = "Scrivi l'orario (es. 22:30, 22.30, 7.5, 9)";
pub const TIME_INVALID: &str = "⚠️ Orario non valido!\nEsempi: 22:30, 22.30, 7.5, 9";
pub const TIME_OUT_OF_RANGE: &str = "⚠️ Orario non valido (max 23:59)";
pub const MESSAGE_PROMPT: &str = "✏️ Cosa vuoi che ti ricordi?";
pub const PHOTO_PROMPT: &str = "📸 Mandami la foto per questo reminder";
pub const PHOTO_UNEXPECTED: &str =
    "📸 Prima scegli giorni, orario e messaggio dal menu (Aggiungi reminder con foto), poi mandami la foto.";
pub const NOTHING_TO_DELETE: &str = "Nessun reminder da cancellare";
pub const DELETE_PROMPT: &str = "Scegli cosa cancellare:";
pub const DELETED: &str = "Cancellato!";
pub const NOT_FOUND: &str = "Reminder non trovato";
pub const SCHEDULE_FAILED: &str = "⚠️ Non sono riuscito a programmare il reminder, riprova.";
pub const PERSIST_WARNING: &str =
    "⚠️ Non sono riuscito a salvare le modifiche: potrebbero andare perse al riavvio.";

const FALLBACK_NAME: &str = "amico";

pub fn menu_text(name: Option<&str>) -> String {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(FALLBACK_NAME);
    format!("Ciao {name}! Cosa vuoi fare?")
}

pub fn menu_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new(
            "Aggiungi reminder (testo)",
            CallbackAction::Add(ReminderKind::Text).data(),
        ),
        Button::new(
            "Aggiungi reminder (con foto)",
            CallbackAction::Add(ReminderKind::Photo).data(),
        ),
        Button::new("Cancella reminder", CallbackAction::ListForDeletion.data()),
    ])
}

pub fn name_saved(name: &str) -> String {
    format!("Perfetto {name}! Nome salvato 💾\nOra puoi usare il bot!")
}

pub fn open_menu_keyboard() -> Keyboard {
    Keyboard::single("Apri menu", CallbackAction::Menu.data())
}

pub fn back_to_menu_keyboard() -> Keyboard {
    Keyboard::single("🔙 Menu", CallbackAction::Menu.data())
}

pub fn menu_button_keyboard() -> Keyboard {
    Keyboard::single("Menu", CallbackAction::Menu.data())
}

/// Seven day buttons, the every-day button and submit, with ✅/⬜ marks.
pub fn day_picker(selection: &DaySelection) -> Keyboard {
    let mark = |day: WeekdayCode| if selection.contains(day) { "✅" } else { "⬜" };
    let days = WeekdayCode::DAYS
        .into_iter()
        .chain([WeekdayCode::Every])
        .map(|day| {
            Button::new(
                format!("{} {}", mark(day), day.label()),
                CallbackAction::ToggleDay(day).data(),
            )
        });
    Keyboard::column(days.chain([Button::new("Invia", CallbackAction::SubmitDays.data())]))
}

pub fn retry_keyboard(kind: ReminderKind) -> Keyboard {
    Keyboard::single("Riprova", CallbackAction::Add(kind).data())
}

pub fn reminder_saved(kind: ReminderKind, text: &str, time: ReminderTime) -> String {
    match kind {
        ReminderKind::Text => format!("✅ Reminder salvato!\n\"{text}\"\nAlle {time}"),
        ReminderKind::Photo => format!("✅ Reminder con foto salvato!\n\"{text}\"\nAlle {time} 📸"),
    }
}

/// One button per reminder, numbered from 1, plus a menu button.
pub fn deletion_keyboard(reminders: &[ReminderDefinition]) -> Keyboard {
    let items = reminders.iter().enumerate().map(|(i, r)| {
        Button::new(
            format!("{}. {} → {}", i + 1, r.text, r.time),
            CallbackAction::Delete(i).data(),
        )
    });
    Keyboard::column(items.chain([Button::new("Menu", CallbackAction::Menu.data())]))
}

/// Append the persistence warning to `text` when saving failed.
pub fn with_persist_warning(text: String, saved: bool) -> String {
    if saved {
        text
    } else {
        format!("{text}\n\n{PERSIST_WARNING}")
    }
}

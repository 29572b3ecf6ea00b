use std::fmt::Write as _;
use std::path::Path;

use remindbot_storage::{JsonFileStore, ProfileStore};
use remindbot_types::{ReminderKind, UserProfile};

/// Print every stored reminder, grouped by user.
pub async fn run_list(data_file: &Path) -> anyhow::Result<()> {
    let store = JsonFileStore::open(data_file)?;
    let profiles = store.list().await;
    print!("{}", render(&profiles));
    Ok(())
}

fn render(profiles: &[UserProfile]) -> String {
    if profiles.is_empty() {
        return "No profiles stored\n".into();
    }

    let mut out = String::new();
    for profile in profiles {
        let name = if profile.has_name() {
            profile.name.as_str()
        } else {
            "(no name)"
        };
        let _ = writeln!(
            out,
            "{} {name}: {} reminder(s)",
            profile.user_id,
            profile.reminders.len()
        );
        for r in &profile.reminders {
            let marker = match r.kind {
                ReminderKind::Text => "",
                ReminderKind::Photo => " 📸",
            };
            let _ = writeln!(
                out,
                "  {:<12} {} {}{marker}  [{}]",
                r.day.label(),
                r.time,
                r.text,
                r.id
            );
        }
    }
    out
}

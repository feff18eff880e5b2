use shared::{Action, ActionKind};

pub fn format_action(action: &Action) -> String {
    let title = action.title.as_deref().unwrap_or_default();
    let text = action.text.as_deref().unwrap_or_default();

    match action.kind {
        ActionKind::Prompt if text.is_empty() => format!("📝 {}", title),
        ActionKind::Prompt => format!("📝 {}\n━━━━━━━━━━━━━━━━━\n{}", title, text),
        ActionKind::Notice => format!("ℹ️ {}", text),
        ActionKind::Completion => format!("✅ {}\n━━━━━━━━━━━━━━━━━\n{}", title, text),
    }
}

use shared::SelectOption;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardButtonKind, InlineKeyboardMarkup};

const BUTTONS_PER_ROW: usize = 2;
const OPTION_PREFIX: &str = "opt:";

/// Buttons carry their position rather than the option value, since Telegram
/// limits callback data to 64 bytes and catalog names can be longer.
pub fn make_options_keyboard(options: &[SelectOption]) -> Option<InlineKeyboardMarkup> {
    if options.is_empty() {
        return None;
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = options
        .chunks(BUTTONS_PER_ROW)
        .enumerate()
        .map(|(row_index, row)| {
            row.iter()
                .enumerate()
                .map(|(i, option)| {
                    let index = row_index * BUTTONS_PER_ROW + i;
                    InlineKeyboardButton::callback(&option.label, format!("{OPTION_PREFIX}{index}"))
                })
                .collect()
        })
        .collect();

    Some(InlineKeyboardMarkup::new(rows))
}

/// Maps tapped callback data back to the label of the button that carried
/// it. The label is fed to the workflow as if the user had typed it.
pub fn resolve_option(markup: &InlineKeyboardMarkup, data: &str) -> Option<String> {
    data.strip_prefix(OPTION_PREFIX)?;

    markup
        .inline_keyboard
        .iter()
        .flatten()
        .find(|button| {
            matches!(&button.kind, InlineKeyboardButtonKind::CallbackData(d) if d == data)
        })
        .map(|button| button.text.clone())
}

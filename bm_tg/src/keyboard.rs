use bm_session::Keyboard;
use bm_session::Strings;
use teloxide::types::KeyboardButton;
use teloxide::types::KeyboardMarkup;

/// Reply keyboard for `keyboard`, labels from the string table; `None` leaves the current one in place
pub fn markup(keyboard: Keyboard, strings: &dyn Strings) -> Option<KeyboardMarkup> {
    if keyboard == Keyboard::Unchanged {
        return None;
    }
    let rows: Vec<Vec<KeyboardButton>> =
        keyboard.rows().into_iter().map(|row| row.into_iter().map(|button| KeyboardButton::new(button.label(strings))).collect()).collect();
    Some(KeyboardMarkup::new(rows).resize_keyboard())
}

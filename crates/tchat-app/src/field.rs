//! Editable single-line text fields.
//!
//! [`FieldSet`] maps each logical [`FieldId`] to a [`Field`]. Operations take
//! the field id explicitly; routing keystrokes only to the focused field is
//! the caller's job (see [`crate::focus`]).
//!
//! Cursor positions and lengths count `char`s, not bytes.

/// Logical input field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    /// Login username.
    Username,
    /// Login password (masked).
    Password,
    /// Chat compose line.
    Message,
    /// Channel list filter.
    ChannelSearch,
}

/// Glyph shown in place of each character of a masked field.
pub const MASK_GLYPH: char = '*';

/// A single-line text buffer with cursor, placeholder, masking and a length
/// limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    value: String,
    /// Cursor position in chars, `0..=len`.
    cursor: usize,
    max_length: usize,
    masked: bool,
    placeholder: &'static str,
}

impl Field {
    /// Create an empty field.
    pub fn new(placeholder: &'static str, max_length: usize) -> Self {
        Self { value: String::new(), cursor: 0, max_length, masked: false, placeholder }
    }

    /// Render every character as [`MASK_GLYPH`]. The buffer keeps plaintext.
    #[must_use]
    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Plaintext value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Maximum length in chars.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Whether the field renders masked.
    pub fn is_masked(&self) -> bool {
        self.masked
    }

    /// Placeholder shown while the field is empty.
    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// True if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Value as it should be displayed (masked if applicable).
    pub fn display(&self) -> String {
        if self.masked {
            std::iter::repeat_n(MASK_GLYPH, self.len()).collect()
        } else {
            self.value.clone()
        }
    }

    /// Insert a character at the cursor.
    ///
    /// Returns `false` (and drops the character) once the field is full or
    /// for control characters.
    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch.is_control() || self.len() >= self.max_length {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
        true
    }

    /// Delete the character before the cursor.
    pub fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
        true
    }

    /// Delete the character at the cursor.
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
        true
    }

    /// Move the cursor one char left.
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor one char right.
    pub fn move_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    /// Move the cursor to the start.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move the cursor to the end.
    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// Replace the value, truncating to `max_length`. Cursor moves to the
    /// end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.chars().filter(|c| !c.is_control()).take(self.max_length).collect();
        self.cursor = self.len();
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value.char_indices().nth(char_index).map_or(self.value.len(), |(at, _)| at)
    }
}

/// All input fields of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    username: Field,
    password: Field,
    message: Field,
    channel_search: Field,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSet {
    /// Username and password length limit.
    pub const CREDENTIAL_MAX_LENGTH: usize = 50;
    /// Compose line length limit.
    pub const MESSAGE_MAX_LENGTH: usize = 500;
    /// Channel search length limit.
    pub const SEARCH_MAX_LENGTH: usize = 50;

    /// Create the standard field set, all empty.
    pub fn new() -> Self {
        Self {
            username: Field::new("Username", Self::CREDENTIAL_MAX_LENGTH),
            password: Field::new("Password", Self::CREDENTIAL_MAX_LENGTH).masked(),
            message: Field::new("Type a message...", Self::MESSAGE_MAX_LENGTH),
            channel_search: Field::new("Search", Self::SEARCH_MAX_LENGTH),
        }
    }

    /// Field by id.
    pub fn get(&self, id: FieldId) -> &Field {
        match id {
            FieldId::Username => &self.username,
            FieldId::Password => &self.password,
            FieldId::Message => &self.message,
            FieldId::ChannelSearch => &self.channel_search,
        }
    }

    /// Mutable field by id.
    pub fn get_mut(&mut self, id: FieldId) -> &mut Field {
        match id {
            FieldId::Username => &mut self.username,
            FieldId::Password => &mut self.password,
            FieldId::Message => &mut self.message,
            FieldId::ChannelSearch => &mut self.channel_search,
        }
    }

    /// Insert a character into a field. Dropped when the field is full.
    pub fn insert_char(&mut self, id: FieldId, ch: char) -> bool {
        self.get_mut(id).insert_char(ch)
    }

    /// Delete the character before the cursor of a field.
    pub fn delete_backward(&mut self, id: FieldId) -> bool {
        self.get_mut(id).delete_backward()
    }

    /// Replace the value of a field.
    pub fn set_value(&mut self, id: FieldId, value: &str) {
        self.get_mut(id).set_value(value);
    }

    /// Current plaintext value of a field.
    pub fn value(&self, id: FieldId) -> &str {
        self.get(id).value()
    }

    /// Empty a field.
    pub fn clear(&mut self, id: FieldId) {
        self.get_mut(id).clear();
    }
}

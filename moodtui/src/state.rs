//! State types for the TUI application.

use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

pub const STATUS_TTL: Duration = Duration::from_secs(4);
pub const TICK_RATE: Duration = Duration::from_millis(200);

/// The current screen being displayed.
#[derive(Debug)]
pub enum Screen {
    Login(LoginForm),
    Dashboard,
}

/// Which dashboard panel receives j/k.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Initial,
    Target,
    History,
}

impl Focus {
    pub const VALUES: [Self; 3] = [Self::Initial, Self::Target, Self::History];

    pub fn next(self) -> Self {
        let idx = Self::VALUES.iter().position(|f| *f == self).unwrap_or(0);
        Self::VALUES[(idx + 1) % Self::VALUES.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// A status message with expiration tracking.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub created: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Email,
    Password,
}

impl LoginField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Username => "Username",
            Self::Email => "Email",
            Self::Password => "Password",
        }
    }
}

/// The login / registration form.
#[derive(Debug)]
pub struct LoginForm {
    pub mode: LoginMode,
    pub field: LoginField,
    pub username: EditInput,
    pub email: EditInput,
    pub password: EditInput,
    pub busy: bool,
}

impl LoginForm {
    pub fn new(username: Option<&str>) -> Self {
        let username = EditInput::new(username.unwrap_or_default().to_string());
        let field = if username.buffer.is_empty() {
            LoginField::Username
        } else {
            LoginField::Password
        };
        Self {
            mode: LoginMode::Login,
            field,
            username,
            email: EditInput::new(String::new()),
            password: EditInput::new(String::new()),
            busy: false,
        }
    }

    /// Fields shown in the current mode, top to bottom.
    pub const fn fields(&self) -> &'static [LoginField] {
        match self.mode {
            LoginMode::Login => &[LoginField::Username, LoginField::Password],
            LoginMode::Register => &[LoginField::Username, LoginField::Email, LoginField::Password],
        }
    }

    pub fn move_field(&mut self, delta: i32) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        let next = clamp_index(current, delta, fields.len().saturating_sub(1));
        self.field = fields[next];
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::Login => LoginMode::Register,
            LoginMode::Register => LoginMode::Login,
        };
        if !self.fields().contains(&self.field) {
            self.field = LoginField::Username;
        }
    }

    pub fn input(&self, field: LoginField) -> &EditInput {
        match field {
            LoginField::Username => &self.username,
            LoginField::Email => &self.email,
            LoginField::Password => &self.password,
        }
    }

    pub fn active_input_mut(&mut self) -> &mut EditInput {
        match self.field {
            LoginField::Username => &mut self.username,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    /// First empty field required by the current mode, if any.
    pub fn missing_field(&self) -> Option<LoginField> {
        self.fields()
            .iter()
            .copied()
            .find(|field| self.input(*field).buffer.trim().is_empty())
    }
}

/// Input state when editing a text field.
#[derive(Debug)]
pub struct EditInput {
    pub buffer: String,
    pub cursor: usize,
}

impl EditInput {
    /// Creates a new EditInput with cursor at the end.
    pub fn new(buffer: String) -> Self {
        let cursor = buffer.len();
        Self { buffer, cursor }
    }

    pub fn insert(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.buffer[..self.cursor]
                .chars()
                .last()
                .map_or(0, char::len_utf8);
            self.cursor -= prev;
            self.buffer.remove(self.cursor);
        }
    }

    /// Delete the character at the cursor (delete key).
    pub fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            let prev = self.buffer[..self.cursor]
                .chars()
                .last()
                .map_or(0, char::len_utf8);
            self.cursor -= prev;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            let next = self.buffer[self.cursor..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            self.cursor += next;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Returns the cursor position in display columns.
    pub fn cursor_display_width(&self) -> usize {
        self.buffer[..self.cursor].width()
    }

    /// Cursor column when the buffer is shown masked, one `*` per char.
    pub fn masked_cursor_width(&self) -> usize {
        self.buffer[..self.cursor].chars().count()
    }
}

/// Clamp an index after applying a delta.
pub fn clamp_index(current: usize, delta: i32, max: usize) -> usize {
    let current = isize::try_from(current).unwrap_or(0);
    let max = isize::try_from(max).unwrap_or(0);
    let delta = isize::try_from(delta).unwrap_or(0);
    let next = (current + delta).clamp(0, max);
    usize::try_from(next).unwrap_or(0)
}

//! Form model: named controls, dynamic rows and the unsaved-edits flag.
//!
//! A [`Form`] mirrors one rendered form. Controls keep their declaration order
//! so the submitted payload matches what a browser would send.

use crate::components::dispatcher::ActionKind;
use crate::components::rows::{Collection, Row, RowKey, RowSet};
use crate::config::FormConfig;
use crate::constants::{EMPTY_BINARY_SIZE, ROW_NAME, ROW_OLD_NAME};
use crate::transport::{PayloadValue, SelectedFile};
use crate::utils::bytes::human_readable_bytes;
use std::fmt;
use uuid::Uuid;

/// Identifier of a form registered with the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormId(Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsaved-edits flag and the action currently being submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub dirty: bool,
    pub pending_action: Option<ActionKind>,
}

/// Text input with an optional hard length cap.
///
/// The cap applies to typed and pasted text; values set by the console itself
/// (server echoes) are stored as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    max_length: Option<usize>,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            max_length: None,
        }
    }

    pub fn bounded(max_length: usize) -> Self {
        Self {
            value: String::new(),
            max_length: Some(max_length),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Type one character; returns false when the cap rejects it
    pub fn push_char(&mut self, c: char) -> bool {
        if let Some(max) = self.max_length {
            if self.value.chars().count() >= max {
                return false;
            }
        }
        self.value.push(c);
        true
    }

    /// Paste text, keeping only what fits under the cap; returns the number of characters accepted
    pub fn insert_str(&mut self, text: &str) -> usize {
        let room = match self.max_length {
            Some(max) => max.saturating_sub(self.value.chars().count()),
            None => usize::MAX,
        };
        let accepted: String = text.chars().take(room).collect();
        let count = accepted.chars().count();
        self.value.push_str(&accepted);
        count
    }

    pub fn pop_char(&mut self) -> Option<char> {
        self.value.pop()
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// "Null" toggle shown next to a nullable binary field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullToggle {
    pub checked: bool,
    pub visible: bool,
}

/// File-upload widget of a binary field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInput {
    pub file: Option<SelectedFile>,
    /// Size currently shown next to the widget
    pub displayed_size: String,
    /// Size of the stored value, restored when the selection is cleared
    pub reference_size: String,
    pub clear_visible: bool,
    pub null: Option<NullToggle>,
    pub disabled: bool,
}

impl BinaryInput {
    pub fn new(stored_size: impl Into<String>) -> Self {
        let size = stored_size.into();
        Self {
            file: None,
            displayed_size: size.clone(),
            reference_size: size,
            clear_visible: false,
            null: None,
            disabled: false,
        }
    }

    pub fn nullable(stored_size: impl Into<String>, has_value: bool) -> Self {
        Self {
            null: Some(NullToggle {
                checked: false,
                visible: has_value,
            }),
            ..Self::new(stored_size)
        }
    }

    pub fn select_file(&mut self, file: SelectedFile, locale: &str) {
        self.displayed_size = human_readable_bytes(file.size, locale);
        self.clear_visible = true;
        self.file = Some(file);
    }

    pub fn clear(&mut self) {
        self.file = None;
        self.displayed_size = self.reference_size.clone();
        self.clear_visible = false;
    }

    pub fn set_null(&mut self, checked: bool) {
        if let Some(null) = self.null.as_mut() {
            null.checked = checked;
            self.disabled = checked;
        }
    }

    /// Bring the widget in line with a value the server has just stored
    pub fn reset_after_update(&mut self) {
        self.reference_size = self.displayed_size.clone();
        self.clear_visible = false;

        if let Some(null) = self.null.as_mut() {
            if null.checked {
                null.checked = false;
                null.visible = false;
                self.disabled = false;
                self.displayed_size = EMPTY_BINARY_SIZE.to_string();
                self.reference_size = EMPTY_BINARY_SIZE.to_string();
            } else if self.file.is_some() {
                null.visible = true;
            }
        }

        self.file = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Text(TextInput),
    Hidden(String),
    Checkbox(bool),
    Select { options: Vec<String>, selected: usize },
    TextArea(String),
    Binary(BinaryInput),
}

/// A named form control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub name: String,
    pub title: String,
    pub kind: ControlKind,
}

impl Control {
    pub fn new(name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            kind,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Text(TextInput::new(value)))
    }

    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ControlKind::Hidden(value.into()))
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self::new(name, ControlKind::Checkbox(checked))
    }

    pub fn select(name: impl Into<String>, options: Vec<String>, selected: usize) -> Self {
        Self::new(name, ControlKind::Select { options, selected })
    }

    pub fn textarea(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ControlKind::TextArea(value.into()))
    }

    pub fn binary(name: impl Into<String>, input: BinaryInput) -> Self {
        Self::new(name, ControlKind::Binary(input))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Current value as text; `None` for binary widgets and unchecked boxes
    pub fn value(&self) -> Option<String> {
        match &self.kind {
            ControlKind::Text(input) => Some(input.value().to_string()),
            ControlKind::Hidden(value) | ControlKind::TextArea(value) => Some(value.clone()),
            ControlKind::Checkbox(true) => Some("on".to_string()),
            ControlKind::Checkbox(false) => None,
            ControlKind::Select { options, selected } => options.get(*selected).cloned(),
            ControlKind::Binary(_) => None,
        }
    }

    /// Overwrite the value; for selects, picks the matching option
    pub fn set_value(&mut self, value: &str) {
        match &mut self.kind {
            ControlKind::Text(input) => input.set_value(value),
            ControlKind::Hidden(current) | ControlKind::TextArea(current) => *current = value.to_string(),
            ControlKind::Checkbox(checked) => *checked = !value.is_empty(),
            ControlKind::Select { options, selected } => {
                if let Some(position) = options.iter().position(|option| option == value) {
                    *selected = position;
                }
            }
            ControlKind::Binary(_) => {}
        }
    }

    fn payload(&self) -> Vec<(String, PayloadValue)> {
        match &self.kind {
            ControlKind::Binary(input) => {
                let mut values = Vec::new();
                if let Some(file) = input.file.as_ref().filter(|_| !input.disabled) {
                    values.push((self.name.clone(), PayloadValue::File(file.clone())));
                }
                if input.null.map(|null| null.checked).unwrap_or(false) {
                    values.push((format!("{}:null", self.name), PayloadValue::Text("on".to_string())));
                }
                values
            }
            _ => self
                .value()
                .map(|value| vec![(self.name.clone(), PayloadValue::Text(value))])
                .unwrap_or_default(),
        }
    }
}

/// One rendered form
#[derive(Debug, Clone)]
pub struct Form {
    id: FormId,
    config: FormConfig,
    state: FormState,
    controls: Vec<Control>,
    rows: RowSet,
    all_checked: bool,
}

impl Form {
    pub fn new(config: FormConfig) -> Self {
        Self {
            id: FormId::new(),
            config,
            state: FormState::default(),
            controls: Vec::new(),
            rows: RowSet::default(),
            all_checked: false,
        }
    }

    /// Add a control rendered by the server
    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Add a row rendered by the server
    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.state.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.state.dirty = false;
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut RowSet {
        &mut self.rows
    }

    /// Look a control up by name, in the form body first and then in its rows
    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls
            .iter()
            .find(|control| control.name == name)
            .or_else(|| self.rows.iter().flat_map(|row| row.controls()).find(|control| control.name == name))
    }

    pub fn control_mut(&mut self, name: &str) -> Option<&mut Control> {
        if let Some(position) = self.controls.iter().position(|control| control.name == name) {
            return self.controls.get_mut(position);
        }
        self.rows
            .iter_mut()
            .flat_map(|row| row.controls_mut())
            .find(|control| control.name == name)
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.control(name).and_then(Control::value)
    }

    /// Set a control's value, adding it as a hidden field when it does not exist yet
    pub fn set_value(&mut self, name: &str, value: &str) {
        match self.control_mut(name) {
            Some(control) => control.set_value(value),
            None => self.controls.push(Control::hidden(name, value)),
        }
    }

    /// Apply a value typed by the user, honoring the input's length cap; returns false for unknown fields
    pub fn edit_value(&mut self, name: &str, value: &str) -> bool {
        let Some(control) = self.control_mut(name) else {
            return false;
        };
        match &mut control.kind {
            ControlKind::Text(input) => {
                input.set_value("");
                input.insert_str(value);
            }
            _ => control.set_value(value),
        }
        self.mark_dirty();
        true
    }

    pub fn binary_mut(&mut self, name: &str) -> Option<&mut BinaryInput> {
        match self.control_mut(name).map(|control| &mut control.kind) {
            Some(ControlKind::Binary(input)) => Some(input),
            _ => None,
        }
    }

    pub fn binary_inputs(&self) -> impl Iterator<Item = (&str, &BinaryInput)> {
        self.controls.iter().filter_map(|control| match &control.kind {
            ControlKind::Binary(input) => Some((control.name.as_str(), input)),
            _ => None,
        })
    }

    pub fn all_checked(&self) -> bool {
        self.all_checked
    }

    /// Toggle the "all" checkbox, setting every item checkbox to match
    pub fn set_all_checked(&mut self, checked: bool) {
        self.all_checked = checked;
        for row in self.rows.iter_mut() {
            row.set_checked(checked);
        }
    }

    /// Toggle one item checkbox; unchecking any item clears "all"
    pub fn set_row_checked(&mut self, key: &RowKey, checked: bool) -> bool {
        let Some(row) = self.rows.get_mut(key) else {
            return false;
        };
        row.set_checked(checked);
        if !checked {
            self.all_checked = false;
        }
        true
    }

    /// Remove every checked row and clear "all"; returns the removed keys
    pub fn remove_checked_rows(&mut self) -> Vec<RowKey> {
        self.all_checked = false;
        self.rows.remove_checked()
    }

    /// Copy every row's `name` into its `old_name` tracking field
    pub fn echo_old_names(&mut self) {
        for row in self.rows.iter_mut() {
            if !matches!(row.key().collection(), Collection::Fields | Collection::Indexes) {
                continue;
            }
            if let Some(name) = row.sub_value(ROW_NAME) {
                row.set_sub_value(ROW_OLD_NAME, &name);
            }
        }
    }

    pub fn reset_binary_inputs(&mut self) {
        for control in self.controls.iter_mut() {
            if let ControlKind::Binary(input) = &mut control.kind {
                input.reset_after_update();
            }
        }
    }

    /// The body a submission of `action` would carry
    pub fn payload(&self, action: &ActionKind) -> Vec<(String, PayloadValue)> {
        let mut fields: Vec<(String, PayloadValue)> = self
            .controls
            .iter()
            .filter(|control| control.name != crate::constants::FIELD_ACTION)
            .flat_map(Control::payload)
            .collect();

        for row in self.rows.iter() {
            fields.extend(row.controls().iter().flat_map(Control::payload));
            if row.is_checked() {
                fields.push((format!("{}:checked", row.key()), PayloadValue::Text("on".to_string())));
            }
        }

        fields.push((
            crate::constants::FIELD_ACTION.to_string(),
            PayloadValue::Text(action.as_str().to_string()),
        ));
        fields
    }
}

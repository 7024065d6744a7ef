//! Dynamic row collections of the schema editor.
//!
//! Rows of the fields, indexes and filters collections are keyed
//! `"<collection>:<index>"`. Indexes come from the page session counter and are
//! never reused, so a new row can never collide with the submitted name of a
//! row deleted earlier on the same page.

use crate::components::filters::FilterSpec;
use crate::config::FormLabels;
use crate::console::context::PageSession;
use crate::constants::{
    COLLECTION_FIELDS, COLLECTION_FILTERS, COLLECTION_INDEXES, INDEX_MODES, MAX_FIELD_NAME_LENGTH,
    MAX_INDEX_NAME_LENGTH, PRIMITIVE_TYPES, ROW_FIELDS, ROW_MODE, ROW_NAME, ROW_NOT_NULL, ROW_PARAMETERS, ROW_TYPE,
};
use crate::form::{Control, ControlKind, Form, TextInput};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Row not found: {0}")]
    UnknownRow(String),

    #[error("Invalid row key: {0}")]
    InvalidKey(String),

    #[error("Form not found")]
    UnknownForm,
}

/// Repeated row collections of a form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Fields,
    Indexes,
    Filters,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Fields => COLLECTION_FIELDS,
            Collection::Indexes => COLLECTION_INDEXES,
            Collection::Filters => COLLECTION_FILTERS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            COLLECTION_FIELDS => Ok(Collection::Fields),
            COLLECTION_INDEXES => Ok(Collection::Indexes),
            COLLECTION_FILTERS => Ok(Collection::Filters),
            other => Err(RowError::InvalidKey(other.to_string())),
        }
    }
}

/// Page-unique identifier of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    collection: Collection,
    index: u32,
}

impl RowKey {
    pub fn new(collection: Collection, index: u32) -> Self {
        Self { collection, index }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Name of one of the row's inputs, e.g. `fields:3:name`
    pub fn sub_name(&self, sub: &str) -> String {
        format!("{}:{}", self, sub)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.index)
    }
}

impl FromStr for RowKey {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(collection), Some(index)) = (parts.next(), parts.next()) else {
            return Err(RowError::InvalidKey(s.to_string()));
        };
        let index = index.parse().map_err(|_| RowError::InvalidKey(s.to_string()))?;
        Ok(RowKey::new(collection.parse()?, index))
    }
}

/// One row: its inputs, its item checkbox and, for filter rows, the filter it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    key: RowKey,
    controls: Vec<Control>,
    checked: bool,
    delete_label: String,
    filter: Option<FilterSpec>,
}

impl Row {
    pub fn new(key: RowKey) -> Self {
        Self {
            key,
            controls: Vec::new(),
            checked: false,
            delete_label: String::new(),
            filter: None,
        }
    }

    /// Add an input named after the row key and `sub`
    pub fn with_input(mut self, sub: &str, kind: ControlKind, title: &str) -> Self {
        self.controls
            .push(Control::new(self.key.sub_name(sub), kind).with_title(title));
        self
    }

    pub fn with_delete_label(mut self, label: impl Into<String>) -> Self {
        self.delete_label = label.into();
        self
    }

    pub fn key(&self) -> RowKey {
        self.key
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [Control] {
        &mut self.controls
    }

    pub fn delete_label(&self) -> &str {
        &self.delete_label
    }

    pub fn sub(&self, sub: &str) -> Option<&Control> {
        let name = self.key.sub_name(sub);
        self.controls.iter().find(|control| control.name == name)
    }

    pub fn sub_mut(&mut self, sub: &str) -> Option<&mut Control> {
        let name = self.key.sub_name(sub);
        self.controls.iter_mut().find(|control| control.name == name)
    }

    pub fn sub_value(&self, sub: &str) -> Option<String> {
        self.sub(sub).and_then(Control::value)
    }

    /// Set an input's value, adding a hidden input when the row has none
    pub fn set_sub_value(&mut self, sub: &str, value: &str) {
        match self.sub_mut(sub) {
            Some(control) => control.set_value(value),
            None => {
                let name = self.key.sub_name(sub);
                self.controls.push(Control::hidden(name, value));
            }
        }
    }

    /// The capped name input of a field or index row
    pub fn name_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.sub_mut(ROW_NAME).map(|control| &mut control.kind) {
            Some(ControlKind::Text(input)) => Some(input),
            _ => None,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn filter(&self) -> Option<&FilterSpec> {
        self.filter.as_ref()
    }

    pub fn set_filter(&mut self, filter: FilterSpec) {
        self.filter = Some(filter);
    }

    pub(crate) fn replace_controls(&mut self, controls: Vec<Control>) {
        self.controls = controls;
    }
}

/// Ordered rows of every collection of a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn get(&self, key: &RowKey) -> Option<&Row> {
        self.rows.iter().find(|row| row.key == *key)
    }

    pub fn get_mut(&mut self, key: &RowKey) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.key == *key)
    }

    pub fn remove(&mut self, key: &RowKey) -> Option<Row> {
        let position = self.rows.iter().position(|row| row.key == *key)?;
        Some(self.rows.remove(position))
    }

    pub fn remove_checked(&mut self) -> Vec<RowKey> {
        let removed = self.rows.iter().filter(|row| row.checked).map(|row| row.key).collect();
        self.rows.retain(|row| !row.checked);
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut()
    }

    pub fn in_collection(&self, collection: Collection) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.key.collection == collection)
    }

    /// Highest index in use for `collection`, if any row exists
    pub fn max_index(&self, collection: Collection) -> Option<u32> {
        self.in_collection(collection).map(|row| row.key.index).max()
    }

    pub fn keys(&self) -> Vec<RowKey> {
        self.rows.iter().map(|row| row.key).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Options of a field row's type selector: the primitive kinds, then the server's custom types
pub fn type_options(custom_types: &[String]) -> Vec<String> {
    PRIMITIVE_TYPES
        .iter()
        .map(|kind| kind.to_string())
        .chain(custom_types.iter().cloned())
        .collect()
}

/// A new field row with default widgets
pub fn field_row(key: RowKey, custom_types: &[String], labels: &FormLabels) -> Row {
    Row::new(key)
        .with_input(
            ROW_TYPE,
            ControlKind::Select {
                options: type_options(custom_types),
                selected: 0,
            },
            &labels.type_label,
        )
        .with_input(
            ROW_NAME,
            ControlKind::Text(TextInput::bounded(MAX_FIELD_NAME_LENGTH)),
            &labels.name,
        )
        .with_input(ROW_PARAMETERS, ControlKind::Text(TextInput::default()), &labels.parameters)
        .with_input(ROW_NOT_NULL, ControlKind::Checkbox(true), &labels.not_null)
        .with_delete_label(labels.drop_field.clone())
}

/// A new index row with default widgets
pub fn index_row(key: RowKey, labels: &FormLabels) -> Row {
    Row::new(key)
        .with_input(
            ROW_MODE,
            ControlKind::Select {
                options: INDEX_MODES.iter().map(|mode| mode.to_string()).collect(),
                selected: 0,
            },
            &labels.mode,
        )
        .with_input(
            ROW_NAME,
            ControlKind::Text(TextInput::bounded(MAX_INDEX_NAME_LENGTH)),
            &labels.name,
        )
        .with_input(ROW_FIELDS, ControlKind::Text(TextInput::default()), &labels.fields)
        .with_delete_label(labels.drop_index.clone())
}

/// Adds and removes rows of a form's collections
pub struct RowSetEditor;

impl RowSetEditor {
    /// Append a field row once the custom type names are known
    pub fn add_field_row(session: &mut PageSession, form: &mut Form, custom_types: &[String]) -> RowKey {
        let key = session.next_key(Collection::Fields);
        let row = field_row(key, custom_types, &form.config().labels);
        form.rows_mut().push(row);
        form.mark_dirty();
        log::debug!("Added row {}", key);
        key
    }

    pub fn add_index_row(session: &mut PageSession, form: &mut Form) -> RowKey {
        let key = session.next_key(Collection::Indexes);
        let row = index_row(key, &form.config().labels);
        form.rows_mut().push(row);
        form.mark_dirty();
        log::debug!("Added row {}", key);
        key
    }

    pub fn delete_row(form: &mut Form, key: &RowKey) -> Result<Row, RowError> {
        let row = form
            .rows_mut()
            .remove(key)
            .ok_or_else(|| RowError::UnknownRow(key.to_string()))?;
        form.mark_dirty();
        log::debug!("Deleted row {}", key);
        Ok(row)
    }
}

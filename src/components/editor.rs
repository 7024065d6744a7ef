//! Text editors bound to textarea fields.
//!
//! Which editor a field gets is decided once from its [`EditorMode`]. Every
//! content change is written back to the field and marks the form dirty,
//! whatever the backend.

use crate::form::{Form, FormId};
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Syntax of a source-mode editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSyntax {
    /// Structured data; content is checked as JSON
    Json,
    Named(String),
}

/// Editor declared for a textarea: `"visual"`, `"json"` or any source syntax name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EditorMode {
    Visual,
    Source(ContentSyntax),
}

impl From<String> for EditorMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "visual" => EditorMode::Visual,
            "json" => EditorMode::Source(ContentSyntax::Json),
            _ => EditorMode::Source(ContentSyntax::Named(value)),
        }
    }
}

impl From<EditorMode> for String {
    fn from(mode: EditorMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorMode::Visual => f.write_str("visual"),
            EditorMode::Source(ContentSyntax::Json) => f.write_str("json"),
            EditorMode::Source(ContentSyntax::Named(name)) => f.write_str(name),
        }
    }
}

/// An edit expressed in character offsets of the editor's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEdit {
    ReplaceAll(String),
    Insert { at: usize, text: String },
    Delete { at: usize, len: usize },
}

/// Contract every editor backend fulfils
pub trait TextEditor: Send {
    fn mode(&self) -> EditorMode;

    /// Replace the content with a field's stored value
    fn load(&mut self, value: &str);

    /// Apply an edit; returns true when the content changed
    fn apply(&mut self, edit: EditorEdit) -> bool;

    /// The field value for the current content
    fn save(&self) -> String;

    /// Text as the user sees it
    fn text(&self) -> String;
}

/// Apply `edit` to `text`, clamping offsets to its length
fn apply_edit(text: &mut String, edit: EditorEdit) -> bool {
    let byte_offset = |text: &str, at: usize| text.char_indices().nth(at).map(|(i, _)| i).unwrap_or(text.len());

    match edit {
        EditorEdit::ReplaceAll(value) => {
            if *text == value {
                return false;
            }
            *text = value;
            true
        }
        EditorEdit::Insert { at, text: inserted } => {
            if inserted.is_empty() {
                return false;
            }
            let offset = byte_offset(text, at);
            text.insert_str(offset, &inserted);
            true
        }
        EditorEdit::Delete { at, len } => {
            let start = byte_offset(text, at);
            let end = byte_offset(text, at.saturating_add(len));
            if start == end {
                return false;
            }
            text.replace_range(start..end, "");
            true
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "table", "tr",
];

const VOID_ELEMENTS: &[&str] = &["hr", "img", "input", "wbr", "col", "area", "source", "embed"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Tags, comments and layout whitespace, written back untouched
    Markup(String),
    Text(String),
    /// Boundary between two blocks; shown as a newline, written as nothing
    BlockBreak,
    /// `<br>`
    LineBreak,
}

impl Token {
    fn visible_len(&self) -> usize {
        match self {
            Token::Text(text) => text.chars().count(),
            Token::BlockBreak | Token::LineBreak => 1,
            Token::Markup(_) => 0,
        }
    }
}

fn tokenize_children(element: ElementRef, tokens: &mut Vec<Token>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text: &str = text;
                if text.trim().is_empty() && text.contains('\n') {
                    tokens.push(Token::Markup(text.to_string()));
                } else {
                    tokens.push(Token::Text(text.to_string()));
                }
            }
            Node::Comment(comment) => {
                let comment: &str = comment;
                tokens.push(Token::Markup(format!("<!--{}-->", comment)));
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    tokenize_element(child, tokens);
                }
            }
            _ => {}
        }
    }
}

fn tokenize_element(element: ElementRef, tokens: &mut Vec<Token>) {
    let name = element.value().name();
    if name == "br" {
        tokens.push(Token::LineBreak);
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    let after_content = tokens
        .iter()
        .rev()
        .find(|token| !matches!(token, Token::Markup(_)))
        .map(|token| *token != Token::BlockBreak)
        .unwrap_or(false);
    if block && after_content {
        tokens.push(Token::BlockBreak);
    }

    let mut open = format!("<{}", name);
    for (attr, value) in element.value().attrs() {
        open.push_str(&format!(" {}=\"{}\"", attr, escape_attr(value)));
    }
    open.push('>');
    tokens.push(Token::Markup(open));

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let start = tokens.len();
    tokenize_children(element, tokens);
    // Every block holds a text run so offsets inside it have somewhere to land
    if block && !tokens[start..].iter().any(|token| matches!(token, Token::Text(_))) {
        tokens.push(Token::Text(String::new()));
    }
    tokens.push(Token::Markup(format!("</{}>", name)));
}

fn char_offset(text: &str, at: usize) -> usize {
    text.char_indices().nth(at).map(|(i, _)| i).unwrap_or(text.len())
}

/// Visual editor over HTML content.
///
/// Content is held as markup tokens around text runs. Edits only touch the
/// text runs and `<br>`s, so inline formatting, links and lists come back out
/// of [`TextEditor::save`] as they went in. Block boundaries show as newlines
/// and survive deletes; [`EditorEdit::ReplaceAll`] rebuilds the content as
/// one paragraph per line.
#[derive(Debug, Clone, Default)]
pub struct RichTextEditor {
    tokens: Vec<Token>,
}

impl RichTextEditor {
    fn insert(&mut self, at: usize, inserted: &str) -> bool {
        if inserted.is_empty() {
            return false;
        }

        let mut position = 0;
        let mut target = None;
        for (index, token) in self.tokens.iter().enumerate() {
            let len = token.visible_len();
            if matches!(token, Token::Text(_)) && position <= at && at <= position + len {
                target = Some((index, at - position));
                break;
            }
            position += len;
        }

        let Some((index, offset)) = target else {
            let mut lines = inserted.split('\n');
            let first = lines.next().unwrap_or_default().to_string();
            self.tokens.push(Token::Markup("<p>".to_string()));
            self.tokens.push(Token::Text(first));
            for line in lines {
                self.tokens.push(Token::LineBreak);
                self.tokens.push(Token::Text(line.to_string()));
            }
            self.tokens.push(Token::Markup("</p>".to_string()));
            return true;
        };

        let Token::Text(text) = &self.tokens[index] else {
            return false;
        };
        let split = char_offset(text, offset);
        let (before, after) = (text[..split].to_string(), text[split..].to_string());

        let mut lines = inserted.split('\n');
        let mut replacement = vec![Token::Text(format!("{}{}", before, lines.next().unwrap_or_default()))];
        for line in lines {
            replacement.push(Token::LineBreak);
            replacement.push(Token::Text(line.to_string()));
        }
        if let Some(Token::Text(last)) = replacement.last_mut() {
            last.push_str(&after);
        }

        self.tokens.splice(index..=index, replacement);
        true
    }

    fn delete(&mut self, at: usize, len: usize) -> bool {
        let end = at.saturating_add(len);
        let mut position = 0;
        let mut changed = false;
        let mut kept = Vec::with_capacity(self.tokens.len());

        for token in self.tokens.drain(..) {
            let token_len = token.visible_len();
            let (start, stop) = (position, position + token_len);
            position = stop;

            match token {
                Token::Text(text) if start < end && at < stop => {
                    let from = char_offset(&text, at.saturating_sub(start));
                    let to = char_offset(&text, end.min(stop) - start);
                    let mut text = text;
                    text.replace_range(from..to, "");
                    changed = true;
                    kept.push(Token::Text(text));
                }
                Token::LineBreak if at <= start && start < end => changed = true,
                other => kept.push(other),
            }
        }

        self.tokens = kept;
        changed
    }
}

impl TextEditor for RichTextEditor {
    fn mode(&self) -> EditorMode {
        EditorMode::Visual
    }

    fn load(&mut self, value: &str) {
        let document = Html::parse_fragment(value);
        let mut tokens = Vec::new();
        tokenize_children(document.root_element(), &mut tokens);
        self.tokens = tokens;
    }

    fn apply(&mut self, edit: EditorEdit) -> bool {
        match edit {
            EditorEdit::ReplaceAll(value) => {
                if self.text() == value {
                    return false;
                }
                self.tokens.clear();
                if value.is_empty() {
                    return true;
                }
                for (i, line) in value.split('\n').enumerate() {
                    if i > 0 {
                        self.tokens.push(Token::BlockBreak);
                    }
                    self.tokens.push(Token::Markup("<p>".to_string()));
                    self.tokens.push(Token::Text(line.to_string()));
                    self.tokens.push(Token::Markup("</p>".to_string()));
                }
                true
            }
            EditorEdit::Insert { at, text } => self.insert(at, &text),
            EditorEdit::Delete { at, len } => self.delete(at, len),
        }
    }

    fn save(&self) -> String {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Markup(markup) => markup.clone(),
                Token::Text(text) => escape_html(text),
                Token::BlockBreak => String::new(),
                Token::LineBreak => "<br>".to_string(),
            })
            .collect()
    }

    fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Text(text) => text.as_str(),
                Token::BlockBreak | Token::LineBreak => "\n",
                Token::Markup(_) => "",
            })
            .collect()
    }
}

/// Plain source editor for a given syntax
#[derive(Debug, Clone)]
pub struct SourceEditor {
    syntax: ContentSyntax,
    text: String,
}

impl SourceEditor {
    pub fn new(syntax: ContentSyntax) -> Self {
        Self {
            syntax,
            text: String::new(),
        }
    }

    pub fn syntax(&self) -> &ContentSyntax {
        &self.syntax
    }

    /// Syntax problem in the current content, for JSON editors
    pub fn diagnostic(&self) -> Option<String> {
        match self.syntax {
            ContentSyntax::Json if !self.text.trim().is_empty() => serde_json::from_str::<serde_json::Value>(&self.text)
                .err()
                .map(|e| e.to_string()),
            _ => None,
        }
    }
}

impl TextEditor for SourceEditor {
    fn mode(&self) -> EditorMode {
        EditorMode::Source(self.syntax.clone())
    }

    fn load(&mut self, value: &str) {
        self.text = value.to_string();
    }

    fn apply(&mut self, edit: EditorEdit) -> bool {
        apply_edit(&mut self.text, edit)
    }

    fn save(&self) -> String {
        self.text.clone()
    }

    fn text(&self) -> String {
        self.text.clone()
    }
}

/// Create the editor backend for `mode`
pub fn editor_for(mode: &EditorMode) -> Box<dyn TextEditor> {
    match mode {
        EditorMode::Visual => Box::new(RichTextEditor::default()),
        EditorMode::Source(syntax) => Box::new(SourceEditor::new(syntax.clone())),
    }
}

/// New value of an editor-backed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub form: FormId,
    pub field: String,
    pub value: String,
}

/// An editor attached to one textarea of a form
pub struct EditorAdapter {
    form: FormId,
    field: String,
    editor: Box<dyn TextEditor>,
}

impl EditorAdapter {
    /// Attach the editor configured for `field`; `None` when the field has no editor
    pub fn attach(form: &Form, field: &str) -> Option<Self> {
        let mode = form.config().editors.get(field)?;
        let mut editor = editor_for(mode);
        editor.load(&form.value(field).unwrap_or_default());
        log::debug!("Attached {} editor to {}", mode, field);

        Some(Self {
            form: form.id(),
            field: field.to_string(),
            editor,
        })
    }

    pub fn form(&self) -> FormId {
        self.form
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn editor(&self) -> &dyn TextEditor {
        self.editor.as_ref()
    }

    /// Apply a user edit; a change yields the value to write back
    pub fn edit(&mut self, edit: EditorEdit) -> Option<ContentChange> {
        if !self.editor.apply(edit) {
            return None;
        }

        Some(ContentChange {
            form: self.form,
            field: self.field.clone(),
            value: self.editor.save(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_mode_names() {
        assert_eq!(EditorMode::from("visual".to_string()), EditorMode::Visual);
        assert_eq!(EditorMode::from("json".to_string()), EditorMode::Source(ContentSyntax::Json));
        assert_eq!(EditorMode::Source(ContentSyntax::Named("xml".to_string())).to_string(), "xml");
    }

    #[test]
    fn test_block_boundaries_survive_deletes() {
        let mut editor = RichTextEditor::default();
        editor.load("<p>one</p><p>two</p>");

        assert!(!editor.apply(EditorEdit::Delete { at: 3, len: 1 }));
        assert!(editor.apply(EditorEdit::Delete { at: 2, len: 3 }));
        assert_eq!(editor.text(), "on\nwo");
        assert_eq!(editor.save(), "<p>on</p><p>wo</p>");
    }

    #[test]
    fn test_edits_use_character_offsets() {
        let mut text = "héllo".to_string();
        assert!(apply_edit(&mut text, EditorEdit::Insert { at: 2, text: "-".to_string() }));
        assert_eq!(text, "hé-llo");
        assert!(apply_edit(&mut text, EditorEdit::Delete { at: 1, len: 2 }));
        assert_eq!(text, "hllo");
        assert!(!apply_edit(&mut text, EditorEdit::Delete { at: 10, len: 1 }));
    }
}

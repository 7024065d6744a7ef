use crate::config::StringsConfig;
use std::collections::VecDeque;
use url::Url;

/// What answering a confirmation dialog decides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPurpose {
    /// Send the pending destructive submission
    Dispatch,
    /// Leave the page despite unsaved edits
    Navigation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Success,
    Warning,
    Error,
    Progress,
    Alert,
    Confirm(ConfirmPurpose),
}

impl DialogKind {
    /// Dialogs waiting on the user or on a transfer; others queue behind them
    pub fn is_blocking(&self) -> bool {
        matches!(self, DialogKind::Progress | DialogKind::Confirm(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Center,
    Left,
}

/// A modal dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub message: String,
    pub align: TextAlign,
    pub accept_label: String,
    pub cancel_label: Option<String>,
    /// Address to navigate to once the dialog is dismissed
    pub navigate_on_dismiss: Option<Url>,
}

impl Dialog {
    pub fn new(kind: DialogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            align: TextAlign::Center,
            accept_label: String::new(),
            cancel_label: None,
            navigate_on_dismiss: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Error, message)
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogKind::Alert, message)
    }

    pub fn progress(text: impl Into<String>) -> Self {
        Self::new(DialogKind::Progress, text)
    }

    pub fn confirm(purpose: ConfirmPurpose, prompt: impl Into<String>) -> Self {
        Self::new(DialogKind::Confirm(purpose), prompt)
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_navigation(mut self, target: Url) -> Self {
        self.navigate_on_dismiss = Some(target);
        self
    }
}

/// The single dialog slot of a page.
///
/// At most one dialog is visible. While a progress or confirmation dialog is
/// up, newly shown dialogs wait in a queue and appear, in order, once it is
/// dismissed. [`DialogSlot::replace`] swaps the visible dialog regardless, which
/// is how a progress dialog gives way to the submission result.
#[derive(Debug, Clone)]
pub struct DialogSlot {
    current: Option<Dialog>,
    queued: VecDeque<Dialog>,
    strings: StringsConfig,
}

impl DialogSlot {
    pub fn new(strings: StringsConfig) -> Self {
        Self {
            current: None,
            queued: VecDeque::new(),
            strings,
        }
    }

    fn labelled(&self, mut dialog: Dialog) -> Dialog {
        if dialog.accept_label.is_empty() {
            dialog.accept_label = self.strings.accept.clone();
        }
        if dialog.kind.is_blocking() && dialog.cancel_label.is_none() {
            dialog.cancel_label = Some(self.strings.cancel.clone());
        }
        dialog
    }

    /// Show `dialog`, or queue it behind a blocking dialog
    pub fn show(&mut self, dialog: Dialog) {
        let dialog = self.labelled(dialog);

        match self.current.as_ref() {
            Some(visible) if visible.kind.is_blocking() => {
                log::debug!("Dialog {:?} queued behind {:?}", dialog.kind, visible.kind);
                self.queued.push_back(dialog);
            }
            _ => {
                if let Some(previous) = self.current.replace(dialog) {
                    log::debug!("Dialog {:?} replaced", previous.kind);
                }
            }
        }
    }

    /// Swap the visible dialog for `dialog`, leaving the queue untouched
    pub fn replace(&mut self, dialog: Dialog) {
        let dialog = self.labelled(dialog);
        if let Some(previous) = self.current.replace(dialog) {
            log::debug!("Dialog {:?} replaced", previous.kind);
        }
    }

    /// Show `dialog` ahead of everything; the dialog it covers is shown again once it is dismissed
    pub fn interrupt(&mut self, dialog: Dialog) {
        let dialog = self.labelled(dialog);
        if let Some(covered) = self.current.replace(dialog) {
            self.queued.push_front(covered);
        }
    }

    /// Close the visible dialog, returning its navigation target if it has one.
    ///
    /// The next queued dialog, if any, becomes visible.
    pub fn dismiss(&mut self) -> Option<Url> {
        let dismissed = self.current.take();
        self.current = self.queued.pop_front();
        dismissed.and_then(|dialog| dialog.navigate_on_dismiss)
    }

    /// Refresh the progress text; ignored unless a progress dialog is visible
    pub fn update_progress(&mut self, text: impl Into<String>) -> bool {
        match self.current.as_mut() {
            Some(dialog) if dialog.kind == DialogKind::Progress => {
                dialog.message = text.into();
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&Dialog> {
        self.current.as_ref()
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialogs_queue_behind_progress() {
        let mut slot = DialogSlot::new(StringsConfig::default());
        slot.show(Dialog::progress("0%"));
        slot.show(Dialog::alert("first"));
        slot.show(Dialog::alert("second"));

        assert_eq!(slot.current().unwrap().kind, DialogKind::Progress);
        assert_eq!(slot.queued(), 2);

        slot.replace(Dialog::success("done"));
        assert_eq!(slot.current().unwrap().message, "done");

        slot.dismiss();
        assert_eq!(slot.current().unwrap().message, "first");
        slot.dismiss();
        assert_eq!(slot.current().unwrap().message, "second");
        slot.dismiss();
        assert!(!slot.is_visible());
    }

    #[test]
    fn test_interrupt_keeps_covered_dialog() {
        let mut slot = DialogSlot::new(StringsConfig::default());
        slot.show(Dialog::confirm(ConfirmPurpose::Navigation, "Leave?"));
        slot.interrupt(Dialog::progress("0%"));

        assert_eq!(slot.current().unwrap().kind, DialogKind::Progress);
        assert!(slot.current().unwrap().cancel_label.is_some());

        slot.dismiss();
        assert_eq!(
            slot.current().unwrap().kind,
            DialogKind::Confirm(ConfirmPurpose::Navigation)
        );
    }

    #[test]
    fn test_plain_dialogs_replace_each_other() {
        let mut slot = DialogSlot::new(StringsConfig::default());
        slot.show(Dialog::alert("first"));
        slot.show(Dialog::error("second"));

        assert_eq!(slot.current().unwrap().message, "second");
        assert_eq!(slot.queued(), 0);
    }
}

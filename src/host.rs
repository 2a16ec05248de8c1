//! Seams to the page the controllers run inside.

use parking_lot::Mutex;

/// Page-level side effects of the search form.
pub trait PageHost: Send + Sync {
    /// Full-page navigation to `location`.
    fn navigate(&self, location: &str);
    /// Blocking notice shown to the user.
    fn notify(&self, message: &str);
}

/// The table widget hosting the result rows.
pub trait TableLayout {
    /// Recompute column widths after a row changed height.
    fn adjust_columns(&self);
}

/// Records every side effect instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingPage {
    navigations: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
}

impl RecordingPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }
}

impl PageHost for RecordingPage {
    fn navigate(&self, location: &str) {
        self.navigations.lock().push(location.to_string());
    }

    fn notify(&self, message: &str) {
        self.notices.lock().push(message.to_string());
    }
}

/// Counts layout recomputations.
#[derive(Debug, Default)]
pub struct LayoutCounter {
    adjustments: Mutex<usize>,
}

impl LayoutCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adjustments(&self) -> usize {
        *self.adjustments.lock()
    }
}

impl TableLayout for LayoutCounter {
    fn adjust_columns(&self) {
        *self.adjustments.lock() += 1;
    }
}

use std::sync::Mutex;

/// A sink for user-facing events raised while planning a build.
///
/// Delivery is best-effort: implementations must not fail, and callers never learn whether a
/// message was shown.
pub trait Reporter {
    /// Surface a warning to the user.
    fn warn(&self, message: &str);
}

impl<T: Reporter + ?Sized> Reporter for &T {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

/// Prints warnings to stderr via [`warn_user!`](crate::warn_user).
///
/// Nothing is printed until the binary calls [`enable`](crate::enable).
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn warn(&self, message: &str) {
        crate::warn_user!("{message}");
    }
}

/// Buffers warnings so they can be shown after other output, e.g., once a progress bar has been
/// cleared.
#[derive(Debug, Default)]
pub struct DeferredReporter {
    messages: Mutex<Vec<String>>,
}

impl DeferredReporter {
    /// Returns the buffered warnings, in the order they were raised.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if no warnings have been raised.
    pub fn is_empty(&self) -> bool {
        self.messages
            .lock()
            .map(|messages| messages.is_empty())
            .unwrap_or(true)
    }

    /// Print and drain the buffered warnings, collapsing duplicates.
    pub fn flush(&self) {
        let Ok(mut messages) = self.messages.lock() else {
            return;
        };
        for message in messages.drain(..) {
            crate::warn_user_once!("{message}");
        }
    }
}

impl Reporter for DeferredReporter {
    fn warn(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

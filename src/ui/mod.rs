//! Status output for CLI commands.
//!
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] writes styled lines to the terminal
//! - [`MockUI`] captures everything for tests
//!
//! Script output is not routed through here; it goes to a
//! [`LogSink`](crate::runner::LogSink).
//!
//! # Example
//!
//! ```
//! use revive::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("job.py succeeded");
//! assert_eq!(ui.successes(), ["job.py succeeded"]);
//! ```

pub mod mock;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, ReviveTheme};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Display a plain message.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Show a header line.
    fn show_header(&mut self, title: &str);

    /// Show an aligned `key: value` line.
    fn key_value(&mut self, key: &str, value: &str);

    /// Write machine-readable output verbatim to stdout.
    fn raw(&mut self, text: &str);
}

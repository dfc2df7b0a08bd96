//! Terminal UI.

use console::Term;
use std::io::Write;

use super::{should_use_colors, ReviveTheme, UserInterface};

/// Writes status lines to stdout, errors and warnings to stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: ReviveTheme,
}

impl TerminalUI {
    pub fn new(no_color: bool) -> Self {
        let theme = if !no_color && should_use_colors() {
            ReviveTheme::new()
        } else {
            ReviveTheme::plain()
        };

        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme,
        }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.out, "{}", msg).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn show_header(&mut self, title: &str) {
        writeln!(self.out, "{}", self.theme.format_header(title)).ok();
    }

    fn key_value(&mut self, key: &str, value: &str) {
        writeln!(self.out, "{}", self.theme.format_key_value(key, value)).ok();
    }

    fn raw(&mut self, text: &str) {
        writeln!(self.out, "{}", text).ok();
    }
}

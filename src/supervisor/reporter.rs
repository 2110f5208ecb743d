//! Operator-facing terminal output.
//!
//! Restart boundaries are marked with a terminal reset followed by a
//! `<time> [watchrun] <message>` line. Diagnostics go through `tracing`
//! instead; this is only what the person at the terminal is meant to read.

use std::fmt::Display;
use std::io::Write;

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

/// Full terminal reset (`ESC c`).
pub const CLEAR_SCREEN: &str = "\u{1b}c";

/// Prefix label on every line.
pub const LABEL: &str = "[watchrun]";

pub struct Reporter {
    out: Box<dyn Write + Send>,
    clear_screen: bool,
    color: bool,
}

impl Reporter {
    /// Report to stdout, colored when stdout is a terminal.
    pub fn stdout(clear_screen: bool) -> Self {
        let color = std::io::stdout().is_terminal();
        Self::new(Box::new(std::io::stdout()), clear_screen, color)
    }

    pub fn new(out: Box<dyn Write + Send>, clear_screen: bool, color: bool) -> Self {
        Self {
            out,
            clear_screen,
            color,
        }
    }

    /// Write one timestamped line.
    pub fn log(&mut self, message: impl Display) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        let line = if self.color {
            format!("{} {} {message}\n", time.dimmed(), LABEL.cyan())
        } else {
            format!("{time} {LABEL} {message}\n")
        };
        // Losing a status line must not take the supervisor down
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }

    pub fn error(&mut self, message: impl Display) {
        if self.color {
            self.log(message.red())
        } else {
            self.log(message)
        }
    }

    /// Mark a restart boundary.
    pub fn restarting(&mut self) {
        if self.clear_screen {
            let _ = self.out.write_all(CLEAR_SCREEN.as_bytes());
        }
        if self.color {
            self.log("rerunning".magenta())
        } else {
            self.log("rerunning")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn is_timestamp(s: &str) -> bool {
        s.len() == 8 && s.chars().filter(|c| *c == ':').count() == 2
    }

    #[test]
    fn test_log_line_format() {
        let capture = Capture::default();
        let mut reporter = Reporter::new(Box::new(capture.clone()), true, false);
        reporter.log("watching 3 files");

        let text = capture.text();
        let (time, rest) = text.split_once(' ').unwrap();
        assert!(is_timestamp(time), "unexpected timestamp {time}");
        assert_eq!(rest, "[watchrun] watching 3 files\n");
    }

    #[test]
    fn test_restart_clears_screen_first() {
        let capture = Capture::default();
        let mut reporter = Reporter::new(Box::new(capture.clone()), true, false);
        reporter.restarting();

        let text = capture.text();
        assert!(text.starts_with(CLEAR_SCREEN));
        assert!(text.ends_with("[watchrun] rerunning\n"));
        assert_eq!(text.matches(CLEAR_SCREEN).count(), 1);
    }

    #[test]
    fn test_restart_without_clear_screen() {
        let capture = Capture::default();
        let mut reporter = Reporter::new(Box::new(capture.clone()), false, false);
        reporter.restarting();

        assert!(!capture.text().contains(CLEAR_SCREEN));
    }
}

//! Human-readable progress output
//!
//! Banners and step lines go to stdout (or any writer in tests);
//! structured diagnostics go through `tracing` separately.

use std::io::{self, Write};
use std::path::Path;

use crate::config::ConnectionSettings;

/// Times the fatal warning lines are repeated
pub const WARNING_REPEAT: usize = 5;

pub struct Console {
    out: Box<dyn Write + Send>,
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    // Console failures never abort a run
    fn line(&mut self, text: impl AsRef<str>) {
        writeln!(self.out, "{}", text.as_ref()).ok();
    }

    fn boxed(&mut self, rows: &[&str]) {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) + 6;
        let rule = format!("  {}", "-".repeat(width - 2));
        self.line(&rule);
        for row in rows {
            self.line(format!(" |  {:^w$}  |", row, w = width - 6));
        }
        self.line(&rule);
    }

    pub fn opening_banner(&mut self) {
        self.line("");
        self.boxed(&["U P D A T I N G   D A T A B A S E"]);
        self.line("");
    }

    pub fn closing_banner(&mut self) {
        self.boxed(&[
            "F I N I S H E D   R E Q U I R E D   S Y S T E M   U P D A T E S",
            "Y O U   C A N   R U N   T H E   S Y S T E M   N O W",
        ]);
    }

    /// A step that is starting
    pub fn step(&mut self, text: &str) {
        self.line(format!("     {}\n", text));
    }

    /// A step that finished
    pub fn done(&mut self, text: &str) {
        self.line(format!("             {}\n", text));
    }

    /// Header above the per-entry lines
    pub fn whats_new(&mut self) {
        self.line("              What's new ?\n");
    }

    pub fn entry_applied(&mut self, index: usize) {
        self.line(format!("                 ADDED EVENTS TABLE (entry {})\n", index));
    }

    pub fn entry_failed(&mut self, index: usize, message: &str, detail: Option<&str>) {
        self.line(format!("\n QUERY ERROR (entry {}): {}", index, message));
        if let Some(detail) = detail {
            self.line(format!(" {}", detail));
        }
    }

    pub fn summary(&mut self, applied: usize, failed: usize) {
        self.line(format!("     ENTRIES APPLIED: {}   FAILED: {}\n", applied, failed));
    }

    pub fn connection_failure(&mut self, settings: &ConnectionSettings, message: &str) {
        self.line(format!("\n DATABASE CONNECTION ERROR: {}", message));
        self.line(format!(" HOST: {}", settings.host));
        self.line(format!(" USER: {}", settings.user));
        self.line(format!(" PORT: {}", settings.port));
        self.line(format!(" DATABASE: {}", settings.database));
        for _ in 0..WARNING_REPEAT {
            self.line(" ERROR: SERVER CONNECTION FAILED. PLEASE CHECK DATABASE CONFIGURATION.");
        }
    }

    pub fn config_not_found(&mut self, path: &Path) {
        self.line("");
        for _ in 0..WARNING_REPEAT {
            self.line(" CONFIGURATION NOT FOUND. PLEASE CHECK IF update/config.json EXISTS.");
        }
        self.line(format!(" LOOKING FOR: {}", path.display()));
    }

    pub fn update_failure(&mut self, message: &str) {
        self.line(format!("\n DATABASE UPDATE ERROR: {}", message));
    }

    pub fn flush(&mut self) {
        self.out.flush().ok();
    }
}


#[cfg(test)]
mod tests {
    use super::capture::Captured;
    use super::*;

    #[test]
    fn banner_rows_are_aligned() {
        let sink = Captured::default();
        let mut console = Console::new(Box::new(sink.clone()));
        console.opening_banner();

        let text = sink.text();
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("U P D A T I N G"));
        assert_eq!(lines[0].len() + 1, lines[1].len());
    }

    #[test]
    fn config_not_found_repeats_and_names_path() {
        let sink = Captured::default();
        let mut console = Console::new(Box::new(sink.clone()));
        console.config_not_found(Path::new("/srv/app/update/config.json"));

        let text = sink.text();
        assert_eq!(text.matches("CONFIGURATION NOT FOUND").count(), WARNING_REPEAT);
        assert!(text.contains("LOOKING FOR: /srv/app/update/config.json"));
    }

    #[test]
    fn connection_failure_lists_settings_without_password() {
        let sink = Captured::default();
        let mut console = Console::new(Box::new(sink.clone()));
        let settings = ConnectionSettings {
            password: "hunter2".into(),
            ..Default::default()
        };
        console.connection_failure(&settings, "connection refused");

        let text = sink.text();
        assert!(text.contains("HOST: localhost"));
        assert!(text.contains("USER: root"));
        assert!(text.contains("PORT: 3306"));
        assert!(text.contains("DATABASE: railway"));
        assert!(!text.contains("hunter2"));
        assert_eq!(
            text.matches("SERVER CONNECTION FAILED").count(),
            WARNING_REPEAT
        );
    }
}

//! Event handling and progress display

use console::{style, Term};
use xfer_events::{AppEvent, DownloadEvent, GeneralEvent, ProgressEvent};

use crate::logging::log_event_with_tracing;

/// Event handler for progress display and user feedback
pub struct EventHandler {
    /// Progress and warnings go to stderr so stdout stays clean for bodies
    term: Term,
    colors_enabled: bool,
    show_progress: bool,
    /// A progress line is on screen and must be cleared before other output
    progress_visible: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, show_progress: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            show_progress,
            progress_visible: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);

        match event {
            AppEvent::Progress(ProgressEvent::Updated { id, percent }) => {
                self.show_progress(&id, percent);
            }
            AppEvent::Download(DownloadEvent::Completed { .. } | DownloadEvent::Failed { .. }) => {
                self.clear_progress();
            }
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                self.clear_progress();
                let line = match context {
                    Some(context) => format!("warning: {message} ({context})"),
                    None => format!("warning: {message}"),
                };
                self.show_line(&line, false);
            }
            AppEvent::General(GeneralEvent::Error { message, details }) => {
                self.clear_progress();
                let line = match details {
                    Some(details) => format!("error: {message}: {details}"),
                    None => format!("error: {message}"),
                };
                self.show_line(&line, true);
            }
            _ => {}
        }
    }

    /// Remove any progress line left on screen
    pub fn finish(&mut self) {
        self.clear_progress();
    }

    fn show_progress(&mut self, id: &str, percent: f32) {
        if !self.show_progress {
            return;
        }
        let label = if self.colors_enabled {
            style(format!("{percent:>5.1}%")).cyan().to_string()
        } else {
            format!("{percent:>5.1}%")
        };
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&format!("{label} {id}"));
        self.progress_visible = true;
    }

    fn clear_progress(&mut self) {
        if self.progress_visible {
            let _ = self.term.clear_line();
            self.progress_visible = false;
        }
    }

    fn show_line(&self, line: &str, is_error: bool) {
        let line = match (self.colors_enabled, is_error) {
            (true, true) => style(line).red().to_string(),
            (true, false) => style(line).yellow().to_string(),
            (false, _) => line.to_string(),
        };
        let _ = self.term.write_line(&line);
    }
}

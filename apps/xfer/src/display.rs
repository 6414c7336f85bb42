//! Output rendering and formatting

use std::io::{self, Write};
use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use serde::Serialize;
use xfer_net::Response;

/// What a command produced, ready to be rendered
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutput {
    /// A verb command finished; the body is printed unless it went to a file
    Transfer {
        #[serde(flatten)]
        response: Response,
        saved_to: Option<PathBuf>,
    },
    /// `fetch` produced a value or a file
    Fetched {
        kind: String,
        url: String,
        path: PathBuf,
        bytes: u64,
    },
    CacheEntry {
        key: String,
        path: PathBuf,
        exists: bool,
    },
    CacheDeleted {
        key: String,
        removed: bool,
    },
    CacheCleared {
        root: PathBuf,
        removed: bool,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    colors_enabled: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors_enabled: bool) -> Self {
        Self {
            json_output,
            colors_enabled,
        }
    }

    /// Render command output
    pub fn render_result(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            self.render_json(output)
        } else {
            self.render_plain(output)
        }
    }

    fn render_json(&self, output: &CommandOutput) -> io::Result<()> {
        let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    fn render_plain(&self, output: &CommandOutput) -> io::Result<()> {
        match output {
            CommandOutput::Transfer {
                response,
                saved_to: None,
            } => {
                // Raw bytes, so binary bodies survive redirection intact
                let mut stdout = io::stdout().lock();
                stdout.write_all(response.data())?;
                stdout.flush()
            }
            CommandOutput::Transfer {
                response,
                saved_to: Some(path),
            } => {
                self.render_success(&format!(
                    "{} saved to {}",
                    response.status(),
                    path.display()
                ));
                Ok(())
            }
            CommandOutput::Fetched {
                kind,
                url,
                path,
                bytes,
            } => {
                let mut table = self.table(&["Kind", "URL", "Cached at", "Bytes"]);
                table.add_row(vec![
                    Cell::new(kind),
                    Cell::new(url),
                    Cell::new(path.display()),
                    Cell::new(bytes),
                ]);
                println!("{table}");
                Ok(())
            }
            CommandOutput::CacheEntry { key, path, exists } => {
                let mut table = self.table(&["Key", "Path", "Present"]);
                let present = if *exists {
                    Cell::new("yes").fg(Color::Green)
                } else {
                    Cell::new("no").fg(Color::Yellow)
                };
                table.add_row(vec![Cell::new(key), Cell::new(path.display()), present]);
                println!("{table}");
                Ok(())
            }
            CommandOutput::CacheDeleted { key, removed } => {
                if *removed {
                    self.render_success(&format!("No cached copy of {key} remains"));
                } else {
                    self.render_failure(&format!("Could not remove cached copy of {key}"));
                }
                Ok(())
            }
            CommandOutput::CacheCleared { root, removed } => {
                if *removed {
                    self.render_success(&format!("Cleared {}", root.display()));
                } else {
                    self.render_failure(&format!("Could not clear {}", root.display()));
                }
                Ok(())
            }
        }
    }

    fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.colors_enabled {
            table.force_no_tty();
        }
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn render_success(&self, message: &str) {
        if self.colors_enabled {
            println!("{} {message}", style("[OK]").green().bold());
        } else {
            println!("[OK] {message}");
        }
    }

    fn render_failure(&self, message: &str) {
        if self.colors_enabled {
            println!("{} {message}", style("[ERROR]").red().bold());
        } else {
            println!("[ERROR] {message}");
        }
    }
}

//! Live terminal display of hub output.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use console::{Style, Term};
use tracing::debug;

use crate::buffer::{MessageBuffer, is_overwrite, strip_overwrite_marker};
use crate::hub::LogObserver;
use crate::orchestrator::BANNER;
use crate::ui::icons::{CHECK, CROSS};

// Carriage return plus erase-entire-line.
const CLEAR_LINE: &str = "\r\x1b[2K";

struct Screen {
    out: Box<dyn Write + Send>,
    /// A progress line is on screen without a trailing newline
    pending: bool,
}

/// [`LogObserver`] that prints every message to a terminal.
///
/// On an interactive terminal overwrite-marked progress lines are redrawn in
/// place and status lines are styled. Otherwise progress lines are skipped and
/// output is plain text. A failed write closes the observer.
pub struct TerminalObserver {
    screen: Mutex<Screen>,
    interactive: bool,
    closed: AtomicBool,
}

impl TerminalObserver {
    pub fn stdout() -> Self {
        let term = Term::stdout();
        let interactive = term.is_term();
        Self::with_writer(term, interactive)
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W, interactive: bool) -> Self {
        Self {
            screen: Mutex::new(Screen {
                out: Box::new(writer),
                pending: false,
            }),
            interactive,
            closed: AtomicBool::new(false),
        }
    }

    /// Stop displaying; the hub drops this observer on its next message.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn show(&self, screen: &mut Screen, message: &str) -> std::io::Result<()> {
        if is_overwrite(message) {
            if !self.interactive {
                return Ok(());
            }
            if screen.pending {
                screen.out.write_all(CLEAR_LINE.as_bytes())?;
            }
            screen.out.write_all(strip_overwrite_marker(message).as_bytes())?;
            screen.pending = true;
            return screen.out.flush();
        }

        if screen.pending {
            screen.out.write_all(CLEAR_LINE.as_bytes())?;
            screen.pending = false;
        }
        writeln!(screen.out, "{}", self.render(message))?;
        screen.out.flush()
    }

    fn render(&self, message: &str) -> String {
        if !self.interactive {
            return message.to_string();
        }
        let styled = |style: Style| style.force_styling(true).apply_to(message).to_string();
        match message {
            "PASSED" => format!("{}{}", CHECK, styled(Style::new().green().bold())),
            "FAILED" => format!("{}{}", CROSS, styled(Style::new().red().bold())),
            "TEST COMPLETE" | "TEST INTERRUPT" => styled(Style::new().bold()),
            BANNER => styled(Style::new().dim()),
            _ if message.starts_with("** ") => styled(Style::new().cyan().bold()),
            _ => message.to_string(),
        }
    }

    fn display(&self, messages: &mut dyn Iterator<Item = &str>) {
        if self.is_closed() {
            return;
        }
        let mut screen = self.screen.lock().unwrap_or_else(|p| p.into_inner());
        for message in messages {
            if let Err(err) = self.show(&mut screen, message) {
                debug!(error = %err, "terminal write failed, closing display");
                self.close();
                return;
            }
        }
    }
}

impl LogObserver for TerminalObserver {
    fn on_message(&self, message: &str) {
        self.display(&mut std::iter::once(message));
    }

    fn on_messages(&self, snapshot: MessageBuffer) {
        self.display(&mut snapshot.iter().map(String::as_str));
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

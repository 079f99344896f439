//! Rendering of controller state to a terminal or a JSON event stream.

use std::io::{self, Write};

use mkvconv_core::Event;

use crate::controller::{Progress, UiController};

const BAR_WIDTH: usize = 30;

/// Something that displays a running job.
pub trait View {
    /// Called after `controller` has applied `event`.
    fn render(&mut self, controller: &UiController, event: &Event) -> io::Result<()>;
}

/// Text rendering of the progress indicator, or `None` when idle.
pub fn progress_bar(progress: Progress) -> Option<String> {
    match progress {
        Progress::Idle => None,
        Progress::Indeterminate => Some(format!("[{}] starting", "?".repeat(BAR_WIDTH))),
        Progress::Bounded { max, value } => {
            let filled = if max == 0 {
                0
            } else {
                value.min(max) * BAR_WIDTH / max
            };
            Some(format!(
                "[{}{}] {value}/{max}",
                "#".repeat(filled),
                "-".repeat(BAR_WIDTH - filled)
            ))
        }
    }
}

/// Prints new log lines as they appear and the progress bar whenever it
/// changes.
pub struct TerminalView<W> {
    out: W,
    seen: usize,
    last_progress: Progress,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            seen: 0,
            last_progress: Progress::Idle,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render(&mut self, controller: &UiController, _event: &Event) -> io::Result<()> {
        for line in controller.log_since(self.seen) {
            writeln!(self.out, "{line}")?;
        }
        self.seen = controller.log().len();

        let progress = controller.progress();
        if progress != self.last_progress {
            self.last_progress = progress;
            if let Some(bar) = progress_bar(progress) {
                writeln!(self.out, "{bar}")?;
            }
        }
        self.out.flush()
    }
}

/// Writes every event as one line of JSON.
pub struct JsonView<W> {
    out: W,
}

impl<W: Write> JsonView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> View for JsonView<W> {
    fn render(&mut self, _controller: &UiController, event: &Event) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

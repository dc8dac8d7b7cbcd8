//! The status indicator is wherever the countdown text ends up

use anyhow::Context;
use log::{error, trace};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    sync::Mutex,
};

/// A single line of status text, updated in place
pub trait StatusIndicator: Send + Sync {
    /// Set the text, without necessarily displaying it yet
    fn set_text(&self, text: &str);

    /// Make the current text visible
    fn show(&self);

    /// Release the indicator. Called once, at shutdown.
    fn dispose(&self);
}

/// Where terminal output goes
#[derive(Clone, Debug, PartialEq)]
pub enum Output {
    /// One line per update, for piping into a status bar
    Stdout,
    /// Overwrite a file on each update, for status bars that poll
    File(PathBuf),
}

/// Indicator for a terminal session. Only writes when the text actually
/// changes, since most ticks produce the same text as the last.
#[derive(Debug)]
pub struct TerminalIndicator {
    output: Output,
    state: Mutex<IndicatorState>,
}

#[derive(Debug, Default)]
struct IndicatorState {
    text: String,
    /// The text last written out
    written: Option<String>,
}

impl TerminalIndicator {
    pub fn new(output: Output) -> Self {
        Self {
            output,
            state: Mutex::default(),
        }
    }

    fn write(&self, text: &str) -> anyhow::Result<()> {
        match &self.output {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{text}")?;
                stdout.flush()?;
            }
            Output::File(path) => {
                fs::write(path, format!("{text}\n")).with_context(|| {
                    format!("Error writing status to {}", path.display())
                })?;
            }
        }
        Ok(())
    }
}

impl StatusIndicator for TerminalIndicator {
    fn set_text(&self, text: &str) {
        if let Ok(mut state) = self.state.lock() {
            text.clone_into(&mut state.text);
        }
    }

    fn show(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.written.as_ref() == Some(&state.text) {
            return;
        }
        trace!("Status changed: {:?} -> {:?}", state.written, state.text);
        match self.write(&state.text) {
            Ok(()) => state.written = Some(state.text.clone()),
            Err(err) => error!("Error updating status: {err:?}"),
        }
    }

    fn dispose(&self) {
        if let Output::File(path) = &self.output {
            if let Err(err) = fs::remove_file(path) {
                if err.kind() != io::ErrorKind::NotFound {
                    error!("Error removing status file {}: {err}", path.display());
                }
            }
        }
    }
}

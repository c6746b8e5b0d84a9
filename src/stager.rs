//! Staging of a generated command as editable, pre-filled input.
//!
//! The operator sees the command on their input line, may edit it, and
//! either confirms with Enter or cancels with Ctrl+C / Ctrl+D.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

/// How a staged line was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The operator pressed Enter; holds the line as edited.
    Confirmed(String),
    /// Interrupt or end-of-input; nothing may run.
    Cancelled,
}

/// Capability to pre-fill an input line and wait for the operator.
pub trait LineStager {
    fn stage(&mut self, prompt: &str, prefill: &str) -> Result<StageOutcome>;
}

/// Terminal stager backed by rustyline.
pub struct TerminalStager {
    editor: DefaultEditor,
}

impl TerminalStager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineStager for TerminalStager {
    fn stage(&mut self, prompt: &str, prefill: &str) -> Result<StageOutcome> {
        match self.editor.readline_with_initial(prompt, (prefill, "")) {
            Ok(line) => Ok(StageOutcome::Confirmed(line)),
            Err(ReadlineError::Interrupted) => {
                info!("Staged command interrupted");
                Ok(StageOutcome::Cancelled)
            }
            Err(ReadlineError::Eof) => {
                info!("Staged command hit end of input");
                Ok(StageOutcome::Cancelled)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Stager for headless use: never confirms anything.
pub struct HeadlessStager;

impl LineStager for HeadlessStager {
    fn stage(&mut self, _prompt: &str, _prefill: &str) -> Result<StageOutcome> {
        info!("No terminal available for staging; declining");
        Ok(StageOutcome::Cancelled)
    }
}

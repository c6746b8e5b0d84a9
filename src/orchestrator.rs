//! Client-side flow: fetch a command, then print it or stage it.
//!
//! Seamless mode serves a wrapping shell function: stdout carries only the
//! command and failures are silent. Interactive mode puts the command on the
//! operator's input line and runs whatever they confirm.

use crate::client::CommandSource;
use crate::execution_context::ExecutionContext;
use crate::executor::ShellRunner;
use crate::stager::{LineStager, StageOutcome};
use anyhow::Result;
use std::io::Write;
use tracing::{debug, error, info};

/// Doubles every backslash so that one round of shell re-interpretation
/// (command substitution into the caller's input buffer) restores the
/// original text.
///
/// This assumes exactly one such round downstream. Executing the output
/// directly would see doubled escapes.
pub fn escape_for_substitution(command: &str) -> String {
    command.replace('\\', "\\\\")
}

/// Staging prompt matching the operator's shell: `% ` for zsh, else `$ `.
pub fn prompt_for_shell(shell: Option<&str>) -> &'static str {
    let name = shell
        .and_then(|path| path.rsplit(['/', '\\']).next())
        .unwrap_or("bash");
    if name == "zsh" { "% " } else { "$ " }
}

/// Ties the command source, the line stager and the shell runner together.
pub struct Orchestrator {
    source: Box<dyn CommandSource>,
    stager: Box<dyn LineStager>,
    runner: Box<dyn ShellRunner>,
    show_prompt: bool,
    prompt: &'static str,
}

impl Orchestrator {
    pub fn new(
        source: Box<dyn CommandSource>,
        stager: Box<dyn LineStager>,
        runner: Box<dyn ShellRunner>,
        show_prompt: bool,
        prompt: &'static str,
    ) -> Self {
        Self {
            source,
            stager,
            runner,
            show_prompt,
            prompt,
        }
    }

    /// Runs one query against the process's stdout and stderr.
    pub async fn run(&mut self, query: &str, seamless: bool) -> bool {
        self.run_with_io(query, seamless, &mut std::io::stdout(), &mut std::io::stderr())
            .await
    }

    /// Runs one query with injected output streams (for testing).
    ///
    /// Returns whether a command was produced (seamless) or ran successfully
    /// (interactive).
    pub async fn run_with_io<W1: Write, W2: Write>(
        &mut self,
        query: &str,
        seamless: bool,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> bool {
        let context = ExecutionContext::current();
        let fetched = self.source.fetch_command(query, &context).await;

        let outcome = if seamless {
            Self::emit(fetched, stdout)
        } else {
            self.stage_and_execute(query, fetched, stdout, stderr)
        };

        outcome.unwrap_or_else(|e| {
            error!("Output failed: {}", e);
            false
        })
    }

    fn emit<W: Write>(fetched: Result<String>, stdout: &mut W) -> Result<bool> {
        match fetched {
            Ok(command) => {
                writeln!(stdout, "{}", escape_for_substitution(&command))?;
                stdout.flush()?;
                Ok(true)
            }
            Err(e) => {
                debug!("Seamless generation failed: {:#}", e);
                Ok(false)
            }
        }
    }

    fn stage_and_execute<W1: Write, W2: Write>(
        &mut self,
        query: &str,
        fetched: Result<String>,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> Result<bool> {
        let command = match fetched {
            Ok(command) => command,
            Err(e) => {
                writeln!(stderr, "{:#}", e)?;
                writeln!(stderr, "Failed to get command from AI service")?;
                return Ok(false);
            }
        };

        if self.show_prompt {
            writeln!(stdout, "Query: {}", query)?;
        }
        writeln!(stdout, "Generated command: {}", command)?;
        if self.show_prompt {
            writeln!(stdout, "Press Enter to execute, or Ctrl+C to cancel:")?;
        }
        stdout.flush()?;

        let line = match self.stager.stage(self.prompt, &command) {
            Ok(StageOutcome::Confirmed(line)) => line,
            Ok(StageOutcome::Cancelled) => {
                info!("Operator cancelled the staged command");
                writeln!(stdout, "\nCommand cancelled")?;
                return Ok(false);
            }
            Err(e) => {
                writeln!(stderr, "Error: {}", e)?;
                return Ok(false);
            }
        };

        let line = line.trim();
        if line.is_empty() {
            writeln!(stdout, "No command to execute")?;
            return Ok(false);
        }

        match self.runner.run(line) {
            Ok(code) => {
                info!("Command exited with status {}", code);
                Ok(code == 0)
            }
            Err(e) => {
                writeln!(stderr, "Error: {}", e)?;
                Ok(false)
            }
        }
    }
}

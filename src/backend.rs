//! Script execution backend.
//!
//! A backend executes one statement at a time; `run_script` drives the
//! whole-script path (split into statements, substitute parameters,
//! stop at the first failure). The scheduler only sees the pass/fail of
//! a whole script.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::{script, sflog_error, sflog_trace, Error, Result};

/// Executes statements against a backing store.
pub trait ScriptBackend: Send + Sync {
    /// Execute a single, already-substituted statement.
    fn run_statement(&self, statement: &str) -> Result<()>;

    /// Execute a full script: split into statements, substitute params,
    /// run each in order. Stops at the first failing statement.
    ///
    /// Returns `true` when every statement succeeded.
    fn run_script(&self, script_text: &str, params: &HashMap<String, String>) -> bool {
        let stmts = script::split_statements(script_text);
        sflog_trace!("Script contains {} statement(s)", stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            let stmt = script::substitute(stmt, params);
            sflog_trace!("Statement {}: {}", i + 1, stmt);
            if let Err(e) = self.run_statement(&stmt) {
                sflog_error!("Statement {} failed: {}", i + 1, e);
                sflog_error!("Failing statement was: {}", stmt);
                return false;
            }
        }
        true
    }
}

/// Backend that pipes each statement to an external command's stdin.
///
/// Exit status 0 means the statement succeeded; anything else is a
/// failure with stderr captured into the error.
#[derive(Debug)]
pub struct ProcessBackend {
    program: String,
    args: Vec<String>,
}

impl ProcessBackend {
    /// Build from a whitespace-separated command line, e.g.
    /// `"psql -v ON_ERROR_STOP=1 -f -"`.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(Error::NoBackend)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl ScriptBackend for ProcessBackend {
    fn run_statement(&self, statement: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Backend(format!("cannot spawn {}: {}", self.program, e)))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(statement.as_bytes())
                .map_err(|e| Error::Backend(format!("cannot write statement: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Backend(format!("backend wait failed: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Backend(format!(
                "{} exited with {} ({})",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

//! Process invocation seam.

use std::io::{self, Read};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::command::SpecDebuggerInvocation;
use crate::spec::DebuggerError;

/// Runs one debugger invocation and returns its combined output.
pub trait DebuggerRunner {
    fn run(&self, invocation: &SpecDebuggerInvocation) -> Result<String, DebuggerError>;
}

/// Spawns the real debugger process.
///
/// stdout and stderr share one pipe, so the text keeps the order the
/// debugger wrote it in. Decoded as lossy UTF-8. The exit status is only
/// logged; the marker scrape decides whether a run produced anything usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl DebuggerRunner for ProcessRunner {
    fn run(&self, invocation: &SpecDebuggerInvocation) -> Result<String, DebuggerError> {
        let err_spawn = |source: io::Error| DebuggerError::Spawn {
            program: invocation.program.clone(),
            source,
        };
        let err_output = |source: io::Error| DebuggerError::Output {
            program: invocation.program.clone(),
            source,
        };

        let (mut reader, writer) = io::pipe().map_err(err_spawn)?;
        let writer_err = writer.try_clone().map_err(err_spawn)?;
        // The Command owns both write ends; it must be dropped before
        // reading or the pipe never reaches EOF.
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .spawn()
            .map_err(err_spawn)?;

        let mut v_bytes = Vec::new();
        reader.read_to_end(&mut v_bytes).map_err(err_output)?;
        let status = child.wait().map_err(err_output)?;
        if !status.success() {
            debug!(%status, "debugger exited unsuccessfully");
        }

        Ok(String::from_utf8_lossy(&v_bytes).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::RefCell;

    use super::*;

    type ResponderFn = dyn Fn(&SpecDebuggerInvocation) -> Result<String, DebuggerError>;

    /// Answers invocations from a closure and records every call.
    pub(crate) struct ScriptedRunner {
        responder: Box<ResponderFn>,
        calls: RefCell<Vec<SpecDebuggerInvocation>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new(
            responder: impl Fn(&SpecDebuggerInvocation) -> Result<String, DebuggerError> + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<SpecDebuggerInvocation> {
            self.calls.borrow().clone()
        }
    }

    impl DebuggerRunner for ScriptedRunner {
        fn run(&self, invocation: &SpecDebuggerInvocation) -> Result<String, DebuggerError> {
            self.calls.borrow_mut().push(invocation.clone());
            (self.responder)(invocation)
        }
    }
}

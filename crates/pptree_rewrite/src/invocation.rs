//! Subprocess invocation behind the [`ToolRunner`] seam.
//!
//! An [`Invocation`] is a program, its argument vector and a working
//! directory. [`ProcessRunner`] runs it with stdout and stderr merged into
//! one pipe and streams the output through an [`OutputFilter`]. Waits are
//! blocking with no timeout.

use crate::filter::OutputFilter;
use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The program to run.
    pub program: String,
    /// Arguments, passed without shell interpretation.
    pub args: Vec<String>,
    /// Working directory, or the caller's if `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The command as a shell-like line, for logs and error reports.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

fn shell_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_word(arg))?;
        }
        Ok(())
    }
}

/// Runs invocations and reports their exit codes.
pub trait ToolRunner {
    /// Runs `invocation` to completion, feeding its merged output to
    /// `filter`. Returns the exit code.
    fn run(&mut self, invocation: &Invocation, filter: &mut OutputFilter) -> io::Result<i32>;
}

/// Runs invocations as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation, filter: &mut OutputFilter) -> io::Result<i32> {
        let (reader, writer) = io::pipe()?;
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        let mut child = command.spawn()?;
        // The command holds the parent's copies of the write end.
        drop(command);

        if let Err(err) = pump(BufReader::new(reader), filter) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        let status = child.wait()?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Feeds `reader` to `filter` line by line until end of input.
fn pump<B: BufRead>(mut reader: B, filter: &mut OutputFilter) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        filter.feed_str(&String::from_utf8_lossy(&buf));
    }
    filter.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Echo, FilterPolicy};
    use std::io::Read;

    fn quiet_filter() -> OutputFilter {
        OutputFilter::new(FilterPolicy {
            echo: Echo::Quiet,
            show_tempdir: false,
            tag: "sh".into(),
        })
    }

    #[test]
    fn command_line_quotes_only_when_needed() {
        let inv = Invocation::new("python3")
            .arg("-c")
            .arg("import sys; print('x')");
        assert_eq!(inv.command_line(), "python3 -c \"import sys; print('x')\"");
        let inv = Invocation::new("/opt/lso/lsoracle").arg("-f").arg("/tmp/a/lso.script");
        assert_eq!(inv.to_string(), "/opt/lso/lsoracle -f /tmp/a/lso.script");
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_merges_streams_and_reports_code() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err 1>&2; printf '\\033[2K\\rfoo\\rbar\\n'; pwd; exit 3")
            .current_dir(dir.path());
        let mut filter = quiet_filter();
        let code = ProcessRunner.run(&inv, &mut filter).unwrap();
        assert_eq!(code, 3);
        let tail = filter.tail();
        assert_eq!(&tail[..3], &["out", "err", "bar"]);
        assert_eq!(tail.len(), 4);
    }

    #[test]
    fn spawn_failure_is_io_error() {
        let inv = Invocation::new("/nonexistent/tool-that-does-not-exist");
        assert!(ProcessRunner.run(&inv, &mut quiet_filter()).is_err());
    }

    /// Yields its data, then fails.
    struct Broken {
        data: io::Cursor<Vec<u8>>,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn read_error_stops_the_pump() {
        let reader = BufReader::new(Broken {
            data: io::Cursor::new(b"first\nsecond\n".to_vec()),
        });
        let mut filter = quiet_filter();
        let err = pump(reader, &mut filter).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(filter.tail(), &["first", "second"]);
    }

    #[test]
    fn pump_reads_to_end() {
        let mut filter = quiet_filter();
        pump(&b"one\ntwo"[..], &mut filter).unwrap();
        assert_eq!(filter.tail(), &["one", "two"]);
    }
}

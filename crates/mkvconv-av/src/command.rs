//! Builder for launching external tools with merged, line-oriented output.
//!
//! [`ToolCommand`] holds an argument vector (never a shell string). Spawning
//! it yields a [`RunningTool`] whose stdout and stderr share one OS pipe, so
//! lines arrive in the order the tool wrote them. Both `\n` and `\r` end a
//! line, so ffmpeg's carriage-return progress updates arrive as separate
//! lines.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use bytes::BytesMut;
use futures::stream::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio_util::codec::{Decoder, FramedRead};

/// A builder for constructing and launching external tool invocations.
///
/// # Example
///
/// ```no_run
/// use mkvconv_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> mkvconv_core::Result<()> {
/// let mut cmd = ToolCommand::new(PathBuf::from("ffmpeg"));
/// cmd.args(["-hide_banner", "-version"]);
/// let mut running = cmd.spawn_merged()?;
/// while let Some(line) = running.next_line().await? {
///     println!("{line}");
/// }
/// let status = running.wait().await?;
/// # let _ = status;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<OsString> {
        std::iter::once(self.program.clone().into_os_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Space-joined rendering of [`argv`](Self::argv) for display only.
    pub fn command_line(&self) -> String {
        self.argv()
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Short tool name used in error messages.
    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Launch the process with stdout and stderr writing into the same
    /// pipe. Stdin is closed.
    ///
    /// # Errors
    ///
    /// Returns [`mkvconv_core::Error::Tool`] if the pipe cannot be created
    /// or spawning the process fails.
    pub fn spawn_merged(&self) -> mkvconv_core::Result<RunningTool> {
        let tool = self.tool_name();
        let pipe_err = |e: io::Error| {
            mkvconv_core::Error::tool(&tool, format!("failed to create output pipe: {e}"))
        };

        let (reader, writer) = os_pipe::pipe().map_err(pipe_err)?;
        let writer_for_stderr = writer.try_clone().map_err(pipe_err)?;

        // The Command (and with it our copies of the write end) is dropped at
        // the end of this statement, so the reader sees EOF once the child
        // exits.
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_for_stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| mkvconv_core::Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let reader = async_reader(reader).map_err(pipe_err)?;
        let output = FramedRead::new(reader, OutputLineCodec::default());

        Ok(RunningTool {
            tool,
            child,
            output: Box::pin(output),
        })
    }
}

#[cfg(unix)]
fn async_reader(reader: os_pipe::PipeReader) -> io::Result<impl AsyncRead + Send + 'static> {
    tokio::net::unix::pipe::Receiver::from_owned_fd(reader.into())
}

#[cfg(windows)]
fn async_reader(reader: os_pipe::PipeReader) -> io::Result<impl AsyncRead + Send + 'static> {
    let handle = std::os::windows::io::OwnedHandle::from(reader);
    Ok(tokio::fs::File::from_std(std::fs::File::from(handle)))
}

/// Merged output of a running tool. Ends once every write end is closed.
pub type OutputLines = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// A spawned tool process and its merged output.
///
/// The output is consumed once; it cannot be restarted. Dropping a
/// `RunningTool` kills the process if it is still alive.
pub struct RunningTool {
    tool: String,
    child: Child,
    output: OutputLines,
}

impl RunningTool {
    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Next line of output, or `None` once both stdout and stderr are closed.
    pub async fn next_line(&mut self) -> mkvconv_core::Result<Option<String>> {
        self.output
            .next()
            .await
            .transpose()
            .map_err(|e| mkvconv_core::Error::tool(&self.tool, format!("failed to read output: {e}")))
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> mkvconv_core::Result<ExitStatus> {
        self.child.wait().await.map_err(|e| {
            mkvconv_core::Error::tool(&self.tool, format!("I/O error waiting for process: {e}"))
        })
    }

    /// Kill the process and reap it.
    pub async fn kill(&mut self) -> mkvconv_core::Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| mkvconv_core::Error::tool(&self.tool, format!("failed to kill: {e}")))
    }
}

/// Splits a byte stream into lines on `\n` or `\r`, dropping empty lines
/// and decoding lossily as UTF-8.
#[derive(Debug, Default)]
pub struct OutputLineCodec {
    next_index: usize,
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let Some(offset) = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
            else {
                self.next_index = buf.len();
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            let chunk = buf.split_to(end + 1);
            let line = &chunk[..chunk.len() - 1];
            if !line.is_empty() {
                return Ok(Some(decode_line(line)));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        Ok(Some(decode_line(&rest)))
    }
}

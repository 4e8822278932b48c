//! Line oriented control plane: `Lookup <fileName>`, `StoreFile <localPath>`,
//! `PrintState` and `Quit`, one command per line.
#![warn(missing_docs)]
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::error::Result;
use crate::prelude::chord_core::consts::FIELD_SEPARATOR;
use crate::prelude::NodeIp;
use crate::processor::Processor;

const SUPPORTED: &str = "Supported commands: Lookup <fileName>, StoreFile <localPath>, PrintState, Quit";

/// A parsed control plane line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the node owning a file name.
    Lookup(String),
    /// Upload a local file to the node owning its name.
    StoreFile(PathBuf),
    /// Dump the routing state of this node.
    PrintState,
    /// Stop the node.
    Quit,
    /// Anything else, answered with the supported command list.
    Invalid(String),
}

impl Command {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let mut tokens = line.split_whitespace();
        let cmd = tokens.next()?;
        let arg = tokens.next();
        Some(match (cmd, arg) {
            ("Lookup", Some(name)) => Command::Lookup(name.to_string()),
            ("StoreFile", Some(path)) => Command::StoreFile(PathBuf::from(path)),
            ("PrintState", _) => Command::PrintState,
            ("Quit", _) => Command::Quit,
            _ => Command::Invalid(line.trim().to_string()),
        })
    }
}

/// Whether the reader should go on after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop reading, shutdown was requested.
    Quit,
}

/// Executes control plane commands against a [Processor].
#[derive(Clone)]
pub struct Frontend {
    processor: Arc<Processor>,
}

fn reject_separator(name: &str) -> Result<()> {
    if name.contains(FIELD_SEPARATOR) {
        return Err(Error::IllegalFileName(name.to_string()));
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, prefix: &str, node: Option<&NodeIp>) -> std::io::Result<()> {
    match node {
        Some(n) => writeln!(out, "{}{}", prefix, n),
        None => writeln!(out, "{}none", prefix),
    }
}

impl Frontend {
    /// Control plane of `processor`.
    pub fn new(processor: Arc<Processor>) -> Self {
        Self { processor }
    }

    /// Print the owner of `name`.
    pub async fn lookup<W: Write + Send>(&self, name: &str, out: &mut W) -> Result<NodeIp> {
        reject_separator(name)?;
        let owner = self
            .processor
            .lookup(name)
            .await?
            .ok_or_else(|| Error::FileLocationNotFound(name.to_string()))?;
        writeln!(out, "Node Information:\n  {}", owner)?;
        Ok(owner)
    }

    /// Ship the local file at `path` to the owner of its bare name.
    pub async fn store_file<W: Write + Send>(
        &self,
        path: &std::path::Path,
        out: &mut W,
    ) -> Result<NodeIp> {
        if let Some(name) = path.file_name() {
            reject_separator(&name.to_string_lossy())?;
        }
        let (name, owner) = self.processor.store_file(path).await?;
        writeln!(out, "Stored {} at:\n  {}", name, owner)?;
        Ok(owner)
    }

    /// Dump self, predecessor, successor list and every finger.
    pub fn print_state<W: Write>(&self, out: &mut W) -> Result<()> {
        let info = self.processor.topo_info()?;
        writeln!(out, "Chord Client's node information:\n {}", info.node)?;
        write_node(out, "Predecessor: ", info.predecessor.as_ref())?;
        writeln!(out, "Successor Nodes:")?;
        for s in info.successors.iter() {
            writeln!(out, "successor {}", s)?;
        }
        for (i, f) in info.fingers.iter().enumerate() {
            write_node(out, &format!("finger {:>3} ", i), f.as_ref())?;
        }
        Ok(())
    }

    /// Run one command. Failures are written to `out`, they never stop the node.
    pub async fn execute<W: Write + Send>(&self, cmd: Command, out: &mut W) -> std::io::Result<Flow> {
        let ret = match cmd {
            Command::Lookup(name) => self.lookup(&name, out).await.map(|_| ()),
            Command::StoreFile(path) => self.store_file(&path, out).await.map(|_| ()),
            Command::PrintState => self.print_state(out),
            Command::Quit => return Ok(Flow::Quit),
            Command::Invalid(line) => {
                tracing::debug!("invalid command {:?}", line);
                writeln!(out, "Invalid command! {}", SUPPORTED)?;
                Ok(())
            }
        };
        if let Err(e) = ret {
            tracing::debug!("command failed: {:?}", e);
            writeln!(out, "{}", e)?;
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    /// Read commands from `input` until it ends, `Quit` is read or `token` is
    /// cancelled. `Quit` cancels `token`.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut out: W,
        token: CancellationToken,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: Write + Send,
    {
        let mut lines = input.lines();
        loop {
            let line = tokio::select! {
                _ = token.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                tracing::info!("control plane input closed");
                break;
            };
            let Some(cmd) = Command::parse(&line) else {
                continue;
            };
            if self.execute(cmd, &mut out).await? == Flow::Quit {
                tracing::info!("quit requested");
                token.cancel();
                break;
            }
        }
        Ok(())
    }
}

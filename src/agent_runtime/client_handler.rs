use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use tracing::{error, instrument, trace, warn};

use super::{AgentFault, AgentRuntime, AgentSession};
use crate::agent::Agent;
use crate::configuration::Configuration;
use crate::game_interface::GameKind;

/// Runs each agent as a child process.
///
/// The code reference is the path of an executable. It is started as
/// `<exe> <port> <game>` and must connect to `127.0.0.1:<port>`. The server then
/// writes one state per turn and reads one action back; both are plain UTF-8 text,
/// one per line.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRuntime {
    connect_timeout: Duration,
    debug_stderr: bool,
}

impl ProcessRuntime {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(config: &Configuration) -> Self {
        ProcessRuntime {
            connect_timeout: Self::CONNECT_TIMEOUT,
            debug_stderr: config.debug_agent_stderr,
        }
    }

    /// Time an agent has to connect back after being spawned.
    pub fn with_connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }
}

impl AgentRuntime for ProcessRuntime {
    fn launch(&self, agent: &Agent, game: GameKind) -> anyhow::Result<Box<dyn AgentSession>> {
        let handler = ClientHandler::init(agent, game, self.connect_timeout, self.debug_stderr)?;
        Ok(Box::new(handler))
    }
}

#[derive(Debug)]
struct ClientHandler {
    conn: LineConnection,
    process: Child,
}

/// Newline-framed text over a TCP stream.
#[derive(Debug)]
struct LineConnection {
    stream: TcpStream,
    /// Bytes received past the last line handed out.
    pending: Vec<u8>,
}

impl LineConnection {
    const MAX_LINE: usize = 64 * 1024;

    fn new(stream: TcpStream) -> Self {
        LineConnection {
            stream,
            pending: vec![],
        }
    }

    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut msg = Vec::with_capacity(line.len() + 1);
        msg.extend_from_slice(line.as_bytes());
        msg.push(b'\n');
        self.stream.write_all(&msg)
    }

    /// Reads up to the next newline, waiting no later than `deadline`.
    ///
    /// A peer closing the stream after a last unterminated line still has that
    /// line returned.
    fn recv_line(&mut self, deadline: Instant) -> io::Result<Vec<u8>> {
        let mut chunk = [0; 4096];
        loop {
            if let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=end).collect();
                line.pop();
                return Ok(line);
            }
            if self.pending.len() > Self::MAX_LINE {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("line longer than {} bytes", Self::MAX_LINE),
                ));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ErrorKind::TimedOut.into());
            }
            self.stream.set_read_timeout(Some(remaining))?;
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                if self.pending.is_empty() {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed by client",
                    ));
                }
                return Ok(std::mem::take(&mut self.pending));
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

impl ClientHandler {
    /// Launch a child process running the agent executable.
    ///
    /// Child process is killed on drop.
    #[instrument(skip_all, fields(agent = %agent.id, exe = agent.code.as_str()))]
    fn init(
        agent: &Agent,
        game: GameKind,
        connect_timeout: Duration,
        debug_stderr: bool,
    ) -> anyhow::Result<ClientHandler> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .context("server error: could not create TcpListener")?;
        let port_arg = listener.local_addr()?.port().to_string();

        let stderr = if debug_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        };
        let mut process = Command::new(agent.code.as_str())
            .arg(port_arg)
            .arg(game.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .with_context(|| format!("could not spawn '{}'", agent.code.as_str()))?;
        trace!(pid = process.id(), "agent spawned");

        listener
            .set_nonblocking(true)
            .context("server error: setting non-blocking to true")?;

        let response_timeout = Instant::now() + connect_timeout;
        while Instant::now() < response_timeout {
            if let Ok((stream, _addr)) = listener.accept() {
                stream
                    .set_nonblocking(false)
                    .context("server error: setting blocking for 'read'")?;
                stream
                    .set_nodelay(true)
                    .context("server error: setting nodelay")?;
                return Ok(ClientHandler {
                    conn: LineConnection::new(stream),
                    process,
                });
            }
            if let Ok(Some(status)) = process.try_wait() {
                return Err(anyhow!("agent exited before connecting ({status})"));
            }
            // at least 10 tries
            thread::sleep(Duration::from_millis(10).min(connect_timeout / 10));
        }

        if let Err(e) = kill(&mut process) {
            warn!("could not kill unresponsive agent: {e}");
        }
        Err(anyhow!("no connection made to server"))
    }
}

impl AgentSession for ClientHandler {
    fn select_action(&mut self, state: &str, deadline: Instant) -> Result<String, AgentFault> {
        if deadline <= Instant::now() {
            return Err(AgentFault::Timeout);
        }
        let line = self
            .conn
            .send_line(state)
            .and_then(|()| self.conn.recv_line(deadline))
            .map_err(|e| match e.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut => AgentFault::Timeout,
                ErrorKind::InvalidData => AgentFault::Malformed(e.to_string()),
                _ => {
                    error!("agent connection: {e}");
                    AgentFault::Crashed(e.to_string())
                }
            })?;
        let answer =
            String::from_utf8(line).map_err(|e| AgentFault::Malformed(e.to_string()))?;
        Ok(answer.trim().to_string())
    }
}

impl Drop for ClientHandler {
    fn drop(&mut self) {
        if let Err(e) = kill(&mut self.process) {
            error!("could not kill child process: {e:#}");
        }
    }
}

fn kill(process: &mut Child) -> anyhow::Result<()> {
    if process.try_wait()?.is_some() {
        return Ok(());
    }
    process.kill().context("kill")?;
    process.wait().context("wait")?;
    Ok(())
}

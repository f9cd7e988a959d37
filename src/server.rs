//! TCP command server
//!
//! Accepts one client at a time on the configured port and feeds decoded
//! commands to the [`Controller`]. TCP is used (not UDP) because command
//! loss and reordering are unacceptable for something that drives motors,
//! and the connection state doubles as the client-presence signal.
//!
//! # Wire Format
//!
//! Each received chunk is decoded as UTF-8, trimmed of surrounding
//! whitespace, and only its first character is significant; the rest of
//! the chunk is discarded. There is no length prefix and no line
//! buffering, so a client that never sends a delimiter cannot grow a
//! buffer here.
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Listener polls for a connection (shutdown flag checked between polls)
//! 2. One session runs to completion; later connect attempts queue in the
//!    kernel until the active session ends
//! 3. Session ends on EOF, dead-man timeout, or I/O error
//! 4. Every session exit forces the drive state to Stop
//! ```
//!
//! # Safety Features
//!
//! - **Dead-man timeout**: a session silent for the configured window is
//!   considered lost and the motors are stopped
//! - **Stop on disconnect**: all session exit paths go through
//!   `Controller::force_stop`
//! - **Contained failures**: per-session errors never take the server down;
//!   only the initial bind can

use crate::command::Command;
use crate::config::NetworkConfig;
use crate::controller::Controller;
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::str;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Poll interval for the non-blocking accept loop
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Backoff after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Receive buffer size; command chunks are a handful of bytes
const RECV_BUFFER_SIZE: usize = 1024;

const ACK_OK: &[u8] = b"OK\n";
const ACK_ERR: &[u8] = b"ERR\n";

/// Outcome of one blocking socket read
#[derive(Debug)]
pub enum ReadEvent {
    /// Bytes arrived (count)
    Data(usize),
    /// Nothing arrived within the dead-man window
    Timeout,
    /// Peer closed the connection cleanly
    Closed,
    /// Any other I/O failure
    Error(std::io::Error),
}

/// Single-session TCP command server
pub struct CommandServer {
    listener: TcpListener,
    read_timeout: Duration,
    send_ack: bool,
    running: Arc<AtomicBool>,
}

impl CommandServer {
    /// Bind the command socket
    ///
    /// A bind failure is a startup error; there is no retry.
    pub fn bind(config: &NetworkConfig, running: Arc<AtomicBool>) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).map_err(|e| Error::Bind {
            addr: config.bind_address.clone(),
            source: e,
        })?;
        // Non-blocking accept so the shutdown flag is observed between polls
        listener.set_nonblocking(true)?;
        log::info!("TCP server listening on {}", config.bind_address);

        Ok(Self {
            listener,
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            send_ack: config.send_ack,
            running,
        })
    }

    /// Address the listener actually bound (for `:0` bindings)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve sessions until the shutdown flag clears
    ///
    /// One session at a time, each followed by a forced stop so a lost
    /// client can never leave the motors running.
    pub fn run(&self, controller: &mut Controller) -> Result<()> {
        while self.running.load(Ordering::Relaxed) {
            let Some((stream, addr)) = self.accept_next() else {
                break;
            };
            log::info!("Client connected from {}", addr);

            self.serve_session(stream, controller);

            if let Err(e) = controller.force_stop() {
                log::error!("Failed to stop motors after session: {}", e);
            }
            log::info!("Client disconnected");
        }

        log::info!("Command server stopped");
        Ok(())
    }

    /// Wait for the next client; `None` on shutdown
    ///
    /// Accept failures are logged and retried after a short delay, never
    /// propagated: the device keeps listening for as long as it runs.
    fn accept_next(&self) -> Option<(TcpStream, SocketAddr)> {
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return None;
            }
            match self.listener.accept() {
                Ok(pair) => return Some(pair),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                    std::thread::sleep(ACCEPT_RETRY_DELAY);
                }
            }
        }
    }

    /// Process one client connection to completion
    fn serve_session(&self, mut stream: TcpStream, controller: &mut Controller) {
        // The stream inherits non-blocking from the listener; session reads
        // are blocking with the dead-man window as timeout.
        if let Err(e) = stream.set_nonblocking(false) {
            log::error!("Failed to set socket to blocking mode: {}", e);
            return;
        }
        if let Err(e) = stream.set_read_timeout(Some(self.read_timeout)) {
            log::error!("Failed to set read timeout: {}", e);
            return;
        }

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            match read_chunk(&mut stream, &mut buffer) {
                ReadEvent::Data(n) => {
                    if !self.handle_chunk(&buffer[..n], &mut stream, controller) {
                        break;
                    }
                }
                ReadEvent::Timeout => {
                    log::info!(
                        "No data for {}s, dropping session (link likely lost)",
                        self.read_timeout.as_secs()
                    );
                    break;
                }
                ReadEvent::Closed => {
                    log::info!("Client closed connection");
                    break;
                }
                ReadEvent::Error(e) => {
                    log::warn!("Connection error: {}", e);
                    break;
                }
            }
        }

        let _ = stream.shutdown(Shutdown::Both);
    }

    /// Decode and execute one received chunk
    ///
    /// Returns `false` when the session must end (undecodable payload or a
    /// GPIO failure). Unknown commands keep the session alive.
    fn handle_chunk(
        &self,
        chunk: &[u8],
        stream: &mut TcpStream,
        controller: &mut Controller,
    ) -> bool {
        let text = match str::from_utf8(chunk) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Undecodable payload ({}), dropping session", e);
                return false;
            }
        };
        log::debug!("Received: {:?}", text.trim());

        match parse_chunk(text) {
            Some(cmd) => {
                log::debug!("Executing command: {}", cmd.as_char());
                match controller.apply(cmd) {
                    Ok(()) => self.ack(stream, true),
                    Err(e) => {
                        log::error!("Command {} failed: {}", cmd.as_char(), e);
                        self.ack(stream, false);
                        return false;
                    }
                }
            }
            None => {
                log::warn!("Unknown command: {:?}", text.trim());
                self.ack(stream, false);
            }
        }
        true
    }

    /// Best-effort acknowledgement; a send failure never ends the session
    fn ack(&self, stream: &mut TcpStream, ok: bool) {
        if !self.send_ack {
            return;
        }
        let token = if ok { ACK_OK } else { ACK_ERR };
        if let Err(e) = stream.write_all(token) {
            log::debug!("Ack send failed: {}", e);
        }
    }
}

/// Classify one blocking read on the session socket
fn read_chunk(stream: &mut TcpStream, buffer: &mut [u8]) -> ReadEvent {
    match stream.read(buffer) {
        Ok(0) => ReadEvent::Closed,
        Ok(n) => ReadEvent::Data(n),
        // Timeout surfaces as WouldBlock or TimedOut depending on platform
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
            ReadEvent::Timeout
        }
        Err(e) => ReadEvent::Error(e),
    }
}

/// Framing policy: first significant character of the trimmed chunk
fn parse_chunk(text: &str) -> Option<Command> {
    let first = text.trim().chars().next()?;
    let byte = u8::try_from(first).ok()?;
    Command::from_byte(byte)
}

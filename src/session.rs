//! A single TCP connection to one instrument.
//!
//! Commands are ASCII lines terminated by CRLF. [`Session::query`] writes a
//! command and reads the reply back as text, [`Session::send`] only writes.
//! The socket is opened when the session is built and released by
//! [`Session::close`] or when the session is dropped, whichever comes first.
//!
//! ```no_run
//! use std::time::Duration;
//! use santec_tsl::session::Session;
//!
//! let mut session = Session::open("192.168.0.200", 5000, Duration::from_secs(5))?;
//! let reply = session.query(":WAV?")?;
//! println!("{}", reply.trim());
//! session.close();
//! # Ok::<(), santec_tsl::error::TslError>(())
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::{ReadMode, SessionConfig};
use crate::error::{TslError, TslResult};

pub const TERMINATOR: &str = "\r\n";

const READ_CHUNK: usize = 1024;

/// Something that happened on a session, handed to the observer if one was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    Opened { peer: SocketAddr },
    Closed { peer: SocketAddr },
    Sent { command: &'a str },
    Received { reply: &'a str },
}

/// Called synchronously from the session, including from `close` during `Drop`.
/// Observers must not panic: a panic while the thread is already unwinding aborts the process.
pub type Observer = Box<dyn FnMut(&SessionEvent<'_>) + Send>;

pub struct Session {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    read_mode: ReadMode,
    observer: Option<Observer>,
}

/// Append CRLF unless the command already ends with it.
pub fn terminate(command: &str) -> Cow<'_, str> {
    if command.ends_with(TERMINATOR) {
        Cow::Borrowed(command)
    } else {
        Cow::Owned(format!("{command}{TERMINATOR}"))
    }
}

fn connect_timeout<A: ToSocketAddrs>(addr: A, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Host did not resolve to any address")))
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn hung_up() -> TslError {
    TslError::Connection(io::Error::new(io::ErrorKind::UnexpectedEof, "Instrument closed the connection"))
}

impl Session {

    /// Connect with the default read mode.
    pub fn open(host: &str, port: u16, timeout: Duration) -> TslResult<Self> {
        Self::connect(&SessionConfig::new(host, port).with_timeout(timeout))
    }

    pub fn connect(config: &SessionConfig) -> TslResult<Self> {
        Self::connect_observed(config, None)
    }

    /// Connect and report lifecycle and traffic to `observer`.
    ///
    /// The timeout bounds each connection attempt and every later read and write.
    pub fn connect_observed(config: &SessionConfig, observer: Option<Observer>) -> TslResult<Self> {
        let timeout = config.timeout()?;
        let stream = connect_timeout((config.host.as_str(), config.port), timeout)?;

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let peer = stream.peer_addr()?;

        debug!(%peer, "Connection opened");

        let mut session = Self { stream: Some(stream), peer, read_mode: config.read_mode, observer };
        session.notify(&SessionEvent::Opened { peer });
        Ok(session)
    }

    pub fn is_open(&self) -> bool { self.stream.is_some() }

    pub fn peer_addr(&self) -> SocketAddr { self.peer }

    pub fn read_mode(&self) -> ReadMode { self.read_mode }

    /// Release the socket. Calling this on a closed session does nothing.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                // The peer may already be gone
                trace!("Shutdown failed: {e}");
            }

            let peer = self.peer;
            debug!(%peer, "Connection closed");
            self.notify(&SessionEvent::Closed { peer });
        }
    }

    /// Write a command without waiting for a reply.
    pub fn send(&mut self, command: &str) -> TslResult<()> {
        let msg = terminate(command);
        trace!("send: {:?}", msg);

        let stream = self.stream()?;
        stream.write_all(msg.as_bytes())?;
        stream.flush()?;

        self.notify(&SessionEvent::Sent { command: &msg });
        Ok(())
    }

    /// Write a command and return the reply exactly as received, terminator included.
    ///
    /// Nothing checks that the reply belongs to this command.
    pub fn query(&mut self, command: &str) -> TslResult<String> {
        self.send(command)?;

        let bytes = match self.read_mode {
            ReadMode::Single => self.read_some()?,
            ReadMode::Line   => self.read_line()?,
        };

        let reply = String::from_utf8(bytes)
            .map_err(|e| TslError::parse(&String::from_utf8_lossy(e.as_bytes()), "UTF-8 text"))?;
        trace!("recv: {:?}", reply);

        self.notify(&SessionEvent::Received { reply: &reply });
        Ok(reply)
    }

    fn stream(&mut self) -> TslResult<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(TslError::closed)
    }

    fn read_some(&mut self) -> TslResult<Vec<u8>> {
        let stream = self.stream()?;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            match stream.read(&mut buf) {
                Ok(0) => return Err(hung_up()),
                Ok(n) => return Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    // A timeout after part of the line arrived leaves the rest of it in the socket,
    // where the next query would take it as its own reply. Drop the connection instead.
    fn read_line(&mut self) -> TslResult<Vec<u8>> {
        let mut reply = Vec::new();

        match self.fill_line(&mut reply) {
            Err(TslError::Connection(e)) if !reply.is_empty() && is_timeout(&e) => {
                debug!(peer = %self.peer, "Read timed out after {} bytes of a reply", reply.len());
                self.close();
                Err(TslError::Connection(e))
            }
            other => other.map(|()| reply),
        }
    }

    fn fill_line(&mut self, reply: &mut Vec<u8>) -> TslResult<()> {
        let stream = self.stream()?;
        let mut buf = [0u8; READ_CHUNK];

        loop {
            match stream.read(&mut buf) {
                Ok(0) => return Err(hung_up()),
                Ok(n) => {
                    reply.extend_from_slice(&buf[..n]);
                    if buf[..n].contains(&b'\n') {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn notify(&mut self, event: &SessionEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }

}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .field("read_mode", &self.read_mode)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl Drop for Session {

    fn drop(&mut self) { self.close(); }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_is_appended_once() {
        assert_eq!(terminate(":WAV?"), ":WAV?\r\n");
        assert_eq!(terminate(":WAV?\r\n"), ":WAV?\r\n");
        assert!(matches!(terminate(":WAV?\r\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn bare_newline_still_gets_crlf() {
        assert_eq!(terminate(":WAV?\n"), ":WAV?\n\r\n");
        assert_eq!(terminate(""), "\r\n");
    }

    #[test]
    fn refused_connection_is_a_connection_error() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = Session::open("127.0.0.1", port, Duration::from_secs(1)).unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn zero_timeout_is_rejected_before_connecting() {
        let err = Session::open("127.0.0.1", 1, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TslError::Config(_)));
    }
}

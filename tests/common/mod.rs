#![allow(dead_code)]

//! A scripted stand-in for the laser: accepts one connection, records every
//! command line it receives and answers according to a responder closure.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use santec_tsl::config::{ReadMode, SessionConfig};

/// Gap between reply chunks, long enough for a single read to return early.
pub const CHUNK_GAP: Duration = Duration::from_millis(200);

pub enum Reply {
    /// Written one after another with [`CHUNK_GAP`] in between.
    Chunks(Vec<String>),
    /// Written as-is, whether or not it is valid text.
    Bytes(Vec<u8>),
    /// Nothing is written back.
    Silent,
    /// The connection is dropped.
    HangUp,
}

impl Reply {
    pub fn line(text: &str) -> Self {
        Reply::Chunks(vec![format!("{text}\n")])
    }
}

pub struct MockInstrument {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockInstrument {
    pub fn start<F>(mut respond: F) -> Self
    where
        F: FnMut(&str) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);

            loop {
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => return,
                    Ok(_) => {}
                }

                let line = String::from_utf8(line).unwrap();
                log.lock().unwrap().push(line.clone());

                match respond(line.trim_end_matches("\r\n")) {
                    Reply::Chunks(chunks) => {
                        for (i, chunk) in chunks.iter().enumerate() {
                            if i > 0 {
                                thread::sleep(CHUNK_GAP);
                            }
                            if writer.write_all(chunk.as_bytes()).is_err() {
                                return;
                            }
                            let _ = writer.flush();
                        }
                    }
                    Reply::Bytes(bytes) => {
                        if writer.write_all(&bytes).is_err() {
                            return;
                        }
                        let _ = writer.flush();
                    }
                    Reply::Silent => {}
                    Reply::HangUp => return,
                }
            }
        });

        Self { addr, received, handle }
    }

    /// Answers every query from a fixed table; setters get no reply.
    pub fn with_table(table: &[(&str, &str)]) -> Self {
        let table: Vec<(String, String)> = table
            .iter()
            .map(|(cmd, reply)| (cmd.to_string(), reply.to_string()))
            .collect();

        Self::start(move |cmd| {
            match table.iter().find(|(c, _)| c == cmd) {
                Some((_, reply)) => Reply::line(reply),
                None => Reply::Silent,
            }
        })
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1", self.addr.port()).with_timeout(Duration::from_secs(2))
    }

    pub fn config_with(&self, read_mode: ReadMode) -> SessionConfig {
        self.config().with_read_mode(read_mode)
    }

    /// Wait for the client to disconnect and return every line received, terminators included.
    pub fn finish(self) -> Vec<String> {
        self.handle.join().unwrap();
        let received = self.received.lock().unwrap();
        received.clone()
    }
}

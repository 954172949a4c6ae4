//! Client side of the coordination protocol

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::protocol::{decode_response, encode_line, Request, Response};
use super::ServerError;
use crate::domain::entities::{CoordinationSession, EventFrame};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct ServerClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl ServerClient {
    pub fn connect(address: SocketAddr) -> Result<Self, ServerError> {
        let stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT).map_err(|source| {
            ServerError::Io {
                op: "connect",
                source,
            }
        })?;
        let reader = stream.try_clone().map_err(|source| ServerError::Io {
            op: "connect",
            source,
        })?;
        Ok(Self {
            reader: BufReader::new(reader),
            writer: stream,
        })
    }

    pub fn request(&mut self, request: &Request) -> Result<Response, ServerError> {
        let line = encode_line(request).map_err(|e| ServerError::Protocol(e.to_string()))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|source| ServerError::Io {
                op: "send request",
                source,
            })?;

        let mut reply = String::new();
        let n = self
            .reader
            .read_line(&mut reply)
            .map_err(|source| ServerError::Io {
                op: "read response",
                source,
            })?;
        if n == 0 {
            return Err(ServerError::Protocol("server closed the connection".to_string()));
        }
        decode_response(&reply).map_err(|e| ServerError::Protocol(e.to_string()))
    }

    pub fn status(&mut self) -> Result<CoordinationSession, ServerError> {
        match self.request(&Request::Status)? {
            Response::Status { session } => Ok(session),
            other => Err(unexpected(other)),
        }
    }

    pub fn deploy(&mut self) -> Result<(), ServerError> {
        match self.request(&Request::Deploy)? {
            Response::Queued => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn shutdown(mut self) -> Result<(), ServerError> {
        match self.request(&Request::Shutdown)? {
            Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Switch the connection into event streaming mode
    pub fn subscribe(mut self) -> Result<FrameStream, ServerError> {
        match self.request(&Request::Subscribe)? {
            Response::Subscribed => Ok(FrameStream {
                reader: self.reader,
                pending: Vec::new(),
            }),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ServerError {
    match response {
        Response::Error { message } => ServerError::Protocol(message),
        other => ServerError::Protocol(format!("{:?}", other)),
    }
}

/// Event frames pushed by the server after `subscribe`
pub struct FrameStream {
    reader: BufReader<TcpStream>,
    /// Raw bytes of a partial line kept across read timeouts; a timeout may
    /// split a multi-byte character
    pending: Vec<u8>,
}

impl FrameStream {
    /// Bound each read so callers can poll for cancellation
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)
    }

    /// Next frame. `Ok(None)` at end of stream; a read timeout surfaces as an
    /// `io::ErrorKind::WouldBlock` or `TimedOut` error and loses nothing.
    pub fn next_frame(&mut self) -> io::Result<Option<EventFrame>> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.pending)?;
            if n == 0 && self.pending.is_empty() {
                return Ok(None);
            }
            if n != 0 && self.pending.last() != Some(&b'\n') {
                continue;
            }
            let bytes = std::mem::take(&mut self.pending);
            let line = String::from_utf8(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if line.trim().is_empty() {
                if n == 0 {
                    return Ok(None);
                }
                continue;
            }
            return serde_json::from_str(line.trim())
                .map(Some)
                .map_err(io::Error::other);
        }
    }
}

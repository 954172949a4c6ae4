//! Local coordination server
//!
//! At most one per project directory. Ownership is an fs2 exclusive lock on
//! `.stagehand/server.lock`, held for the life of the process so the kernel
//! drops it if the owner crashes. The owner listens on a loopback TCP port
//! and publishes its address in `.stagehand/server.json`; every other
//! invocation reads that file and attaches as a client.

mod client;
mod hub;
mod protocol;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::Sender;
use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::cancel::CancelToken;
use crate::application::stage::PROJECT_STATE_DIR;
use crate::domain::entities::{CoordinationSession, SessionCommand};
use crate::domain::value_objects::StageKey;
use crate::infrastructure::fs::write_atomic;

pub use client::{FrameStream, ServerClient};
pub use hub::{FrameHub, DEFAULT_HUB_CAPACITY};
pub use protocol::{decode_request, decode_response, encode_line, Request, Response};

const LOCK_FILE: &str = "server.lock";
const SESSION_FILE: &str = "server.json";

/// How long an attaching process waits for the owner to publish its address
const PUBLISH_WAIT: Duration = Duration::from_secs(2);
const ACCEPT_POLL: Duration = Duration::from_millis(50);
const LIVENESS_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server already running (pid {}, {})", .session.pid, .session.address)]
    AlreadyRunning { session: Box<CoordinationSession> },

    #[error("a server holds {} but has not published a session", .path.display())]
    SessionUnavailable { path: PathBuf },

    #[error("server {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unexpected server response: {0}")]
    Protocol(String),
}

impl ServerError {
    fn io(op: &'static str) -> impl FnOnce(io::Error) -> ServerError {
        move |source| ServerError::Io { op, source }
    }
}

/// Result of trying to become the project's server
#[derive(Debug)]
pub enum ServerStart {
    Owns(ServerHandle),
    Attached(CoordinationSession),
}

/// Claim the project's server slot or find the current owner
pub fn start(project_dir: &Path, key: &StageKey) -> Result<ServerStart, ServerError> {
    let dir = project_dir.join(PROJECT_STATE_DIR);
    fs::create_dir_all(&dir).map_err(ServerError::io("create state dir"))?;

    let lock_path = dir.join(LOCK_FILE);
    let session_path = dir.join(SESSION_FILE);
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(ServerError::io("open lock"))?;

    if let Err(err) = lock.try_lock_exclusive() {
        if err.kind() != fs2::lock_contended_error().kind() {
            return Err(ServerError::Io {
                op: "lock",
                source: err,
            });
        }
        let session = wait_for_session(&session_path)?;
        info!(pid = session.pid, address = %session.address, "attaching to running server");
        return Ok(ServerStart::Attached(session));
    }

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(ServerError::io("bind"))?;
    let address = listener.local_addr().map_err(ServerError::io("bind"))?;
    let session = CoordinationSession {
        pid: std::process::id(),
        key: key.clone(),
        address,
        started_at: Utc::now(),
    };
    let body = serde_json::to_vec_pretty(&session).map_err(|e| ServerError::Io {
        op: "encode session",
        source: io::Error::other(e),
    })?;
    write_atomic(&session_path, &body).map_err(ServerError::io("publish session"))?;
    info!(%address, key = %key, "coordination server started");

    Ok(ServerStart::Owns(ServerHandle {
        session,
        session_path,
        listener,
        hub: FrameHub::default(),
        _lock: lock,
    }))
}

/// Read the published session without trying to claim the slot
pub fn read_session(project_dir: &Path) -> Option<CoordinationSession> {
    let path = project_dir.join(PROJECT_STATE_DIR).join(SESSION_FILE);
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Wait for a session that accepts connections. A file left behind by a
/// crashed owner stays unreachable until the new owner overwrites it.
fn wait_for_session(path: &Path) -> Result<CoordinationSession, ServerError> {
    let deadline = Instant::now() + PUBLISH_WAIT;
    loop {
        if let Ok(content) = fs::read_to_string(path) {
            if let Ok(session) = serde_json::from_str::<CoordinationSession>(&content) {
                match TcpStream::connect_timeout(&session.address, LIVENESS_TIMEOUT) {
                    Ok(_) => return Ok(session),
                    Err(err) => {
                        debug!(address = %session.address, error = %err, "published session unreachable")
                    }
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(ServerError::SessionUnavailable {
                path: path.to_path_buf(),
            });
        }
        thread::sleep(ACCEPT_POLL);
    }
}

/// The owned server slot. Dropping it unpublishes the session and releases
/// the lock.
#[derive(Debug)]
pub struct ServerHandle {
    session: CoordinationSession,
    session_path: PathBuf,
    listener: TcpListener,
    hub: FrameHub,
    _lock: File,
}

impl ServerHandle {
    pub fn session(&self) -> &CoordinationSession {
        &self.session
    }

    pub fn hub(&self) -> &FrameHub {
        &self.hub
    }

    /// Accept clients on a background thread until `cancel` fires.
    ///
    /// `deploy` and `shutdown` requests are forwarded to `commands`.
    pub fn spawn_acceptor(
        &self,
        commands: Sender<SessionCommand>,
        cancel: CancelToken,
    ) -> Result<JoinHandle<()>, ServerError> {
        let listener = self
            .listener
            .try_clone()
            .map_err(ServerError::io("clone listener"))?;
        listener
            .set_nonblocking(true)
            .map_err(ServerError::io("configure listener"))?;
        let session = self.session.clone();
        let hub = self.hub.clone();

        Ok(thread::spawn(move || {
            while !cancel.is_cancelled() {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        debug!(%peer, "client connected");
                        let ctx = ClientContext {
                            session: session.clone(),
                            hub: hub.clone(),
                            commands: commands.clone(),
                        };
                        thread::spawn(move || {
                            if let Err(err) = handle_client(stream, ctx) {
                                debug!(%peer, error = %err, "client connection ended");
                            }
                        });
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL);
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        thread::sleep(ACCEPT_POLL);
                    }
                }
            }
            debug!("acceptor stopped");
        }))
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.hub.close();
        // Only unpublish our own session
        let ours = fs::read_to_string(&self.session_path)
            .ok()
            .and_then(|c| serde_json::from_str::<CoordinationSession>(&c).ok())
            .is_some_and(|s| s.pid == self.session.pid && s.address == self.session.address);
        if ours {
            let _ = fs::remove_file(&self.session_path);
        }
        info!(address = %self.session.address, "coordination server stopped");
    }
}

struct ClientContext {
    session: CoordinationSession,
    hub: FrameHub,
    commands: Sender<SessionCommand>,
}

fn handle_client(stream: TcpStream, ctx: ClientContext) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request = match decode_request(&line) {
            Ok(request) => request,
            Err(err) => {
                respond(
                    &mut writer,
                    &Response::Error {
                        message: format!("invalid request: {}", err),
                    },
                )?;
                continue;
            }
        };
        debug!(?request, "client request");

        match request {
            Request::Status => respond(
                &mut writer,
                &Response::Status {
                    session: ctx.session.clone(),
                },
            )?,
            Request::Deploy => {
                let queued = ctx.commands.send(SessionCommand::Deploy {
                    reason: "requested by client".to_string(),
                });
                let response = match queued {
                    Ok(()) => Response::Queued,
                    Err(_) => Response::Error {
                        message: "session is shutting down".to_string(),
                    },
                };
                respond(&mut writer, &response)?;
            }
            Request::Shutdown => {
                let _ = ctx.commands.send(SessionCommand::Shutdown);
                respond(&mut writer, &Response::ShuttingDown)?;
                return Ok(());
            }
            Request::Subscribe => {
                let frames = ctx.hub.subscribe();
                respond(&mut writer, &Response::Subscribed)?;
                for frame in frames {
                    let line = encode_line(&frame).map_err(io::Error::other)?;
                    writer.write_all(line.as_bytes())?;
                    writer.flush()?;
                }
                return Ok(());
            }
        }
    }
    Ok(())
}

fn respond(writer: &mut TcpStream, response: &Response) -> io::Result<()> {
    let line = encode_line(response).map_err(io::Error::other)?;
    writer.write_all(line.as_bytes())?;
    writer.flush()
}

use std::io;
use std::process::Child;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use super::shell::{program_name, resource_command};
use super::CommandError;
use crate::application::cancel::CancelToken;
use crate::application::dev::{DevSession, RunReport};
use crate::application::watch::ProjectWatcher;
use crate::domain::entities::{CoordinationSession, EventFrame};
use crate::infrastructure::server::{self, ServerClient, ServerError, ServerHandle, ServerStart};
use crate::presentation::context::CommandContext;
use crate::presentation::factory::Project;
use crate::ui::progress::format_event;
use crate::ui::UiContext;

const ATTACH_POLL: Duration = Duration::from_millis(100);

pub fn cmd_dev(ctx: &mut CommandContext) -> Result<()> {
    let args = ctx.invocation.positionals.clone();
    let ui = ctx.ui;
    let cancel = ctx.cancel.clone();
    let project = ctx.project()?;

    let start = server::start(project.root(), &project.key)
        .context("failed to start the dev session")?;
    let child = if args.is_empty() {
        None
    } else {
        Some(spawn_alongside(project, &args, &cancel)?)
    };

    let result = match start {
        ServerStart::Owns(handle) => {
            eprintln!(
                "Dev session for {} listening on {}",
                project.key,
                handle.session().address
            );
            serve(project, handle, ui, &cancel)
        }
        ServerStart::Attached(session) => attach(&session, ui, &cancel),
    };

    cancel.cancel();
    if let Some(child) = child {
        let _ = child.join();
    }
    result
}

/// Hidden: run the session in the foreground, refusing to attach
pub fn cmd_server(ctx: &mut CommandContext) -> Result<()> {
    let ui = ctx.ui;
    let cancel = ctx.cancel.clone();
    let project = ctx.project()?;
    match server::start(project.root(), &project.key)? {
        ServerStart::Owns(handle) => {
            println!("Server listening on {}", handle.session().address);
            serve(project, handle, ui, &cancel)
        }
        ServerStart::Attached(session) => Err(ServerError::AlreadyRunning {
            session: Box::new(session),
        }
        .into()),
    }
}

fn serve(project: &Project, handle: ServerHandle, ui: UiContext, cancel: &CancelToken) -> Result<()> {
    let (requests, commands) = unbounded();
    let acceptor = handle.spawn_acceptor(requests.clone(), cancel.clone())?;
    let renderer = spawn_frame_renderer(handle.hub().subscribe(), ui);

    let watcher = ProjectWatcher::new(project.root(), project.config.config.dev.debounce());
    let reports = DevSession::new(project.stack(), handle.hub().clone())
        .with_watcher(watcher)
        .run(requests, commands, cancel);

    cancel.cancel();
    let _ = acceptor.join();
    drop(handle);
    let _ = renderer.join();

    let failed = reports
        .iter()
        .filter(|r| matches!(r, RunReport::Failed(_)))
        .count();
    info!(runs = reports.len(), failed, "dev session ended");
    Ok(())
}

fn spawn_frame_renderer(
    frames: crossbeam_channel::Receiver<EventFrame>,
    ui: UiContext,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for frame in frames {
            eprintln!("{}", format_event(&frame.key, &frame.event, &ui));
        }
    })
}

fn attach(session: &CoordinationSession, ui: UiContext, cancel: &CancelToken) -> Result<()> {
    eprintln!(
        "Attached to the dev session for {} (pid {})",
        session.key, session.pid
    );
    let client = ServerClient::connect(session.address)?;
    let mut stream = client.subscribe()?;
    stream.set_read_timeout(Some(ATTACH_POLL))?;

    while !cancel.is_cancelled() {
        match stream.next_frame() {
            Ok(Some(frame)) => eprintln!("{}", format_event(&frame.key, &frame.event, &ui)),
            Ok(None) => {
                eprintln!("The dev session has ended");
                break;
            }
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(err) => return Err(err).context("lost connection to the dev session"),
        }
    }
    Ok(())
}

/// Start the user's command with linked resources. Its exit ends the
/// session; the end of the session stops it.
fn spawn_alongside(
    project: &Project,
    args: &[String],
    cancel: &CancelToken,
) -> Result<JoinHandle<()>> {
    let links = project
        .backend
        .get_links(&project.key)
        .context("failed to load linked resources")?;
    let program = program_name(args);
    let child = resource_command(args, &links, &project.key, project.root())
        .spawn()
        .map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;
    debug!(%program, pid = child.id(), "started command alongside dev session");

    let cancel = cancel.clone();
    Ok(thread::spawn(move || supervise(child, &program, &cancel)))
}

fn supervise(mut child: Child, program: &str, cancel: &CancelToken) {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    info!(%program, "command exited");
                } else {
                    warn!(%program, %status, "command exited");
                }
                cancel.cancel();
                return;
            }
            Ok(None) if cancel.is_cancelled() => {
                let _ = child.kill();
                let _ = child.wait();
                debug!(%program, "command stopped with the session");
                return;
            }
            Ok(None) => thread::sleep(ATTACH_POLL),
            Err(err) => {
                warn!(%program, error = %err, "could not wait for command");
                return;
            }
        }
    }
}

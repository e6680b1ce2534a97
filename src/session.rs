/// Runs a `ViewController` on its own task. Callers talk to it through a
/// cloneable handle, so every state change is handled one at a time.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::controller::{ViewController, ViewSnapshot};
use crate::explanation::TextGenerator;

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session task has stopped")]
    Closed,
}

enum Command {
    SetTemperature { temperature: f64, reply: oneshot::Sender<ViewSnapshot> },
    SetSubstance { id: String, reply: oneshot::Sender<ViewSnapshot> },
    Snapshot { reply: oneshot::Sender<ViewSnapshot> },
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn set_temperature(&self, temperature: f64) -> Result<ViewSnapshot, SessionError> {
        self.call(|reply| Command::SetTemperature { temperature, reply }).await
    }

    pub async fn set_substance(&self, id: impl Into<String>) -> Result<ViewSnapshot, SessionError> {
        let id = id.into();
        self.call(|reply| Command::SetSubstance { id, reply }).await
    }

    pub async fn snapshot(&self) -> Result<ViewSnapshot, SessionError> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    async fn call<F>(&self, build: F) -> Result<ViewSnapshot, SessionError>
    where
        F: FnOnce(oneshot::Sender<ViewSnapshot>) -> Command,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

/// Starts the session loop and kicks off the first explanation request.
/// The task ends once every handle is dropped.
pub fn spawn_session<G: TextGenerator>(mut controller: ViewController<G>) -> SessionHandle {
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    tokio::spawn(async move {
        controller.start();
        run(controller, rx).await;
    });
    SessionHandle { commands }
}

async fn run<G: TextGenerator>(
    mut controller: ViewController<G>,
    mut commands: mpsc::Receiver<Command>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::SetTemperature { temperature, reply } => {
                        controller.set_temperature(temperature);
                        let _ = reply.send(controller.snapshot());
                    }
                    Command::SetSubstance { id, reply } => {
                        controller.set_substance(&id);
                        let _ = reply.send(controller.snapshot());
                    }
                    Command::Snapshot { reply } => {
                        let _ = reply.send(controller.snapshot());
                    }
                }
            }
            Some(event) = controller.next_event() => {
                controller.apply_event(event);
            }
        }
    }
    controller.cancel_explanation();
    debug!("session closed");
}

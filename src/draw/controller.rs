use crate::draw::engine::DrawEngine;
use crate::draw::messages::{Command, CommandReply};
use crate::draw::render::Surface;
use crate::draw::settings_store::{SharedStore, StoreChange};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerLifecycle {
    Starting,
    Active,
    Detached,
}

#[derive(Debug)]
pub struct CommandEnvelope {
    pub command: Command,
    pub reply_tx: Option<Sender<CommandReply>>,
}

/// Sending half held by the popup, background worker and shortcut handler.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<CommandEnvelope>,
}

impl CommandSender {
    /// Fire-and-forget. A missing overlay is not an error: the command is
    /// dropped and `false` returned.
    pub fn send(&self, command: Command) -> bool {
        self.deliver(CommandEnvelope {
            command,
            reply_tx: None,
        })
    }

    /// Sends a command and returns the channel its reply will arrive on.
    pub fn request(&self, command: Command) -> Option<Receiver<CommandReply>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.deliver(CommandEnvelope {
            command,
            reply_tx: Some(reply_tx),
        })
        .then_some(reply_rx)
    }

    fn deliver(&self, envelope: CommandEnvelope) -> bool {
        let action = envelope.command.action();
        match self.tx.send(envelope) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(action, "overlay not ready; command dropped");
                false
            }
        }
    }
}

pub fn command_channel() -> (CommandSender, Receiver<CommandEnvelope>) {
    let (tx, rx) = mpsc::channel();
    (CommandSender { tx }, rx)
}

/// Feeds commands and store notifications into a page's engine.
pub struct OverlayController {
    command_rx: Receiver<CommandEnvelope>,
    store_rx: Receiver<StoreChange>,
    lifecycle: ControllerLifecycle,
}

impl OverlayController {
    pub fn new(command_rx: Receiver<CommandEnvelope>, store_rx: Receiver<StoreChange>) -> Self {
        Self {
            command_rx,
            store_rx,
            lifecycle: ControllerLifecycle::Starting,
        }
    }

    /// Wires a controller to `store` and returns the sender callers use to
    /// reach it.
    pub fn connect(store: &SharedStore) -> (Self, CommandSender) {
        let (sender, command_rx) = command_channel();
        (Self::new(command_rx, store.subscribe()), sender)
    }

    pub fn lifecycle(&self) -> ControllerLifecycle {
        self.lifecycle
    }

    /// Applies pending store changes, then pending commands, each in arrival
    /// order, then advances engine timers. Returns the number of messages
    /// handled.
    pub fn pump<S: Surface>(&mut self, engine: &mut DrawEngine<S>, now: Instant) -> usize {
        if self.lifecycle == ControllerLifecycle::Detached {
            return 0;
        }
        self.lifecycle = ControllerLifecycle::Active;
        let mut handled = 0;

        loop {
            match self.store_rx.try_recv() {
                Ok(change) => {
                    engine.store_changed(&change);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.detach("store");
                    break;
                }
            }
        }

        loop {
            match self.command_rx.try_recv() {
                Ok(CommandEnvelope { command, reply_tx }) => {
                    let reply = engine.dispatch(command);
                    if let Some(reply_tx) = reply_tx {
                        let _ = reply_tx.send(reply);
                    }
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.detach("command");
                    break;
                }
            }
        }

        engine.tick(now);
        handled
    }

    fn detach(&mut self, source: &str) {
        if self.lifecycle != ControllerLifecycle::Detached {
            tracing::info!(source, "overlay controller detached");
        }
        self.lifecycle = ControllerLifecycle::Detached;
    }
}

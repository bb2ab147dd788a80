//! The seam between the bridge and the host's "evaluate script" primitive.
//!
//! The bridge only ever pushes commands into an unbounded channel, which never
//! blocks and never calls back into the bridge. The host owns the receiving
//! end and drains it from the one context allowed to touch the web view.

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::command::Command;

pub fn channel(object: impl Into<String>) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        OutboundSender { tx },
        OutboundReceiver {
            rx,
            object: object.into(),
        },
    )
}

#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl OutboundSender {
    /// Queue a command for transmission. Returns false once the receiver is
    /// gone.
    pub fn send(&self, command: Command) -> bool {
        let operation = command.operation();
        match self.tx.send(command) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Outbound receiver dropped, discarding {}", operation);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
    object: String,
}

impl OutboundReceiver {
    /// Name of the web-side object commands are addressed to.
    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn render(&self, command: &Command) -> String {
        command.to_script(&self.object)
    }

    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Blocking receive for hosts that pump from a plain thread. Must not be
    /// called from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Command> {
        self.rx.blocking_recv()
    }

    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    pub async fn recv_script(&mut self) -> Option<String> {
        let command = self.rx.recv().await?;
        Some(self.render(&command))
    }

    pub fn blocking_recv_script(&mut self) -> Option<String> {
        let command = self.rx.blocking_recv()?;
        Some(self.render(&command))
    }

    /// Everything queued right now, in transmission order.
    pub fn drain(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Write every command queued right now as one script per line, without
    /// waiting for more. Returns how many were written.
    pub fn write_ready(&mut self, out: &mut impl Write) -> io::Result<usize> {
        let mut written = 0;
        while let Ok(command) = self.rx.try_recv() {
            writeln!(out, "{}", self.render(&command))?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    }

    pub fn drain_scripts(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .map(|command| self.render(command))
            .collect()
    }
}

use std::sync::Arc;

use futures_util::future::join_all;

use triage_contract::{EventKind, IncomingMessage};

use crate::command::Command;

/// Ordered collection of commands sharing one inbound event stream.
///
/// Every registered command whose event kind matches is offered every event,
/// in registration order, with no stop-after-first-match: two commands may
/// both react to one message. Failures stay inside the offering; dispatch
/// always proceeds to the remaining commands and the next event.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Offers `payload` to each command listening for `kind` and drives the
    /// eligible ones concurrently.
    pub async fn dispatch(&self, kind: EventKind, payload: &IncomingMessage) {
        let offers = self
            .commands
            .iter()
            .filter(|command| command.event_kind() == kind)
            .map(|command| offer_to_command(command.as_ref(), payload));
        join_all(offers).await;
    }
}

/// Failure boundary around one command's two-phase lifecycle.
async fn offer_to_command(command: &dyn Command, payload: &IncomingMessage) {
    let eligible = match command.can_execute(payload).await {
        Ok(eligible) => eligible,
        Err(error) => {
            tracing::warn!(
                command = command.name(),
                error = %error,
                "command eligibility check failed"
            );
            return;
        }
    };
    if !eligible {
        return;
    }
    if let Err(error) = command.execute(payload).await {
        tracing::error!(
            command = command.name(),
            error = %error,
            "command execution failed"
        );
    }
}

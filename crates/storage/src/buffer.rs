use std::cell::RefCell;

use stagehand_core::Command;
use tracing::{debug, trace};

use crate::error::StorageError;
use crate::traits::{CommandSink, ComponentStore};

/// Ordered queue of deferred commands, applied to a store at commit.
///
/// Single-threaded by construction (`RefCell`); the host scheduler owns
/// exclusive access for the duration of a batch.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: RefCell<Vec<Command>>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    /// Clone of the queued commands, in push order.
    pub fn snapshot(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    /// Drain the queue without applying it.
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    /// Apply every queued command in order, then clear the queue.
    /// On failure the queue is left intact.
    pub fn commit<S: ComponentStore + ?Sized>(&self, store: &mut S) -> Result<usize, StorageError> {
        let applied = {
            let commands = self.commands.borrow();
            store.apply(&commands)?;
            commands.len()
        };
        self.commands.borrow_mut().clear();
        debug!(applied, "committed command buffer");
        Ok(applied)
    }
}

impl CommandSink for CommandBuffer {
    fn push(&self, command: Command) -> Result<(), StorageError> {
        trace!(
            entity = %command.entity,
            component = command.component,
            kind = command.kind().as_str(),
            "queued command"
        );
        self.commands.borrow_mut().push(command);
        Ok(())
    }
}

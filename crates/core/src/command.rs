use crate::component::{self, Component};
use crate::error::CoreError;
use crate::ids::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Add,
    Set,
    Remove,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

/// Payloads are MessagePack-encoded component values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOp {
    Add(Vec<u8>),
    Set(Vec<u8>),
    Remove,
}

/// A deferred structural change addressed to one component of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub entity: EntityId,
    pub component: &'static str,
    pub op: CommandOp,
}

impl Command {
    pub fn add<T: Component>(entity: EntityId, value: &T) -> Result<Self, CoreError> {
        Ok(Self {
            entity,
            component: T::NAME,
            op: CommandOp::Add(component::encode(value)?),
        })
    }

    pub fn set<T: Component>(entity: EntityId, value: &T) -> Result<Self, CoreError> {
        Ok(Self {
            entity,
            component: T::NAME,
            op: CommandOp::Set(component::encode(value)?),
        })
    }

    pub fn remove<T: Component>(entity: EntityId) -> Self {
        Self {
            entity,
            component: T::NAME,
            op: CommandOp::Remove,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self.op {
            CommandOp::Add(_) => CommandKind::Add,
            CommandOp::Set(_) => CommandKind::Set,
            CommandOp::Remove => CommandKind::Remove,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match &self.op {
            CommandOp::Add(bytes) | CommandOp::Set(bytes) => Some(bytes),
            CommandOp::Remove => None,
        }
    }

    /// Decode the carried value. `Ok(None)` for removes.
    pub fn decode<T: Component>(&self) -> Result<Option<T>, CoreError> {
        if self.component != T::NAME {
            return Err(CoreError::ComponentMismatch {
                expected: T::NAME,
                found: self.component,
            });
        }
        self.payload().map(component::decode::<T>).transpose()
    }
}

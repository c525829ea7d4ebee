pub mod command;
pub mod component;
pub mod error;
pub mod ids;

pub use command::{Command, CommandKind, CommandOp};
pub use component::Component;
pub use error::CoreError;
pub use ids::*;

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use stagehand_core::Component;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health(pub u32);

impl Component for Health {
    const NAME: &'static str = "health";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Component for Position {
    const NAME: &'static str = "position";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: i32,
    pub dy: i32,
}

impl Component for Velocity {
    const NAME: &'static str = "velocity";
}

/// Tag: the entity is excluded from movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frozen;

impl Component for Frozen {
    const NAME: &'static str = "frozen";
}

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CoreError;

/// A value type that can be attached to an entity.
///
/// `NAME` keys the component in the backing store and in forwarded commands,
/// so it must be unique across every component type sharing a store.
pub trait Component: Clone + Serialize + DeserializeOwned + 'static {
    const NAME: &'static str;

    /// Tag components carry no payload; presence is the whole state.
    const ZERO_SIZED: bool = std::mem::size_of::<Self>() == 0;
}

pub fn encode<T: Component>(value: &T) -> Result<Vec<u8>, CoreError> {
    rmp_serde::to_vec(value).map_err(|e| CoreError::Serialization(format!("{}: {e}", T::NAME)))
}

pub fn decode<T: Component>(bytes: &[u8]) -> Result<T, CoreError> {
    rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(format!("{}: {e}", T::NAME)))
}

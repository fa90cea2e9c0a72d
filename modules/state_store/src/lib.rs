// === ASPECT DEFINITION ===
pub mod aspect;
pub use aspect::{StateProvider, StateStore, STATE_KEY};

// === PUBLIC TYPES ===
pub mod store;
pub use store::{Action, Reducer, StateSlice, StoreHandle};

#[doc(hidden)]
pub mod config;

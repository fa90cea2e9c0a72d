// === FEATURE DEFINITION ===
pub mod feature;
pub use feature::{feature, CartApi, FEATURE_NAME};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod reducer;

// === FEATURE DEFINITION ===
pub mod feature;
pub use feature::{feature, SearchApi, FEATURE_NAME};

// === PUBLIC TYPES ===
pub mod view;
pub use view::{MainPageView, Section};

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod config;

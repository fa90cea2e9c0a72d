mod assembly;
mod launcher;

pub use assembly::{App, Assembly};
pub use launcher::{launch, LaunchOptions, RegisterRootFn};

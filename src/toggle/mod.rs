pub mod engine;

pub use engine::{TargetKind, ToggleEngine, ToggleState};

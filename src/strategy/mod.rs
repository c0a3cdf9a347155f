// Signal generation module
pub mod signals;

pub use signals::SignalGenerator;

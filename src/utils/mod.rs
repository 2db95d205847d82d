pub mod logging;
pub mod timing;

pub use timing::{jittered, sleep_jittered};

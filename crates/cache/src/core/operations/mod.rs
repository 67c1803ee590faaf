//! Cache operations routed through the key mangler and the active driver

mod get;
mod misc;
mod put;
mod remove;

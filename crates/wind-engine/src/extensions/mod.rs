// extensions/mod.rs
//
// Optional helpers shared by the systems but independent of them.

pub mod easing;

pub use easing::{ease, mix, mix_vec2, Easing};

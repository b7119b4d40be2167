pub mod bounds;
pub mod field;
pub mod projection;
pub mod rng;
pub mod time;
pub mod vector;

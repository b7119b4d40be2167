pub mod labels;
pub mod legend;
pub mod particles;
pub mod readout;
pub mod view;

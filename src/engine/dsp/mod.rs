pub mod delay;
pub mod distortion;
pub mod reverb;
pub mod shelf;
pub mod smooth;
pub mod svf;

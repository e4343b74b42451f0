pub mod engine;
pub mod headset;

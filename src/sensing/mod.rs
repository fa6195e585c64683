mod controller;
mod sampler;

pub use controller::SamplerController;
pub use sampler::{sampling_loop, READING_BUFFER};

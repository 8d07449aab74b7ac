pub mod analysis;
pub mod assemble;
pub mod beat;
pub mod decode;
pub mod features;
pub mod framing;
pub mod normalize;
pub mod onset;
pub mod result;
pub mod spectrum;
pub mod waveform;

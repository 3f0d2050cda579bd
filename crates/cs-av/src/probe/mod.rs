//! Probe backends that shell out to CLI tools.

mod ffprobe;

pub use ffprobe::{parse_ffprobe_output, FfprobeProber};

// SPDX-License-Identifier: GPL-3.0-only

//! Audio side of the backend: file decoding and the virtual microphone

mod decoder;
mod devices;
mod virtual_mic;

pub use decoder::decode_file;
pub use devices::{AudioDevice, enumerate_audio_sources, parse_pw_dump};
pub use virtual_mic::VirtualMicrophone;

//! vt-file: Audio File I/O for VoxTune
//!
//! Boundary between the pitch engine and the file system:
//! - WAV decode/encode (via hound), samples as `f64` in [-1, 1]
//! - Output path derivation (`<stem>_pitch_corrected.<ext>`)
//! - JSON diagnostics of original vs corrected contours

mod audio_file;
mod diagnostics;
mod error;

pub use audio_file::*;
pub use diagnostics::*;
pub use error::*;

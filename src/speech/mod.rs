//! External speech collaborators and the audio plumbing between them.
//!
//! Speech synthesis (ElevenLabs) and recognition (Whisper) are opaque remote
//! services reached over HTTP; this module only carries their request and
//! response contracts. `audio` holds the decode/resample/encode glue needed
//! to move bytes between browser uploads, the transcription endpoint, and
//! the animation pipeline.

pub mod audio;
pub mod stt;
pub mod tts;

pub use stt::{Transcription, WhisperStt};
pub use tts::ElevenLabsTts;

//! Synthetic facial animation.
//!
//! When no real Audio2Face pipeline is attached, speech is animated with a
//! deterministic time-to-blendshape mapping: each word drives a viseme
//! target chosen by its first letter, eased in and out over the word's
//! scaled duration, with blink/brow/head motion layered on top.

pub mod frames;
pub mod package;

pub use frames::{AnimationFrame, FaceControls, generate_face_animation};
pub use package::{WebAnimationPackage, build_web_package, build_zip_package};

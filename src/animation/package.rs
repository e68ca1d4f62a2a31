//! Animation packaging: the JSON web package and the CSV/zip archive.

use crate::animation::frames::AnimationFrame;
use crate::error::{AssistantError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use zip::write::SimpleFileOptions;

/// Control names advertised to the web player.
const CONTROL_NAMES: &[&str] = &[
    "mouth_open",
    "jaw_open",
    "lip_pucker",
    "smile",
    "blink",
    "eyebrow_raise",
    "head_nod",
    "head_turn",
];

/// Package metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationMetadata {
    pub text: String,
    pub duration: f32,
    pub total_frames: usize,
    pub fps: u32,
    pub voice_id: String,
    pub generated_by: String,
    pub version: String,
}

/// Embedded audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPayload {
    pub format: String,
    pub base64: String,
    pub duration: f32,
}

/// The animation frames plus the control names they drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSection {
    #[serde(rename = "type")]
    pub kind: String,
    pub frames: Vec<AnimationFrame>,
    pub controls: Vec<String>,
}

/// Playback hints for the web player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackInfo {
    pub recommended_avatar: String,
    pub sync_audio: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
}

/// Web-playable animation package: metadata, audio, frames, playback hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAnimationPackage {
    pub metadata: AnimationMetadata,
    pub audio: AudioPayload,
    pub animation: AnimationSection,
    pub playback_info: PlaybackInfo,
}

/// Assemble the web animation package.
#[must_use]
pub fn build_web_package(
    text: &str,
    voice_id: &str,
    audio_mp3: &[u8],
    duration: f32,
    fps: u32,
    frames: Vec<AnimationFrame>,
) -> WebAnimationPackage {
    WebAnimationPackage {
        metadata: AnimationMetadata {
            text: text.to_owned(),
            duration,
            total_frames: frames.len(),
            fps,
            voice_id: voice_id.to_owned(),
            generated_by: "University Assistant A2F Web".to_owned(),
            version: "1.0".to_owned(),
        },
        audio: AudioPayload {
            format: "mp3".to_owned(),
            base64: BASE64.encode(audio_mp3),
            duration,
        },
        animation: AnimationSection {
            kind: "face_animation".to_owned(),
            frames,
            controls: CONTROL_NAMES.iter().map(|&n| n.to_owned()).collect(),
        },
        playback_info: PlaybackInfo {
            recommended_avatar: "university_assistant".to_owned(),
            sync_audio: true,
            loop_playback: false,
        },
    }
}

/// Emotion track CSV (A2F smoothed-emotion output layout).
fn emotion_csv(frames: &[AnimationFrame]) -> String {
    let mut csv = String::from(
        "frame,time_code,emotion_values.grief,emotion_values.joy,emotion_values.disgust,\
         emotion_values.outofbreath,emotion_values.pain,emotion_values.anger,\
         emotion_values.amazement,emotion_values.cheekiness,emotion_values.sadness,\
         emotion_values.fear\n",
    );
    for frame in frames {
        let c = frame.face_controls;
        let _ = writeln!(
            csv,
            "{},{},0,{},0,0,0,0,{},0,0,0",
            frame.frame, frame.time, c.mouth_smile, c.brow_up
        );
    }
    csv
}

/// Blendshape track CSV.
fn blendshape_csv(frames: &[AnimationFrame]) -> String {
    let mut csv = String::from(
        "frame,timeCode,blendShapes.mouth_open,blendShapes.jaw_open,blendShapes.lip_pucker,\
         blendShapes.mouthSmile,blendShapes.eyeBlink,blendShapes.browUp,blendShapes.headNod,\
         blendShapes.headTurn\n",
    );
    for frame in frames {
        let c = frame.face_controls;
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{}",
            frame.frame,
            frame.time,
            c.mouth_open,
            c.jaw_open,
            c.lip_pucker,
            c.mouth_smile,
            c.eye_blink,
            c.brow_up,
            c.head_nod,
            c.head_turn
        );
    }
    csv
}

/// Build the downloadable animation archive: two CSV tracks plus the
/// playback MP3, zipped in memory.
///
/// # Errors
///
/// Returns an error if zip assembly fails.
pub fn build_zip_package(audio_mp3: &[u8], frames: &[AnimationFrame]) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("a2f_smoothed_emotion_output.csv", options)
            .map_err(|e| AssistantError::Animation(format!("zip entry failed: {e}")))?;
        zip.write_all(emotion_csv(frames).as_bytes())?;

        zip.start_file("animation_frames.csv", options)
            .map_err(|e| AssistantError::Animation(format!("zip entry failed: {e}")))?;
        zip.write_all(blendshape_csv(frames).as_bytes())?;

        zip.start_file("out.mp3", options)
            .map_err(|e| AssistantError::Animation(format!("zip entry failed: {e}")))?;
        zip.write_all(audio_mp3)?;

        zip.finish()
            .map_err(|e| AssistantError::Animation(format!("zip finalize failed: {e}")))?;
    }
    Ok(cursor.into_inner())
}

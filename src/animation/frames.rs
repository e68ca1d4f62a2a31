//! Animation frame generation.

use crate::config::AnimationConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Blendshape values for one frame.
///
/// Field names preserve the wire format consumed by the web player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceControls {
    pub mouth_open: f32,
    pub jaw_open: f32,
    pub lip_pucker: f32,
    #[serde(rename = "mouthSmile")]
    pub mouth_smile: f32,
    #[serde(rename = "eyeBlink")]
    pub eye_blink: f32,
    #[serde(rename = "browUp")]
    pub brow_up: f32,
    #[serde(rename = "headNod")]
    pub head_nod: f32,
    #[serde(rename = "headTurn")]
    pub head_turn: f32,
}

/// One keyframe of the synthetic animation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub frame: u32,
    pub time: f32,
    pub face_controls: FaceControls,
    pub word: String,
    pub phoneme: String,
}

/// Mouth-shape target for a viseme.
#[derive(Debug, Clone, Copy)]
struct VisemeTarget {
    mouth_open: f32,
    jaw_open: f32,
    lip_pucker: f32,
}

const SILENCE: VisemeTarget = VisemeTarget {
    mouth_open: 0.0,
    jaw_open: 0.0,
    lip_pucker: 0.0,
};

/// Viseme target for a word's leading letter.
fn viseme_for(letter: char) -> VisemeTarget {
    let target = |mouth_open, jaw_open, lip_pucker| VisemeTarget {
        mouth_open,
        jaw_open,
        lip_pucker,
    };
    match letter {
        'a' => target(0.8, 0.6, 0.0),
        'e' => target(0.5, 0.3, 0.0),
        'i' => target(0.2, 0.1, 0.0),
        'o' => target(0.6, 0.4, 0.7),
        'u' => target(0.3, 0.2, 0.9),
        'm' | 'p' => target(0.0, 0.0, 0.0),
        'b' => target(0.1, 0.1, 0.0),
        't' => target(0.2, 0.1, 0.0),
        'd' => target(0.3, 0.2, 0.0),
        'k' | 'g' => target(0.4, 0.3, 0.0),
        'f' | 'v' | 's' | 'z' => target(0.1, 0.1, 0.0),
        'l' => target(0.4, 0.2, 0.0),
        'r' => target(0.3, 0.2, 0.4),
        'w' => target(0.2, 0.1, 0.8),
        'h' => target(0.6, 0.4, 0.0),
        _ => SILENCE,
    }
}

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Generate animation keyframes for spoken text.
///
/// Word durations are proportional to word length (0.1 s per character) and
/// rescaled so the words exactly fill `audio_duration`. Each word's viseme
/// target is eased in and out with a cosine curve; small uniform noise keeps
/// the mouth from freezing on long words.
#[must_use]
pub fn generate_face_animation(
    text: &str,
    audio_duration: f32,
    config: &AnimationConfig,
) -> Vec<AnimationFrame> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let fps = config.fps.max(1);
    let total_frames = (audio_duration.max(0.0) * fps as f32) as u32;
    let mut rng = rand::thread_rng();

    let mut durations: Vec<f32> = words.iter().map(|w| w.len() as f32 * 0.1).collect();
    let total_word_time: f32 = durations.iter().sum();
    if total_word_time > 0.0 {
        let scale = audio_duration / total_word_time;
        for duration in &mut durations {
            *duration *= scale;
        }
    }

    let mut starts = Vec::with_capacity(durations.len());
    let mut cursor = 0.0;
    for &duration in &durations {
        starts.push(cursor);
        cursor += duration;
    }

    let noise = config.noise.max(0.0);
    let blink_period = config.blink_period_frames.max(1);

    let mut result = Vec::with_capacity(total_frames as usize);
    for frame in 0..total_frames {
        let time = frame as f32 / fps as f32;

        // Active word: the last one whose start time has passed.
        let word_index = starts.iter().rposition(|&start| time >= start);

        let (word, phoneme, target, easing) = match word_index {
            Some(i) => {
                let word = words[i];
                let first = word
                    .chars()
                    .next()
                    .map(|c| c.to_ascii_lowercase());
                let target = first.map_or(SILENCE, viseme_for);
                let phoneme = first.map_or_else(|| "silence".to_owned(), |c| c.to_string());

                let into_word = time - starts[i];
                let progress = (into_word / durations[i].max(0.01)).min(1.0);
                let easing = 0.5 * (1.0 - (PI * progress * 2.0).cos());
                (word.to_owned(), phoneme, target, easing)
            }
            None => (String::new(), "silence".to_owned(), SILENCE, 0.0),
        };

        let mouth_jitter = rng.gen_range(-noise..=noise);
        let jaw_jitter = rng.gen_range(-noise..=noise);
        let pucker_jitter = rng.gen_range(-noise..=noise);
        let face_controls = FaceControls {
            mouth_open: clamp01(target.mouth_open * easing + mouth_jitter),
            jaw_open: clamp01(target.jaw_open * easing + jaw_jitter),
            lip_pucker: clamp01(target.lip_pucker * easing + pucker_jitter),
            mouth_smile: rng.gen_range(0.0..0.15) * easing,
            eye_blink: if frame % blink_period < config.blink_frames {
                1.0
            } else {
                0.0
            },
            brow_up: rng.gen_range(0.0..0.4) * easing,
            head_nod: 0.03 * (time * 1.5).sin(),
            head_turn: 0.02 * (time * 1.2).sin(),
        };

        result.push(AnimationFrame {
            frame,
            time,
            face_controls,
            word,
            phoneme,
        });
    }

    result
}

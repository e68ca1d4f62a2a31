//! Audio decode/encode utilities.
//!
//! Browser uploads arrive as compressed audio (typically mp3/mp4/wav);
//! the transcription endpoint wants 16 kHz mono WAV. Decoding goes through
//! symphonia, WAV encoding through hound.

use crate::error::{AssistantError, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Sample rate expected by the Whisper transcription endpoint.
pub const STT_SAMPLE_RATE: u32 = 16_000;

/// Decoded mono PCM audio.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmAudio {
    /// Duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode compressed audio bytes to mono f32 PCM.
///
/// # Errors
///
/// Returns an error when the container/codec is unrecognized or no samples
/// could be decoded.
pub fn decode(bytes: &[u8]) -> Result<PcmAudio> {
    let cursor = std::io::Cursor::new(bytes.to_vec());
    let stream = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AssistantError::Audio(format!("unrecognized audio format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssistantError::Audio("no decodable audio track".to_owned()))?;
    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AssistantError::Audio("audio track has no sample rate".to_owned()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AssistantError::Audio(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AssistantError::Audio(format!("demux error: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip corrupt frames instead of failing the whole file.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(AssistantError::Audio(format!("decode error: {e}"))),
        };

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        for frame in buf.samples().chunks(channels) {
            samples.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }

    if samples.is_empty() {
        return Err(AssistantError::Audio("no audio samples decoded".to_owned()));
    }

    Ok(PcmAudio {
        samples,
        sample_rate,
    })
}

/// Linear resampling between sample rates.
#[must_use]
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let out_len = ((samples.len() as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 / ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - pos.floor()) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

/// Encode mono f32 PCM as a 16-bit WAV file in memory.
///
/// # Errors
///
/// Returns an error if WAV writing fails.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AssistantError::Audio(format!("WAV writer init failed: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer
                .write_sample(value)
                .map_err(|e| AssistantError::Audio(format!("WAV write failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| AssistantError::Audio(format!("WAV finalize failed: {e}")))?;
    }
    Ok(cursor.into_inner())
}

/// Decode an upload and convert it to the WAV format a target expects.
///
/// # Errors
///
/// Returns an error when the audio cannot be decoded.
pub fn convert_to_wav(bytes: &[u8], target_rate: u32) -> Result<Vec<u8>> {
    let pcm = decode(bytes)?;
    let resampled = resample_linear(&pcm.samples, pcm.sample_rate, target_rate);
    encode_wav_pcm16(&resampled, target_rate)
}

/// Duration of compressed audio, in seconds.
///
/// # Errors
///
/// Returns an error when the audio cannot be decoded.
pub fn duration_secs(bytes: &[u8]) -> Result<f32> {
    Ok(decode(bytes)?.duration_secs())
}

/// Rough speech duration estimate when the audio cannot be decoded.
#[must_use]
pub fn estimate_speech_duration(text: &str) -> f32 {
    // ~0.08 seconds per character.
    text.len() as f32 * 0.08
}

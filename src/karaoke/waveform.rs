use std::{fs::File, path::Path};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::common::errors::{Analysis, AnalysisError};

/// Decode an audio file to mono f32 at `target_rate`.
pub fn load_waveform(path: &Path, target_rate: u32) -> Analysis<Vec<f32>> {
    let file = File::open(path)
        .map_err(|e| AnalysisError::Unavailable(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::Failed(format!("unsupported audio: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Failed("no decodable audio track".into()))?;
    let track_id = track.id;
    let mut source_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Failed(format!("no decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) | Err(Error::ResetRequired) => break,
            Err(e) => return Err(AnalysisError::Failed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                source_rate = spec.rate;
                let channels = spec.channels.count().max(1);

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);

                if channels == 1 {
                    samples.extend_from_slice(buf.samples());
                } else {
                    samples.extend(
                        buf.samples()
                            .chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                }
            }
            Err(Error::IoError(_)) => break,
            Err(Error::DecodeError(_)) => {}
            Err(e) => return Err(AnalysisError::Failed(e.to_string())),
        }
    }

    if samples.is_empty() || source_rate == 0 {
        return Err(AnalysisError::Unavailable(format!(
            "{} contains no audio",
            path.display()
        )));
    }

    Ok(resample_linear(&samples, source_rate, target_rate))
}

/// Mono linear-interpolation resampler.
pub fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || input.is_empty() || target_rate == 0 {
        return input.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let fract = (pos - idx as f64) as f32;
            let s1 = input[idx.min(last)];
            let s2 = input[(idx + 1).min(last)];
            s1 * (1.0 - fract) + s2 * fract
        })
        .collect()
}

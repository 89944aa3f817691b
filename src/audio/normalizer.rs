use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::audio_downloader::CancelFlag;
use crate::domain::{AppError, OutputFormat};
use crate::utils::is_placeholder;

/// Magic at offset 0 of a RIFF/WAVE file.
pub const WAV_MAGIC: &[u8; 4] = b"RIFF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub path: PathBuf,
    pub transcoded: bool,
}

/// Classify a file by its first four bytes.
pub fn classify(path: &Path) -> Result<Container, AppError> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == WAV_MAGIC => Ok(Container::Wav),
        Ok(()) => Ok(Container::Other),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(Container::Other),
        Err(e) => Err(e.into()),
    }
}

pub fn needs_transcode(container: Container, requested: OutputFormat) -> bool {
    requested == OutputFormat::Wav && container != Container::Wav
}

/// Bring `source` to `destination` in the requested format.
///
/// Only a WAV request on a non-WAV file transcodes; everything else is a
/// plain move. `destination` must be absent or an empty placeholder; any
/// other file there is left alone. On failure `source` is left untouched
/// and `destination` is back to how it was found.
pub fn normalize(
    source: &Path,
    destination: &Path,
    requested: OutputFormat,
    extension_hint: Option<&str>,
    cancel: &CancelFlag,
) -> Result<Normalized, AppError> {
    ensure_replaceable(destination)?;
    let container = classify(source)?;

    if !needs_transcode(container, requested) {
        move_file(source, destination)?;
        return Ok(Normalized {
            path: destination.to_path_buf(),
            transcoded: false,
        });
    }

    let reserved = destination.exists();
    if let Err(e) = transcode_to_wav(source, destination, extension_hint, cancel) {
        if reserved {
            let _ = File::create(destination);
        } else {
            let _ = std::fs::remove_file(destination);
        }
        return Err(e);
    }

    std::fs::remove_file(source)?;
    Ok(Normalized {
        path: destination.to_path_buf(),
        transcoded: true,
    })
}

fn ensure_replaceable(destination: &Path) -> Result<(), AppError> {
    if is_placeholder(destination) {
        Ok(())
    } else {
        Err(AppError::DestinationTaken(destination.display().to_string()))
    }
}

/// Rename, falling back to copy + delete across filesystems. Only replaces
/// an empty placeholder.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), AppError> {
    ensure_replaceable(destination)?;
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    std::fs::copy(source, destination)?;
    std::fs::remove_file(source)?;
    Ok(())
}

fn decode_error(err: impl std::fmt::Display) -> AppError {
    AppError::DecodeUnsupported(err.to_string())
}

fn encode_error(err: hound::Error) -> AppError {
    AppError::EncodeFailed(err.to_string())
}

/// Decode any container symphonia knows and write 16-bit PCM WAV at the
/// source's sample rate and channel count. `cancel` is checked once per packet.
pub fn transcode_to_wav(
    source: &Path,
    destination: &Path,
    extension_hint: Option<&str>,
    cancel: &CancelFlag,
) -> Result<(), AppError> {
    let file = File::open(source)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext.trim_start_matches('.'));
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error("no audio track found"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut writer: Option<hound::WavWriter<_>> = None;
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        if writer.is_none() {
            let wav_spec = hound::WavSpec {
                channels: channels as u16,
                sample_rate: spec.rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            writer = Some(hound::WavWriter::create(destination, wav_spec).map_err(encode_error)?);
        }

        let frames = decoded.capacity();
        if sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < frames * channels)
        {
            sample_buf = Some(SampleBuffer::new(frames as u64, spec));
        }

        if let (Some(buf), Some(out)) = (sample_buf.as_mut(), writer.as_mut()) {
            buf.copy_interleaved_ref(decoded);
            for &sample in buf.samples() {
                out.write_sample(sample).map_err(encode_error)?;
            }
        }
    }

    match writer {
        // Finalizing rewrites the header sizes; the file is complete only after this.
        Some(writer) => writer.finalize().map_err(encode_error),
        None => Err(decode_error("no decodable audio")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::uniquify;

    /// Short silent MPEG-1 Layer III stream, mono 44.1 kHz.
    pub(crate) const SILENT_MP3: &[u8] = include_bytes!("testdata/silence.mp3");

    fn write_wav(path: &Path, bits: u16, frames: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let value = ((i % 64) as i32 - 32) * 256;
            writer.write_sample(value).unwrap();
            writer.write_sample(-value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_classify() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("a.wav");
        write_wav(&wav, 16, 10);
        let mp3 = dir.path().join("a.mp3");
        std::fs::write(&mp3, b"ID3\x04\x00rest").unwrap();
        let tiny = dir.path().join("tiny");
        std::fs::write(&tiny, b"RI").unwrap();

        assert_eq!(classify(&wav).unwrap(), Container::Wav);
        assert_eq!(classify(&mp3).unwrap(), Container::Other);
        assert_eq!(classify(&tiny).unwrap(), Container::Other);
    }

    #[test]
    fn test_wav_source_is_moved_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".job.part");
        write_wav(&staging, 16, 500);
        let original = std::fs::read(&staging).unwrap();
        let dest = dir.path().join("My Beat.wav");

        let result =
            normalize(&staging, &dest, OutputFormat::Wav, Some(".mp3"), &CancelFlag::default())
                .unwrap();

        assert!(!result.transcoded);
        assert_eq!(std::fs::read(&dest).unwrap(), original);
        assert!(!staging.exists());
    }

    #[test]
    fn test_auto_never_transcodes() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".job.part");
        std::fs::write(&staging, b"\x89PNG\r\n\x1a\n...").unwrap();
        let dest = dir.path().join("cover-art.png");

        let result =
            normalize(&staging, &dest, OutputFormat::Auto, Some(".png"), &CancelFlag::default())
                .unwrap();

        assert!(!result.transcoded);
        assert_eq!(std::fs::read(&dest).unwrap(), b"\x89PNG\r\n\x1a\n...");
    }

    #[test]
    fn test_undecodable_source_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".job.part");
        std::fs::write(&staging, vec![0x5au8; 4096]).unwrap();
        let dest = dir.path().join("broken.wav");

        let err = normalize(&staging, &dest, OutputFormat::Wav, Some(".mp3"), &CancelFlag::default())
            .unwrap_err();

        assert!(matches!(err, AppError::DecodeUnsupported(_)));
        assert!(staging.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_transcode_writes_16_bit_pcm() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("deep.wav");
        write_wav(&source, 24, 1_000);
        let dest = dir.path().join("out.wav");

        transcode_to_wav(&source, &dest, Some("wav"), &CancelFlag::default()).unwrap();

        let reader = hound::WavReader::open(&dest).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(reader.duration(), 1_000);
    }

    #[test]
    fn test_mp3_is_transcoded_into_reserved_name() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".1-0.part");
        std::fs::write(&staging, SILENT_MP3).unwrap();
        let dest = uniquify(dir.path(), "My Beat", ".wav").unwrap();

        let result =
            normalize(&staging, &dest, OutputFormat::Wav, Some(".mp3"), &CancelFlag::default())
                .unwrap();

        assert!(result.transcoded);
        assert!(!staging.exists());
        assert_eq!(&std::fs::read(&dest).unwrap()[..4], WAV_MAGIC);
        let reader = hound::WavReader::open(&dest).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert!(reader.duration() > 0);
    }

    #[test]
    fn test_existing_file_is_never_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("My Beat.wav");
        std::fs::write(&dest, b"USER FILE").unwrap();

        let staging = dir.path().join(".1-0.part");
        write_wav(&staging, 16, 50);
        let err = normalize(&staging, &dest, OutputFormat::Wav, None, &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(err, AppError::DestinationTaken(_)));

        std::fs::write(&staging, SILENT_MP3).unwrap();
        let err = normalize(&staging, &dest, OutputFormat::Wav, Some(".mp3"), &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(err, AppError::DestinationTaken(_)));

        assert!(matches!(move_file(&staging, &dest), Err(AppError::DestinationTaken(_))));
        assert_eq!(std::fs::read(&dest).unwrap(), b"USER FILE");
        assert!(staging.exists());
    }

    #[test]
    fn test_cancelled_transcode_stops_and_keeps_reservation() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".1-0.part");
        std::fs::write(&staging, SILENT_MP3).unwrap();
        let dest = uniquify(dir.path(), "My Beat", ".wav").unwrap();
        let cancel = CancelFlag::default();
        cancel.cancel();

        let err = normalize(&staging, &dest, OutputFormat::Wav, Some(".mp3"), &cancel).unwrap_err();

        assert_eq!(err, AppError::Cancelled);
        assert_eq!(std::fs::read(&staging).unwrap(), SILENT_MP3);
        assert!(is_placeholder(&dest));
        assert!(dest.exists());

        let loose = dir.path().join("loose.wav");
        let err = transcode_to_wav(&staging, &loose, Some("mp3"), &cancel).unwrap_err();
        assert_eq!(err, AppError::Cancelled);
        assert!(!loose.exists());
    }
}

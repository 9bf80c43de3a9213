use async_trait::async_trait;
use byteorder::{ LittleEndian, ReadBytesExt };
use log::debug;
use std::error::Error;
use std::fmt;
use std::io::{ Cursor, Read, Seek, SeekFrom };
use std::path::Path;

/// Capture slice interval. Each chunk sent over the transcription socket
/// covers this much audio.
pub const CHUNK_INTERVAL_MS: u64 = 250;

/// Fixed capture constraints requested for every recording. There is no
/// fallback negotiation: a source that cannot satisfy them fails capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

impl CaptureConstraints {
    /// Bytes of 16-bit PCM covering one capture slice.
    pub fn chunk_size(&self) -> usize {
        let bytes_per_second = (self.sample_rate as usize) * (self.channels as usize) * 2;
        (bytes_per_second * (CHUNK_INTERVAL_MS as usize)) / 1000
    }
}

#[derive(Debug)]
pub enum CaptureError {
    Io(std::io::Error),
    UnsupportedFormat(String),
    ConstraintMismatch {
        expected: CaptureConstraints,
        sample_rate: u32,
        channels: u16,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Io(e) => write!(f, "Audio source unavailable: {}", e),
            CaptureError::UnsupportedFormat(detail) => {
                write!(f, "Unsupported audio format: {}", detail)
            }
            CaptureError::ConstraintMismatch { expected, sample_rate, channels } => {
                write!(
                    f,
                    "Audio does not match capture constraints (want {} Hz / {} ch, got {} Hz / {} ch)",
                    expected.sample_rate,
                    expected.channels,
                    sample_rate,
                    channels
                )
            }
        }
    }
}

impl Error for CaptureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CaptureError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err)
    }
}

/// A recording in progress. `next_chunk` yields successive capture slices and
/// flushes the trailing partial slice before returning `None`.
#[async_trait]
pub trait AudioSource: Send {
    fn constraints(&self) -> CaptureConstraints;

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;
}

/// In-memory PCM source. Backs both tests and WAV playback.
pub struct MemorySource {
    pcm: Vec<u8>,
    offset: usize,
    constraints: CaptureConstraints,
}

impl MemorySource {
    pub fn new(pcm: Vec<u8>, constraints: CaptureConstraints) -> Self {
        Self {
            pcm,
            offset: 0,
            constraints,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pcm.len() - self.offset
    }
}

#[async_trait]
impl AudioSource for MemorySource {
    fn constraints(&self) -> CaptureConstraints {
        self.constraints
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        if self.offset >= self.pcm.len() {
            return Ok(None);
        }
        let end = (self.offset + self.constraints.chunk_size()).min(self.pcm.len());
        let chunk = self.pcm[self.offset..end].to_vec();
        self.offset = end;
        debug!("Captured audio chunk: {} bytes", chunk.len());
        Ok(Some(chunk))
    }
}

/// Opens a 16-bit PCM WAV file as an audio source, enforcing the capture
/// constraints against the file's fmt header.
pub async fn wav_source(
    path: &Path,
    constraints: CaptureConstraints
) -> Result<MemorySource, CaptureError> {
    let bytes = tokio::fs::read(path).await?;
    let pcm = parse_wav_pcm(&bytes, constraints)?;
    Ok(MemorySource::new(pcm, constraints))
}

/// Minimal RIFF/WAVE reader: walks the chunk list, checks the fmt chunk
/// against the constraints and returns the raw data payload.
fn parse_wav_pcm(bytes: &[u8], constraints: CaptureConstraints) -> Result<Vec<u8>, CaptureError> {
    let mut cursor = Cursor::new(bytes);

    let mut riff = [0u8; 4];
    cursor.read_exact(&mut riff)?;
    if &riff != b"RIFF" {
        return Err(CaptureError::UnsupportedFormat("missing RIFF header".to_string()));
    }
    cursor.seek(SeekFrom::Current(4))?;
    let mut wave = [0u8; 4];
    cursor.read_exact(&mut wave)?;
    if &wave != b"WAVE" {
        return Err(CaptureError::UnsupportedFormat("not a WAVE file".to_string()));
    }

    let mut data: Option<Vec<u8>> = None;
    let mut format_seen = false;

    loop {
        let mut chunk_id = [0u8; 4];
        match cursor.read_exact(&mut chunk_id) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(CaptureError::Io(e));
            }
        }
        let chunk_len = cursor.read_u32::<LittleEndian>()? as usize;

        match &chunk_id {
            b"fmt " => {
                let audio_format = cursor.read_u16::<LittleEndian>()?;
                if audio_format != 1 {
                    return Err(
                        CaptureError::UnsupportedFormat(
                            format!("audio format {} is not PCM", audio_format)
                        )
                    );
                }
                let channels = cursor.read_u16::<LittleEndian>()?;
                let sample_rate = cursor.read_u32::<LittleEndian>()?;
                cursor.seek(SeekFrom::Current(6))?; // byte rate + block align
                let bits_per_sample = cursor.read_u16::<LittleEndian>()?;
                if bits_per_sample != 16 {
                    return Err(
                        CaptureError::UnsupportedFormat(
                            format!("{}-bit samples, expected 16-bit", bits_per_sample)
                        )
                    );
                }
                if sample_rate != constraints.sample_rate || channels != constraints.channels {
                    return Err(CaptureError::ConstraintMismatch {
                        expected: constraints,
                        sample_rate,
                        channels,
                    });
                }
                format_seen = true;
                // skip any fmt extension bytes
                if chunk_len > 16 {
                    cursor.seek(SeekFrom::Current((chunk_len - 16) as i64))?;
                }
            }
            b"data" => {
                let mut payload = vec![0u8; chunk_len];
                cursor.read_exact(&mut payload)?;
                data = Some(payload);
            }
            _ => {
                cursor.seek(SeekFrom::Current(chunk_len as i64))?;
            }
        }

        // chunks are word-aligned
        if chunk_len % 2 == 1 {
            cursor.seek(SeekFrom::Current(1))?;
        }
    }

    if !format_seen {
        return Err(CaptureError::UnsupportedFormat("missing fmt chunk".to_string()));
    }
    let pcm = data.ok_or_else(|| {
        CaptureError::UnsupportedFormat("missing data chunk".to_string())
    })?;
    if pcm.len() % 2 != 0 {
        return Err(
            CaptureError::UnsupportedFormat("PCM payload has an odd byte length".to_string())
        );
    }
    Ok(pcm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(sample_rate: u32, channels: u16, bits: u16, pcm: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let byte_rate = sample_rate * (channels as u32) * ((bits as u32) / 8);
        let block_align = channels * (bits / 8);

        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + pcm.len()) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(pcm.len() as u32).to_le_bytes());
        out.extend_from_slice(pcm);
        out
    }

    #[test]
    fn default_constraints_give_8000_byte_chunks() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.chunk_size(), 8000);
    }

    #[tokio::test]
    async fn memory_source_slices_and_flushes_trailing_partial() {
        let constraints = CaptureConstraints::default();
        let mut source = MemorySource::new(vec![0u8; 20_000], constraints);

        let first = source.next_chunk().await.unwrap().unwrap();
        let second = source.next_chunk().await.unwrap().unwrap();
        let tail = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.len(), 8000);
        assert_eq!(second.len(), 8000);
        assert_eq!(tail.len(), 4000);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wav_source_reads_matching_file() {
        let constraints = CaptureConstraints::default();
        let pcm = vec![7u8; 16_000];
        let wav = make_wav(16_000, 1, 16, &pcm);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.wav");
        std::fs::write(&path, wav).unwrap();

        let mut source = wav_source(&path, constraints).await.unwrap();
        assert_eq!(source.remaining(), 16_000);
        let chunk = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.len(), 8000);
        assert!(chunk.iter().all(|b| *b == 7));
    }

    #[test]
    fn wav_parser_rejects_wrong_sample_rate() {
        let constraints = CaptureConstraints::default();
        let wav = make_wav(44_100, 1, 16, &[0u8; 64]);
        match parse_wav_pcm(&wav, constraints) {
            Err(CaptureError::ConstraintMismatch { sample_rate, channels, .. }) => {
                assert_eq!(sample_rate, 44_100);
                assert_eq!(channels, 1);
            }
            other => panic!("expected constraint mismatch, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn wav_parser_rejects_non_pcm_and_non_wave_input() {
        let constraints = CaptureConstraints::default();

        let mut compressed = make_wav(16_000, 1, 16, &[0u8; 8]);
        // flip the audio-format field to something non-PCM
        compressed[20] = 6;
        assert!(matches!(
            parse_wav_pcm(&compressed, constraints),
            Err(CaptureError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            parse_wav_pcm(b"OggS not a wave", constraints),
            Err(CaptureError::UnsupportedFormat(_))
        ));
    }
}

use crate::audio::{ AudioSource, CaptureError, CHUNK_INTERVAL_MS };
use futures::{ SinkExt, StreamExt };
use futures::stream::SplitSink;
use log::{ debug, error, info, warn };
use serde::{ Serialize, Deserialize };
use std::error::Error;
use std::fmt;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{ interval, Duration };
use tokio_tungstenite::{ connect_async, MaybeTlsStream, WebSocketStream };
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

/// Control frame the client sends after the final audio chunk.
#[derive(Serialize, Debug)]
#[serde(tag = "event")]
pub enum ControlFrame {
    #[serde(rename = "end")]
    End,
}

/// One line of the transcription server's line-delimited JSON output.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "status")]
pub enum TranscriptFrame {
    #[serde(rename = "success")] Success {
        transcript: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Sent,
    Dropped,
}

#[derive(Debug)]
pub enum StreamError {
    InvalidEndpoint(url::ParseError),
    Handshake(tokio_tungstenite::tungstenite::Error),
    Transcription(String),
    Capture(CaptureError),
    ClosedBeforeTranscript,
    Json(serde_json::Error),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::InvalidEndpoint(e) => write!(f, "Invalid streaming endpoint: {}", e),
            StreamError::Handshake(e) => write!(f, "Could not open transcription socket: {}", e),
            StreamError::Transcription(message) => {
                write!(f, "Transcription failed: {}", message)
            }
            StreamError::Capture(e) => write!(f, "Audio capture failed: {}", e),
            StreamError::ClosedBeforeTranscript => {
                write!(f, "Transcription socket closed before a transcript arrived")
            }
            StreamError::Json(e) => write!(f, "Control frame serialization error: {}", e),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamError::InvalidEndpoint(e) => Some(e),
            StreamError::Handshake(e) => Some(e),
            StreamError::Capture(e) => Some(e),
            StreamError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<url::ParseError> for StreamError {
    fn from(err: url::ParseError) -> Self {
        StreamError::InvalidEndpoint(err)
    }
}

impl From<CaptureError> for StreamError {
    fn from(err: CaptureError) -> Self {
        StreamError::Capture(err)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Json(err)
    }
}

/// Live connection to the `/ws/audio` transcription relay.
///
/// Binary chunks go out while the socket is open; chunks produced after it
/// closed are dropped silently and only counted, there is no buffering. The
/// server's responses are read by a background task and handed over line by
/// line.
pub struct TranscriptionSocket {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    events: mpsc::Receiver<TranscriptFrame>,
    open: Arc<AtomicBool>,
    dropped_chunks: u64,
    _reader: JoinHandle<()>,
}

impl TranscriptionSocket {
    /// Opens the socket. A failed handshake aborts the whole capture; there
    /// is no retry.
    pub async fn connect(endpoint: &str) -> Result<Self, StreamError> {
        let url = Url::parse(endpoint)?;
        let (ws, _response) = connect_async(url).await.map_err(StreamError::Handshake)?;
        info!("Transcription socket connected: {}", endpoint);

        let (sink, mut stream) = ws.split();
        let open = Arc::new(AtomicBool::new(true));
        let reader_open = open.clone();
        let (tx, rx) = mpsc::channel(32);

        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        for line in text.lines() {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<TranscriptFrame>(line) {
                                Ok(frame) => {
                                    if tx.send(frame).await.is_err() {
                                        reader_open.store(false, Ordering::SeqCst);
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!("Skipping malformed transcription line: {}", e);
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Transcription socket closed by server");
                        break;
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                    Ok(other) => {
                        debug!("Ignoring unexpected frame from transcription server ({} bytes)", other.len());
                    }
                    Err(e) => {
                        match e {
                            | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                            | tokio_tungstenite::tungstenite::Error::Protocol(_)
                            | tokio_tungstenite::tungstenite::Error::Utf8 => {
                                info!("Transcription socket closed: {}", e);
                            }
                            tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                                io_err.kind() == std::io::ErrorKind::ConnectionReset
                            => {
                                info!("Transcription socket reset by server");
                            }
                            _ => {
                                error!("Transcription socket receive error: {}", e);
                            }
                        }
                        break;
                    }
                }
            }
            reader_open.store(false, Ordering::SeqCst);
        });

        Ok(Self {
            sink,
            events: rx,
            open,
            dropped_chunks: 0,
            _reader: reader,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Chunks produced while the socket was not open.
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks
    }

    /// Sends one audio chunk as a binary frame iff the socket is open. A
    /// chunk that cannot go out is dropped, never an error.
    pub async fn send_chunk(&mut self, chunk: &[u8]) -> ChunkOutcome {
        if !self.is_open() {
            self.dropped_chunks += 1;
            debug!("Dropping {}-byte audio chunk: socket not open", chunk.len());
            return ChunkOutcome::Dropped;
        }
        match self.sink.send(Message::Binary(chunk.to_vec())).await {
            Ok(()) => ChunkOutcome::Sent,
            Err(e) => {
                warn!("Audio chunk send failed, treating socket as closed: {}", e);
                self.open.store(false, Ordering::SeqCst);
                self.dropped_chunks += 1;
                ChunkOutcome::Dropped
            }
        }
    }

    /// Ends the stream: sends the `{"event":"end"}` control frame (once, and
    /// only while the socket is still open), then waits for the finalized
    /// transcript. A backend error line becomes `StreamError::Transcription`
    /// and the recording stays terminal, nothing retries.
    pub async fn finish(mut self) -> Result<String, StreamError> {
        if self.is_open() {
            let end = serde_json::to_string(&ControlFrame::End)?;
            if let Err(e) = self.sink.send(Message::Text(end)).await {
                warn!("Could not deliver end-of-stream frame: {}", e);
                self.open.store(false, Ordering::SeqCst);
            } else {
                info!("End-of-stream control frame sent");
            }
        }

        while let Some(frame) = self.events.recv().await {
            match frame {
                TranscriptFrame::Success { transcript } => {
                    let _ = self.sink.send(Message::Close(None)).await;
                    info!("Transcript finalized ({} chars)", transcript.len());
                    return Ok(transcript);
                }
                TranscriptFrame::Error { message } => {
                    let _ = self.sink.send(Message::Close(None)).await;
                    return Err(StreamError::Transcription(message));
                }
                TranscriptFrame::Processing => {
                    debug!("Transcription in progress");
                }
            }
        }
        Err(StreamError::ClosedBeforeTranscript)
    }
}

/// Drives a whole recording: paces the source at the capture interval, ships
/// each chunk, then completes the end-of-stream handshake and returns the
/// finalized transcript.
pub async fn stream_source_to_transcript<S: AudioSource>(
    endpoint: &str,
    mut source: S
) -> Result<String, StreamError> {
    let mut socket = TranscriptionSocket::connect(endpoint).await?;
    let mut ticker = interval(Duration::from_millis(CHUNK_INTERVAL_MS));

    loop {
        ticker.tick().await;
        match source.next_chunk().await? {
            Some(chunk) => {
                socket.send_chunk(&chunk).await;
            }
            None => {
                break;
            }
        }
    }

    if socket.dropped_chunks() > 0 {
        warn!("{} audio chunks were dropped while the socket was not open", socket.dropped_chunks());
    }
    socket.finish().await
}

//! TCP socket transport.
//!
//! Carries Thrift messages over a plain TCP connection, either behind a SASL
//! PLAIN handshake with length-framed messages, or raw (NOSASL) where the
//! message boundary is found by decoding the envelope.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::TransportError;

use super::protocol::{AuthMode, TransportProtocol};
use super::thrift::MessageScanner;

const SASL_START: u8 = 1;
const SASL_OK: u8 = 2;
const SASL_BAD: u8 = 3;
const SASL_ERROR: u8 = 4;
const SASL_COMPLETE: u8 = 5;

const ANONYMOUS: &str = "anonymous";

/// Upper bound on a single framed message.
const MAX_FRAME_LEN: usize = 1 << 30;

/// Connection parameters for the socket transport.
#[derive(Debug, Clone)]
pub struct SocketParams {
    pub host: String,
    pub port: u16,
    pub auth: AuthMode,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Connection state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Open,
    Closed,
}

/// Socket transport implementation.
pub struct SocketTransport {
    params: SocketParams,
    stream: Option<TcpStream>,
    read_buf: BytesMut,
    state: ConnectionState,
}

impl SocketTransport {
    pub fn new(params: SocketParams) -> Self {
        Self {
            params,
            stream: None,
            read_buf: BytesMut::new(),
            state: ConnectionState::Disconnected,
        }
    }
}

#[async_trait]
impl TransportProtocol for SocketTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Open => {
                return Err(TransportError::ProtocolError("Already open".to_string()))
            }
            ConnectionState::Closed => return Err(TransportError::Closed),
            ConnectionState::Disconnected => {}
        }

        let address = format!("{}:{}", self.params.host, self.params.port);
        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|e| TransportError::IoError(format!("connect to {}: {}", address, e)))?;
        stream.set_nodelay(true)?;

        if self.params.auth == AuthMode::Plain {
            let username = non_empty_or_anonymous(self.params.username.as_deref());
            let password = non_empty_or_anonymous(self.params.password.as_deref());
            sasl_plain_handshake(&mut stream, username, password).await?;
        }
        debug!(address = %address, auth = ?self.params.auth, "socket transport open");

        self.stream = Some(stream);
        self.state = ConnectionState::Open;
        Ok(())
    }

    async fn round_trip(&mut self, request: Bytes) -> Result<Bytes, TransportError> {
        let stream = match self.state {
            ConnectionState::Disconnected => return Err(TransportError::NotOpen),
            ConnectionState::Closed => return Err(TransportError::Closed),
            ConnectionState::Open => self.stream.as_mut().ok_or(TransportError::NotOpen)?,
        };
        match self.params.auth {
            AuthMode::Plain => {
                write_frame(stream, &request).await?;
                read_frame(stream).await
            }
            AuthMode::NoSasl => {
                stream.write_all(&request).await?;
                stream.flush().await?;
                read_unframed(stream, &mut self.read_buf).await
            }
        }
    }

    fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state = ConnectionState::Closed;
        self.read_buf.clear();
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

fn non_empty_or_anonymous(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => ANONYMOUS,
    }
}

/// Run the client side of a SASL PLAIN negotiation.
pub(crate) async fn sasl_plain_handshake<S>(
    stream: &mut S,
    username: &str,
    password: &str,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_sasl_frame(stream, SASL_START, b"PLAIN").await?;

    let mut response = Vec::with_capacity(username.len() + password.len() + 2);
    response.push(0);
    response.extend_from_slice(username.as_bytes());
    response.push(0);
    response.extend_from_slice(password.as_bytes());
    write_sasl_frame(stream, SASL_OK, &response).await?;

    loop {
        let (status, payload) = read_sasl_frame(stream).await?;
        match status {
            SASL_COMPLETE => return Ok(()),
            // an empty challenge may precede COMPLETE
            SASL_OK => continue,
            SASL_BAD | SASL_ERROR => {
                return Err(TransportError::SaslError(
                    String::from_utf8_lossy(&payload).into_owned(),
                ))
            }
            other => {
                return Err(TransportError::SaslError(format!(
                    "unexpected negotiation status {}",
                    other
                )))
            }
        }
    }
}

async fn write_sasl_frame<W>(w: &mut W, status: u8, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(5 + payload.len());
    frame.push(status);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    w.write_all(&frame).await?;
    w.flush().await?;
    Ok(())
}

async fn read_sasl_frame<R>(r: &mut R) -> Result<(u8, Vec<u8>), TransportError>
where
    R: AsyncRead + Unpin,
{
    let status = r.read_u8().await?;
    let len = checked_len(r.read_u32().await?)?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await?;
    Ok((status, payload))
}

async fn write_frame<W>(w: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    w.write_all(payload).await?;
    w.flush().await?;
    Ok(())
}

async fn read_frame<R>(r: &mut R) -> Result<Bytes, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = checked_len(r.read_u32().await?)?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

/// Read until `buf` holds one complete message, then split it off.
async fn read_unframed<R>(r: &mut R, buf: &mut BytesMut) -> Result<Bytes, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = MessageScanner::default();
    loop {
        if let Some(len) = scanner.scan(buf)? {
            let message = buf.split_to(len).freeze();
            return Ok(message);
        }
        if buf.len() > MAX_FRAME_LEN {
            return Err(TransportError::ProtocolError(
                "reply exceeds maximum message size".to_string(),
            ));
        }
        let read = r.read_buf(buf).await?;
        if read == 0 {
            return Err(TransportError::IoError(
                "connection closed mid-message".to_string(),
            ));
        }
    }
}

fn checked_len(len: u32) -> Result<usize, TransportError> {
    let len = len as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::ProtocolError(format!(
            "frame length {} exceeds maximum",
            len
        )));
    }
    Ok(len)
}

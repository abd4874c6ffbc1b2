//! Network time over SNTP (RFC 4330) with a local-clock fallback.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::application::ports::TimeSourcePort;

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01.
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Request/response packet size.
const PACKET_LEN: usize = 48;

/// LI = 0, VN = 3, Mode = 3 (client).
const CLIENT_HEADER: u8 = 0x1B;

/// Local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl TimeSourcePort for SystemClock {
    async fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// SNTP client settings.
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// `host:port` of the time server.
    pub server: String,
    /// Round-trip budget.
    pub timeout: Duration,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            server: "pool.ntp.org:123".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
enum SntpError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out")]
    Timeout,
    #[error("short reply ({0} bytes)")]
    ShortReply(usize),
    #[error("server sent an unsynchronized or invalid timestamp")]
    InvalidTimestamp,
}

/// Network clock; never fails, falls back to `Utc::now()` with a warning.
#[derive(Debug, Clone, Default)]
pub struct SntpClock {
    config: SntpConfig,
}

impl SntpClock {
    /// Create a clock for the given server.
    #[must_use]
    pub const fn new(config: SntpConfig) -> Self {
        Self { config }
    }

    async fn query(&self) -> Result<DateTime<Utc>, SntpError> {
        let exchange = async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(&self.config.server).await?;

            let mut request = [0u8; PACKET_LEN];
            request[0] = CLIENT_HEADER;
            socket.send(&request).await?;

            let mut reply = [0u8; PACKET_LEN];
            let len = socket.recv(&mut reply).await?;
            Ok::<_, SntpError>((reply, len))
        };

        let (reply, len) = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| SntpError::Timeout)??;
        if len < PACKET_LEN {
            return Err(SntpError::ShortReply(len));
        }
        decode_transmit_timestamp(&reply)
    }
}

/// Read the server's transmit timestamp (bytes 40..48).
fn decode_transmit_timestamp(reply: &[u8; PACKET_LEN]) -> Result<DateTime<Utc>, SntpError> {
    let seconds = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]);
    let fraction = u32::from_be_bytes([reply[44], reply[45], reply[46], reply[47]]);
    if seconds == 0 {
        return Err(SntpError::InvalidTimestamp);
    }
    let unix_secs = i64::from(seconds) - NTP_UNIX_OFFSET;
    let nanos = ((u64::from(fraction) * 1_000_000_000) >> 32) as u32;
    DateTime::from_timestamp(unix_secs, nanos).ok_or(SntpError::InvalidTimestamp)
}

#[async_trait]
impl TimeSourcePort for SntpClock {
    async fn now(&self) -> DateTime<Utc> {
        match self.query().await {
            Ok(now) => now,
            Err(e) => {
                tracing::warn!(
                    server = %self.config.server,
                    error = %e,
                    "Network time unavailable, using local clock"
                );
                Utc::now()
            }
        }
    }
}

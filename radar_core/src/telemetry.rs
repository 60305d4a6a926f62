//! Line-oriented telemetry push to the single consumer.
//!
//! Every sample becomes one `"<angle>,<distance_cm:.2>\n"` line. There is no
//! handshake or acknowledgement; a failed write ends the session.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::duration_ms;
use crate::error::{RadarError, Result};
use crate::gate::ConnectionSession;
use crate::sample::Sample;

/// Owns the accepted session and serializes samples onto it.
#[derive(Debug)]
pub struct TelemetryLink {
    session: ConnectionSession,
    write_timeout: Duration,
    buf: String,
    sent: u64,
}

impl TelemetryLink {
    pub fn new(session: ConnectionSession, write_timeout: Duration) -> Result<Self> {
        session
            .stream()
            .set_write_timeout(Some(write_timeout))
            .map_err(|e| eyre::Report::new(RadarError::Io(e.to_string())))?;
        Ok(Self {
            session,
            write_timeout,
            buf: String::with_capacity(16),
            sent: 0,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.session.peer_addr()
    }

    /// Lines written so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Write one sample fully, or fail with `PeerDisconnected` / `WriteTimeout`.
    pub fn send(&mut self, sample: &Sample) -> Result<()> {
        self.buf.clear();
        sample.encode_into(&mut self.buf);
        trace!(line = self.buf.trim_end(), "telemetry out");

        let stream = self.session.stream_mut();
        if let Err(e) = stream.write_all(self.buf.as_bytes()) {
            let err = classify_write_error(&e, self.write_timeout);
            debug!(error = %e, mapped = %err, "telemetry write failed");
            return Err(eyre::Report::new(err));
        }
        self.session.touch();
        self.sent += 1;
        Ok(())
    }

    /// Shut the session down; the socket is released when this returns.
    pub fn close(self) -> io::Result<()> {
        self.session.close()
    }
}

/// Map a socket write failure onto the telemetry fault classes.
pub fn classify_write_error(e: &io::Error, write_timeout: Duration) -> RadarError {
    use io::ErrorKind::*;
    match e.kind() {
        WouldBlock | TimedOut => RadarError::WriteTimeout {
            timeout_ms: duration_ms(write_timeout),
        },
        BrokenPipe | ConnectionReset | ConnectionAborted | NotConnected | UnexpectedEof
        | WriteZero => RadarError::PeerDisconnected,
        _ => RadarError::Io(e.to_string()),
    }
}

//! Activation gating and the single-consumer telemetry listener.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use radar_traits::AuthPrompt;
use tracing::{debug, info, warn};

use crate::config::{NetworkCfg, duration_ms};
use crate::error::{RadarError, Result};

/// Poll period while waiting for a consumer; bounds interrupt latency.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Shared-secret check performed before any hardware is armed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationGate {
    required: bool,
    secret: Option<String>,
}

/// Outcome of a passed activation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Gating turned off.
    Disabled,
    /// The operator entered the configured secret.
    Granted,
    /// Gating is on but no secret is configured; proceeding ungated.
    FailOpen,
}

impl ActivationGate {
    /// An empty secret counts as not configured.
    pub fn new(required: bool, secret: Option<String>) -> Self {
        Self {
            required,
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, None)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether `check` will ask the prompt for input.
    pub fn needs_prompt(&self) -> bool {
        self.required && self.secret.is_some()
    }

    pub fn check<P: AuthPrompt + ?Sized>(&self, prompt: Option<&mut P>) -> Result<Activation> {
        if !self.required {
            debug!("activation gate disabled");
            return Ok(Activation::Disabled);
        }
        let Some(secret) = self.secret.as_deref() else {
            // Fail-open: proceed, but say so.
            warn!("activation gate enabled but no secret configured; continuing without a gate");
            return Ok(Activation::FailOpen);
        };
        let Some(prompt) = prompt else {
            return Err(eyre::Report::new(RadarError::ActivationDenied));
        };
        let entered = match prompt.obtain_secret() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not read activation secret");
                return Err(eyre::Report::new(RadarError::ActivationDenied));
            }
        };
        if entered.trim() == secret {
            info!("activation secret accepted");
            Ok(Activation::Granted)
        } else {
            warn!("activation secret rejected");
            Err(eyre::Report::new(RadarError::ActivationDenied))
        }
    }
}

/// An accepted telemetry connection.
#[derive(Debug)]
pub struct ConnectionSession {
    peer_addr: SocketAddr,
    stream: TcpStream,
    last_activity: Instant,
}

impl ConnectionSession {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            stream,
            last_activity: Instant::now(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Shut down both directions. The socket itself closes on drop.
    pub fn close(self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}

/// Listens for exactly one telemetry consumer.
#[derive(Debug)]
pub struct ConnectionGate {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    accept_timeout: Duration,
}

impl ConnectionGate {
    /// Bind the configured host/port with a backlog of one.
    pub fn bind(cfg: &NetworkCfg) -> Result<Self> {
        let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).map_err(|e| {
            eyre::Report::new(RadarError::Io(format!(
                "bind {}:{}: {e}",
                cfg.host, cfg.port
            )))
        })?;
        if let Err(e) = limit_backlog(&listener) {
            warn!(error = %e, "could not reduce listen backlog; continuing");
        }
        listener
            .set_nonblocking(true)
            .map_err(|e| eyre::Report::new(RadarError::Io(e.to_string())))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| eyre::Report::new(RadarError::Io(e.to_string())))?;
        Ok(Self {
            listener: Some(listener),
            local_addr,
            accept_timeout: cfg.accept_timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    /// Wait for one consumer, up to the accept timeout.
    ///
    /// Returns `Ok(None)` if `shutdown` is raised while waiting.
    pub fn accept_one(&self, shutdown: &AtomicBool) -> Result<Option<ConnectionSession>> {
        let Some(listener) = self.listener.as_ref() else {
            return Err(eyre::Report::new(RadarError::Io(
                "listener already closed".into(),
            )));
        };
        let deadline = Instant::now() + self.accept_timeout;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("accept wait interrupted");
                return Ok(None);
            }
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream
                        .set_nonblocking(false)
                        .map_err(|e| eyre::Report::new(RadarError::Io(e.to_string())))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(error = %e, "TCP_NODELAY not applied");
                    }
                    return Ok(Some(ConnectionSession::new(stream, peer)));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(eyre::Report::new(RadarError::AcceptTimeout {
                            timeout_ms: duration_ms(self.accept_timeout),
                        }));
                    }
                    std::thread::sleep(ACCEPT_POLL.min(deadline - now));
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(eyre::Report::new(RadarError::Io(e.to_string()))),
            }
        }
    }

    /// Close the listening socket. Fails if it was already closed.
    pub fn close(&mut self) -> io::Result<()> {
        match self.listener.take() {
            Some(listener) => {
                drop(listener);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "listener already closed",
            )),
        }
    }
}

#[cfg(unix)]
fn limit_backlog(listener: &TcpListener) -> io::Result<()> {
    use std::os::fd::AsRawFd;
    // Re-issuing listen(2) on a listening socket only updates its backlog.
    // SAFETY: the fd is owned by `listener` and stays valid for this call.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), 1) };
    if rc != 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn limit_backlog(_listener: &TcpListener) -> io::Result<()> {
    Ok(())
}

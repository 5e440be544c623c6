//! Blocking UDP listener feeding the LWES decoder.
//!
//! A listener moves through three states: unbound, bound and closed. It owns
//! at most one socket and cannot be re-bound; construct a new one instead.
//! Receives block until a datagram arrives or the listener is closed, either
//! directly or through a [`Closer`] held by another thread.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, io};

use bytes::BytesMut;
use lwes_config::ListenerConfig;
use lwes_protocol::{DecodeMode, Decoder, Event, Receipt};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, instrument, trace, warn};

use crate::addr::IntoListenerAddr;
use crate::datagram::Datagram;
use crate::error::ListenerError;

/// Largest UDP payload over IPv4: 65535 minus 20 bytes of IP header and 8 of UDP header.
pub const MAX_MSG_SIZE: usize = 65_507;

/// How often a blocked receive wakes up to observe a close requested elsewhere.
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(250);

enum State {
    Unbound,
    Bound(UdpSocket),
    Closed,
}

/// Handle that closes a [`Listener`] from outside its receive loop.
#[derive(Debug, Clone)]
pub struct Closer {
    closed: Arc<AtomicBool>,
}

impl Closer {
    /// Requests closure. A receive in flight fails with [`ListenerError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// LWES datagram listener.
pub struct Listener {
    ip: Ipv4Addr,
    port: u16,
    interface: Option<Ipv4Addr>,
    decoder: Decoder,
    state: State,
    closed: Arc<AtomicBool>,
}

impl Listener {
    /// Creates an unbound listener. `interface` is the local address used to
    /// join a multicast group and is ignored for unicast addresses.
    pub fn new<A: IntoListenerAddr>(
        addr: A,
        port: u16,
        interface: Option<Ipv4Addr>,
    ) -> Result<Self, ListenerError> {
        Ok(Self {
            ip: addr.into_listener_addr()?,
            port,
            interface,
            decoder: Decoder::new(),
            state: State::Unbound,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates and binds a listener in one step.
    pub fn bind_to<A: IntoListenerAddr>(
        addr: A,
        port: u16,
        interface: Option<Ipv4Addr>,
    ) -> Result<Self, ListenerError> {
        let mut listener = Self::new(addr, port, interface)?;
        listener.bind()?;
        Ok(listener)
    }

    /// Creates and binds a listener from loaded configuration.
    pub fn from_config(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let interface = config
            .interface
            .as_deref()
            .map(|iface| iface.into_listener_addr())
            .transpose()?;
        let mut listener = Self::new(config.address.as_str(), config.port, interface)?
            .with_decode_mode(config.decode_mode);
        listener.bind()?;
        Ok(listener)
    }

    /// Selects how malformed datagrams are handled (lenient by default).
    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decoder = Decoder::with_mode(mode);
        self
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn interface(&self) -> Option<Ipv4Addr> {
        self.interface
    }

    pub fn decode_mode(&self) -> DecodeMode {
        self.decoder.mode()
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, State::Bound(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed) || self.closed.load(Ordering::Acquire)
    }

    /// The bound socket address; resolves an ephemeral port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Bound(socket) => socket.local_addr().ok(),
            _ => None,
        }
    }

    pub fn closer(&self) -> Closer {
        Closer {
            closed: self.closed.clone(),
        }
    }

    /// Binds the socket, joining the group when the address is multicast.
    #[instrument(skip(self), fields(ip = %self.ip, port = self.port))]
    pub fn bind(&mut self) -> Result<(), ListenerError> {
        match self.state {
            State::Unbound if !self.closed.load(Ordering::Acquire) => {}
            State::Bound(_) => {
                return Err(ListenerError::Config("listener is already bound".into()));
            }
            _ => return Err(ListenerError::Closed),
        }

        let addr = SocketAddrV4::new(self.ip, self.port);
        let socket = if self.ip.is_multicast() {
            self.bind_multicast(addr)?
        } else {
            UdpSocket::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?
        };
        socket
            .set_read_timeout(Some(CLOSE_POLL_INTERVAL))
            .map_err(|source| ListenerError::Bind { addr, source })?;

        info!(
            local = ?socket.local_addr().ok(),
            multicast = self.ip.is_multicast(),
            "Listener bound"
        );
        self.state = State::Bound(socket);
        Ok(())
    }

    fn bind_multicast(&self, group: SocketAddrV4) -> Result<UdpSocket, ListenerError> {
        // Windows cannot bind to a group address; receive on all interfaces instead.
        let local = if cfg!(windows) {
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port())
        } else {
            group
        };
        let bind_err = |source: io::Error| ListenerError::Bind { addr: group, source };

        // Several listeners may share one group and port on a host.
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true).map_err(bind_err)?;
        socket.bind(&SocketAddr::V4(local).into()).map_err(bind_err)?;
        let socket: UdpSocket = socket.into();

        let interface = self.interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket
            .join_multicast_v4(group.ip(), &interface)
            .map_err(bind_err)?;
        debug!(group = %group.ip(), %interface, "Joined multicast group");
        Ok(socket)
    }

    /// Blocks until one datagram arrives and returns its decoded event.
    pub fn receive(&mut self) -> Result<Event, ListenerError> {
        let datagram = self.receive_datagram()?;
        self.decoder
            .decode_received(&datagram.data, &datagram.receipt)
            .map_err(|err| {
                warn!(sender = %datagram.receipt.sender, "Rejected datagram: {err}");
                ListenerError::Decode(err)
            })
    }

    /// Blocks until one datagram arrives and returns it undecoded.
    pub fn receive_datagram(&mut self) -> Result<Datagram, ListenerError> {
        let mut buf = BytesMut::zeroed(MAX_MSG_SIZE);
        loop {
            if self.closed.load(Ordering::Acquire) {
                self.close();
            }
            let socket = match &self.state {
                State::Bound(socket) => socket,
                State::Unbound => {
                    return Err(ListenerError::Config("socket is not bound".into()));
                }
                State::Closed => return Err(ListenerError::Closed),
            };

            match socket.recv_from(&mut buf) {
                Ok((len, SocketAddr::V4(sender))) => {
                    let receipt = Receipt::now(sender);
                    buf.truncate(len);
                    let datagram = Datagram::new(buf.freeze(), receipt);
                    debug!(%sender, len = datagram.len(), "Received datagram");
                    return Ok(datagram);
                }
                Ok((_, sender)) => {
                    warn!(%sender, "Dropping datagram from non-IPv4 sender");
                }
                Err(e) if is_poll_timeout(&e) => {
                    trace!("No datagram within poll interval");
                }
                Err(e) if self.closed.load(Ordering::Acquire) => {
                    debug!("Receive interrupted by close: {e}");
                }
                Err(e) => return Err(ListenerError::Transport(e)),
            }
        }
    }

    /// Feeds every received event (or error) to `handler` until it breaks,
    /// the listener is closed, or a configuration error makes further
    /// receives pointless. The listener is consumed and its socket released
    /// on every exit path, including a panicking handler.
    pub fn for_each<F>(mut self, mut handler: F)
    where
        F: FnMut(Result<Event, ListenerError>) -> ControlFlow<()>,
    {
        loop {
            let result = self.receive();
            let terminal = matches!(&result, Err(e) if e.is_configuration());
            if handler(result).is_break() || terminal {
                break;
            }
        }
        debug!("Dispatch loop finished");
    }

    /// Releases the socket. Idempotent; a never-bound listener is simply
    /// marked closed.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let State::Bound(socket) = std::mem::replace(&mut self.state, State::Closed) {
            info!(local = ?socket.local_addr().ok(), "Listener closed");
        }
    }
}

fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Unbound => "unbound",
            State::Bound(_) => "bound",
            State::Closed => "closed",
        };
        f.debug_struct("Listener")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("interface", &self.interface)
            .field("decode_mode", &self.decoder.mode())
            .field("state", &state)
            .finish()
    }
}

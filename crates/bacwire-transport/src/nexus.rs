use crate::handler::{ApduHandler, BvlcHandler, HandlerId, MessageHandler, NpduHandler};
use crate::TransportError;
use bacwire_core::apdu::{Apdu, UnconfirmedRequest};
use bacwire_core::encoding::reader::Reader;
use bacwire_core::npdu::{message_type, Npdu, NpduContent};
use bacwire_datalink::{BvlcFrame, BvlcFunction};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use log::{debug, warn};
use tokio::time::timeout;

/// Filter the built-in router handler registers for: the two BVLC functions
/// that carry an NPDU end to end.
const ROUTER_BVLC_FILTER: u8 =
    BvlcFunction::OriginalUnicastNpdu.to_u8() | BvlcFunction::OriginalBroadcastNpdu.to_u8();

/// Network-layer message types the built-in router handler subscribes to.
const ROUTER_NPDU_FILTER: u8 =
    message_type::WHO_IS_ROUTER_TO_NETWORK | message_type::I_AM_ROUTER_TO_NETWORK;

#[derive(Debug, Clone, Copy)]
pub struct NexusConfig {
    /// How long a dispatch blocks on a full handler channel before the
    /// message is dropped.
    pub dispatch_deadline: Duration,
    /// Channel capacity of the built-in router handler.
    pub router_capacity: usize,
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            dispatch_deadline: Duration::from_secs(1),
            router_capacity: 1,
        }
    }
}

/// One registry level: handler lists indexed by the filter byte. Filters
/// are small, so a flat array beats a map.
struct Registry<T> {
    slots: Box<[Vec<MessageHandler<T>>; 256]>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| Vec::new())),
        }
    }

    /// Adds the handler under `filter`. Returns false (and changes nothing)
    /// when the same handler is already registered there.
    fn register(&mut self, filter: u8, handler: MessageHandler<T>) -> bool {
        let slot = &mut self.slots[filter as usize];
        if slot.iter().any(|existing| existing.id() == handler.id()) {
            return false;
        }
        slot.push(handler);
        true
    }

    fn deregister(&mut self, filter: u8, id: HandlerId) -> bool {
        let slot = &mut self.slots[filter as usize];
        let before = slot.len();
        slot.retain(|existing| existing.id() != id);
        slot.len() != before
    }

    /// Senders of every handler whose filter ANDed with `value` is
    /// non-zero. Each handler is delivered to at most once even when it is
    /// registered under several matching filters.
    fn matching(&self, value: u8) -> Vec<mpsc::Sender<T>> {
        self.collect(|filter| filter & value != 0)
    }

    /// Senders of every registered handler, for messages that have no
    /// filterable discriminant.
    fn all(&self) -> Vec<mpsc::Sender<T>> {
        self.collect(|_| true)
    }

    fn collect(&self, matches: impl Fn(u8) -> bool) -> Vec<mpsc::Sender<T>> {
        let mut seen: Vec<HandlerId> = Vec::new();
        let mut senders = Vec::new();
        for (filter, slot) in self.slots.iter().enumerate() {
            if !matches(filter as u8) {
                continue;
            }
            for handler in slot {
                if !seen.contains(&handler.id()) {
                    seen.push(handler.id());
                    senders.push(handler.sender());
                }
            }
        }
        senders
    }
}

struct NexusInner {
    config: NexusConfig,
    bvlc: RwLock<Registry<BvlcFrame>>,
    npdu: RwLock<Registry<Npdu>>,
    apdu: RwLock<Registry<UnconfirmedRequest>>,
}

struct NexusState {
    router_rx: Option<(mpsc::Receiver<BvlcFrame>, mpsc::Receiver<Npdu>)>,
    cancel: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Routes inbound messages to registered handlers across three levels:
/// BVLC function, network-layer message type, and unconfirmed service id.
///
/// A built-in router handler is registered at construction. It decodes the
/// NPDU out of unicast/broadcast BVLC frames and re-dispatches it, and
/// decodes unconfirmed APDUs out of application NPDUs for the service
/// registry. Malformed payloads are logged and discarded.
pub struct MessageNexus {
    inner: Arc<NexusInner>,
    state: Mutex<NexusState>,
}

impl MessageNexus {
    pub fn new(config: NexusConfig) -> Self {
        let inner = Arc::new(NexusInner {
            config,
            bvlc: RwLock::new(Registry::new()),
            npdu: RwLock::new(Registry::new()),
            apdu: RwLock::new(Registry::new()),
        });

        let (bvlc_handler, bvlc_rx) = BvlcHandler::channel(config.router_capacity);
        let (npdu_handler, npdu_rx) = NpduHandler::channel(config.router_capacity);
        write_lock(&inner.bvlc).register(ROUTER_BVLC_FILTER, bvlc_handler);
        write_lock(&inner.npdu).register(ROUTER_NPDU_FILTER, npdu_handler);

        Self {
            inner,
            state: Mutex::new(NexusState {
                router_rx: Some((bvlc_rx, npdu_rx)),
                cancel: None,
                tasks: Vec::new(),
            }),
        }
    }

    /// Spawns the router handler tasks. Must be called before messages are
    /// routed for the NPDU and APDU levels to see anything.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut state = mutex_lock(&self.state);
        let (bvlc_rx, npdu_rx) = state.router_rx.take().ok_or(TransportError::AlreadyStarted)?;
        let (cancel_tx, cancel_rx) = watch::channel(false);

        state.tasks.push(tokio::spawn(npdu_router_task(
            Arc::clone(&self.inner),
            bvlc_rx,
            cancel_rx.clone(),
        )));
        state.tasks.push(tokio::spawn(apdu_router_task(
            Arc::clone(&self.inner),
            npdu_rx,
            cancel_rx,
        )));
        state.cancel = Some(cancel_tx);
        Ok(())
    }

    /// Cancels and joins the router tasks. Once this returns, the nexus
    /// itself sends to no handler channel; callers must stop routing into
    /// it first.
    pub async fn stop(&self) {
        let (cancel, tasks) = {
            let mut state = mutex_lock(&self.state);
            (state.cancel.take(), std::mem::take(&mut state.tasks))
        };
        if let Some(cancel) = cancel {
            let _ = cancel.send(true);
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Delivers a BVLC frame to every handler whose filter matches its
    /// function code.
    pub async fn route(&self, frame: BvlcFrame) {
        let senders = read_lock(&self.inner.bvlc).matching(frame.function.to_u8());
        deliver(senders, frame, self.inner.config.dispatch_deadline, "bvlc").await;
    }

    pub fn register_bvlc_handler(&self, filter: u8, handler: &BvlcHandler) -> bool {
        write_lock(&self.inner.bvlc).register(filter, handler.clone())
    }

    pub fn register_npdu_handler(&self, filter: u8, handler: &NpduHandler) -> bool {
        write_lock(&self.inner.npdu).register(filter, handler.clone())
    }

    pub fn register_apdu_handler(&self, filter: u8, handler: &ApduHandler) -> bool {
        write_lock(&self.inner.apdu).register(filter, handler.clone())
    }

    pub fn deregister_bvlc_handler(&self, filter: u8, id: HandlerId) -> bool {
        write_lock(&self.inner.bvlc).deregister(filter, id)
    }

    pub fn deregister_npdu_handler(&self, filter: u8, id: HandlerId) -> bool {
        write_lock(&self.inner.npdu).deregister(filter, id)
    }

    pub fn deregister_apdu_handler(&self, filter: u8, id: HandlerId) -> bool {
        write_lock(&self.inner.apdu).deregister(filter, id)
    }
}

impl Default for MessageNexus {
    fn default() -> Self {
        Self::new(NexusConfig::default())
    }
}

/// First router stage: NPDUs out of unicast/broadcast BVLC frames.
async fn npdu_router_task(
    inner: Arc<NexusInner>,
    mut rx: mpsc::Receiver<BvlcFrame>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_frame = rx.recv() => {
                let Some(frame) = maybe_frame else { break };
                if !matches!(
                    frame.function,
                    BvlcFunction::OriginalUnicastNpdu | BvlcFunction::OriginalBroadcastNpdu
                ) {
                    debug!("router handler ignores BVLC function {:?}", frame.function);
                    continue;
                }
                let npdu = match Npdu::decode(&mut Reader::new(&frame.data)) {
                    Ok(npdu) => npdu,
                    Err(error) => {
                        debug!("discarding frame with undecodable NPDU: {error}");
                        continue;
                    }
                };
                let senders = {
                    let registry = read_lock(&inner.npdu);
                    match &npdu.content {
                        NpduContent::Network { message_type, .. } => registry.matching(*message_type),
                        // an APDU-bearing NPDU has no message type to filter on
                        NpduContent::Application(_) => registry.all(),
                    }
                };
                deliver(senders, npdu, inner.config.dispatch_deadline, "npdu").await;
            }
            _ = cancel.changed() => break,
        }
    }
}

/// Second router stage: unconfirmed APDUs out of application NPDUs.
async fn apdu_router_task(
    inner: Arc<NexusInner>,
    mut rx: mpsc::Receiver<Npdu>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_npdu = rx.recv() => {
                let Some(npdu) = maybe_npdu else { break };
                let NpduContent::Application(bytes) = &npdu.content else { continue };
                let request = match Apdu::decode(&mut Reader::new(bytes)) {
                    Ok(Apdu::UnconfirmedRequest(request)) => request,
                    Ok(_) => continue,
                    Err(error) => {
                        debug!("discarding NPDU with undecodable APDU: {error}");
                        continue;
                    }
                };
                let senders = read_lock(&inner.apdu).matching(request.service as u8);
                deliver(senders, request, inner.config.dispatch_deadline, "apdu").await;
            }
            _ = cancel.changed() => break,
        }
    }
}

/// Sends `message` to each handler channel, blocking per handler up to the
/// deadline. Messages for full channels are dropped after the deadline
/// rather than buffered without bound.
async fn deliver<T: Clone>(
    senders: Vec<mpsc::Sender<T>>,
    message: T,
    deadline: Duration,
    layer: &'static str,
) {
    for tx in senders {
        match timeout(deadline, tx.send(message.clone())).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!("{layer} handler channel closed"),
            Err(_) => warn!("dispatch deadline passed, dropping {layer} message"),
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn mutex_lock<T>(lock: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

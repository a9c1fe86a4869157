use bacwire_core::apdu::UnconfirmedRequest;
use bacwire_core::npdu::Npdu;
use bacwire_datalink::BvlcFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handler identity, used for the idempotent-registration
/// equality test. Clones of a handler share the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The registration half of a handler: a bounded channel sender plus an
/// identity. The receiving half stays with the handler's own task; the
/// nexus only ever holds these back-references.
#[derive(Debug)]
pub struct MessageHandler<T> {
    id: HandlerId,
    tx: mpsc::Sender<T>,
}

/// Receives BVLC frames.
pub type BvlcHandler = MessageHandler<BvlcFrame>;
/// Receives decoded NPDUs.
pub type NpduHandler = MessageHandler<Npdu>;
/// Receives decoded unconfirmed APDUs.
pub type ApduHandler = MessageHandler<UnconfirmedRequest>;

impl<T> MessageHandler<T> {
    /// Creates a handler with a bounded delivery channel. The capacity is
    /// the handler's back-pressure budget: when it is full the nexus blocks
    /// up to its dispatch deadline, then drops.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: HandlerId::next(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<T> {
        self.tx.clone()
    }
}

impl<T> Clone for MessageHandler<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

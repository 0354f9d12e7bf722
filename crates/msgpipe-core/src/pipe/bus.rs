//! `MessagePipe` -- the public entry point of the pipe.
//!
//! Composes the registry, the dispatcher and the deferred scheduler. Every
//! operation delegates to one of them; the pipe holds no state of its own.
//! Cloning a `MessagePipe` yields another handle to the same registry and
//! outbound buffer.

use std::sync::Arc;
use std::time::Duration;

use msgpipe_types::{DeliveryError, Envelope, EnvelopeKind, OwnerId, ReceiverError, ReceiverHandle};

use super::dispatcher::{DeliveryReport, Dispatcher};
use super::host::TickHost;
use super::registry::Registry;
use super::scheduler::{DEFAULT_TICK_INTERVAL, DeferredScheduler};

/// What `send` did with an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Published synchronously; every fan-out step has completed.
    Delivered(DeliveryReport),
    /// Appended to the outbound buffer; `pending` includes this envelope.
    Buffered { pending: usize },
}

/// In-process publish/subscribe pipe.
#[derive(Clone)]
pub struct MessagePipe {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    scheduler: DeferredScheduler,
}

impl MessagePipe {
    /// Create a pipe whose buffered path ticks every `tick_interval` on `host`.
    pub fn new(host: Arc<dyn TickHost>, tick_interval: Duration) -> Self {
        let registry = Arc::new(Registry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        let scheduler = DeferredScheduler::new(Arc::clone(&dispatcher), host, tick_interval);
        Self {
            registry,
            dispatcher,
            scheduler,
        }
    }

    /// Create a pipe with the default 100 ms tick.
    pub fn with_host(host: Arc<dyn TickHost>) -> Self {
        Self::new(host, DEFAULT_TICK_INTERVAL)
    }

    /// Send an envelope.
    ///
    /// Buffered envelopes (`Envelope::buffered`) return immediately. Others are
    /// fanned out before this returns, and a receiver error surfaces here.
    pub fn send(&self, mut envelope: Envelope) -> Result<SendOutcome, DeliveryError> {
        if envelope.can_buffer() {
            let pending = self.scheduler.enqueue(envelope);
            return Ok(SendOutcome::Buffered { pending });
        }
        self.dispatcher
            .publish(&mut envelope)
            .map(SendOutcome::Delivered)
    }

    /// Register interest in `accepted_kinds`, optionally limited to one scope.
    ///
    /// Returns `false` (and stores nothing) if `accepted_kinds` is empty or
    /// `handle` is already registered.
    pub fn register_receiver<F>(
        &self,
        handle: ReceiverHandle,
        accepted_kinds: impl IntoIterator<Item = EnvelopeKind>,
        target_scope: Option<&str>,
        callback: F,
    ) -> bool
    where
        F: Fn(&Envelope) -> Result<(), ReceiverError> + Send + Sync + 'static,
    {
        self.registry
            .register(handle, accepted_kinds, target_scope, callback)
    }

    /// Remove one receiver by handle.
    pub fn unregister_receiver(&self, handle: &ReceiverHandle) -> bool {
        self.registry.unregister(handle)
    }

    /// Remove every receiver registered by `owner`.
    pub fn unregister_owner(&self, owner: OwnerId) -> usize {
        self.registry.unregister_owner(owner)
    }

    /// Remove every receiver registered for `target_scope`.
    ///
    /// `None` removes all receivers, including scoped ones.
    pub fn unregister_receivers(&self, target_scope: Option<&str>) -> usize {
        self.registry.unregister_scope(target_scope)
    }

    pub fn receiver_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_registered(&self, handle: &ReceiverHandle) -> bool {
        self.registry.contains(handle)
    }

    /// Buffered envelopes not yet delivered.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn tick_interval(&self) -> Duration {
        self.scheduler.interval()
    }
}

impl std::fmt::Debug for MessagePipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePipe")
            .field("registered_receivers", &self.registry.len())
            .field("target_scopes", &self.registry.distinct_target_scopes())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::host::ManualHost;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct KindA(u32);

    #[derive(Debug)]
    struct KindB;

    fn make_pipe() -> (Arc<ManualHost>, MessagePipe) {
        let host = Arc::new(ManualHost::new());
        let pipe = MessagePipe::with_host(host.clone());
        (host, pipe)
    }

    fn kind_a() -> [EnvelopeKind; 1] {
        [EnvelopeKind::of::<KindA>()]
    }

    fn counter(
        hits: &Arc<AtomicUsize>,
    ) -> impl Fn(&Envelope) -> Result<(), ReceiverError> + Send + Sync + 'static {
        let hits = Arc::clone(hits);
        move |_: &Envelope| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn unbuffered_send_to_single_wildcard_receiver() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let scopes = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&scopes);
        pipe.register_receiver(owner.handle("r1"), kind_a(), None, move |env: &Envelope| {
            s.lock().unwrap().push(env.target_scope().map(str::to_owned));
            Ok(())
        });

        let outcome = pipe.send(Envelope::new(KindA(1))).unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Delivered(DeliveryReport {
                steps: 1,
                deliveries: 1
            })
        );
        assert_eq!(*scopes.lock().unwrap(), vec![None]);
    }

    #[test]
    fn scoped_and_wildcard_receivers_tally() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let r1 = Arc::new(AtomicUsize::new(0));
        let r2 = Arc::new(AtomicUsize::new(0));
        pipe.register_receiver(owner.handle("r1"), kind_a(), Some("X"), counter(&r1));
        pipe.register_receiver(owner.handle("r2"), kind_a(), None, counter(&r2));

        pipe.send(Envelope::new(KindA(1))).unwrap();

        assert_eq!(r1.load(Ordering::SeqCst), 1);
        assert_eq!(r2.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn buffered_sends_arrive_in_order_one_per_tick() {
        let (host, pipe) = make_pipe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        pipe.register_receiver(
            OwnerId::new().handle("r1"),
            kind_a(),
            None,
            move |env: &Envelope| {
                if let Some(KindA(n)) = env.payload::<KindA>() {
                    s.lock().unwrap().push(*n);
                }
                Ok(())
            },
        );

        for n in 1..=3 {
            let outcome = pipe.send(Envelope::new(KindA(n)).buffered()).unwrap();
            assert_eq!(outcome, SendOutcome::Buffered { pending: n as usize });
        }
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(pipe.pending(), 3);

        for expected in 1..=3u32 {
            assert!(host.fire_next());
            assert_eq!(seen.lock().unwrap().len(), expected as usize);
        }
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(pipe.pending(), 0);
    }

    #[test]
    fn buffered_send_never_runs_receivers_inline() {
        let (host, pipe) = make_pipe();
        let hits = Arc::new(AtomicUsize::new(0));
        pipe.register_receiver(OwnerId::new().handle("r"), kind_a(), None, counter(&hits));

        pipe.send(Envelope::new(KindA(1)).buffered()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(host.next_delay(), Some(DEFAULT_TICK_INTERVAL));

        host.fire_next();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_receivers_none_removes_scoped_receivers_too() {
        // A `None` scope means "everything", not "unscoped only".
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let r1 = Arc::new(AtomicUsize::new(0));
        let r2 = Arc::new(AtomicUsize::new(0));
        pipe.register_receiver(owner.handle("r1"), kind_a(), Some("X"), counter(&r1));
        pipe.register_receiver(owner.handle("r2"), kind_a(), Some("Y"), counter(&r2));

        assert_eq!(pipe.unregister_receivers(None), 2);
        assert_eq!(pipe.receiver_count(), 0);

        let outcome = pipe
            .send(Envelope::new(KindA(1)).with_target_scope("X"))
            .unwrap();
        assert_eq!(outcome, SendOutcome::Delivered(DeliveryReport::default()));
        pipe.send(Envelope::new(KindA(1)).with_target_scope("Y"))
            .unwrap();
        assert_eq!(r1.load(Ordering::SeqCst), 0);
        assert_eq!(r2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregister_receivers_by_scope_keeps_others() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let hits = Arc::new(AtomicUsize::new(0));
        pipe.register_receiver(owner.handle("x"), kind_a(), Some("X"), counter(&hits));
        pipe.register_receiver(owner.handle("y"), kind_a(), Some("Y"), counter(&hits));

        assert_eq!(pipe.unregister_receivers(Some("X")), 1);
        assert!(!pipe.is_registered(&owner.handle("x")));
        assert!(pipe.is_registered(&owner.handle("y")));
    }

    #[test]
    fn unregister_owner_removes_receiver_registered_by_it() {
        let (_host, pipe) = make_pipe();
        let window = OwnerId::new();
        let hits = Arc::new(AtomicUsize::new(0));
        pipe.register_receiver(window.handle("on_delivered"), kind_a(), None, counter(&hits));

        assert_eq!(pipe.unregister_owner(window), 1);

        pipe.send(Envelope::new(KindA(1))).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregister_unknown_receiver_is_a_no_op() {
        let (_host, pipe) = make_pipe();
        let hits = Arc::new(AtomicUsize::new(0));
        let owner = OwnerId::new();
        pipe.register_receiver(owner.handle("r"), kind_a(), None, counter(&hits));

        assert!(!pipe.unregister_receiver(&owner.handle("other")));
        assert_eq!(pipe.unregister_owner(OwnerId::new()), 0);
        assert_eq!(pipe.unregister_receivers(Some("nowhere")), 0);
        assert_eq!(pipe.receiver_count(), 1);
    }

    #[test]
    fn empty_kind_filter_never_receives() {
        let (_host, pipe) = make_pipe();
        let hits = Arc::new(AtomicUsize::new(0));
        let stored = pipe.register_receiver(
            OwnerId::new().handle("r"),
            Vec::<EnvelopeKind>::new(),
            None,
            counter(&hits),
        );

        assert!(!stored);
        let outcome = pipe.send(Envelope::new(KindA(1))).unwrap();
        assert_eq!(outcome, SendOutcome::Delivered(DeliveryReport::default()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn duplicate_registration_is_delivered_once() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let hits = Arc::new(AtomicUsize::new(0));
        assert!(pipe.register_receiver(owner.handle("r"), kind_a(), None, counter(&hits)));
        assert!(!pipe.register_receiver(owner.handle("r"), kind_a(), None, counter(&hits)));

        pipe.send(Envelope::new(KindA(1))).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn receiver_unregistering_itself_during_send() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner = pipe.clone();
        let h = Arc::clone(&hits);
        pipe.register_receiver(owner.handle("once"), kind_a(), None, move |_: &Envelope| {
            h.fetch_add(1, Ordering::SeqCst);
            inner.unregister_receiver(&owner.handle("once"));
            Ok(())
        });
        pipe.register_receiver(owner.handle("stays"), kind_a(), None, counter(&hits));

        pipe.send(Envelope::new(KindA(1))).unwrap();
        pipe.send(Envelope::new(KindA(2))).unwrap();

        // once: 1, stays: 2
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(pipe.receiver_count(), 1);
    }

    #[test]
    fn receiver_error_surfaces_from_unbuffered_send() {
        let (_host, pipe) = make_pipe();
        let owner = OwnerId::new();
        pipe.register_receiver(
            owner.handle("bad"),
            [EnvelopeKind::of::<KindB>()],
            None,
            |_: &Envelope| Err(ReceiverError::rejected("unsupported")),
        );

        let err = pipe.send(Envelope::new(KindB)).unwrap_err();
        assert_eq!(err.receiver, owner.handle("bad"));
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn clone_shares_registry_and_buffer() {
        let (_host, pipe) = make_pipe();
        let other = pipe.clone();
        let hits = Arc::new(AtomicUsize::new(0));
        other.register_receiver(OwnerId::new().handle("r"), kind_a(), None, counter(&hits));

        assert_eq!(pipe.receiver_count(), 1);
        pipe.send(Envelope::new(KindA(1)).buffered()).unwrap();
        assert_eq!(other.pending(), 1);
    }

    #[test]
    fn debug_impl() {
        let (_host, pipe) = make_pipe();
        let debug = format!("{pipe:?}");
        assert!(debug.contains("MessagePipe"));
        assert!(debug.contains("registered_receivers"));
    }
}

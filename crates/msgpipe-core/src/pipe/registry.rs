//! Receiver registry with snapshot reads.
//!
//! Registrations live in a copy-on-write vector behind a mutex. Readers take
//! an `Arc` snapshot and iterate it without holding the lock, so a receiver
//! that registers or unregisters from inside its own callback only affects
//! later snapshots and never the iteration in progress.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use msgpipe_types::{Envelope, EnvelopeKind, OwnerId, ReceiverError, ReceiverHandle};
use tracing::debug;

/// Callback invoked for every matching envelope.
pub type ReceiverFn = dyn Fn(&Envelope) -> Result<(), ReceiverError> + Send + Sync;

/// Immutable view of the registry at one point in time.
pub type Snapshot = Arc<Vec<Arc<Registration>>>;

/// One subscriber: a callback, the kinds it accepts, and an optional scope.
pub struct Registration {
    handle: ReceiverHandle,
    accepted_kinds: HashSet<EnvelopeKind>,
    target_scope: Option<String>,
    callback: Arc<ReceiverFn>,
}

impl Registration {
    pub fn handle(&self) -> &ReceiverHandle {
        &self.handle
    }

    pub fn accepted_kinds(&self) -> &HashSet<EnvelopeKind> {
        &self.accepted_kinds
    }

    pub fn target_scope(&self) -> Option<&str> {
        self.target_scope.as_deref()
    }

    /// Kind is accepted and the scope is either a wildcard or equal to the
    /// envelope's current scope.
    pub fn matches(&self, envelope: &Envelope) -> bool {
        if !self.accepted_kinds.contains(&envelope.kind()) {
            return false;
        }
        match &self.target_scope {
            None => true,
            Some(scope) => envelope.target_scope() == Some(scope.as_str()),
        }
    }

    pub fn invoke(&self, envelope: &Envelope) -> Result<(), ReceiverError> {
        (self.callback)(envelope)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("handle", &self.handle)
            .field("accepted_kinds", &self.accepted_kinds)
            .field("target_scope", &self.target_scope)
            .finish()
    }
}

/// Ordered collection of active registrations.
pub struct Registry {
    entries: Mutex<Snapshot>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Add a registration.
    ///
    /// Returns `false` without storing anything if `accepted_kinds` is empty
    /// or a registration with the same handle already exists.
    pub fn register<F>(
        &self,
        handle: ReceiverHandle,
        accepted_kinds: impl IntoIterator<Item = EnvelopeKind>,
        target_scope: Option<&str>,
        callback: F,
    ) -> bool
    where
        F: Fn(&Envelope) -> Result<(), ReceiverError> + Send + Sync + 'static,
    {
        let accepted_kinds: HashSet<EnvelopeKind> = accepted_kinds.into_iter().collect();
        if accepted_kinds.is_empty() {
            debug!(receiver = %handle, "ignoring registration with no accepted kinds");
            return false;
        }

        let mut entries = self.entries.lock().expect("registry lock poisoned");
        if entries.iter().any(|r| r.handle == handle) {
            debug!(receiver = %handle, "receiver already registered");
            return false;
        }

        debug!(
            receiver = %handle,
            kinds = accepted_kinds.len(),
            scope = ?target_scope,
            "registered receiver"
        );
        Arc::make_mut(&mut *entries).push(Arc::new(Registration {
            handle,
            accepted_kinds,
            target_scope: target_scope.map(str::to_owned),
            callback: Arc::new(callback),
        }));
        true
    }

    /// Remove the registration with this handle. Returns `true` if one existed.
    pub fn unregister(&self, handle: &ReceiverHandle) -> bool {
        let removed = self.remove_where(|r| &r.handle == handle) > 0;
        if removed {
            debug!(receiver = %handle, "unregistered receiver");
        }
        removed
    }

    /// Remove every registration made by `owner`. Returns how many were removed.
    pub fn unregister_owner(&self, owner: OwnerId) -> usize {
        let removed = self.remove_where(|r| r.handle.belongs_to(owner));
        debug!(%owner, removed, "unregistered owner");
        removed
    }

    /// Remove every registration whose scope equals `target_scope`.
    ///
    /// `None` removes every registration, scoped or not.
    pub fn unregister_scope(&self, target_scope: Option<&str>) -> usize {
        let removed = self.remove_where(|r| {
            target_scope.is_none() || r.target_scope.as_deref() == target_scope
        });
        debug!(scope = ?target_scope, removed, "unregistered receivers by scope");
        removed
    }

    /// Each distinct registration scope once, in first-registered order.
    ///
    /// `None` is included when at least one wildcard registration exists.
    pub fn distinct_target_scopes(&self) -> Vec<Option<String>> {
        let snapshot = self.snapshot();
        let mut scopes: Vec<Option<String>> = Vec::new();
        for registration in snapshot.iter() {
            if !scopes.contains(&registration.target_scope) {
                scopes.push(registration.target_scope.clone());
            }
        }
        scopes
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.entries.lock().expect("registry lock poisoned"))
    }

    pub fn contains(&self, handle: &ReceiverHandle) -> bool {
        self.snapshot().iter().any(|r| &r.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_where(&self, predicate: impl Fn(&Registration) -> bool) -> usize {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        let before = entries.len();
        if entries.iter().any(|r| predicate(&**r)) {
            Arc::make_mut(&mut *entries).retain(|r| !predicate(&**r));
        }
        before - entries.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Registry")
            .field("receivers", &snapshot.len())
            .field("registrations", &snapshot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Alpha;

    #[derive(Debug)]
    struct Beta;

    fn noop(_: &Envelope) -> Result<(), ReceiverError> {
        Ok(())
    }

    fn alpha() -> [EnvelopeKind; 1] {
        [EnvelopeKind::of::<Alpha>()]
    }

    #[test]
    fn register_stores_and_reports_true() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        assert!(registry.register(owner.handle("a"), alpha(), None, noop));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&owner.handle("a")));
    }

    #[test]
    fn empty_kind_set_is_never_stored() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        assert!(!registry.register(owner.handle("a"), Vec::<EnvelopeKind>::new(), None, noop));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_handle_is_a_noop() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        assert!(registry.register(owner.handle("a"), alpha(), None, noop));
        assert!(!registry.register(
            owner.handle("a"),
            [EnvelopeKind::of::<Beta>()],
            Some("X"),
            noop
        ));
        assert_eq!(registry.len(), 1);
        // First registration wins.
        assert!(registry.snapshot()[0].target_scope().is_none());
    }

    #[test]
    fn unregister_removes_only_that_handle() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("a"), alpha(), None, noop);
        registry.register(owner.handle("b"), alpha(), None, noop);

        assert!(registry.unregister(&owner.handle("a")));
        assert!(!registry.unregister(&owner.handle("a")));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&owner.handle("b")));
    }

    #[test]
    fn unregister_owner_removes_all_of_its_receivers() {
        let registry = Registry::new();
        let window = OwnerId::new();
        let other = OwnerId::new();
        registry.register(window.handle("on_delivered"), alpha(), None, noop);
        registry.register(window.handle("on_status"), alpha(), Some("X"), noop);
        registry.register(other.handle("on_delivered"), alpha(), None, noop);

        assert_eq!(registry.unregister_owner(window), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&other.handle("on_delivered")));
        assert_eq!(registry.unregister_owner(window), 0);
    }

    #[test]
    fn unregister_scope_matches_exact_scope() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("x"), alpha(), Some("X"), noop);
        registry.register(owner.handle("y"), alpha(), Some("Y"), noop);
        registry.register(owner.handle("any"), alpha(), None, noop);

        assert_eq!(registry.unregister_scope(Some("X")), 1);
        assert!(!registry.contains(&owner.handle("x")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregister_scope_none_removes_everything_including_scoped() {
        // `None` is "remove all", not "remove only unscoped".
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("x"), alpha(), Some("X"), noop);
        registry.register(owner.handle("y"), alpha(), Some("Y"), noop);
        registry.register(owner.handle("any"), alpha(), None, noop);

        assert_eq!(registry.unregister_scope(None), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn distinct_scopes_are_deduplicated_in_registration_order() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("1"), alpha(), Some("X"), noop);
        registry.register(owner.handle("2"), alpha(), None, noop);
        registry.register(owner.handle("3"), alpha(), Some("X"), noop);
        registry.register(owner.handle("4"), alpha(), Some("Y"), noop);
        registry.register(owner.handle("5"), alpha(), None, noop);

        assert_eq!(
            registry.distinct_target_scopes(),
            vec![Some("X".to_string()), None, Some("Y".to_string())]
        );
    }

    #[test]
    fn distinct_scopes_empty_without_registrations() {
        assert!(Registry::new().distinct_target_scopes().is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("a"), alpha(), None, noop);
        let snapshot = registry.snapshot();

        registry.unregister(&owner.handle("a"));
        registry.register(owner.handle("b"), alpha(), None, noop);
        registry.register(owner.handle("c"), alpha(), None, noop);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].handle(), &owner.handle("a"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn matches_requires_kind_and_compatible_scope() {
        let registry = Registry::new();
        let owner = OwnerId::new();
        registry.register(owner.handle("scoped"), alpha(), Some("X"), noop);
        registry.register(owner.handle("wild"), alpha(), None, noop);
        let snapshot = registry.snapshot();
        let (scoped, wild) = (&snapshot[0], &snapshot[1]);

        let mut env = Envelope::new(Alpha).with_target_scope("X");
        assert!(scoped.matches(&env));
        assert!(wild.matches(&env));

        env.set_target_scope(Some("Y".to_string()));
        assert!(!scoped.matches(&env));
        assert!(wild.matches(&env));

        env.set_target_scope(None);
        assert!(!scoped.matches(&env));
        assert!(wild.matches(&env));

        assert!(!wild.matches(&Envelope::new(Beta)));
    }

    #[test]
    fn debug_impl() {
        let registry = Registry::new();
        registry.register(OwnerId::new().handle("a"), alpha(), None, noop);
        let debug = format!("{registry:?}");
        assert!(debug.contains("Registry"));
        assert!(debug.contains("receivers"));
    }
}

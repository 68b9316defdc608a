//! Derived-state combinator.
//!
//! Merges a fixed set of watchable inputs into one recomputed snapshot.
//! The combinator keeps the latest value per input and re-merges whenever
//! any input emits, but only once every input has emitted at least once.
//!
//! Input subscriptions are cold with a grace period: they are created when
//! the first consumer attaches and torn down only after the last consumer
//! has been gone for the grace duration. Re-attachment within the window
//! reuses the live input subscriptions and replays the cached snapshot.
//!
//! Lifecycle: Idle -> Active -> Draining(timer) -> Idle/Active.

use super::{lock, Subscription, Watchable};
use log::error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Teardown delay after the last consumer detaches.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

type Poke = Arc<dyn Fn() + Send + Sync>;
type ConsumerSink<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// A fixed tuple of watchable inputs feeding one combinator.
///
/// Implemented for tuples of one to five watchables over the matching
/// value tuple. `Slots` holds the latest value per input; `values` yields
/// `None` until every slot is filled.
pub trait Inputs<Values>: Send + Sync + 'static {
    type Slots: Default + Send + 'static;

    /// Subscribes every input, routing emissions into `slots` and poking
    /// the combinator after each write.
    fn attach(&self, slots: &Arc<Mutex<Self::Slots>>, poke: &Poke) -> Vec<Subscription>;

    /// Clones the latest values out of the slots, if all are present.
    fn values(slots: &Self::Slots) -> Option<Values>;
}

macro_rules! impl_inputs {
    ($(($watch:ident, $value:ident, $idx:tt)),+) => {
        impl<$($value,)+ $($watch,)+> Inputs<($($value,)+)> for ($($watch,)+)
        where
            $($value: Clone + Send + 'static,)+
            $($watch: Watchable<$value> + Send + Sync + 'static,)+
        {
            type Slots = ($(Option<$value>,)+);

            fn attach(&self, slots: &Arc<Mutex<Self::Slots>>, poke: &Poke) -> Vec<Subscription> {
                let mut subs = Vec::new();
                $(
                    {
                        let slots = Arc::clone(slots);
                        let poke = Arc::clone(poke);
                        subs.push(self.$idx.watch(Arc::new(move |value| {
                            lock(&slots).$idx = Some(value);
                            poke();
                        })));
                    }
                )+
                subs
            }

            fn values(slots: &Self::Slots) -> Option<($($value,)+)> {
                Some(($(slots.$idx.clone()?,)+))
            }
        }
    };
}

impl_inputs!((W0, T0, 0));
impl_inputs!((W0, T0, 0), (W1, T1, 1));
impl_inputs!((W0, T0, 0), (W1, T1, 1), (W2, T2, 2));
impl_inputs!((W0, T0, 0), (W1, T1, 1), (W2, T2, 2), (W3, T3, 3));
impl_inputs!(
    (W0, T0, 0),
    (W1, T1, 1),
    (W2, T2, 2),
    (W3, T3, 3),
    (W4, T4, 4)
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Active,
    Draining { epoch: u64 },
}

struct Shared<S> {
    phase: Phase,
    subs: Vec<Subscription>,
    latest: Option<S>,
    consumers: HashMap<u64, ConsumerSink<S>>,
    next_consumer: u64,
    epoch: u64,
}

struct DerivedCore<S> {
    activate: Box<dyn Fn(&Poke) -> Vec<Subscription> + Send + Sync>,
    reset: Box<dyn Fn() + Send + Sync>,
    recombine: Box<dyn Fn() -> Option<S> + Send + Sync>,
    grace: Duration,
    /// Serializes merge + publish + delivery; two inputs changing at once
    /// become two sequential recombination steps.
    serial: Mutex<()>,
    state: Mutex<Shared<S>>,
}

/// Shared handle to one derived snapshot.
///
/// All consumers observe the same latest value; a late consumer immediately
/// receives the cached snapshot when one exists.
pub struct Derived<S> {
    core: Arc<DerivedCore<S>>,
}

impl<S> Clone for Derived<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

/// Keeps one consumer attached; dropping it detaches.
pub struct Consumer {
    inner: Subscription,
}

impl Consumer {
    /// Detaches explicitly. Equivalent to dropping the handle.
    pub fn detach(mut self) {
        self.inner.cancel();
    }
}

enum Attach {
    Activate,
    Replay,
}

impl<S: Clone + Send + 'static> Derived<S> {
    /// Builds a combinator with the default five-second grace period.
    pub fn new<V, I, F>(inputs: I, merge: F) -> Self
    where
        I: Inputs<V>,
        F: Fn(V) -> S + Send + Sync + 'static,
    {
        Self::with_grace_period(inputs, merge, DEFAULT_GRACE_PERIOD)
    }

    /// Builds a combinator with an explicit grace period.
    pub fn with_grace_period<V, I, F>(inputs: I, merge: F, grace: Duration) -> Self
    where
        I: Inputs<V>,
        F: Fn(V) -> S + Send + Sync + 'static,
    {
        let slots: Arc<Mutex<I::Slots>> = Arc::new(Mutex::new(I::Slots::default()));

        let activate = {
            let slots = Arc::clone(&slots);
            move |poke: &Poke| inputs.attach(&slots, poke)
        };
        let reset = {
            let slots = Arc::clone(&slots);
            move || {
                *lock(&slots) = I::Slots::default();
            }
        };
        let recombine = move || I::values(&lock(&slots)).map(&merge);

        Self {
            core: Arc::new(DerivedCore {
                activate: Box::new(activate),
                reset: Box::new(reset),
                recombine: Box::new(recombine),
                grace,
                serial: Mutex::new(()),
                state: Mutex::new(Shared {
                    phase: Phase::Idle,
                    subs: Vec::new(),
                    latest: None,
                    consumers: HashMap::new(),
                    next_consumer: 0,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Attaches a consumer. The first consumer subscribes the inputs; a
    /// consumer attaching while a snapshot is cached receives it at once.
    ///
    /// The callback runs on whichever thread performed the triggering write;
    /// it must return promptly and must not synchronously mutate the store.
    pub fn subscribe(&self, on_state: impl Fn(&S) + Send + Sync + 'static) -> Consumer {
        let sink: ConsumerSink<S> = Arc::new(on_state);
        let (id, action) = {
            let mut shared = lock(&self.core.state);
            let id = shared.next_consumer;
            shared.next_consumer += 1;
            shared.consumers.insert(id, Arc::clone(&sink));
            let action = match shared.phase {
                Phase::Idle => Attach::Activate,
                Phase::Active | Phase::Draining { .. } => Attach::Replay,
            };
            shared.phase = Phase::Active;
            (id, action)
        };

        match action {
            Attach::Activate => {
                (self.core.reset)();
                let poke = DerivedCore::poke_handle(&self.core);
                let subs = (self.core.activate)(&poke);
                lock(&self.core.state).subs = subs;
            }
            Attach::Replay => {
                // Same serial discipline as poke, so a replay can never be
                // delivered after a newer snapshot it predates.
                let _serial = lock(&self.core.serial);
                let latest = lock(&self.core.state).latest.clone();
                if let Some(value) = latest {
                    sink(&value);
                }
            }
        }

        let weak = Arc::downgrade(&self.core);
        Consumer {
            inner: Subscription::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.detach(id);
                }
            }),
        }
    }

    /// Returns the cached combined value, `None` while unset.
    pub fn latest(&self) -> Option<S> {
        lock(&self.core.state).latest.clone()
    }
}

impl<S: Clone + Send + 'static> DerivedCore<S> {
    fn poke_handle(core: &Arc<Self>) -> Poke {
        let weak = Arc::downgrade(core);
        Arc::new(move || {
            if let Some(core) = weak.upgrade() {
                core.poke();
            }
        })
    }

    fn poke(self: &Arc<Self>) {
        let _serial = lock(&self.serial);
        let value = match (self.recombine)() {
            Some(value) => value,
            None => return,
        };
        let sinks: Vec<ConsumerSink<S>> = {
            let mut shared = lock(&self.state);
            if shared.phase == Phase::Idle {
                return;
            }
            shared.latest = Some(value.clone());
            shared.consumers.values().cloned().collect()
        };
        for sink in sinks {
            sink(&value);
        }
    }

    fn detach(self: &Arc<Self>, id: u64) {
        let drain_epoch = {
            let mut shared = lock(&self.state);
            shared.consumers.remove(&id);
            if shared.consumers.is_empty() && matches!(shared.phase, Phase::Active) {
                shared.epoch += 1;
                shared.phase = Phase::Draining {
                    epoch: shared.epoch,
                };
                Some(shared.epoch)
            } else {
                None
            }
        };
        if let Some(epoch) = drain_epoch {
            Self::start_drain(self, epoch);
        }
    }

    fn start_drain(core: &Arc<Self>, epoch: u64) {
        let weak = Arc::downgrade(core);
        let grace = core.grace;
        let spawned = thread::Builder::new()
            .name("derived-drain".into())
            .spawn(move || {
                thread::sleep(grace);
                let core = match weak.upgrade() {
                    Some(core) => core,
                    None => return,
                };
                let subs = {
                    let mut shared = lock(&core.state);
                    match shared.phase {
                        Phase::Draining { epoch: current } if current == epoch => {
                            shared.phase = Phase::Idle;
                            shared.latest = None;
                            // Slots clear under the same lock as the phase
                            // change; emissions from a consumer attaching
                            // right after must never be wiped.
                            (core.reset)();
                            std::mem::take(&mut shared.subs)
                        }
                        // A consumer re-attached; keep everything live.
                        _ => Vec::new(),
                    }
                };
                drop(subs);
            });
        if let Err(err) = spawned {
            error!("event=derived_drain module=reactive status=error error={err}");
        }
    }
}


//! In-process progression event notifications.
//!
//! Milestone mutations (level-ups, quest completions, achievement unlocks,
//! streak extensions) publish a [`ProgressionEvent`] to every live
//! subscriber **after** the owning transaction commits. A rolled back batch
//! never produces events.
//!
//! # Architecture
//!
//! ```text
//! apply_attempt ──commit──▶ EventBus ──try_send──▶ EventSubscriber (sync recv)
//!                                   └─────────────▶ EventStream (async poll)
//! ```
//!
//! Each subscriber owns a bounded `crossbeam-channel` queue. Publishing
//! never blocks the mutation path: when a subscriber's queue is full the
//! event is dropped for that subscriber and a warning is logged. Subscribers
//! whose receiving half has been dropped are pruned on the next publish.
//!
//! The async side is a `futures-core` [`Stream`] bridged with
//! [`AtomicWaker`], so UIs can `.await` celebration events without this
//! crate pulling in an executor.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use atomic_waker::AtomicWaker;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use futures_core::Stream;
use tracing::{debug, warn};

use crate::types::{AchievementId, LearnerId, QuestId};

// ============================================================================
// ProgressionEvent
// ============================================================================

/// A milestone crossed by a committed mutation.
///
/// Events describe state *after* the commit: a `LevelUp { level: 3 }` means
/// the learner is now level 3.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressionEvent {
    /// Total XP crossed one or more level thresholds.
    LevelUp {
        /// The learner who leveled up.
        learner_id: LearnerId,
        /// The level reached.
        level: u32,
        /// Lifetime XP after the award that triggered the level-up.
        total_xp: u64,
    },

    /// A quest assignment reached its goal.
    QuestCompleted {
        /// The learner who completed the quest.
        learner_id: LearnerId,
        /// The completed quest.
        quest_id: QuestId,
        /// One-time XP granted for the completion.
        reward_xp: u64,
    },

    /// An achievement rule was satisfied for the first time.
    AchievementUnlocked {
        /// The learner who unlocked the achievement.
        learner_id: LearnerId,
        /// The unlocked achievement.
        achievement_id: AchievementId,
        /// Display title from the catalog.
        title: String,
        /// One-time XP granted for the unlock.
        reward_xp: u64,
    },

    /// The daily streak grew by one day.
    StreakExtended {
        /// The learner whose streak grew.
        learner_id: LearnerId,
        /// The streak length after extension.
        daily_streak: u32,
    },
}

impl ProgressionEvent {
    /// Returns the learner this event belongs to.
    pub fn learner_id(&self) -> LearnerId {
        match self {
            Self::LevelUp { learner_id, .. }
            | Self::QuestCompleted { learner_id, .. }
            | Self::AchievementUnlocked { learner_id, .. }
            | Self::StreakExtended { learner_id, .. } => *learner_id,
        }
    }

    /// Returns a stable label for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LevelUp { .. } => "level_up",
            Self::QuestCompleted { .. } => "quest_completed",
            Self::AchievementUnlocked { .. } => "achievement_unlocked",
            Self::StreakExtended { .. } => "streak_extended",
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// One registered subscriber: its queue plus the waker that parks its
/// async stream.
#[derive(Debug)]
struct BusSlot {
    sender: Sender<ProgressionEvent>,
    waker: Arc<AtomicWaker>,
}

/// Fan-out hub owned by the engine.
///
/// Publishing walks the subscriber list under a short mutex hold; each
/// send is a lock-free `try_send` into that subscriber's bounded queue.
#[derive(Debug)]
pub(crate) struct EventBus {
    slots: Mutex<Vec<BusSlot>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a bus whose subscribers buffer up to `capacity` events.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Registers a new subscriber with an empty queue.
    pub(crate) fn subscribe(&self) -> EventSubscriber {
        let (sender, receiver) = bounded(self.capacity);
        let waker = Arc::new(AtomicWaker::new());

        let mut slots = self.lock_slots();
        slots.push(BusSlot {
            sender,
            waker: Arc::clone(&waker),
        });
        debug!(subscribers = slots.len(), "Event subscriber registered");

        EventSubscriber { receiver, waker }
    }

    /// Delivers `event` to every live subscriber.
    ///
    /// Slots whose receiver was dropped are pruned. A full queue drops this
    /// event for that subscriber only.
    pub(crate) fn publish(&self, event: ProgressionEvent) {
        let mut slots = self.lock_slots();
        slots.retain(|slot| match slot.sender.try_send(event.clone()) {
            Ok(()) => {
                slot.waker.wake();
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(kind = event.kind(), "Subscriber queue full, event dropped");
                // Wake anyway: the stalled consumer may be parked.
                slot.waker.wake();
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers (stale slots pruned on publish).
    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock_slots().len()
    }

    /// Locks the slot list, recovering from a poisoned mutex.
    ///
    /// Nothing panics while holding this lock, so poisoning is
    /// unreachable in practice; recovery keeps publish infallible.
    fn lock_slots(&self) -> std::sync::MutexGuard<'_, Vec<BusSlot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ============================================================================
// EventSubscriber (sync)
// ============================================================================

/// Synchronous receiving half of a subscription.
///
/// Obtained from `Stryde::subscribe`. Events queue up until received;
/// dropping the subscriber unregisters it on the next publish.
#[derive(Debug)]
pub struct EventSubscriber {
    receiver: Receiver<ProgressionEvent>,
    waker: Arc<AtomicWaker>,
}

impl EventSubscriber {
    /// Returns the next queued event, if any, without blocking.
    pub fn try_recv(&self) -> Option<ProgressionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Blocks up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or when the engine (and with it the bus)
    /// has been dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressionEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Converts this subscription into an async [`Stream`].
    pub fn into_stream(self) -> EventStream {
        EventStream {
            receiver: self.receiver,
            waker: self.waker,
        }
    }
}

// ============================================================================
// EventStream (async)
// ============================================================================

/// Async receiving half of a subscription.
///
/// Yields events as they are published and ends (`None`) once the engine
/// is dropped. Runtime-agnostic: any executor that polls `Stream` works.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<ProgressionEvent>,
    waker: Arc<AtomicWaker>,
}

impl Stream for EventStream {
    type Item = ProgressionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Fast path: something is already queued.
        match this.receiver.try_recv() {
            Ok(event) => return Poll::Ready(Some(event)),
            Err(TryRecvError::Disconnected) => return Poll::Ready(None),
            Err(TryRecvError::Empty) => {}
        }

        // Park, then re-check to close the race with a concurrent publish
        // that fired between try_recv and register.
        this.waker.register(cx.waker());
        match this.receiver.try_recv() {
            Ok(event) => Poll::Ready(Some(event)),
            Err(TryRecvError::Disconnected) => Poll::Ready(None),
            Err(TryRecvError::Empty) => Poll::Pending,
        }
    }
}

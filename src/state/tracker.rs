//! Change tracking for objects whose derived data (cached copies, validated pipes) may go
//! stale.
//!
//! A [`StateTrackableDelegate`] owns the trackability state of one object and mints
//! [`StateTracker`] tokens. A token answers "has the object changed since I was issued?"
//! with a single atomic load, so callers can poll it on every draw.

use crate::foundation::error::{GfxError, GfxResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Trackability of an object's contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Contents never change again.
    Immutable,
    /// Contents change only through tracked mutations.
    Stable,
    /// Contents change through an untracked channel while dynamic agents are attached.
    Dynamic,
    /// Contents can change at any time.
    Untrackable,
}

/// Freshness token minted by a [`StateTrackableDelegate`].
///
/// Once a token reports stale it never reports current again. Equality is token identity:
/// two tokens compare equal when they were minted from the same object state.
#[derive(Clone, Debug)]
pub enum StateTracker {
    /// Issued for immutable objects.
    AlwaysCurrent,
    /// Issued for dynamic and untrackable objects, and used as the "no snapshot yet" value.
    NeverCurrent,
    /// Issued for stable objects; current while the owner's epoch is unchanged.
    Epoch { shared: Arc<AtomicU64>, epoch: u64 },
    /// Current for a fixed number of queries. Used to schedule retries.
    Countdown(Arc<AtomicI64>),
}

impl StateTracker {
    /// A tracker that reports current for exactly `checks` queries.
    pub fn countdown(checks: u32) -> Self {
        Self::Countdown(Arc::new(AtomicI64::new(checks as i64)))
    }

    pub fn is_current(&self) -> bool {
        match self {
            Self::AlwaysCurrent => true,
            Self::NeverCurrent => false,
            Self::Epoch { shared, epoch } => shared.load(Ordering::Acquire) == *epoch,
            Self::Countdown(left) => left.fetch_sub(1, Ordering::AcqRel) > 0,
        }
    }
}

impl PartialEq for StateTracker {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AlwaysCurrent, Self::AlwaysCurrent) => true,
            (Self::NeverCurrent, Self::NeverCurrent) => true,
            (
                Self::Epoch { shared: a, epoch: ea },
                Self::Epoch { shared: b, epoch: eb },
            ) => Arc::ptr_eq(a, b) && ea == eb,
            (Self::Countdown(a), Self::Countdown(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Anything that can hand out freshness tokens for its contents.
pub trait StateTrackable {
    fn state(&self) -> State;
    fn state_tracker(&self) -> StateTracker;
}

#[derive(Debug)]
struct DelegateInner {
    state: State,
    dynamic_agents: u32,
}

/// Owns the trackability state of one object.
///
/// State transitions are serialized by a narrow per-object lock. `mark_dirty` does not take
/// the lock: it bumps the epoch with a single atomic increment, so a write racing with
/// `state_tracker` may hand out a token that goes stale immediately. It never produces a
/// token that stays current across a later write.
#[derive(Debug)]
pub struct StateTrackableDelegate {
    epoch: Arc<AtomicU64>,
    inner: Mutex<DelegateInner>,
}

impl StateTrackableDelegate {
    pub fn new(state: State) -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            inner: Mutex::new(DelegateInner {
                state,
                dynamic_agents: 0,
            }),
        }
    }

    pub fn immutable() -> Self {
        Self::new(State::Immutable)
    }

    pub fn untrackable() -> Self {
        Self::new(State::Untrackable)
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Return a token for the current contents.
    ///
    /// Repeated calls without an intervening change return equal tokens.
    pub fn state_tracker(&self) -> StateTracker {
        let inner = self.inner.lock();
        match inner.state {
            State::Immutable => StateTracker::AlwaysCurrent,
            State::Stable => StateTracker::Epoch {
                shared: Arc::clone(&self.epoch),
                epoch: self.epoch.load(Ordering::Acquire),
            },
            State::Dynamic | State::Untrackable => StateTracker::NeverCurrent,
        }
    }

    /// Record a content change. Every token issued so far goes stale.
    pub fn mark_dirty(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn set_immutable(&self) -> GfxResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Immutable => return Ok(()),
            State::Dynamic | State::Untrackable => {
                return Err(GfxError::illegal_state(
                    "dynamic or untrackable objects cannot become immutable",
                ));
            }
            State::Stable => inner.state = State::Immutable,
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn set_untrackable(&self) -> GfxResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Untrackable => return Ok(()),
            State::Immutable => {
                return Err(GfxError::illegal_state(
                    "immutable objects cannot become untrackable",
                ));
            }
            State::Stable | State::Dynamic => inner.state = State::Untrackable,
        }
        self.mark_dirty();
        Ok(())
    }

    /// Attach an agent that mutates the contents outside tracked channels. Immutable objects
    /// admit no such agents.
    pub fn add_dynamic_agent(&self) -> GfxResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Untrackable => return Ok(()),
            State::Immutable => {
                return Err(GfxError::illegal_state(
                    "immutable objects cannot take dynamic agents",
                ));
            }
            State::Stable | State::Dynamic => {}
        }
        inner.dynamic_agents += 1;
        if inner.state == State::Stable {
            inner.state = State::Dynamic;
            self.mark_dirty();
        }
        Ok(())
    }

    /// Detach an agent added by [`Self::add_dynamic_agent`]. The object returns to stable once
    /// the last agent detaches.
    pub fn remove_dynamic_agent(&self) -> GfxResult<()> {
        let mut inner = self.inner.lock();
        if inner.dynamic_agents == 0 {
            if inner.state == State::Untrackable {
                return Ok(());
            }
            return Err(GfxError::illegal_state(
                "remove_dynamic_agent without matching add",
            ));
        }
        inner.dynamic_agents -= 1;
        if inner.dynamic_agents == 0 && inner.state == State::Dynamic {
            inner.state = State::Stable;
            self.mark_dirty();
        }
        Ok(())
    }

    pub fn dynamic_agents(&self) -> u32 {
        self.inner.lock().dynamic_agents
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/tracker.rs"]
mod tests;

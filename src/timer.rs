// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cancellable one-shot timer handle.
//!
//! A [`Timer`] is a deadline owned by one state machine. Arming always
//! replaces the previous deadline, so at most one expiry is outstanding per
//! timer. Event loops wait on [`Timer::expired`] inside `tokio::select!`;
//! a disarmed timer never completes.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// A cancellable deadline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Creates a disarmed timer.
    pub(crate) const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arms the timer to expire `after` from now, cancelling any prior deadline.
    pub(crate) fn arm(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    /// Re-arms a periodic timer one `period` after its previous deadline.
    ///
    /// Falls back to [`arm`](Self::arm) when the timer was not armed.
    pub(crate) fn rearm(&mut self, period: Duration) {
        self.deadline = Some(match self.deadline {
            Some(previous) => previous + period,
            None => Instant::now() + period,
        });
    }

    /// Cancels the timer. Returns true if it was armed.
    pub(crate) fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Returns true if the timer is armed.
    pub(crate) fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns a future completing at the current deadline.
    ///
    /// The future does not borrow the timer; re-arming afterwards does not
    /// affect it.
    pub(crate) fn expired(&self) -> impl Future<Output = ()> + use<> {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}

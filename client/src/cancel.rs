// Registrar Client
// Copyright (C) 2020 Monadic GmbH <radicle@monadic.xyz>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3 as
// published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Cooperative cancellation of registration attempts.
//!
//! [cancellation] returns a [CancelHandle] and a [CancelToken]. The token is raced against every
//! suspension point of an attempt. Dropping the handle without calling [CancelHandle::cancel]
//! never cancels.

use std::future::Future;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, Either, FutureExt as _, Shared};

/// Returned by [CancelToken::run] when the token fired first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("The operation was cancelled")]
pub struct Cancelled;

/// Create a connected [CancelHandle] and [CancelToken].
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = oneshot::channel::<()>();
    let signal = receiver.map(|received| received.is_ok()).boxed().shared();
    (CancelHandle { sender }, CancelToken { signal })
}

/// Requests cancellation of everything guarded by the connected [CancelToken].
#[derive(Debug)]
pub struct CancelHandle {
    sender: oneshot::Sender<()>,
}

impl CancelHandle {
    pub fn cancel(self) {
        // The tokens may all be gone already.
        let _ = self.sender.send(());
    }
}

#[derive(Clone)]
pub struct CancelToken {
    signal: Shared<BoxFuture<'static, bool>>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancelToken {
            signal: future::pending::<bool>().boxed().shared(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.clone().now_or_never() == Some(true)
    }

    /// Resolves once cancellation was requested.
    pub async fn cancelled(&self) {
        if !self.signal.clone().await {
            // The handle was dropped without cancelling.
            future::pending::<()>().await
        }
    }

    /// Drive `work` unless the token fires first.
    pub async fn run<F: Future>(&self, work: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        let cancelled = self.cancelled();
        futures::pin_mut!(work, cancelled);
        match future::select(work, cancelled).await {
            Either::Left((output, _)) => Ok(output),
            Either::Right(((), _)) => Err(Cancelled),
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "CancelToken(cancelled: {})", self.is_cancelled())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[async_std::test]
    async fn run_completes_without_cancellation() {
        let (_handle, token) = cancellation();
        assert_eq!(token.run(async { 42 }).await, Ok(42));
        assert!(!token.is_cancelled());
    }

    #[async_std::test]
    async fn cancel_interrupts_a_pending_future() {
        let (handle, token) = cancellation();
        let guarded = token.clone();
        let task = async_std::task::spawn(async move {
            guarded.run(future::pending::<()>()).await
        });
        handle.cancel();
        assert_eq!(task.await, Err(Cancelled));
        assert!(token.is_cancelled());
    }

    #[async_std::test]
    async fn cancelled_tokens_do_not_start_work() {
        let (handle, token) = cancellation();
        handle.cancel();
        assert_eq!(token.run(async { 42 }).await, Err(Cancelled));
    }

    #[async_std::test]
    async fn dropping_the_handle_does_not_cancel() {
        let (handle, token) = cancellation();
        drop(handle);
        assert!(!token.is_cancelled());
        assert_eq!(token.run(async { 7 }).await, Ok(7));
        assert!(!CancelToken::never().is_cancelled());
    }
}

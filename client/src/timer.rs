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

//! Abstraction over waiting so that tests can run against an emulated clock.

use std::time::Duration;

/// Source of sleeps for backoff, timeouts and the maturity wait.
#[async_trait::async_trait]
pub trait Timer: Send + Sync {
    /// Resolve after at least `duration` has passed.
    async fn sleep(&self, duration: Duration);
}

/// [Timer] using the wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimer;

#[async_trait::async_trait]
impl Timer for SystemTimer {
    async fn sleep(&self, duration: Duration) {
        async_std::task::sleep(duration).await
    }
}

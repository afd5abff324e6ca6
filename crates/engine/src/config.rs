// Copyright (C) 2019-2026 Provable Inc.
// This file is part of the Peggy library.

// The Peggy library is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// The Peggy library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with the Peggy library. If not, see <https://www.gnu.org/licenses/>.

/// How the engine responds to a match failure that would otherwise abort the
/// whole parse. See the recovery controller (component I) for the mechanics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RecoveryStrategy {
    /// The first `ParseError` is returned; no diagnostic is assembled.
    #[default]
    None,
    /// A diagnostic is recorded for the first failure, then parsing aborts.
    Basic,
    /// Failures are absorbed by synchronisation-token skipping and `Error`
    /// CST node synthesis, up to the cascade bound.
    Advanced,
}

/// Immutable per-parse configuration, resolved once by the facade and
/// threaded through the whole engine run.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub packrat_enabled: bool,
    pub recovery: RecoveryStrategy,
    pub capture_trivia: bool,
    /// Cascade bound: the maximum number of synthesised `Error` nodes per
    /// parse before recovery converts into a hard failure (default 100, §4.E).
    pub cascade_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { packrat_enabled: true, recovery: RecoveryStrategy::default(), capture_trivia: true, cascade_limit: 100 }
    }
}

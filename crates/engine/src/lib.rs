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

//! PEG execution engine (component G) and recovery controller (component I):
//! the backtracking interpreter over a compiled [`peggy_tree::Grammar`],
//! including packrat memoisation, trivia skipping, named captures, token
//! boundaries, and CST/AST construction.

mod cache;
mod captures;
mod charclass;
mod compiled;
mod config;
mod dictionary;
mod engine;
mod recovery;

pub use compiled::CompiledGrammar;
pub use config::{EngineConfig, RecoveryStrategy};
pub use engine::{run, EngineOutcome};

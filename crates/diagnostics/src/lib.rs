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

//! Diagnostic model, fatal error types, and Rust-style source rendering.
//!
//! This crate is the error-handling backbone of the toolkit: [`Diagnostic`]
//! and [`Handler`] are the recoverable/accumulating side, [`ParseError`] and
//! [`Result`] are the fatal side, and [`render`] turns a diagnostic into the
//! multi-line annotated text a terminal or editor would show.

mod diagnostic;
mod error;
mod handler;
mod render;
mod severity;

pub use diagnostic::{Diagnostic, Label, LspDiagnostic};
pub use error::{ParseError, Result};
pub use handler::Handler;
pub use render::{render, render_all};
pub use severity::Severity;

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

use peggy_span::Location;
use thiserror::Error;

/// The fatal error family returned at the API boundary, per the propagation
/// policy: in NONE/BASIC recovery modes the innermost failure is surfaced
/// unchanged (modulo `errorMessage` overrides); in ADVANCED mode only
/// failures the recovery controller cannot absorb reach here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input did not match at `location`.
    #[error("unexpected input at {location}: found {found}, expected {expected}")]
    UnexpectedInput { location: Location, found: String, expected: String },

    /// The input ended before the grammar demanded more.
    #[error("unexpected end of input at {location}: expected {expected}")]
    UnexpectedEof { location: Location, expected: String },

    /// Raised by the validator, the grammar parser, or a user predicate.
    #[error("semantic error at {location}: {reason}")]
    SemanticError { location: Location, reason: String },

    /// An external action callback threw.
    #[error("action error at {location} in `{action}`: {cause}")]
    ActionError { location: Location, action: String, cause: String },
}

impl ParseError {
    pub fn location(&self) -> Location {
        match self {
            ParseError::UnexpectedInput { location, .. }
            | ParseError::UnexpectedEof { location, .. }
            | ParseError::SemanticError { location, .. }
            | ParseError::ActionError { location, .. } => *location,
        }
    }

    /// User-visible rendering: `"<reason> at <line>:<column>"`.
    pub fn user_message(&self) -> String {
        let loc = self.location();
        let reason = match self {
            ParseError::UnexpectedInput { found, expected, .. } => {
                format!("unexpected input: found {found}, expected {expected}")
            }
            ParseError::UnexpectedEof { expected, .. } => format!("unexpected end of input, expected {expected}"),
            ParseError::SemanticError { reason, .. } => reason.clone(),
            ParseError::ActionError { cause, .. } => cause.clone(),
        };
        format!("{reason} at {loc}")
    }
}

/// Convenience alias used throughout the toolkit, matching the ambient
/// `Result<T>` alias pattern used across the crate family this was grounded on.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use peggy_span::Location;

    use super::*;

    #[test]
    fn user_message_matches_expected_shape() {
        let err = ParseError::UnexpectedInput {
            location: Location::new(1, 1, 0),
            found: "'b'".into(),
            expected: "'a'".into(),
        };
        assert_eq!(err.user_message(), "unexpected input: found 'b', expected 'a' at 1:1");
    }
}

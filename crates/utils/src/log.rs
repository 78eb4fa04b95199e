// This file is part of Conduit.
//
// Conduit is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Conduit is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Conduit.
// If not, see https://www.gnu.org/licenses/.

//! Helper traits for logging failures without losing the original error

use std::fmt::{Debug, Display};

use tracing::Level;

/// Log the error of a result-like value, keeping the original type
pub trait LogOnError: Sized {
    /// Log at `ERROR` if this is a failure
    fn log_on_error<C: Display>(self, context: C) -> Self {
        self.log_on_error_level(Level::ERROR, context)
    }

    /// Log at `level` if this is a failure
    fn log_on_error_level<C: Display>(self, level: Level, context: C) -> Self;
}

impl<T, E: Debug> LogOnError for Result<T, E> {
    fn log_on_error_level<C: Display>(self, level: Level, context: C) -> Self {
        if let Err(error) = &self {
            log_at_level(level, &format!("{context}: {error:?}"));
        }
        self
    }
}

impl<T> LogOnError for Option<T> {
    fn log_on_error_level<C: Display>(self, level: Level, context: C) -> Self {
        if self.is_none() {
            log_at_level(level, &context.to_string());
        }
        self
    }
}

fn log_at_level(level: Level, message: &str) {
    match level {
        Level::TRACE => tracing::trace!("{message}"),
        Level::DEBUG => tracing::debug!("{message}"),
        Level::INFO => tracing::info!("{message}"),
        Level::WARN => tracing::warn!("{message}"),
        Level::ERROR => tracing::error!("{message}"),
    }
}

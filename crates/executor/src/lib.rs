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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
//! Bundle execution engine for Conduit.
//!
//! Turns batches of user operations into signed `handleOps` transactions, keeps them
//! moving with fee bumped replacements and unsticks sending accounts.

mod bundle_tx;

mod emit;
pub use emit::{ExecutorEvent, ExecutorEventKind};

mod error;
pub use error::ExecutorError;

mod executor;
pub use executor::Executor;

mod gas;

mod sender;
pub use sender::TxSenderError;

mod settings;
pub use settings::ExecutorSettings;

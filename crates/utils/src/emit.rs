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

//! Event channel helpers shared by the execution engine and its consumers

use std::fmt::Display;

use alloy_primitives::Address;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Capacity of the event channels.
///
/// Events carry op and transaction hashes only, so a few thousand slots is cheap.
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// An event tagged with the entry point it belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithEntryPoint<T> {
    /// Entry point address associated with the event
    pub entry_point: Address,
    /// The event itself
    pub event: T,
}

impl<T> WithEntryPoint<T> {
    /// Tag `event` with `entry_point`
    pub fn new(entry_point: Address, event: T) -> Self {
        Self { entry_point, event }
    }
}

impl<T: Display> Display for WithEntryPoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}    Entrypoint: {:?}", self.event, self.entry_point)
    }
}

/// Send an event, ignoring the case where nobody is listening
pub fn emit<T>(sender: &broadcast::Sender<WithEntryPoint<T>>, entry_point: Address, event: T) {
    let _ = sender.send(WithEntryPoint::new(entry_point, event));
}

/// Spawn a task calling `handler` for every event received on `rx`
pub fn receive_events<T>(
    description: &'static str,
    mut rx: broadcast::Receiver<T>,
    handler: impl Fn(T) + Send + 'static,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handler(event),
                Err(RecvError::Closed) => {
                    info!("Event stream for {description} closed");
                    break;
                }
                Err(RecvError::Lagged(count)) => {
                    warn!("Event stream for {description} lagged. Missed {count} messages.")
                }
            }
        }
    })
}

/// Log every event on `rx` at `INFO`
pub fn receive_and_log_events<T>(rx: broadcast::Receiver<T>) -> JoinHandle<()>
where
    T: Clone + Display + Send + 'static,
{
    receive_events("logging", rx, |event| info!("{event}"))
}

//! Room transport: newline-delimited JSON room events.
//!
//! * [`parse_line`] / [`RoomEvent`]: the wire format.
//! * [`Room`]: one event stream feeding one
//!   [`SessionRegistry`](crate::pipeline::SessionRegistry).
//! * [`serve`]: TCP listener, one room per connection.
//!
//! Development mode runs a single [`Room`] over stdin.

pub mod event;
pub mod room;
pub mod server;

pub use event::{parse_line, RoomEvent, TransportError};
pub use room::Room;
pub use server::{bind, serve, RoomFactory};

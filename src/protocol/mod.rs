//! Client side of the VNDB TCP query protocol.
//!
//! This module defines how requests are framed, encoded and exchanged with the
//! server and how the replies are interpreted. It is layered bottom-up:
//!
//! - [`FramedTransport`]: owns the stream and moves whole messages across it.
//! - [`Command`]: typed encoder for the `login`, `dbstats`, `get` and `set`
//!   commands.
//! - [`Reply`]: decoder classifying a reply as a bare status, a data object or
//!   an error object.
//! - [`Session`]: the request/reply cycle tying the three together.
//!
//! # Wire Format
//!
//! Every request and reply is UTF-8 text terminated by a single `0x04` byte:
//!
//! ```text
//! login {"protocol":1,"client":"vndump","clientver":0.1}\x04
//! dbstats\x04
//! get vn basic (id = [1, 2, 3]) {"page":1,"results":25,"sort":"id"}\x04
//! set vnlist 12 {"status":2}\x04
//! ```
//!
//! Replies are either a bare token (`ok`) or `<keyword> <json-object>`. An
//! object carrying a top-level `id` key is an error, whatever its keyword; the
//! `throttled` error additionally carries `fullwait`, the number of seconds to
//! pause before repeating the request.
//!
//! # See Also
//!
//! - [`fetch`](crate::fetch): Pagination built on top of [`Session::get`].
mod command;
mod reply;
mod session;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{Command, CommandError, GetOptions, IdFilter, Login};
pub use reply::{
    ErrorKind, PageReply, Record, Reply, ReplyError, ResultPage, ServerError, Stats,
};
pub use session::{Session, SessionError};
pub use transport::{Connection, DELIMITER, FramedTransport, TransportError};

//! Reply delivery
//!
//! Pairs decoded replies with callers waiting for them, in order.

use std::io::Read;

use crossbeam::channel::{Receiver, Sender, TrySendError};

use crate::error::Result;

use super::{ReplyDecoder, Value};

/// Deliver every decoded reply to the next waiting caller.
///
/// Each caller registers by sending a reply `Sender` on `reply_to` before
/// (or while) its reply is on the wire. A reply whose caller is no longer
/// listening is dropped. Returns `Ok(())` at clean end of stream or once
/// `reply_to` disconnects; a decode error ends delivery and is returned.
pub fn serve_replies<R: Read>(
    decoder: &mut ReplyDecoder<R>,
    reply_to: &Receiver<Sender<Value>>,
) -> Result<()> {
    while let Some(value) = decoder.decode_next()? {
        let Ok(reply) = reply_to.recv() else {
            tracing::debug!("reply channel closed, stopping delivery");
            return Ok(());
        };
        match reply.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(value)) | Err(TrySendError::Disconnected(value)) => {
                tracing::warn!(reply = %value, "ignoring reply nobody is waiting for");
            }
        }
    }
    Ok(())
}

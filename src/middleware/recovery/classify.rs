//! Dead-connection detection for recovered faults.

use std::error::Error as StdError;
use std::io;

use crate::error::{Error, NetError};

const NEEDLES: [&str; 2] = ["broken pipe", "connection reset by peer"];

/// Reports whether `err` says the client connection is already unusable,
/// so that writing a response is pointless.
///
/// Every level of the cause chain is checked, outermost first:
/// an `io::Error` of kind `BrokenPipe` or `ConnectionReset` matches by
/// type; a [`NetError`] matches on its inner I/O message; any level matches
/// when its own message contains `"broken pipe"` or
/// `"connection reset by peer"`, ignoring case.
///
/// `None` is never broken.
pub fn is_broken_pipe(err: Option<&Error>) -> bool {
    err.is_some_and(|err| err.chain().any(level_is_broken))
}

fn level_is_broken(err: &(dyn StdError + 'static)) -> bool {
    if let Some(io) = err.downcast_ref::<io::Error>() {
        if matches!(io.kind(), io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset) {
            return true;
        }
    }
    if let Some(net) = err.downcast_ref::<NetError>() {
        if mentions_dead_peer(&net.inner().to_string()) {
            return true;
        }
    }
    mentions_dead_peer(&err.to_string())
}

fn mentions_dead_peer(message: &str) -> bool {
    let message = message.to_lowercase();
    NEEDLES.iter().any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    /// An application error that wraps a cause without repeating it.
    #[derive(Debug)]
    struct Flush(NetError);

    impl fmt::Display for Flush {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("flushing response")
        }
    }

    impl StdError for Flush {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    fn net(message: &str) -> NetError {
        NetError::new("write", io::Error::other(message.to_owned()))
    }

    #[test]
    fn none_is_not_broken() {
        assert!(!is_broken_pipe(None));
    }

    #[test]
    fn plain_messages() {
        assert!(is_broken_pipe(Some(&Error::msg("write tcp: Broken Pipe"))));
        assert!(is_broken_pipe(Some(&Error::msg("read: CONNECTION RESET BY PEER"))));
        assert!(!is_broken_pipe(Some(&Error::msg("boom"))));
        assert!(!is_broken_pipe(Some(&Error::msg("connection refused"))));
    }

    #[test]
    fn net_error_deep_in_chain() {
        let err = Error::new(Flush(net("Broken pipe (os error 32)")));
        assert!(is_broken_pipe(Some(&err)));

        let err = Error::new(Flush(net("timed out")));
        assert!(!is_broken_pipe(Some(&err)));
    }

    #[test]
    fn io_kinds_match_without_message() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        assert!(is_broken_pipe(Some(&Error::new(reset))));

        let pipe = NetError::new("write", io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(is_broken_pipe(Some(&Error::new(Flush(pipe)))));

        let other = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(!is_broken_pipe(Some(&Error::new(other))));
    }

    #[test]
    fn same_answer_every_time() {
        let broken = Error::new(net("write: broken pipe"));
        let fine = Error::msg("nil pointer");
        for _ in 0..3 {
            assert!(is_broken_pipe(Some(&broken)));
            assert!(!is_broken_pipe(Some(&fine)));
        }
    }
}

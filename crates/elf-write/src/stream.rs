//! Streaming build mode.
//!
//! [`ImageStream`] is a deferred, run-to-completion rendition of the
//! buffer build: obtaining the handle produces nothing, the first poll
//! runs the entire two-pass build at once, and the resulting chunks are
//! then drained in write order. There is no suspension point inside the
//! build and no cancellation: once started it completes or fails.

use std::collections::VecDeque;

use crate::error::BuildError;
use crate::image::ImageBuilder;

enum State {
    /// Handle exists, build not yet started.
    Pending(Box<ImageBuilder>),
    /// Build finished; chunks wait to be drained.
    Draining(VecDeque<Vec<u8>>),
    /// Stream exhausted or failed.
    Done,
}

/// A pull stream of image chunks.
///
/// Yields each part's bytes as owned chunks, in the exact order the
/// write pass produced them; concatenating every `Ok` chunk gives a
/// byte sequence identical to [`ImageBuilder::build`] output. A
/// write-time error surfaces as a single `Err` item, after which the
/// stream is terminated and no chunk is ever yielded; a failed build
/// produces no output to discard.
pub struct ImageStream {
    state: State,
    written: Option<u64>,
}

impl ImageStream {
    pub(crate) fn new(builder: ImageBuilder) -> Self {
        Self {
            state: State::Pending(Box::new(builder)),
            written: None,
        }
    }

    /// Final write cursor, once the build has run.
    ///
    /// `None` until the stream is first polled.
    #[must_use]
    pub fn bytes_written(&self) -> Option<u64> {
        self.written
    }
}

impl Iterator for ImageStream {
    type Item = Result<Vec<u8>, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Pending(builder) => match builder.build_chunks() {
                    Ok((chunks, written)) => {
                        self.written = Some(written);
                        self.state = State::Draining(chunks);
                    }
                    // State stays Done: partial chunks are dropped.
                    Err(err) => return Some(Err(err)),
                },
                State::Draining(mut chunks) => match chunks.pop_front() {
                    Some(chunk) => {
                        self.state = State::Draining(chunks);
                        return Some(Ok(chunk));
                    }
                    None => return None,
                },
                State::Done => return None,
            }
        }
    }
}

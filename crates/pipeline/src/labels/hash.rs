use xxhash_rust::xxh3::{xxh3_64, Xxh3};

use super::Label;

const SEP: u8 = 0xff;
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Hashes label sequences through one reusable scratch buffer.
#[derive(Debug)]
pub struct Hasher {
    buf: Vec<u8>,
}

impl Hasher {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Hash of the sequence as given. Callers sort first when order must not matter.
    pub fn hash(&mut self, labels: &[Label]) -> u64 {
        self.buf.clear();
        for l in labels {
            self.buf.extend_from_slice(l.name.as_bytes());
            self.buf.push(SEP);
            self.buf.extend_from_slice(l.value.as_bytes());
            self.buf.push(SEP);
        }
        xxh3_64(&self.buf)
    }
}

/// One-off hash of a sequence, streamed without a scratch buffer.
///
/// Equal to [`Hasher::hash`] for the same input.
pub fn hash_labels(labels: &[Label]) -> u64 {
    let mut state = Xxh3::new();
    for l in labels {
        state.update(l.name.as_bytes());
        state.update(&[SEP]);
        state.update(l.value.as_bytes());
        state.update(&[SEP]);
    }
    state.digest()
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// The single binary blob of a glTF document. It only ever grows, except for
/// rolling back to an earlier length after a failed operation.
#[derive(Debug, Default)]
pub struct BufferAllocator {
    data: Vec<u8>,
}

impl BufferAllocator {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Adds zeros to the buffer until it is n-byte aligned. Returns the number
    /// of bytes added.
    pub fn align(&mut self, n: usize) -> usize {
        let padding = padding(self.data.len(), n);
        self.data.resize(self.data.len() + padding, 0);
        padding
    }

    /// Appends bytes at the next n-byte aligned position and returns their offset.
    pub fn append(&mut self, bytes: &[u8], n: usize) -> usize {
        self.align(n);
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Grows the buffer with zeros up to the given length and returns the
    /// newly added range for writing.
    pub fn grow_to(&mut self, length: usize) -> &mut [u8] {
        let start = self.data.len().min(length);
        self.data.resize(length.max(self.data.len()), 0);
        &mut self.data[start..]
    }

    pub fn truncate(&mut self, length: usize) {
        self.data.truncate(length);
    }
}

/// Returns the number of bytes needed to advance `offset` to a multiple of `n`.
pub fn padding(offset: usize, n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (n - offset % n) % n
    }
}

pub fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let rest = a % b;
        a = b;
        b = rest;
    }
    a
}

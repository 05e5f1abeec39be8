//! Prints the first terms of the Fibonacci sequence, produced lazily.

/// Number of terms the sequence yields before it is exhausted.
const TERMS: usize = 9;

/// Single-pass Fibonacci generator starting at 1, 1.
///
/// Terms are computed on demand; once `TERMS` values were produced the
/// iterator stays exhausted.
struct Fibonacci {
    current: u64,
    next: u64,
    remaining: usize,
}

impl Fibonacci {
    fn new() -> Self {
        Self {
            current: 1,
            next: 1,
            remaining: TERMS,
        }
    }
}

impl Iterator for Fibonacci {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let term = self.current;
        self.current = self.next;
        self.next += term;
        Some(term)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Fibonacci {}

impl std::iter::FusedIterator for Fibonacci {}

fn main() {
    for term in Fibonacci::new() {
        println!("{term}");
    }
}

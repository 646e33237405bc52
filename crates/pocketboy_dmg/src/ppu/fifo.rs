/// Fixed eight-slot pixel queue.
///
/// Both FIFOs of the pipeline hold at most one tile row. A ring buffer
/// avoids shifting on pop; `get_mut` exposes queued slots so a later
/// sprite fetch can merge under pixels that are already waiting.
pub struct Fifo<T> {
    slots: [T; 8],
    head: u8,
    len: u8,
}

impl<T: Copy + Default> Fifo<T> {
    pub fn new() -> Fifo<T> {
        Fifo {
            slots: [T::default(); 8],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Append one pixel. The pipeline only pushes into an empty FIFO (or
    /// merges via `get_mut`), so overflow indicates a fetcher bug.
    pub fn push(&mut self, value: T) {
        debug_assert!(self.len < 8, "pixel FIFO overflow");
        let tail = (self.head + self.len) & 0x07;
        self.slots[tail as usize] = value;
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head as usize];
        self.head = (self.head + 1) & 0x07;
        self.len -= 1;
        Some(value)
    }

    /// Mutable access to the i-th queued pixel, front first.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len as usize {
            return None;
        }
        let slot = (self.head as usize + index) & 0x07;
        Some(&mut self.slots[slot])
    }
}

// Mixed-radix counter used to walk every joint assignment of a scope in flat-index order.
//
// Digit 0 is the fastest-moving one. Each call to `advance()` reports the digits it touched,
// in order: zero or more `CarryOver`s followed by at most one `Advance`.
// Callers translate these ticks into incremental updates of their own flat indices,
// so no index is ever recomputed from scratch.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Advance(usize),   // digit at this position was incremented
    CarryOver(usize), // digit at this position wrapped from `radix - 1` back to 0
}

#[derive(Debug)]
pub struct Odometer {
    radices: Vec<usize>,
    digits: Vec<usize>,
}

impl Odometer {
    pub fn new(radices: Vec<usize>) -> Self {
        let digits = vec![0; radices.len()];
        Odometer { radices, digits }
    }

    // Moves to the next assignment, reporting every touched digit to `on_tick`
    pub fn advance(&mut self, mut on_tick: impl FnMut(Tick)) {
        for (position, digit) in self.digits.iter_mut().enumerate() {
            *digit += 1;
            if *digit == self.radices[position] {
                // "Carry over" to initial label
                *digit = 0;
                on_tick(Tick::CarryOver(position));
            } else {
                // "Advance" to next label
                on_tick(Tick::Advance(position));
                return;
            }
        }
    }

    pub fn digits(&self) -> &[usize] {
        &self.digits
    }
}

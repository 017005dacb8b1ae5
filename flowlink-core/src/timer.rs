//! One-shot callback timers for idle-timeout resynchronization
//!
//! Each channel allocates one slot at construction. Every received byte
//! re-arms the slot, so it only fires after a full idle period. The tick
//! context calls [`TimerQueue::expire`] and hands the result to the
//! channels, which run their handler only if the slot was not re-armed or
//! cancelled in between (generation check).
//!
//! Deadlines are `u32` milliseconds that wrap at 2^32. A deadline is
//! reached when `deadline - now` (wrapping) is zero or larger than the
//! longest delay that may be armed, i.e. when it lies in the past.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

/// Longest delay accepted by default (one day)
pub const DEFAULT_MAX_DELAY_MS: u32 = 24 * 60 * 60 * 1000;

/// How far into the past a cancelled deadline is moved
///
/// A tick that was sampled before the cancel must not see the old
/// deadline as due. Start-up with interrupts masked has been seen to let
/// the millisecond counter run several ms ahead of the tick handler.
pub const CANCEL_PADDING_MS: u32 = 1000;

/// Errors from timer allocation and arming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Every slot of the queue is already allocated
    NoFreeSlot,
    /// Requested delay exceeds the queue's maximum
    DelayTooLong,
}

/// Handle to an allocated timer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerSlot(u8);

impl TimerSlot {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    allocated: bool,
    planned: bool,
    deadline: u32,
    /// Bumped on every arm and cancel
    generation: u16,
}

impl Entry {
    const IDLE: Entry = Entry {
        allocated: false,
        planned: false,
        deadline: 0,
        generation: 0,
    };
}

/// Slots that fired during one [`TimerQueue::expire`] call
#[derive(Debug, Clone)]
pub struct Expired<const S: usize> {
    fired: Vec<(TimerSlot, u16), S>,
}

impl<const S: usize> Expired<S> {
    /// Generation the slot fired with, if it fired
    pub fn generation_of(&self, slot: TimerSlot) -> Option<u16> {
        self.fired
            .iter()
            .find(|(fired, _)| *fired == slot)
            .map(|&(_, generation)| generation)
    }

    pub fn contains(&self, slot: TimerSlot) -> bool {
        self.generation_of(slot).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimerSlot> + '_ {
        self.fired.iter().map(|&(slot, _)| slot)
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

/// Fixed set of `S` one-shot timers shared between channels
pub struct TimerQueue<M: RawMutex, const S: usize> {
    max_delay_ms: u32,
    entries: Mutex<M, RefCell<[Entry; S]>>,
}

impl<M: RawMutex, const S: usize> TimerQueue<M, S> {
    const SLOT_RANGE: () = assert!(S <= u8::MAX as usize + 1, "too many timer slots");

    /// Create a queue accepting delays up to `max_delay_ms`
    ///
    /// `max_delay_ms` must stay below 2^31 so past and future deadlines
    /// remain distinguishable.
    pub const fn new(max_delay_ms: u32) -> Self {
        let () = Self::SLOT_RANGE;
        let max_delay_ms = if max_delay_ms > i32::MAX as u32 {
            i32::MAX as u32
        } else {
            max_delay_ms
        };
        Self {
            max_delay_ms,
            entries: Mutex::new(RefCell::new([Entry::IDLE; S])),
        }
    }

    pub const fn max_delay_ms(&self) -> u32 {
        self.max_delay_ms
    }

    /// Reserve a slot
    pub fn allocate(&self) -> Result<TimerSlot, TimerError> {
        self.entries.lock(|entries| {
            let mut entries = entries.borrow_mut();
            let index = entries
                .iter()
                .position(|entry| !entry.allocated)
                .ok_or(TimerError::NoFreeSlot)?;
            entries[index] = Entry {
                allocated: true,
                ..Entry::IDLE
            };
            Ok(TimerSlot(index as u8))
        })
    }

    /// Schedule `slot` to fire `delay_ms` after `now`
    ///
    /// A pending deadline is replaced, not stacked. A zero delay fires at
    /// the next [`expire`](Self::expire).
    pub fn arm(&self, slot: TimerSlot, delay_ms: u32, now: u32) -> Result<(), TimerError> {
        if delay_ms > self.max_delay_ms {
            return Err(TimerError::DelayTooLong);
        }
        self.entries.lock(|entries| {
            let mut entries = entries.borrow_mut();
            let entry = &mut entries[slot.index()];
            entry.deadline = now.wrapping_add(delay_ms);
            entry.planned = true;
            entry.generation = entry.generation.wrapping_add(1);
        });
        Ok(())
    }

    /// Deschedule `slot`
    ///
    /// Effective even against an `expire` that sampled the clock earlier:
    /// the planned flag is cleared, the generation moves on, and the
    /// deadline is padded into the past.
    pub fn cancel(&self, slot: TimerSlot, now: u32) {
        self.entries.lock(|entries| {
            let mut entries = entries.borrow_mut();
            let entry = &mut entries[slot.index()];
            entry.planned = false;
            entry.deadline = now.wrapping_sub(CANCEL_PADDING_MS);
            entry.generation = entry.generation.wrapping_add(1);
        });
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.entries
            .lock(|entries| entries.borrow()[slot.index()].planned)
    }

    /// Milliseconds until `slot` fires, or `None` if it is not armed
    pub fn remaining(&self, slot: TimerSlot, now: u32) -> Option<u32> {
        self.entries.lock(|entries| {
            let entry = entries.borrow()[slot.index()];
            if !entry.planned {
                return None;
            }
            let left = entry.deadline.wrapping_sub(now);
            Some(if left > self.max_delay_ms { 0 } else { left })
        })
    }

    /// Whether `generation` is still the latest event of `slot`
    ///
    /// True only if the slot fired with that generation and has not been
    /// re-armed or cancelled since.
    pub fn is_current(&self, slot: TimerSlot, generation: u16) -> bool {
        self.entries.lock(|entries| {
            let entry = entries.borrow()[slot.index()];
            !entry.planned && entry.generation == generation
        })
    }

    /// Fire every armed slot whose deadline has been reached
    ///
    /// Each fired slot returns to the un-armed state, so it fires once per
    /// arming.
    pub fn expire(&self, now: u32) -> Expired<S> {
        let mut fired = Vec::new();
        self.entries.lock(|entries| {
            for (index, entry) in entries.borrow_mut().iter_mut().enumerate() {
                if !entry.planned {
                    continue;
                }
                let left = entry.deadline.wrapping_sub(now);
                if left == 0 || left > self.max_delay_ms {
                    entry.planned = false;
                    // Capacity is S, one push per slot at most
                    let _ = fired.push((TimerSlot(index as u8), entry.generation));
                }
            }
        });
        Expired { fired }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Queue<const S: usize> = TimerQueue<NoopRawMutex, S>;

    #[test]
    fn test_allocate_until_exhausted() {
        let queue = Queue::<2>::new(DEFAULT_MAX_DELAY_MS);
        let a = queue.allocate().unwrap();
        let b = queue.allocate().unwrap();
        assert_ne!(a, b);
        assert_eq!(queue.allocate(), Err(TimerError::NoFreeSlot));
    }

    #[test]
    fn test_fires_once_at_deadline() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 2000, 100).unwrap();

        assert!(queue.expire(2099).is_empty());
        assert_eq!(queue.remaining(slot, 2099), Some(1));

        let expired = queue.expire(2100);
        assert!(expired.contains(slot));
        assert!(!queue.is_armed(slot));

        assert!(queue.expire(2101).is_empty());
        assert!(queue.expire(5000).is_empty());
    }

    #[test]
    fn test_late_poll_still_fires() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 10, 0).unwrap();
        assert!(queue.expire(250).contains(slot));
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 2000, 0).unwrap();
        queue.arm(slot, 2000, 1500).unwrap();

        assert!(queue.expire(2000).is_empty());
        assert!(queue.expire(3500).contains(slot));
    }

    #[test]
    fn test_deadline_across_wrap() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        let now = u32::MAX - 500;
        queue.arm(slot, 2000, now).unwrap();

        assert!(queue.expire(u32::MAX).is_empty());
        assert!(queue.expire(1000).is_empty());
        assert_eq!(queue.remaining(slot, 1000), Some(499));
        assert!(queue.expire(1499).contains(slot));
    }

    #[test]
    fn test_zero_delay_fires_next_poll() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 0, 42).unwrap();
        assert!(queue.expire(42).contains(slot));
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 5, 0).unwrap();
        queue.cancel(slot, 3);

        assert!(!queue.is_armed(slot));
        assert_eq!(queue.remaining(slot, 5), None);
        assert!(queue.expire(5).is_empty());
        assert!(queue.expire(4).is_empty());
    }

    #[test]
    fn test_delay_too_long() {
        let queue = Queue::<1>::new(1000);
        let slot = queue.allocate().unwrap();
        assert_eq!(queue.arm(slot, 1001, 0), Err(TimerError::DelayTooLong));
        assert!(!queue.is_armed(slot));
    }

    #[test]
    fn test_generation_goes_stale_on_rearm() {
        let queue = Queue::<1>::new(DEFAULT_MAX_DELAY_MS);
        let slot = queue.allocate().unwrap();
        queue.arm(slot, 10, 0).unwrap();

        let expired = queue.expire(10);
        let generation = expired.generation_of(slot).unwrap();
        assert!(queue.is_current(slot, generation));

        // A byte arrives before the handler runs
        queue.arm(slot, 10, 11).unwrap();
        assert!(!queue.is_current(slot, generation));
    }

    #[test]
    fn test_slots_are_independent() {
        let queue = Queue::<3>::new(DEFAULT_MAX_DELAY_MS);
        let a = queue.allocate().unwrap();
        let b = queue.allocate().unwrap();
        let c = queue.allocate().unwrap();
        queue.arm(a, 10, 0).unwrap();
        queue.arm(b, 20, 0).unwrap();
        queue.arm(c, 10, 0).unwrap();

        let expired = queue.expire(15);
        assert_eq!(expired.len(), 2);
        assert!(expired.contains(a));
        assert!(expired.contains(c));
        assert!(!expired.contains(b));
        assert_eq!(expired.iter().count(), 2);
    }
}

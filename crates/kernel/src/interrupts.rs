//! Software interrupt dispatcher
//!
//! Fan-out point for software signals raised from IRQ-deferred context.
//! Subscribers are a function pointer plus one context word; `raise`
//! invokes every active matching subscription in registration order.
//! Handlers must not block and must not re-raise the signal they handle.

use crate::lib::error::{KernelError, Result};
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

/// Software signals. Ctrl-C is the only one defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Signal {
    CtrlC = 0,
}

/// Signal callback: receives the signal and the context word given at
/// subscription time.
pub type SignalHandler = fn(Signal, usize);

pub const MAX_SUBSCRIPTIONS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

#[derive(Clone, Copy)]
struct Subscription {
    signal: Signal,
    handler: SignalHandler,
    context: usize,
    active: bool,
}

struct Dispatcher {
    slots: [Option<Subscription>; MAX_SUBSCRIPTIONS],
}

impl Dispatcher {
    const fn new() -> Self {
        Self {
            slots: [None; MAX_SUBSCRIPTIONS],
        }
    }

    fn subscribe(&mut self, signal: Signal, handler: SignalHandler, context: usize) -> Result<SubscriptionId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(Subscription {
                    signal,
                    handler,
                    context,
                    active: true,
                });
                return Ok(SubscriptionId(i));
            }
        }
        Err(KernelError::Exhausted)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> Result<()> {
        let slot = self.slots.get_mut(id.0).ok_or(KernelError::InvalidArgument)?;
        if slot.is_none() {
            return Err(KernelError::NotFound);
        }
        *slot = None;
        Ok(())
    }

    fn matching(&self, signal: Signal) -> [Option<Subscription>; MAX_SUBSCRIPTIONS] {
        let mut out = [None; MAX_SUBSCRIPTIONS];
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(sub) = slot {
                if sub.active && sub.signal == signal {
                    out[i] = Some(*sub);
                }
            }
        }
        out
    }

    fn active_count(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.active).count()
    }
}

static DISPATCHER: Mutex<Dispatcher> = Mutex::new(Dispatcher::new());

/// Register a handler. The returned id releases the slot again.
pub fn subscribe(signal: Signal, handler: SignalHandler, context: usize) -> Result<SubscriptionId> {
    crate::arch::without_interrupts(|| DISPATCHER.lock().subscribe(signal, handler, context))
}

pub fn unsubscribe(id: SubscriptionId) -> Result<()> {
    crate::arch::without_interrupts(|| DISPATCHER.lock().unsubscribe(id))
}

/// Invoke every active subscription for `signal` in registration order.
/// Safe to call from IRQ-deferred context: the table is snapshotted under
/// the lock and handlers run outside it.
pub fn raise(signal: Signal) {
    let snapshot = crate::arch::without_interrupts(|| DISPATCHER.lock().matching(signal));
    for sub in snapshot.iter().flatten() {
        (sub.handler)(signal, sub.context);
    }
}

pub fn active_count() -> usize {
    crate::arch::without_interrupts(|| DISPATCHER.lock().active_count())
}

/// Cancellation latch for long-running primitives. Subscribed to a signal it
/// flips on delivery; consumers poll `requested()` and return early.
pub struct CancelFlag {
    requested: AtomicBool,
}

impl CancelFlag {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }

    fn notify(_signal: Signal, context: usize) {
        // context carries the flag address; only addresses handed out by
        // subscribe_flag() ever reach here.
        let flag = unsafe { &*(context as *const CancelFlag) };
        flag.set();
    }
}

/// Subscribe `flag` to `signal`. The flag must be a static: its address is
/// the subscription context.
pub fn subscribe_flag(signal: Signal, flag: &'static CancelFlag) -> Result<SubscriptionId> {
    subscribe(signal, CancelFlag::notify, flag as *const CancelFlag as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    static FIRST_SEEN: AtomicUsize = AtomicUsize::new(0);
    static ORDER_PROBE: AtomicUsize = AtomicUsize::new(0);

    fn count_first(_signal: Signal, _ctx: usize) {
        FIRST_SEEN.fetch_add(1, Ordering::SeqCst);
        ORDER_PROBE.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).ok();
    }

    fn count_second(_signal: Signal, _ctx: usize) {
        // Must observe count_first's marker: registration order.
        assert!(ORDER_PROBE.load(Ordering::SeqCst) >= 1);
        ORDER_PROBE.store(2, Ordering::SeqCst);
    }

    #[test]
    fn raise_runs_subscribers_in_registration_order() {
        let a = subscribe(Signal::CtrlC, count_first, 0).unwrap();
        let b = subscribe(Signal::CtrlC, count_second, 0).unwrap();
        let before = FIRST_SEEN.load(Ordering::SeqCst);
        raise(Signal::CtrlC);
        assert!(FIRST_SEEN.load(Ordering::SeqCst) >= before + 1);
        assert_eq!(ORDER_PROBE.load(Ordering::SeqCst), 2);
        unsubscribe(a).unwrap();
        unsubscribe(b).unwrap();
    }

    #[test]
    fn unsubscribe_releases_the_slot() {
        let id = subscribe(Signal::CtrlC, |_, _| {}, 7).unwrap();
        assert!(unsubscribe(id).is_ok());
        assert_eq!(unsubscribe(id), Err(KernelError::NotFound));
    }

    #[test]
    fn table_capacity_is_bounded() {
        // Exercise a local table so the shared dispatcher is not exhausted
        // underneath concurrently running tests.
        let mut table = Dispatcher::new();
        for _ in 0..MAX_SUBSCRIPTIONS {
            table.subscribe(Signal::CtrlC, |_, _| {}, 0).unwrap();
        }
        assert_eq!(
            table.subscribe(Signal::CtrlC, |_, _| {}, 0),
            Err(KernelError::Exhausted)
        );
        table.unsubscribe(SubscriptionId(3)).unwrap();
        assert!(table.subscribe(Signal::CtrlC, |_, _| {}, 0).is_ok());
    }

    #[test]
    fn cancel_flag_latches_on_signal() {
        static FLAG: CancelFlag = CancelFlag::new();
        let id = subscribe_flag(Signal::CtrlC, &FLAG).unwrap();
        assert!(!FLAG.requested());
        raise(Signal::CtrlC);
        assert!(FLAG.requested());
        FLAG.reset();
        assert!(!FLAG.requested());
        unsubscribe(id).unwrap();
    }
}

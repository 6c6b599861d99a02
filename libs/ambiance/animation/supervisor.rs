//! Animation Supervisor
//!
//! Runs at most one LED routine at a time. Each routine gets its own OS
//! thread and a [`CancelToken`]; starting a new routine cancels the current
//! one and blocks until its thread has released the "current" slot, so two
//! routines never write to the strip in the same window.
//!
//! The slot lives under a `parking_lot::Mutex` with a `Condvar` signalled by
//! the exiting routine's drop guard. The guard runs on normal return, on
//! cancellation and on panic alike.

use super::color::Rgb;
use super::zone::Zone;
use crate::infrastructure::hardware::{HardwareError, LedStrip};
use parking_lot::{Condvar, Mutex};
use roomsockets::{LogicError, Outbox};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Strip shared between the supervisor and its routines
pub type SharedStrip = Arc<Mutex<dyn LedStrip>>;

/// Why a routine stopped before finishing
#[derive(Error, Debug)]
pub enum Interrupted {
    #[error("stop requested")]
    Cancelled,

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

/// Result of one routine step; `?` unwinds the routine on stop
pub type Step = Result<(), Interrupted>;

/// One-shot stop flag whose sleeps wake early
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `duration`; returns false if cancelled first
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = flag.lock();
        while !*cancelled {
            if cvar.wait_until(&mut cancelled, deadline).timed_out() {
                return !*cancelled;
            }
        }
        false
    }
}

/// What a routine sees: its stop token, the strip and the outbox
pub struct AnimationContext {
    name: String,
    token: CancelToken,
    strip: SharedStrip,
    outbox: Option<Outbox>,
}

impl AnimationContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails with [`Interrupted::Cancelled`] once a stop was requested
    pub fn check(&self) -> Step {
        if self.is_stopped() {
            Err(Interrupted::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn sleep(&self, duration: Duration) -> Step {
        if self.token.sleep(duration) {
            Ok(())
        } else {
            Err(Interrupted::Cancelled)
        }
    }

    /// Write one pixel, checking for a stop first
    pub fn set_pixel(&self, index: usize, color: Rgb) -> Step {
        self.check()?;
        self.strip.lock().set_pixel(index, color)?;
        Ok(())
    }

    pub fn show(&self) -> Step {
        self.check()?;
        self.strip.lock().flush()?;
        Ok(())
    }

    /// Paint every pixel of `zone` and show it
    pub fn fill(&self, zone: Zone, color: Rgb) -> Step {
        for i in zone.range() {
            self.set_pixel(i, color)?;
        }
        self.show()
    }

    /// Queue an outbound message; false without an outbox
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.outbox.as_ref().is_some_and(|outbox| outbox.send(text))
    }
}

/// Snapshot of the supervisor slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Running { id: u64, name: String },
    Stopping { id: u64, name: String },
}

struct Running {
    id: u64,
    name: String,
    token: CancelToken,
    stop_requested: bool,
}

#[derive(Default)]
struct Slot {
    current: Option<Running>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    idle: Condvar,
    next_id: AtomicU64,
}

/// Clears the slot when the routine thread exits, however it exits
struct SlotGuard {
    shared: Arc<Shared>,
    id: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        if slot.current.as_ref().is_some_and(|r| r.id == self.id) {
            slot.current = None;
        }
        self.shared.idle.notify_all();
    }
}

/// Single-slot animation runner
#[derive(Clone)]
pub struct AnimationSupervisor {
    shared: Arc<Shared>,
    strip: SharedStrip,
    outbox: Option<Outbox>,
}

impl AnimationSupervisor {
    pub fn new(strip: SharedStrip) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            strip,
            outbox: None,
        }
    }

    /// Let routines queue messages (scene start/end notifications)
    pub fn with_outbox(mut self, outbox: Outbox) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn strip(&self) -> SharedStrip {
        Arc::clone(&self.strip)
    }

    /// Stop whatever runs, wait for it to exit, then launch `routine`
    ///
    /// Blocks the caller for as long as the old routine takes to notice
    /// its stop, which is one pixel write or one wake-up of its sleep.
    pub fn start_animation<F>(&self, name: impl Into<String>, routine: F) -> Result<u64, LogicError>
    where
        F: FnOnce(&AnimationContext) -> Step + Send + 'static,
    {
        let name = name.into();
        let mut slot = self.shared.slot.lock();
        while let Some(running) = slot.current.as_mut() {
            if !running.stop_requested {
                debug!("[ANIM] Stopping '{}' for '{}'", running.name, name);
                running.stop_requested = true;
                running.token.cancel();
            }
            self.shared.idle.wait(&mut slot);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancelToken::new();
        slot.current = Some(Running {
            id,
            name: name.clone(),
            token: token.clone(),
            stop_requested: false,
        });
        drop(slot);

        let ctx = AnimationContext {
            name: name.clone(),
            token,
            strip: Arc::clone(&self.strip),
            outbox: self.outbox.clone(),
        };
        let guard = SlotGuard {
            shared: Arc::clone(&self.shared),
            id,
        };

        let spawned = std::thread::Builder::new()
            .name(format!("anim-{}", name))
            .spawn(move || {
                let _guard = guard;
                run_routine(&ctx, routine);
            });

        match spawned {
            Ok(_) => {
                info!("[ANIM] Started '{}' (#{})", name, id);
                Ok(id)
            }
            Err(e) => {
                // The closure (and its guard) was dropped, which freed the slot
                Err(LogicError::AnimationSpawn {
                    name,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Request a stop without waiting
    pub fn request_stop(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        match slot.current.as_mut() {
            Some(running) => {
                running.stop_requested = true;
                running.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop the current routine and wait until the slot is free
    pub fn stop_current(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        let mut stopped = false;
        while let Some(running) = slot.current.as_mut() {
            if !running.stop_requested {
                running.stop_requested = true;
                running.token.cancel();
            }
            stopped = true;
            self.shared.idle.wait(&mut slot);
        }
        stopped
    }

    /// Wait for the slot to free up on its own; false on timeout
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.current.is_some() {
            if self.shared.idle.wait_until(&mut slot, deadline).timed_out() {
                return slot.current.is_none();
            }
        }
        true
    }

    pub fn current_animation(&self) -> Option<String> {
        self.shared.slot.lock().current.as_ref().map(|r| r.name.clone())
    }

    pub fn state(&self) -> AnimationState {
        match self.shared.slot.lock().current.as_ref() {
            None => AnimationState::Idle,
            Some(r) if r.stop_requested => AnimationState::Stopping {
                id: r.id,
                name: r.name.clone(),
            },
            Some(r) => AnimationState::Running {
                id: r.id,
                name: r.name.clone(),
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.shared.slot.lock().current.is_none()
    }
}

fn run_routine<F>(ctx: &AnimationContext, routine: F)
where
    F: FnOnce(&AnimationContext) -> Step,
{
    match catch_unwind(AssertUnwindSafe(|| routine(ctx))) {
        Ok(Ok(())) => debug!("[ANIM] '{}' finished", ctx.name()),
        Ok(Err(Interrupted::Cancelled)) => debug!("[ANIM] '{}' stopped", ctx.name()),
        Ok(Err(Interrupted::Hardware(e))) => warn!("[ANIM] '{}' aborted: {}", ctx.name(), e),
        Err(_) => error!("[ANIM] {}", LogicError::AnimationPanicked(ctx.name().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::hardware::MemoryStrip;

    fn recording_strip(len: usize) -> (Arc<Mutex<MemoryStrip>>, SharedStrip) {
        let strip = Arc::new(Mutex::new(MemoryStrip::recording(len)));
        let shared: SharedStrip = strip.clone();
        (strip, shared)
    }

    /// Paint the zone over and over until stopped
    fn endless(color: Rgb) -> impl FnOnce(&AnimationContext) -> Step + Send + 'static {
        move |ctx: &AnimationContext| loop {
            for i in 0..8 {
                ctx.set_pixel(i, color)?;
                ctx.sleep(Duration::from_millis(1))?;
            }
            ctx.show()?;
        }
    }

    #[test]
    fn test_token_sleep_wakes_on_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(5)));

        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(token.is_cancelled());
        handle.join().unwrap();
    }

    #[test]
    fn test_new_animation_replaces_old_without_interleaving() {
        let (strip, shared) = recording_strip(8);
        let supervisor = AnimationSupervisor::new(shared);

        supervisor.start_animation("red", endless(Rgb::new(255, 0, 0))).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(supervisor.current_animation().as_deref(), Some("red"));

        supervisor.start_animation("blue", endless(Rgb::new(0, 0, 255))).unwrap();
        assert_eq!(supervisor.current_animation().as_deref(), Some("blue"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(supervisor.stop_current());
        assert!(supervisor.is_idle());

        let strip = strip.lock();
        let writers: Vec<&str> = strip.writes().iter().map(|w| w.writer.as_str()).collect();
        let first_blue = writers.iter().position(|w| *w == "anim-blue").unwrap();
        assert!(first_blue > 0);
        assert!(writers[..first_blue].iter().all(|w| *w == "anim-red"));
        assert!(writers[first_blue..].iter().all(|w| *w == "anim-blue"));
    }

    #[test]
    fn test_at_most_one_animation_under_concurrent_starts() {
        let (strip, shared) = recording_strip(8);
        let supervisor = AnimationSupervisor::new(shared);

        let handles: Vec<_> = (0..4u8)
            .map(|n| {
                let supervisor = supervisor.clone();
                std::thread::spawn(move || {
                    for round in 0..3u8 {
                        let color = Rgb::new(n * 60, round * 80, 0);
                        supervisor
                            .start_animation(format!("t{}r{}", n, round), endless(color))
                            .unwrap();
                        std::thread::sleep(Duration::from_millis(5));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        supervisor.stop_current();

        // Writers form contiguous runs: no run ever reappears once another started
        let strip = strip.lock();
        let mut finished: Vec<&str> = Vec::new();
        let mut last: Option<&str> = None;
        for write in strip.writes() {
            let writer = write.writer.as_str();
            if last != Some(writer) {
                assert!(!finished.contains(&writer), "{} resumed after being replaced", writer);
                if let Some(prev) = last {
                    finished.push(prev);
                }
                last = Some(writer);
            }
        }
    }

    #[test]
    fn test_panicking_routine_frees_slot() {
        let (_, shared) = recording_strip(4);
        let supervisor = AnimationSupervisor::new(shared);

        supervisor
            .start_animation("boom", |_ctx| -> Step { panic!("routine bug") })
            .unwrap();
        assert!(supervisor.wait_idle(Duration::from_secs(2)));

        supervisor
            .start_animation("after", |ctx| ctx.fill(Zone::new(0, 4), Rgb::WHITE))
            .unwrap();
        assert!(supervisor.wait_idle(Duration::from_secs(2)));
    }

    #[test]
    fn test_hardware_error_ends_routine() {
        let (_, shared) = recording_strip(4);
        let supervisor = AnimationSupervisor::new(shared);

        supervisor
            .start_animation("overrun", |ctx| ctx.fill(Zone::new(0, 10), Rgb::WHITE))
            .unwrap();
        assert!(supervisor.wait_idle(Duration::from_secs(2)));
        assert_eq!(supervisor.state(), AnimationState::Idle);
    }

    #[test]
    fn test_state_reports_running() {
        let (_, shared) = recording_strip(8);
        let supervisor = AnimationSupervisor::new(shared);
        assert_eq!(supervisor.state(), AnimationState::Idle);
        assert!(!supervisor.request_stop());

        let id = supervisor.start_animation("glow", endless(Rgb::WHITE)).unwrap();
        assert_eq!(
            supervisor.state(),
            AnimationState::Running {
                id,
                name: "glow".into()
            }
        );
        assert!(supervisor.request_stop());
        assert!(supervisor.wait_idle(Duration::from_secs(2)));
    }
}

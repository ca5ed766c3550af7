// src/engine_lib/lifecycle.rs
//
// Mount state shared between the host page and the running scene. All of
// it lives on the one UI thread, hence `Rc<RefCell<_>>`.

use log::{info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::engine_lib::controller::normalize_section;

/// Inline style for the scene canvas. It tracks the container through CSS,
/// so the canvas resize observer sees every container change.
pub const CANVAS_FILL_STYLE: [(&str, &str); 3] = [("display", "block"), ("width", "100%"), ("height", "100%")];

pub type SectionCallback = Box<dyn FnMut(usize)>;
pub type SharedBridge = Rc<RefCell<HostBridge>>;

#[derive(Debug, Default)]
struct LoopState {
    cancelled: Cell<bool>,
    frames: Cell<u64>,
}

/// Cancellable per-frame loop. Once cancelled no frame body runs again,
/// even if the platform still delivers a scheduled callback.
#[derive(Clone, Debug, Default)]
pub struct FrameLoop {
    state: Rc<LoopState>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        !self.state.cancelled.get()
    }

    pub fn cancel(&self) {
        self.state.cancelled.set(true);
    }

    pub fn frames(&self) -> u64 {
        self.state.frames.get()
    }

    /// Runs one whole frame, or nothing at all when cancelled.
    pub fn tick<R>(&self, frame: impl FnOnce() -> R) -> Option<R> {
        if !self.is_running() {
            return None;
        }
        self.state.frames.set(self.state.frames.get() + 1);
        Some(frame())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostInputs {
    pub section: i64,
    pub reduced_motion: bool,
}

/// What the host can see and change while the scene is mounted.
pub struct HostBridge {
    inputs: HostInputs,
    inputs_changed: bool,
    on_section_change: Option<SectionCallback>,
    frame_loop: FrameLoop,
    teardown: Vec<Box<dyn FnOnce()>>,
    mounted: bool,
}

impl HostBridge {
    pub fn new(section: i64, reduced_motion: bool, on_section_change: Option<SectionCallback>) -> Self {
        Self {
            inputs: HostInputs { section, reduced_motion },
            inputs_changed: true,
            on_section_change,
            frame_loop: FrameLoop::new(),
            teardown: Vec::new(),
            mounted: true,
        }
    }

    pub fn shared(self) -> SharedBridge {
        Rc::new(RefCell::new(self))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn frame_loop(&self) -> FrameLoop {
        self.frame_loop.clone()
    }

    pub fn inputs(&self) -> HostInputs {
        self.inputs
    }

    pub fn set_section_callback(&mut self, callback: SectionCallback) {
        if self.mounted {
            self.on_section_change = Some(callback);
        }
    }

    pub fn set_current_section(&mut self, section: i64) {
        if self.inputs.section != section {
            self.inputs.section = section;
            self.inputs_changed = true;
        }
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        if self.inputs.reduced_motion != reduced {
            self.inputs.reduced_motion = reduced;
            self.inputs_changed = true;
        }
    }

    /// Inputs that changed since the last call, if any.
    pub fn take_inputs(&mut self) -> Option<HostInputs> {
        std::mem::take(&mut self.inputs_changed).then_some(self.inputs)
    }

    /// Registers work that must happen exactly once at unmount.
    pub fn on_unmount(&mut self, hook: impl FnOnce() + 'static) {
        if self.mounted {
            self.teardown.push(Box::new(hook));
        } else {
            hook();
        }
    }

    /// Cancels the frame loop before anything else, then runs the teardown
    /// hooks. Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.frame_loop.cancel();
        self.mounted = false;
        self.on_section_change = None;
        for hook in self.teardown.drain(..).rev() {
            hook();
        }
        info!("scene unmounted after {} frames", self.frame_loop.frames());
    }
}

/// Fires the host callback once for `index`. The callback is taken out of
/// the bridge while it runs so it may call back into the bridge.
pub fn emit_section_change(bridge: &SharedBridge, index: usize) {
    let callback = {
        let mut bridge = bridge.borrow_mut();
        if !bridge.mounted {
            return;
        }
        bridge.on_section_change.take()
    };
    let Some(mut callback) = callback else {
        warn!("face {} clicked but the host registered no section callback", index);
        return;
    };
    callback(normalize_section(index as i64));
    let mut bridge = bridge.borrow_mut();
    if bridge.mounted && bridge.on_section_change.is_none() {
        bridge.on_section_change = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_style_follows_container() {
        let get = |name: &str| CANVAS_FILL_STYLE.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        assert_eq!(get("width"), Some("100%"));
        assert_eq!(get("height"), Some("100%"));
        assert!(CANVAS_FILL_STYLE.iter().all(|(_, v)| !v.ends_with("px")));
    }

    #[test]
    fn no_frame_runs_after_unmount() {
        let bridge = HostBridge::new(0, false, None).shared();
        let frame_loop = bridge.borrow().frame_loop();
        let spy = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let spy = spy.clone();
            frame_loop.tick(move || spy.set(spy.get() + 1));
        }
        assert_eq!(spy.get(), 3);

        bridge.borrow_mut().unmount();
        for _ in 0..3 {
            let spy = spy.clone();
            assert!(frame_loop.tick(move || spy.set(spy.get() + 1)).is_none());
        }
        assert_eq!(spy.get(), 3);
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn teardown_hooks_run_exactly_once() {
        let bridge = HostBridge::new(0, false, None).shared();
        let removed = Rc::new(Cell::new(0u32));
        let hook = removed.clone();
        bridge.borrow_mut().on_unmount(move || hook.set(hook.get() + 1));
        bridge.borrow_mut().unmount();
        bridge.borrow_mut().unmount();
        assert_eq!(removed.get(), 1);
        assert!(!bridge.borrow().is_mounted());
    }

    #[test]
    fn callback_fires_once_and_may_reenter_bridge() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let bridge: SharedBridge = HostBridge::new(0, false, None).shared();
        let (log, inner) = (seen.clone(), Rc::downgrade(&bridge));
        bridge.borrow_mut().set_section_callback(Box::new(move |index| {
            log.borrow_mut().push(index);
            if let Some(bridge) = inner.upgrade() {
                bridge.borrow_mut().set_current_section(index as i64);
            }
        }));

        emit_section_change(&bridge, 3);
        assert_eq!(*seen.borrow(), vec![3]);
        assert_eq!(bridge.borrow_mut().take_inputs(), Some(HostInputs { section: 3, reduced_motion: false }));

        bridge.borrow_mut().unmount();
        emit_section_change(&bridge, 4);
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn inputs_are_reported_only_when_changed() {
        let mut bridge = HostBridge::new(2, true, None);
        assert!(bridge.take_inputs().is_some());
        assert!(bridge.take_inputs().is_none());
        bridge.set_current_section(2);
        assert!(bridge.take_inputs().is_none());
        bridge.set_reduced_motion(false);
        assert_eq!(bridge.take_inputs(), Some(HostInputs { section: 2, reduced_motion: false }));
    }
}

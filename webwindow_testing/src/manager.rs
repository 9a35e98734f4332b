//! Window manager recording every request it receives.

use std::sync::{Mutex, PoisonError};

use webwindow::{ProcessId, WindowId, WindowManager};

/// [`WindowManager`] that records calls instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingManager {
    halted: Mutex<Vec<ProcessId>>,
    unregistered: Mutex<Vec<WindowId>>,
    shown: Mutex<Vec<(WindowId, String)>>,
    refuse_show: bool,
}

impl RecordingManager {
    /// Manager whose `show` always fails.
    #[must_use]
    pub fn refusing_show() -> Self {
        Self {
            refuse_show: true,
            ..Self::default()
        }
    }

    /// Processes halted so far, in order.
    #[must_use]
    pub fn halted(&self) -> Vec<ProcessId> {
        self.halted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Windows unregistered so far, in order.
    #[must_use]
    pub fn unregistered(&self) -> Vec<WindowId> {
        self.unregistered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `show` requests received so far.
    #[must_use]
    pub fn shown(&self) -> Vec<(WindowId, String)> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl WindowManager for RecordingManager {
    fn halt_client(&self, process: ProcessId) {
        self.halted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(process);
    }

    fn unregister(&self, window: WindowId) {
        self.unregistered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(window);
    }

    fn url(&self, window: WindowId, remote: bool) -> String {
        let host = if remote { "http://0.0.0.0:8080" } else { "http://localhost:8080" };
        format!("{host}/win{window}/")
    }

    fn show(&self, window: WindowId, location: &str) -> bool {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((window, location.to_owned()));
        !self.refuse_show
    }

    fn wait_for(&self, check: &mut dyn FnMut(f64) -> i32, time_limit: f64) -> i32 {
        let mut spent = 0.0;
        loop {
            let res = check(spent);
            if res != 0 {
                return res;
            }
            spent += 0.1;
            if time_limit > 0.0 && spent > time_limit {
                return 0;
            }
        }
    }
}

//! Window-control seam for the embedding shell.
//!
//! The core runs both inside a desktop shell and headless (CLI, tests).
//! Shells implement [`DesktopHost`] against their real window; everywhere
//! else the controls degrade to a no-op.

/// Snapshot of the window state, delivered to subscribers on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub maximized: bool,
    pub focused: bool,
}

pub type WindowStateListener = Box<dyn Fn(WindowState) + Send + Sync>;

pub trait DesktopHost: Send + Sync {
    fn minimize(&self);
    fn toggle_maximize(&self);
    fn close(&self);
    fn is_maximized(&self) -> bool;

    /// Register a listener for window state changes. Hosts without a real
    /// window never call it.
    fn subscribe(&self, listener: WindowStateListener);
}

/// Host for headless runs. Every control does nothing and listeners are
/// dropped unfired.
#[derive(Debug, Default)]
pub struct NoopHost;

impl DesktopHost for NoopHost {
    fn minimize(&self) {}

    fn toggle_maximize(&self) {}

    fn close(&self) {}

    fn is_maximized(&self) -> bool {
        false
    }

    fn subscribe(&self, _listener: WindowStateListener) {}
}

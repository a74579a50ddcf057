//! Edge detection over the stream of connectivity events.

/// A change of the derived online flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOffline,
    CameOnline,
}

/// Remembers the previous online value and reports only real changes.
///
/// Starts out assuming the device is online.
#[derive(Debug, Clone, Copy)]
pub struct OfflineStatusTracker {
    online: bool,
}

impl Default for OfflineStatusTracker {
    fn default() -> Self {
        Self { online: true }
    }
}

impl OfflineStatusTracker {
    pub const fn new(initial: bool) -> Self {
        Self { online: initial }
    }

    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// Feed the latest value; returns the transition it caused, if any.
    pub fn observe(&mut self, online: bool) -> Option<Transition> {
        if online == self.online {
            return None;
        }
        self.online = online;
        Some(if online {
            Transition::CameOnline
        } else {
            Transition::WentOffline
        })
    }
}

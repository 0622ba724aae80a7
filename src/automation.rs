//! Automation triggers.
//!
//! A [`Trigger`] is a zero-argument firing event.  Downstream automations
//! attach actions to it; [`Trigger::fire`] runs them in attachment order.

/// Zero-argument event with attached actions.
#[derive(Default)]
pub struct Trigger {
    actions: Vec<Box<dyn FnMut()>>,
    fired: u32,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an action run on every firing.
    pub fn add_action(&mut self, action: impl FnMut() + 'static) {
        self.actions.push(Box::new(action));
    }

    pub fn fire(&mut self) {
        self.fired = self.fired.wrapping_add(1);
        for action in &mut self.actions {
            action();
        }
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Number of firings since construction (wraps).
    pub fn fired_count(&self) -> u32 {
        self.fired
    }
}

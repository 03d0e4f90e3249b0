//! Notification sinks delivered synchronously from inside `advance`.

use kin_types::BodyHandle;

/// Callback for per-advance step notifications; receives the simulated
/// elapsed time in seconds.
pub type StepSink = Box<dyn FnMut(f64) + Send>;

/// Callback for collision notifications; receives the two body handles.
pub type ContactSink = Box<dyn FnMut(BodyHandle, BodyHandle) + Send>;

/// Subscription sets for the scene's notifications.
#[derive(Default)]
pub struct EventSinks {
    pub(crate) step: Vec<StepSink>,
    pub(crate) contact_begin: Vec<ContactSink>,
    pub(crate) contact_end: Vec<ContactSink>,
    pub(crate) static_contact: Vec<ContactSink>,
}

impl EventSinks {
    pub(crate) fn emit_step(&mut self, elapsed: f64) {
        for sink in &mut self.step {
            sink(elapsed);
        }
    }

    pub(crate) fn emit_contact_begin(&mut self, a: BodyHandle, b: BodyHandle) {
        for sink in &mut self.contact_begin {
            sink(a, b);
        }
    }

    pub(crate) fn emit_contact_end(&mut self, a: BodyHandle, b: BodyHandle) {
        for sink in &mut self.contact_end {
            sink(a, b);
        }
    }

    pub(crate) fn emit_static_contact(&mut self, dynamic: BodyHandle, fixed: BodyHandle) {
        for sink in &mut self.static_contact {
            sink(dynamic, fixed);
        }
    }
}

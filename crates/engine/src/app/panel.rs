use std::error::Error;

use thiserror::Error as ThisError;
use tracing::debug;

use super::input::{InputEvent, InputState};
use super::options::Options;
use super::rendering::{CursorAlignment, Frame};

/// Runtime fault raised by a panel during event handling, ticking, or drawing.
/// Faults are fatal to the application; panels never retry.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct PanelError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl PanelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelCursor {
    pub sprite_key: &'static str,
    pub alignment: CursorAlignment,
}

/// One interactive surface: a full-screen panel or a stacked overlay.
///
/// All mutation of the stack goes through [`PanelContext::transitions`];
/// requests take effect at the stack's apply points, never mid-call.
pub trait Panel {
    fn handle_event(
        &mut self,
        event: &InputEvent,
        ctx: &mut PanelContext<'_>,
    ) -> Result<(), PanelError>;

    fn tick(&mut self, dt: f64, ctx: &mut PanelContext<'_>) -> Result<(), PanelError>;

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError>;

    /// Second draw layer for the active panel only, drawn above every
    /// stacked panel (HUD, tooltips).
    fn render_secondary(&mut self, _frame: &mut Frame<'_>) -> Result<(), PanelError> {
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Called with `true` on the panel an overlay is pushed above, and with
    /// `false` on the panel revealed by a pop.
    fn on_pause_changed(&mut self, _paused: bool) {}

    fn current_cursor(&self) -> Option<PanelCursor> {
        None
    }

    fn debug_name(&self) -> &'static str {
        "panel"
    }
}

/// Deferred stack mutations collected while a panel runs.
///
/// At most one primary replacement and one overlay push are pending at a
/// time; a later request wins. A second pop request before the first is
/// applied, or a pop with no overlay on the stack, is a logic error and
/// panics immediately.
#[derive(Default)]
pub struct TransitionRequests {
    pending_primary: Option<Box<dyn Panel>>,
    pending_overlay: Option<Box<dyn Panel>>,
    pop_requested: bool,
    exit_requested: bool,
    overlay_depth: usize,
}

impl TransitionRequests {
    pub fn set_primary_panel(&mut self, panel: Box<dyn Panel>) {
        self.pending_primary = Some(panel);
    }

    pub fn push_overlay(&mut self, panel: Box<dyn Panel>) {
        self.pending_overlay = Some(panel);
    }

    pub fn request_pop_overlay(&mut self) {
        assert!(
            !self.pop_requested,
            "overlay pop requested twice before being applied"
        );
        assert!(
            self.overlay_depth > 0,
            "overlay pop requested with no overlay on the stack"
        );
        self.pop_requested = true;
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn has_pending_primary(&self) -> bool {
        self.pending_primary.is_some()
    }

    pub fn has_pending_overlay(&self) -> bool {
        self.pending_overlay.is_some()
    }
}

/// What a panel sees while handling an event or ticking.
pub struct PanelContext<'a> {
    pub transitions: &'a mut TransitionRequests,
    pub options: &'a mut Options,
    pub input: &'a InputState,
}

/// One primary panel plus a LIFO overlay stack. The top overlay (or the
/// primary, when no overlay is stacked) is the active panel and receives
/// events and ticks. There is always an active panel.
pub struct PanelStack {
    primary: Box<dyn Panel>,
    overlays: Vec<Box<dyn Panel>>,
    requests: TransitionRequests,
}

impl PanelStack {
    pub fn new(primary: Box<dyn Panel>) -> Self {
        Self {
            primary,
            overlays: Vec::new(),
            requests: TransitionRequests::default(),
        }
    }

    pub fn active_panel(&self) -> &dyn Panel {
        match self.overlays.last() {
            Some(top) => top.as_ref(),
            None => self.primary.as_ref(),
        }
    }

    pub fn active_panel_mut(&mut self) -> &mut dyn Panel {
        match self.overlays.last_mut() {
            Some(top) => top.as_mut(),
            None => self.primary.as_mut(),
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn exit_requested(&self) -> bool {
        self.requests.exit_requested
    }

    pub fn request_exit(&mut self) {
        self.requests.exit_requested = true;
    }

    pub fn dispatch_event(
        &mut self,
        event: &InputEvent,
        options: &mut Options,
        input: &InputState,
    ) -> Result<(), PanelError> {
        let (active, requests) = self.active_and_requests();
        let mut ctx = PanelContext {
            transitions: requests,
            options,
            input,
        };
        active.handle_event(event, &mut ctx)
    }

    pub fn tick(
        &mut self,
        dt: f64,
        options: &mut Options,
        input: &InputState,
    ) -> Result<(), PanelError> {
        let (active, requests) = self.active_and_requests();
        let mut ctx = PanelContext {
            transitions: requests,
            options,
            input,
        };
        active.tick(dt, &mut ctx)
    }

    /// Draws the primary panel, every overlay bottom-to-top, then the
    /// active panel's secondary layer above all of them.
    pub fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), PanelError> {
        self.primary.render(frame)?;
        for overlay in &mut self.overlays {
            overlay.render(frame)?;
        }
        self.active_panel_mut().render_secondary(frame)
    }

    pub fn resize_all(&mut self, width: u32, height: u32) {
        self.primary.resize(width, height);
        for overlay in &mut self.overlays {
            overlay.resize(width, height);
        }
    }

    /// Applies pending transitions in a fixed order: pop, push, primary
    /// replacement. Replaced and popped panels are dropped here.
    pub fn apply_pending_transitions(&mut self) {
        if self.requests.pop_requested {
            self.requests.pop_requested = false;
            match self.overlays.pop() {
                Some(popped) => debug!(panel = popped.debug_name(), "overlay_popped"),
                None => unreachable!("pop request accepted with no overlay on the stack"),
            }
            let revealed = match self.overlays.last_mut() {
                Some(top) => top.as_mut(),
                None => self.primary.as_mut(),
            };
            revealed.on_pause_changed(false);
        }

        if let Some(overlay) = self.requests.pending_overlay.take() {
            let covered = match self.overlays.last_mut() {
                Some(top) => top.as_mut(),
                None => self.primary.as_mut(),
            };
            covered.on_pause_changed(true);
            debug!(panel = overlay.debug_name(), "overlay_pushed");
            self.overlays.push(overlay);
        }

        if let Some(primary) = self.requests.pending_primary.take() {
            debug!(
                from = self.primary.debug_name(),
                to = primary.debug_name(),
                "primary_panel_replaced"
            );
            self.primary = primary;
        }

        self.requests.overlay_depth = self.overlays.len();
    }

    fn active_and_requests(&mut self) -> (&mut dyn Panel, &mut TransitionRequests) {
        self.requests.overlay_depth = self.overlays.len();
        let active: &mut dyn Panel = match self.overlays.last_mut() {
            Some(top) => top.as_mut(),
            None => self.primary.as_mut(),
        };
        (active, &mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use winit::keyboard::KeyCode;

    use super::*;

    type EventLog = Rc<RefCell<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum OnEvent {
        Nothing,
        PushOverlay(&'static str),
        PopOverlay,
        ReplacePrimary(&'static str),
        PushThenReplace(&'static str, &'static str),
        PopThenPush(&'static str),
        RequestExit,
        Fail,
    }

    struct ScriptedPanel {
        name: &'static str,
        on_event: OnEvent,
        log: EventLog,
    }

    impl ScriptedPanel {
        fn new(name: &'static str, on_event: OnEvent, log: &EventLog) -> Box<dyn Panel> {
            Box::new(Self {
                name,
                on_event,
                log: Rc::clone(log),
            })
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, what));
        }
    }

    impl Panel for ScriptedPanel {
        fn handle_event(
            &mut self,
            _event: &InputEvent,
            ctx: &mut PanelContext<'_>,
        ) -> Result<(), PanelError> {
            self.record("event");
            match self.on_event {
                OnEvent::Nothing => {}
                OnEvent::PushOverlay(name) => {
                    ctx.transitions
                        .push_overlay(ScriptedPanel::new(name, OnEvent::Nothing, &self.log));
                }
                OnEvent::PopOverlay => ctx.transitions.request_pop_overlay(),
                OnEvent::ReplacePrimary(name) => {
                    ctx.transitions
                        .set_primary_panel(ScriptedPanel::new(name, OnEvent::Nothing, &self.log));
                }
                OnEvent::PushThenReplace(first, second) => {
                    ctx.transitions
                        .push_overlay(ScriptedPanel::new(first, OnEvent::Nothing, &self.log));
                    ctx.transitions
                        .push_overlay(ScriptedPanel::new(second, OnEvent::Nothing, &self.log));
                }
                OnEvent::PopThenPush(name) => {
                    ctx.transitions.request_pop_overlay();
                    ctx.transitions
                        .push_overlay(ScriptedPanel::new(name, OnEvent::Nothing, &self.log));
                }
                OnEvent::RequestExit => ctx.transitions.request_exit(),
                OnEvent::Fail => return Err(PanelError::new("scripted failure")),
            }
            Ok(())
        }

        fn tick(&mut self, _dt: f64, _ctx: &mut PanelContext<'_>) -> Result<(), PanelError> {
            self.record("tick");
            Ok(())
        }

        fn render(&mut self, _frame: &mut Frame<'_>) -> Result<(), PanelError> {
            self.record("render");
            Ok(())
        }

        fn render_secondary(&mut self, _frame: &mut Frame<'_>) -> Result<(), PanelError> {
            self.record("render_secondary");
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.record(&format!("resize {}x{}", width, height));
        }

        fn on_pause_changed(&mut self, paused: bool) {
            self.record(if paused { "paused" } else { "unpaused" });
        }

        fn debug_name(&self) -> &'static str {
            self.name
        }
    }

    fn any_event() -> InputEvent {
        InputEvent::KeyPressed {
            key: KeyCode::Enter,
            repeat: false,
        }
    }

    fn dispatch(stack: &mut PanelStack) {
        let mut options = Options::default();
        let input = InputState::default();
        stack
            .dispatch_event(&any_event(), &mut options, &input)
            .expect("dispatch");
    }

    fn stack_with_log(on_event: OnEvent) -> (PanelStack, EventLog) {
        let log: EventLog = Rc::default();
        let stack = PanelStack::new(ScriptedPanel::new("primary", on_event, &log));
        (stack, log)
    }

    #[test]
    fn active_panel_is_primary_without_overlays() {
        let (stack, _log) = stack_with_log(OnEvent::Nothing);
        assert_eq!(stack.active_panel().debug_name(), "primary");
        assert_eq!(stack.overlay_count(), 0);
    }

    #[test]
    fn push_is_deferred_until_apply() {
        let (mut stack, _log) = stack_with_log(OnEvent::PushOverlay("overlay"));

        dispatch(&mut stack);
        assert_eq!(stack.active_panel().debug_name(), "primary");

        stack.apply_pending_transitions();
        assert_eq!(stack.active_panel().debug_name(), "overlay");
        assert_eq!(stack.overlay_count(), 1);
    }

    #[test]
    fn later_push_request_wins() {
        let (mut stack, _log) = stack_with_log(OnEvent::PushThenReplace("first", "second"));

        dispatch(&mut stack);
        stack.apply_pending_transitions();

        assert_eq!(stack.overlay_count(), 1);
        assert_eq!(stack.active_panel().debug_name(), "second");
    }

    #[test]
    fn later_primary_replacement_wins() {
        let log: EventLog = Rc::default();
        let mut stack = PanelStack::new(ScriptedPanel::new("primary", OnEvent::Nothing, &log));
        let mut options = Options::default();
        let input = InputState::default();

        stack.requests.set_primary_panel(ScriptedPanel::new("first", OnEvent::Nothing, &log));
        stack
            .requests
            .set_primary_panel(ScriptedPanel::new("second", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();

        stack
            .dispatch_event(&any_event(), &mut options, &input)
            .expect("dispatch");
        assert_eq!(stack.active_panel().debug_name(), "second");
    }

    #[test]
    #[should_panic(expected = "overlay pop requested twice")]
    fn double_pop_request_panics() {
        let (mut stack, log) = stack_with_log(OnEvent::PushOverlay("popper"));
        dispatch(&mut stack);
        stack.apply_pending_transitions();
        // Replace the overlay's behavior by pushing a dedicated popper above it.
        stack
            .requests
            .push_overlay(ScriptedPanel::new("double_popper", OnEvent::PopOverlay, &log));
        stack.apply_pending_transitions();

        dispatch(&mut stack);
        // Second request before apply must panic.
        dispatch(&mut stack);
    }

    #[test]
    #[should_panic(expected = "no overlay on the stack")]
    fn pop_with_empty_overlay_stack_panics() {
        let (mut stack, _log) = stack_with_log(OnEvent::PopOverlay);
        dispatch(&mut stack);
    }

    #[test]
    fn push_pauses_covered_panel_and_pop_unpauses_it() {
        let (mut stack, log) = stack_with_log(OnEvent::PushOverlay("a"));

        dispatch(&mut stack);
        stack.apply_pending_transitions();
        assert!(log.borrow().contains(&"primary:paused".to_string()));

        stack.requests.request_pop_overlay();
        stack.apply_pending_transitions();
        assert!(log.borrow().contains(&"primary:unpaused".to_string()));
        assert_eq!(stack.overlay_count(), 0);
    }

    #[test]
    fn stacked_overlays_pause_and_unpause_in_lifo_order() {
        let log: EventLog = Rc::default();
        let mut stack = PanelStack::new(ScriptedPanel::new("m", OnEvent::Nothing, &log));

        stack
            .requests
            .push_overlay(ScriptedPanel::new("a", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();
        stack
            .requests
            .push_overlay(ScriptedPanel::new("b", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();
        assert_eq!(stack.active_panel().debug_name(), "b");

        stack.requests.request_pop_overlay();
        stack.apply_pending_transitions();
        assert_eq!(stack.active_panel().debug_name(), "a");

        stack.requests.request_pop_overlay();
        stack.apply_pending_transitions();
        assert_eq!(stack.active_panel().debug_name(), "m");

        let log = log.borrow();
        let pauses: Vec<&str> = log
            .iter()
            .filter(|entry| entry.ends_with("paused"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            pauses,
            ["m:paused", "a:paused", "a:unpaused", "m:unpaused"]
        );
    }

    #[test]
    fn pop_and_push_in_one_apply_pops_first() {
        let log: EventLog = Rc::default();
        let mut stack = PanelStack::new(ScriptedPanel::new("m", OnEvent::Nothing, &log));
        stack
            .requests
            .push_overlay(ScriptedPanel::new("a", OnEvent::PopThenPush("b"), &log));
        stack.apply_pending_transitions();

        dispatch(&mut stack);
        stack.apply_pending_transitions();

        // The primary is unpaused by the pop and re-paused by the push.
        let log = log.borrow();
        let m_pauses: Vec<&str> = log
            .iter()
            .filter(|entry| entry.starts_with("m:") && entry.ends_with("paused"))
            .map(String::as_str)
            .collect();
        assert_eq!(m_pauses, ["m:paused", "m:unpaused", "m:paused"]);
        assert_eq!(stack.active_panel().debug_name(), "b");
        assert_eq!(stack.overlay_count(), 1);
    }

    #[test]
    fn primary_replacement_swaps_bottom_of_stack() {
        let (mut stack, _log) = stack_with_log(OnEvent::ReplacePrimary("world"));

        dispatch(&mut stack);
        assert_eq!(stack.active_panel().debug_name(), "primary");
        stack.apply_pending_transitions();
        assert_eq!(stack.active_panel().debug_name(), "world");
    }

    #[test]
    fn resize_reaches_every_stacked_panel() {
        let log: EventLog = Rc::default();
        let mut stack = PanelStack::new(ScriptedPanel::new("m", OnEvent::Nothing, &log));
        stack
            .requests
            .push_overlay(ScriptedPanel::new("a", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();

        stack.resize_all(640, 400);

        let log = log.borrow();
        assert!(log.contains(&"m:resize 640x400".to_string()));
        assert!(log.contains(&"a:resize 640x400".to_string()));
    }

    #[test]
    fn render_draws_primary_then_overlays_then_secondary() {
        let log: EventLog = Rc::default();
        let mut stack = PanelStack::new(ScriptedPanel::new("m", OnEvent::Nothing, &log));
        stack
            .requests
            .push_overlay(ScriptedPanel::new("a", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();
        stack
            .requests
            .push_overlay(ScriptedPanel::new("b", OnEvent::Nothing, &log));
        stack.apply_pending_transitions();

        let mut buffer = vec![0u8; 16 * 16 * 4];
        let mut frame = Frame::new(&mut buffer, 16, 16);
        stack.render(&mut frame).expect("render");

        let log = log.borrow();
        let draws: Vec<&str> = log
            .iter()
            .filter(|entry| entry.contains("render"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            draws,
            ["m:render", "a:render", "b:render", "b:render_secondary"]
        );
    }

    #[test]
    fn exit_request_is_observable_without_apply() {
        let (mut stack, _log) = stack_with_log(OnEvent::RequestExit);
        assert!(!stack.exit_requested());
        dispatch(&mut stack);
        assert!(stack.exit_requested());
    }

    #[test]
    fn failing_event_handler_reports_panel_error() {
        let (mut stack, _log) = stack_with_log(OnEvent::Fail);
        let mut options = Options::default();
        let input = InputState::default();

        let error = stack
            .dispatch_event(&any_event(), &mut options, &input)
            .expect_err("failure");
        assert_eq!(error.to_string(), "scripted failure");
    }

    struct FailingTickPanel;

    impl Panel for FailingTickPanel {
        fn handle_event(
            &mut self,
            _event: &InputEvent,
            _ctx: &mut PanelContext<'_>,
        ) -> Result<(), PanelError> {
            Ok(())
        }

        fn tick(&mut self, _dt: f64, _ctx: &mut PanelContext<'_>) -> Result<(), PanelError> {
            Err(PanelError::new("tick failure"))
        }

        fn render(&mut self, _frame: &mut Frame<'_>) -> Result<(), PanelError> {
            Ok(())
        }

        fn debug_name(&self) -> &'static str {
            "failing_tick"
        }
    }

    #[test]
    fn failing_tick_reports_panel_error() {
        let mut stack = PanelStack::new(Box::new(FailingTickPanel));
        let mut options = Options::default();
        let input = InputState::default();

        let error = stack
            .tick(0.016, &mut options, &input)
            .expect_err("tick failure");
        assert_eq!(error.to_string(), "tick failure");
    }
}

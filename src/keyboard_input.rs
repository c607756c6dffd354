use crate::camera::SurfaceHandle;
use crate::error::Result;
use crate::monitor::{DeviceSelector, SimulatedMonitor};
use crate::session::CommandDispatch;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press asks the shell to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    OpenSelected,
    Select(usize),
    ListDevices,
    SurfaceReady,
    SurfaceDestroyed,
    Start,
    Stop,
    Teardown,
    Unplug,
    Quit,
}

impl KeyAction {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(KeyAction::Quit),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('o') => Some(KeyAction::OpenSelected),
            KeyCode::Char(c @ '1'..='9') => {
                c.to_digit(10).map(|digit| KeyAction::Select(digit as usize - 1))
            }
            KeyCode::Char('l') => Some(KeyAction::ListDevices),
            KeyCode::Char('s') => Some(KeyAction::SurfaceReady),
            KeyCode::Char('d') => Some(KeyAction::SurfaceDestroyed),
            KeyCode::Char('p') => Some(KeyAction::Start),
            KeyCode::Char('x') => Some(KeyAction::Stop),
            KeyCode::Char('t') => Some(KeyAction::Teardown),
            KeyCode::Char('u') => Some(KeyAction::Unplug),
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
            _ => None,
        }
    }
}

/// Surface ids handed out by the shell; the shell plays the display surface provider
#[derive(Debug, Default)]
struct SurfaceTracker {
    next_id: u64,
    current: Option<SurfaceHandle>,
}

impl SurfaceTracker {
    fn create(&mut self) -> SurfaceHandle {
        self.next_id += 1;
        let surface = SurfaceHandle::new(self.next_id);
        self.current = Some(surface);
        surface
    }

    fn destroy(&mut self) -> Option<SurfaceHandle> {
        self.current.take()
    }
}

/// Interactive shell driving the session from the keyboard
pub struct KeyboardInputHandler {
    selector: Arc<Mutex<DeviceSelector<SimulatedMonitor>>>,
    dispatch: CommandDispatch,
    surfaces: Arc<Mutex<SurfaceTracker>>,
    quit_token: CancellationToken,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// `quit_token` is cancelled when the user asks to leave
    pub fn new(
        selector: Arc<Mutex<DeviceSelector<SimulatedMonitor>>>,
        dispatch: CommandDispatch,
        quit_token: CancellationToken,
    ) -> Self {
        Self {
            selector,
            dispatch,
            surfaces: Arc::new(Mutex::new(SurfaceTracker::default())),
            quit_token,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Apply one action. Returns false once the shell should exit.
    pub fn apply(&self, action: KeyAction) -> bool {
        match action {
            KeyAction::OpenSelected => {
                if self.selector.lock().open_selected().is_none() {
                    warn!("No camera attached");
                }
            }
            KeyAction::Select(index) => {
                if let Err(e) = self.selector.lock().select(index) {
                    warn!("Cannot select camera: {}", e);
                }
            }
            KeyAction::ListDevices => {
                let selector = self.selector.lock();
                for (index, label) in selector.candidates().iter().enumerate() {
                    let marker = if index == selector.selected_index() { "*" } else { " " };
                    info!("{} {}: {}", marker, index + 1, label);
                }
            }
            KeyAction::SurfaceReady => {
                let surface = self.surfaces.lock().create();
                info!("Announcing {}", surface);
                self.dispatch.on_surface_ready(surface);
            }
            KeyAction::SurfaceDestroyed => match self.surfaces.lock().destroy() {
                Some(surface) => self.dispatch.on_surface_destroyed(surface),
                None => debug!("No surface to destroy"),
            },
            KeyAction::Start => self.dispatch.request_start(),
            KeyAction::Stop => self.dispatch.request_stop(),
            KeyAction::Teardown => self.dispatch.request_teardown(),
            KeyAction::Unplug => {
                let selector = self.selector.lock();
                if selector.monitor().detach(selector.selected_index()).is_none() {
                    warn!("No camera at slot {}", selector.selected_index() + 1);
                }
            }
            KeyAction::Quit => {
                info!("Quit key pressed - requesting shutdown");
                self.quit_token.cancel();
                return false;
            }
        }
        true
    }

    /// Start listening for keyboard input
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        info!(
            "Keyboard shell active: o=open 1-9=select l=list s=surface d=destroy \
             p=start x=stop t=teardown u=unplug q=quit"
        );

        let handler = Arc::clone(self);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }
                            match KeyAction::from_key(&key_event) {
                                Some(action) => {
                                    if !handler.apply(action) {
                                        break;
                                    }
                                }
                                None => debug!("Key pressed: {:?}", key_event.code),
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the poll loop a tick to notice and restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{BindingCall, SimulatedCamera};
    use crate::config::UvcConfig;
    use crate::session::{spawn_session, SessionController, SessionState};

    fn create_test_handler(
        camera: &SimulatedCamera,
        devices: u32,
    ) -> (
        KeyboardInputHandler,
        tokio::task::JoinHandle<SessionController<SimulatedCamera>>,
        CancellationToken,
    ) {
        let controller = SessionController::new(camera.clone(), UvcConfig::default());
        let (dispatch, worker) = spawn_session(controller, CancellationToken::new());
        let monitor = SimulatedMonitor::with_devices(dispatch.clone(), devices);
        let selector = Arc::new(Mutex::new(DeviceSelector::new(
            monitor,
            dispatch.clone(),
            0,
        )));
        let quit_token = CancellationToken::new();
        let handler = KeyboardInputHandler::new(selector, dispatch, quit_token.clone());
        (handler, worker, quit_token)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            KeyAction::from_key(&press(KeyCode::Char('o'))),
            Some(KeyAction::OpenSelected)
        );
        assert_eq!(
            KeyAction::from_key(&press(KeyCode::Char('3'))),
            Some(KeyAction::Select(2))
        );
        assert_eq!(KeyAction::from_key(&press(KeyCode::Char('0'))), None);
        assert_eq!(
            KeyAction::from_key(&press(KeyCode::Esc)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            KeyAction::from_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(KeyAction::from_key(&press(KeyCode::Char('z'))), None);
    }

    #[tokio::test]
    async fn test_keyboard_session_flow() {
        let camera = SimulatedCamera::default();
        let (handler, worker, _quit) = create_test_handler(&camera, 1);

        assert!(handler.apply(KeyAction::SurfaceReady));
        assert!(handler.apply(KeyAction::OpenSelected));
        assert!(handler.apply(KeyAction::Stop));
        assert!(handler.apply(KeyAction::Start));
        assert!(handler.apply(KeyAction::SurfaceDestroyed));
        drop(handler);

        let controller = worker.await.unwrap();
        assert_eq!(controller.state(), SessionState::Destroyed);
        assert_eq!(camera.open_instances(), 0);

        let calls = camera.calls();
        let starts = calls
            .iter()
            .filter(|c| matches!(c, BindingCall::StartStreaming { .. }))
            .count();
        // Auto start after open, then the explicit start after the stop
        assert_eq!(starts, 2);
        assert!(calls.contains(&BindingCall::BindDisplay {
            instance: 1,
            surface: SurfaceHandle::new(1),
        }));
    }

    #[tokio::test]
    async fn test_surface_ids_increase() {
        let camera = SimulatedCamera::default();
        let (handler, _worker, _quit) = create_test_handler(&camera, 0);

        handler.apply(KeyAction::SurfaceReady);
        handler.apply(KeyAction::SurfaceReady);
        assert_eq!(
            handler.surfaces.lock().current,
            Some(SurfaceHandle::new(2))
        );
        handler.apply(KeyAction::SurfaceDestroyed);
        assert!(handler.surfaces.lock().current.is_none());
    }

    #[tokio::test]
    async fn test_quit_cancels_token() {
        let camera = SimulatedCamera::default();
        let (handler, _worker, quit) = create_test_handler(&camera, 0);

        assert!(handler.apply(KeyAction::ListDevices));
        assert!(!quit.is_cancelled());
        assert!(!handler.apply(KeyAction::Quit));
        assert!(quit.is_cancelled());
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let camera = SimulatedCamera::default();
        let (handler, _worker, _quit) = create_test_handler(&camera, 0);

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}

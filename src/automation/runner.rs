//! The fishing actor.
//!
//! One thread owns every piece of loop state (run state, bait baseline,
//! session, cast history). The tray, the hotkey handler and the extend-time
//! watcher talk to it only through `Command`s. Commands that need an
//! immediate reaction also trip the shared `CancelToken`, which cuts any
//! in-progress hold or wait short.

mod reel;

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::bucket::CastMonitor;
use super::cancel::{CancelToken, Interrupted};
use super::config::AppConfig;
use super::cue::Cue;
use super::input::{InputDriver, Mouse};
use super::queue::RecorderMessage;
use super::state::{RunState, Session, SharedStatus};
use super::timing::{Jitter, Timings};
use crate::capture::ScreenCapture;
use crate::logging;
use crate::paths;
use crate::vision::{Detector, TemplateCache};

/// How long the paused actor blocks on its mailbox before re-checking.
const IDLE_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum Command {
    /// Start when paused, pause when running.
    Toggle,
    UpdateConfig(Box<AppConfig>),
    /// The watcher saw the extend-time dialog.
    ResolveExtendTime,
    ClearRecords,
    Shutdown,
}

impl Command {
    /// Whether the command should cut the current wait short.
    fn interrupts(&self) -> bool {
        matches!(
            self,
            Command::Toggle | Command::ResolveExtendTime | Command::Shutdown
        )
    }
}

/// Sending side of the actor's mailbox.
#[derive(Clone)]
pub struct Controller {
    sender: Sender<Command>,
    cancel: CancelToken,
}

impl Controller {
    pub fn send(&self, command: Command) -> Result<()> {
        let interrupts = command.interrupts();
        self.sender
            .send(command)
            .map_err(|_| anyhow!("Fishing loop is not running"))?;
        // Cancel after sending so the actor finds the command once it wakes
        if interrupts {
            self.cancel.cancel();
        }
        Ok(())
    }
}

pub struct Mailbox {
    pub(super) commands: Receiver<Command>,
    cancel: CancelToken,
}

pub fn channel_pair() -> (Controller, Mailbox) {
    let (sender, commands) = channel();
    let cancel = CancelToken::new();
    (
        Controller {
            sender,
            cancel: cancel.clone(),
        },
        Mailbox { commands, cancel },
    )
}

pub struct FishingActor {
    commands: Receiver<Command>,
    cancel: CancelToken,
    screen: Box<dyn ScreenCapture>,
    mouse: Mouse,
    templates: Arc<TemplateCache>,
    detector: Detector,
    config: AppConfig,
    timings: Timings,
    jitter: Jitter,
    status: Arc<SharedStatus>,
    recorder: Option<Sender<RecorderMessage>>,
    state: RunState,
    session: Option<Session>,
    previous_bait: Option<u32>,
    casts: CastMonitor,
    extend_pending: bool,
    shutdown: bool,
}

impl FishingActor {
    pub fn new(
        mailbox: Mailbox,
        screen: Box<dyn ScreenCapture>,
        input: Box<dyn InputDriver>,
        templates: Arc<TemplateCache>,
        config: AppConfig,
        status: Arc<SharedStatus>,
        recorder: Option<Sender<RecorderMessage>>,
    ) -> Self {
        let target = config.target_resolution(screen.resolution());
        let detector = Detector::for_resolution(&templates, target);
        status.set_resolution(target);

        Self {
            commands: mailbox.commands,
            cancel: mailbox.cancel,
            screen,
            mouse: Mouse::new(input),
            templates,
            detector,
            timings: Timings::from(&config.active_timing()),
            jitter: Jitter::new(config.jitter_percent),
            config,
            status,
            recorder,
            state: RunState::Paused,
            session: None,
            previous_bait: None,
            casts: CastMonitor::new(),
            extend_pending: false,
            shutdown: false,
        }
    }

    /// Runs until a `Shutdown` command arrives or every `Controller` is dropped.
    pub fn run(mut self) {
        info!(
            "Fishing loop ready (screen {}, layout {})",
            self.screen.resolution(),
            self.detector.layout().resolution
        );

        while !self.shutdown {
            self.pump();
            if self.shutdown {
                break;
            }
            match self.state {
                RunState::Paused => self.wait_for_command(),
                RunState::Running => self.step(),
            }
        }

        self.pause();
        self.status.set_stopped();
        info!("Fishing loop stopped");
    }

    /// Handles every queued command without blocking.
    fn pump(&mut self) {
        loop {
            self.cancel.reset();
            match self.commands.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.shutdown = true;
                    return;
                }
            }
        }
    }

    fn wait_for_command(&mut self) {
        match self.commands.recv_timeout(IDLE_WAIT) {
            Ok(command) => self.handle(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.shutdown = true,
        }
    }

    /// One running iteration followed by the poll interval.
    fn step(&mut self) {
        match self.tick() {
            Ok(()) => {}
            Err(e) if e.is::<Interrupted>() => {
                self.release_mouse();
                return;
            }
            Err(e) => warn!("Fishing iteration failed: {:#}", e),
        }
        self.release_mouse();

        // Interrupted here just means a command is waiting
        let _ = self.cancel.sleep(self.timings.poll_interval);
    }

    fn handle(&mut self, command: Command) {
        debug!("Command: {:?}", command);
        match command {
            Command::Toggle => match self.state {
                RunState::Paused => self.start(),
                RunState::Running => self.pause(),
            },
            Command::UpdateConfig(config) => self.apply_config(*config),
            Command::ResolveExtendTime => {
                if self.state == RunState::Running {
                    self.extend_pending = true;
                }
            }
            Command::ClearRecords => self.notify(RecorderMessage::Clear),
            Command::Shutdown => self.shutdown = true,
        }
    }

    fn start(&mut self) {
        let bait = self
            .screen
            .open()
            .and_then(|mut handle| self.detector.read_bait(handle.as_mut()));

        let bait = match bait {
            Ok(Some(bait)) => bait,
            Ok(None) => {
                warn!("Cannot read the bait counter. Open the fishing screen and try again.");
                return;
            }
            Err(e) => {
                warn!("Cannot start, screen capture failed: {:#}", e);
                return;
            }
        };

        let session = Session::start();
        logging::set_session_log(Some(
            paths::get_session_logs_dir().join(format!("{}.log", session.id)),
        ));
        info!(
            "Started fishing: session {}, bait {}, preset '{}'",
            session.id,
            bait,
            self.config.active_timing().name
        );
        self.notify(RecorderMessage::SessionStarted(session.id.clone()));

        self.session = Some(session);
        self.previous_bait = Some(bait);
        self.casts.reset();
        self.extend_pending = false;
        self.state = RunState::Running;
        self.status.set_running(true);
        if self.config.sound_cues {
            Cue::Start.play();
        }
    }

    fn pause(&mut self) {
        self.release_mouse();
        if self.state == RunState::Paused {
            return;
        }

        self.state = RunState::Paused;
        self.status.set_running(false);
        self.previous_bait = None;
        self.extend_pending = false;

        if let Some(session) = self.session.take() {
            let minutes = (chrono::Local::now() - session.started).num_minutes();
            info!("Paused. Session {} ran for {} min", session.id, minutes);
            self.notify(RecorderMessage::SessionEnded(session.id));
        }
        logging::set_session_log(None);
        if self.config.sound_cues {
            Cue::Pause.play();
        }
    }

    fn apply_config(&mut self, config: AppConfig) {
        self.timings = Timings::from(&config.active_timing());
        self.jitter.set_percent(config.jitter_percent);

        let target = config.target_resolution(self.screen.resolution());
        if target != self.detector.layout().resolution {
            info!("Layout resolution changed to {}", target);
            self.detector = Detector::for_resolution(&self.templates, target);
            self.status.set_resolution(target);
        }

        info!(
            "Settings applied: preset '{}', extend time {:?}",
            config.active_timing().name,
            config.extend_time
        );
        self.config = config;
    }

    fn notify(&mut self, message: RecorderMessage) {
        if let Some(recorder) = &self.recorder {
            if recorder.send(message).is_err() {
                error!("Recorder has stopped, catches will no longer be recorded");
                self.recorder = None;
            }
        }
    }

    fn release_mouse(&mut self) {
        if let Err(e) = self.mouse.release_if_held() {
            warn!("Failed to release the mouse button: {:#}", e);
        }
    }

    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.cancel.sleep(duration)
    }
}

/// Spawns the actor thread.
///
/// The screen is created on the actor thread because capture objects are
/// tied to the thread that made them.
pub fn spawn<F>(
    mailbox: Mailbox,
    make_screen: F,
    input: Box<dyn InputDriver>,
    templates: Arc<TemplateCache>,
    config: AppConfig,
    status: Arc<SharedStatus>,
    recorder: Option<Sender<RecorderMessage>>,
) -> JoinHandle<()>
where
    F: FnOnce() -> Result<Box<dyn ScreenCapture>> + Send + 'static,
{
    thread::spawn(move || match make_screen() {
        Ok(screen) => {
            FishingActor::new(mailbox, screen, input, templates, config, status, recorder).run()
        }
        Err(e) => {
            error!("Screen capture is unavailable, fishing loop not started: {:#}", e);
            status.set_stopped();
        }
    })
}

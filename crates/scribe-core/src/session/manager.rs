//! Session manager: the single writer of the session context
//!
//! User intents (load/play/pause/seek) are serialized behind one mutex and
//! validated against the state graph before any engine call. Engine callbacks
//! arrive on the engine's thread and never take that mutex: they update the
//! context with a compare-and-retry swap, guarded so a callback for a stale
//! playback handle is ignored.
//!
//! Readers on any thread get whole [`SessionContext`] snapshots and can never
//! observe a half-applied command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use super::{
    EventBus, SessionCommand, SessionContext, SessionError, SessionEvent, SessionResult,
    SessionState, StatePayload,
};
use crate::engine::{AudioEngine, AudioHandle, PlaybackHandle, PlaybackListener, PlaybackState};
use crate::types::{clamp_frame, frames_to_seconds, millis_to_frames, SeekDirection};

/// Default event bus capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// State shared between the manager and its engine listener
struct SessionShared {
    context: ArcSwap<SessionContext>,
    events: EventBus,
    /// Channels dropped from the context by an error, still held by the engine
    orphaned: Mutex<Vec<PlaybackHandle>>,
}

impl SessionShared {
    /// Apply `command` if `guard` accepts the current context
    ///
    /// Publishes a state-change event when the state differs afterwards.
    /// Returns whether the command was applied.
    fn apply_if<G>(&self, guard: G, command: SessionCommand, payload: StatePayload) -> bool
    where
        G: Fn(&SessionContext) -> bool,
    {
        let mut applied = None;
        let previous = self.context.rcu(|current| {
            if guard(current.as_ref()) {
                let next = Arc::new(current.apply(&command));
                applied = Some(Arc::clone(&next));
                next
            } else {
                applied = None;
                Arc::clone(current)
            }
        });

        let Some(next) = applied else {
            return false;
        };

        log::trace!(
            "apply: {} ({} -> {})",
            command.name(),
            previous.state(),
            next.state()
        );
        if previous.state() != next.state() {
            log::info!("session: {} -> {}", previous.state(), next.state());
            self.publish(SessionEvent::StateChanged {
                previous: previous.state(),
                current: next.state(),
                payload,
            });
        }
        true
    }

    fn publish(&self, event: SessionEvent) {
        let delivered = self.events.publish(event);
        log::trace!("publish: delivered to {} subscribers", delivered);
    }
}

/// Engine listener feeding callbacks into the shared context
struct SessionPlaybackListener {
    shared: Arc<SessionShared>,
}

impl SessionPlaybackListener {
    fn fail(&self, playback: PlaybackHandle, message: &str) {
        let applied = self.shared.apply_if(
            |ctx| {
                ctx.playback_handle() == Some(playback)
                    && ctx.state().can_transition_to(SessionState::Error)
            },
            SessionCommand::SetLoadError {
                message: message.to_string(),
            },
            StatePayload::Error(message.to_string()),
        );
        if applied {
            log::error!("on_playback_error: {}: {}", playback, message);
            self.shared.orphaned.lock().push(playback);
        } else {
            log::warn!("on_playback_error: ignoring error for {}: {}", playback, message);
        }
    }
}

impl PlaybackListener for SessionPlaybackListener {
    fn on_progress(&self, playback: PlaybackHandle, position_frames: u64, _total_frames: u64) {
        self.shared.apply_if(
            |ctx| ctx.state() == SessionState::Playing && ctx.playback_handle() == Some(playback),
            SessionCommand::UpdatePosition { position_frames },
            StatePayload::None,
        );
    }

    fn on_state_changed(
        &self,
        playback: PlaybackHandle,
        new_state: PlaybackState,
        old_state: PlaybackState,
    ) {
        log::debug!("on_state_changed: {} {} -> {}", playback, old_state, new_state);
        if new_state == PlaybackState::Error {
            self.fail(playback, "audio engine reported an error");
        }
    }

    fn on_playback_complete(&self, playback: PlaybackHandle) {
        let applied = self.shared.apply_if(
            |ctx| ctx.playback_handle() == Some(playback),
            SessionCommand::StopPlayback,
            StatePayload::Completed,
        );
        if applied {
            log::info!("on_playback_complete: {} finished", playback);
        }
    }

    fn on_playback_error(&self, playback: PlaybackHandle, message: &str) {
        self.fail(playback, message);
    }
}

/// Owns the session context and drives the audio engine
pub struct SessionManager {
    engine: Arc<dyn AudioEngine>,
    shared: Arc<SessionShared>,
    listener: Arc<dyn PlaybackListener>,
    intents: Mutex<()>,
    /// Short replay channel running beside the session's own
    audition: Mutex<Option<PlaybackHandle>>,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self::with_event_capacity(engine, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(engine: Arc<dyn AudioEngine>, capacity: usize) -> Self {
        let shared = Arc::new(SessionShared {
            context: ArcSwap::from_pointee(SessionContext::create_initial()),
            events: EventBus::new(capacity),
            orphaned: Mutex::new(Vec::new()),
        });
        let listener: Arc<dyn PlaybackListener> = Arc::new(SessionPlaybackListener {
            shared: Arc::clone(&shared),
        });
        engine.add_playback_listener(Arc::clone(&listener));

        Self {
            engine,
            shared,
            listener,
            intents: Mutex::new(()),
            audition: Mutex::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Intents
    // ─────────────────────────────────────────────────────────────

    /// Load a file, closing whatever is currently loaded
    ///
    /// On failure the session is left in ERROR with the message captured and
    /// the error is returned; loading another file recovers.
    pub fn load(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        let path = path.as_ref().to_path_buf();
        let _intent = self.intents.lock();
        log::info!("load: {}", path.display());

        if self.context().state().is_audio_loaded() {
            self.close_locked()?;
        }
        self.release_orphans();

        let ctx = self.context();
        ctx.state().transition(SessionState::Loading)?;
        self.commit(
            &ctx,
            SessionCommand::BeginLoad { file: path.clone() },
            StatePayload::None,
        );

        let ctx = self.context();
        let loaded = self
            .engine
            .load_audio(&path)
            .and_then(|audio| Ok((audio, self.engine.metadata(audio)?)));

        match loaded {
            Ok((audio, metadata)) => {
                log::info!(
                    "load: {} ready ({} frames @ {} Hz, {:.2}s)",
                    path.display(),
                    metadata.frame_count,
                    metadata.sample_rate,
                    metadata.duration_seconds()
                );
                self.commit(
                    &ctx,
                    SessionCommand::LoadFile {
                        file: path.clone(),
                        audio_handle: audio,
                        total_frames: metadata.frame_count,
                        sample_rate: metadata.sample_rate,
                    },
                    StatePayload::FileLoaded(path),
                );
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("load: {}", message);
                self.commit(
                    &ctx,
                    SessionCommand::SetLoadError {
                        message: message.clone(),
                    },
                    StatePayload::Error(message.clone()),
                );
                Err(SessionError::Load { path, message })
            }
        }
    }

    /// Start from READY (pending seek or last position) or resume from PAUSED
    pub fn play(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        match ctx.state() {
            SessionState::Paused => self.resume_locked(&ctx),
            SessionState::Ready => {
                let start = ctx
                    .pending_start_frame()
                    .unwrap_or_else(|| ctx.playhead_frame());
                self.start_locked(&ctx, start, ctx.total_frames())
            }
            from => Err(SessionError::IllegalTransition {
                from,
                to: SessionState::Playing,
            }),
        }
    }

    pub fn pause(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        self.pause_locked(&ctx)
    }

    pub fn resume(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        if ctx.state() != SessionState::Paused {
            return Err(SessionError::IllegalTransition {
                from: ctx.state(),
                to: SessionState::Playing,
            });
        }
        self.resume_locked(&ctx)
    }

    /// Release the playback channel and return to READY at frame 0
    pub fn stop(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        if !ctx.state().is_playback_active() {
            return Err(SessionError::IllegalTransition {
                from: ctx.state(),
                to: SessionState::Ready,
            });
        }
        self.stop_locked(&ctx);
        Ok(())
    }

    /// PLAYING pauses, PAUSED resumes, READY starts
    pub fn toggle_play_pause(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        match ctx.state() {
            SessionState::Playing => self.pause_locked(&ctx),
            SessionState::Paused => self.resume_locked(&ctx),
            SessionState::Ready => {
                let start = ctx
                    .pending_start_frame()
                    .unwrap_or_else(|| ctx.playhead_frame());
                self.start_locked(&ctx, start, ctx.total_frames())
            }
            from => Err(SessionError::IllegalTransition {
                from,
                to: SessionState::Playing,
            }),
        }
    }

    /// Seek to `frame`, clamped to `[0, total_frames - 1]`
    ///
    /// With an active channel the engine seeks immediately. In READY the
    /// target is kept as the start frame of the next play.
    pub fn seek(&self, frame: u64) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        self.seek_locked(&ctx, frame)
    }

    /// Seek relative to the current position by a duration
    pub fn seek_by_amount(&self, direction: SeekDirection, millis: u64) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        if !ctx.state().is_audio_loaded() {
            return Err(SessionError::NoAudioLoaded(ctx.state()));
        }

        let base = match ctx.pending_start_frame() {
            Some(pending) => pending,
            None => self.live_position(&ctx),
        };
        let delta = millis_to_frames(millis, ctx.sample_rate());
        let target = match direction {
            SeekDirection::Forward => base.saturating_add(delta),
            SeekDirection::Backward => base.saturating_sub(delta),
        };
        self.seek_locked(&ctx, target)
    }

    pub fn seek_to_start(&self) -> SessionResult<()> {
        self.seek(0)
    }

    /// Seek to the last frame
    pub fn seek_to_end(&self) -> SessionResult<()> {
        self.seek(u64::MAX)
    }

    /// Audition the `millis` leading up to the playhead
    ///
    /// Only while READY or PAUSED. The range plays on a separate channel; the
    /// session's state, playhead and paused channel are left untouched.
    pub fn replay_last_millis(&self, millis: u64) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        self.check_audition_state(&ctx, "replay")?;

        let end = ctx
            .pending_start_frame()
            .unwrap_or_else(|| ctx.playhead_frame());
        let start = end.saturating_sub(millis_to_frames(millis, ctx.sample_rate()));
        self.audition_locked(&ctx, start, end);
        Ok(())
    }

    /// Move the playhead by `millis`, then audition the `millis` before it
    ///
    /// Only while READY or PAUSED. The move is a regular seek (deferred in
    /// READY) and is clamped to the file.
    pub fn step_and_replay(&self, direction: SeekDirection, millis: u64) -> SessionResult<()> {
        let _intent = self.intents.lock();
        let ctx = self.context();
        self.check_audition_state(&ctx, "step and replay")?;

        let base = ctx
            .pending_start_frame()
            .unwrap_or_else(|| ctx.playhead_frame());
        let shift = millis_to_frames(millis, ctx.sample_rate());
        let target = match direction {
            SeekDirection::Forward => base.saturating_add(shift),
            SeekDirection::Backward => base.saturating_sub(shift),
        };
        self.seek_locked(&ctx, target)?;

        let ctx = self.context();
        let end = ctx
            .pending_start_frame()
            .unwrap_or_else(|| ctx.playhead_frame());
        self.audition_locked(&ctx, end.saturating_sub(shift), end);
        Ok(())
    }

    /// Stop and unload, returning to NO_AUDIO
    pub fn close(&self) -> SessionResult<()> {
        let _intent = self.intents.lock();
        self.close_locked()
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// Current snapshot
    pub fn context(&self) -> Arc<SessionContext> {
        self.shared.context.load_full()
    }

    pub fn state(&self) -> SessionState {
        self.shared.context.load().state()
    }

    pub fn is_audio_loaded(&self) -> bool {
        self.state().is_audio_loaded()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.state() == SessionState::Loading
    }

    pub fn current_audio_handle(&self) -> Option<AudioHandle> {
        self.shared.context.load().audio_handle()
    }

    pub fn current_file_path(&self) -> Option<PathBuf> {
        self.shared
            .context
            .load()
            .current_file()
            .map(Path::to_path_buf)
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.context.load().sample_rate()
    }

    pub fn total_frames(&self) -> u64 {
        self.shared.context.load().total_frames()
    }

    /// Playhead position; asks the engine directly while playing
    pub fn playback_position_frames(&self) -> u64 {
        self.live_position(&self.context())
    }

    pub fn playback_position_seconds(&self) -> f64 {
        let ctx = self.context();
        frames_to_seconds(self.live_position(&ctx), ctx.sample_rate())
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.shared.context.load().total_duration_seconds()
    }

    pub fn error_message(&self) -> Option<String> {
        self.shared
            .context
            .load()
            .error_message()
            .map(str::to_string)
    }

    /// Receiver for session events
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Channel of the running or last audition, if any
    pub fn audition_handle(&self) -> Option<PlaybackHandle> {
        *self.audition.lock()
    }

    // ─────────────────────────────────────────────────────────────
    // Internals (intent lock held)
    // ─────────────────────────────────────────────────────────────

    /// Apply a command if no engine callback changed the state or channel
    /// since `expected` was read
    fn commit(
        &self,
        expected: &SessionContext,
        command: SessionCommand,
        payload: StatePayload,
    ) -> bool {
        let state = expected.state();
        let playback = expected.playback_handle();
        let name = command.name();
        let applied = self.shared.apply_if(
            |ctx| ctx.state() == state && ctx.playback_handle() == playback,
            command,
            payload,
        );
        if !applied {
            log::warn!("commit: {} superseded by an engine callback", name);
        }
        applied
    }

    fn live_position(&self, ctx: &SessionContext) -> u64 {
        match (ctx.state(), ctx.playback_handle()) {
            (SessionState::Playing, Some(playback)) => {
                self.engine.position(playback).unwrap_or_else(|e| {
                    log::debug!("live_position: {}", e);
                    ctx.playhead_frame()
                })
            }
            _ => ctx.playhead_frame(),
        }
    }

    fn check_audition_state(
        &self,
        ctx: &SessionContext,
        operation: &'static str,
    ) -> SessionResult<()> {
        match ctx.state() {
            SessionState::Ready | SessionState::Paused => Ok(()),
            SessionState::Playing => Err(SessionError::NotAvailable {
                operation,
                state: SessionState::Playing,
            }),
            state => Err(SessionError::NoAudioLoaded(state)),
        }
    }

    /// Play `[start, end)` on a side channel, replacing any earlier audition
    fn audition_locked(&self, ctx: &SessionContext, start: u64, end: u64) {
        self.stop_audition();
        if end <= start {
            log::debug!("audition: nothing before frame {}", end);
            return;
        }
        let Some(audio) = ctx.audio_handle() else {
            return;
        };

        match self.engine.play(audio, start, end) {
            Ok(playback) => {
                log::debug!("audition: {} frames {}..{}", playback, start, end);
                *self.audition.lock() = Some(playback);
            }
            Err(e) => log::error!("audition: engine failed to play {}: {}", audio, e),
        }
    }

    fn stop_audition(&self) {
        if let Some(playback) = self.audition.lock().take() {
            // Usually already finished on its own
            if let Err(e) = self.engine.stop(playback) {
                log::trace!("stop_audition: {}", e);
            }
        }
    }

    fn start_locked(&self, ctx: &SessionContext, start: u64, end: u64) -> SessionResult<()> {
        ctx.state().transition(SessionState::Playing)?;
        self.stop_audition();
        let audio = ctx
            .audio_handle()
            .ok_or(SessionError::NoAudioLoaded(ctx.state()))?;

        match self.engine.play(audio, start, end) {
            Ok(playback) => {
                log::info!("play: {} from frame {}", playback, start);
                self.commit(
                    ctx,
                    SessionCommand::StartPlayback {
                        playback_handle: playback,
                        start_frame: start,
                    },
                    StatePayload::Position(start),
                );
            }
            Err(e) => log::error!("play: engine failed to start {}: {}", audio, e),
        }
        Ok(())
    }

    fn pause_locked(&self, ctx: &SessionContext) -> SessionResult<()> {
        ctx.state().transition(SessionState::Paused)?;
        let Some(playback) = ctx.playback_handle() else {
            return Err(SessionError::IllegalTransition {
                from: ctx.state(),
                to: SessionState::Paused,
            });
        };

        if let Err(e) = self.engine.pause(playback) {
            log::error!("pause: engine failed to pause {}: {}", playback, e);
            return Ok(());
        }
        let position = self.engine.position(playback).unwrap_or_else(|e| {
            log::error!("pause: engine position unavailable for {}: {}", playback, e);
            self.shared.context.load().playhead_frame()
        });

        self.commit(
            ctx,
            SessionCommand::PausePlayback {
                position_frames: position,
            },
            StatePayload::Position(position),
        );
        Ok(())
    }

    fn resume_locked(&self, ctx: &SessionContext) -> SessionResult<()> {
        let Some(playback) = ctx.playback_handle() else {
            return Err(SessionError::IllegalTransition {
                from: ctx.state(),
                to: SessionState::Playing,
            });
        };
        self.stop_audition();

        if let Err(e) = self.engine.resume(playback) {
            log::error!("resume: engine failed to resume {}: {}", playback, e);
            return Ok(());
        }
        let position = self
            .engine
            .position(playback)
            .unwrap_or_else(|_| ctx.playhead_frame());

        self.commit(
            ctx,
            SessionCommand::ResumePlayback {
                position_frames: position,
            },
            StatePayload::Position(position),
        );
        Ok(())
    }

    /// Release the channel; the handle is dropped even if the engine errors
    fn stop_locked(&self, ctx: &SessionContext) {
        let Some(playback) = ctx.playback_handle() else {
            return;
        };
        if let Err(e) = self.engine.stop(playback) {
            log::error!("stop: engine failed to stop {}: {}", playback, e);
        }
        self.commit(ctx, SessionCommand::StopPlayback, StatePayload::Stopped);
    }

    fn seek_locked(&self, ctx: &SessionContext, frame: u64) -> SessionResult<()> {
        if !ctx.state().is_audio_loaded() {
            return Err(SessionError::NoAudioLoaded(ctx.state()));
        }
        let target = clamp_frame(frame, ctx.total_frames());

        match ctx.playback_handle() {
            Some(playback) => {
                if let Err(e) = self.engine.seek(playback, target) {
                    log::error!("seek: engine failed to seek {}: {}", playback, e);
                    return Ok(());
                }
                self.commit(
                    ctx,
                    SessionCommand::SeekPlayback {
                        target_frame: target,
                    },
                    StatePayload::None,
                );
                log::debug!("seek: {} -> frame {}", playback, target);
                self.shared.publish(SessionEvent::Seeked {
                    frame: target,
                    deferred: false,
                });
            }
            None => {
                self.commit(
                    ctx,
                    SessionCommand::SetPendingSeek {
                        target_frame: target,
                    },
                    StatePayload::None,
                );
                log::debug!("seek: deferred to frame {}", target);
                self.shared.publish(SessionEvent::Seeked {
                    frame: target,
                    deferred: true,
                });
            }
        }
        Ok(())
    }

    /// Stop channels whose error already took them out of the context
    fn release_orphans(&self) {
        let orphaned = std::mem::take(&mut *self.shared.orphaned.lock());
        for playback in orphaned {
            log::debug!("release_orphans: stopping failed channel {}", playback);
            if let Err(e) = self.engine.stop(playback) {
                log::debug!("release_orphans: {}", e);
            }
        }
    }

    fn close_locked(&self) -> SessionResult<()> {
        self.stop_audition();
        self.release_orphans();
        let ctx = self.context();
        if ctx.state().is_playback_active() {
            self.stop_locked(&ctx);
        }

        let ctx = self.context();
        if ctx.state() == SessionState::NoAudio {
            return Ok(());
        }
        ctx.state().transition(SessionState::NoAudio)?;
        self.commit(&ctx, SessionCommand::CloseFile, StatePayload::None);
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(playback) = self.shared.context.load().playback_handle() {
            if let Err(e) = self.engine.stop(playback) {
                log::debug!("drop: {}", e);
            }
        }
        self.stop_audition();
        self.release_orphans();
        self.engine.remove_playback_listener(&self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AudioMetadata, SimulatedEngine};
    use std::thread;

    const TEN_SECONDS: AudioMetadata = AudioMetadata {
        sample_rate: 44_100,
        frame_count: 441_000,
    };

    fn setup() -> (Arc<SimulatedEngine>, SessionManager) {
        let engine = Arc::new(
            SimulatedEngine::new()
                .with_file("interview.wav", TEN_SECONDS)
                .with_file(
                    "short.flac",
                    AudioMetadata {
                        sample_rate: 48_000,
                        frame_count: 96_000,
                    },
                ),
        );
        let manager = SessionManager::new(engine.clone());
        (engine, manager)
    }

    fn playback(manager: &SessionManager) -> PlaybackHandle {
        manager.context().playback_handle().unwrap()
    }

    fn transitions(rx: &Receiver<SessionEvent>) -> Vec<(SessionState, SessionState)> {
        rx.try_iter()
            .filter_map(|event| match event {
                SessionEvent::StateChanged {
                    previous, current, ..
                } => Some((previous, current)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let (engine, manager) = setup();
        let events = manager.subscribe();

        manager.load("interview.wav").unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.total_frames(), 441_000);
        assert_eq!(manager.sample_rate(), 44_100);
        assert_eq!(manager.total_duration_seconds(), 10.0);
        assert_eq!(
            transitions(&events),
            vec![
                (SessionState::NoAudio, SessionState::Loading),
                (SessionState::Loading, SessionState::Ready),
            ]
        );

        manager.play().unwrap();
        assert!(manager.is_playing());
        engine.advance(playback(&manager), 44_100).unwrap();
        assert!((manager.playback_position_seconds() - 1.0).abs() < 1e-9);

        manager.pause().unwrap();
        assert_eq!(manager.state(), SessionState::Paused);
        engine.advance(playback(&manager), 10_000).unwrap();
        assert_eq!(manager.playback_position_frames(), 44_100);

        manager.resume().unwrap();
        assert_eq!(manager.state(), SessionState::Playing);
        assert_eq!(manager.playback_position_frames(), 44_100);

        manager.stop().unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.total_frames(), 441_000);
        assert_eq!(manager.sample_rate(), 44_100);
        assert_eq!(manager.playback_position_frames(), 0);
        assert_eq!(engine.active_channels(), 0);
    }

    #[test]
    fn test_pending_seek_consumed_by_play() {
        let (_engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        let events = manager.subscribe();

        manager.seek(100_000).unwrap();
        let ctx = manager.context();
        assert_eq!(ctx.state(), SessionState::Ready);
        assert_eq!(ctx.playhead_frame(), 0);
        assert_eq!(ctx.pending_start_frame(), Some(100_000));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Seeked {
                frame: 100_000,
                deferred: true
            }
        );

        manager.play().unwrap();
        let ctx = manager.context();
        assert_eq!(ctx.playhead_frame(), 100_000);
        assert_eq!(ctx.pending_start_frame(), None);
        assert_eq!(manager.playback_position_frames(), 100_000);
    }

    #[test]
    fn test_seek_by_amount_clamps_to_last_frame() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();

        manager.seek(440_000).unwrap();
        manager
            .seek_by_amount(SeekDirection::Forward, 60_000)
            .unwrap();
        assert_eq!(manager.context().pending_start_frame(), Some(440_999));

        manager.play().unwrap();
        manager
            .seek_by_amount(SeekDirection::Forward, 60_000)
            .unwrap();
        assert_eq!(engine.position(playback(&manager)).unwrap(), 440_999);

        manager
            .seek_by_amount(SeekDirection::Backward, 60_000)
            .unwrap();
        assert_eq!(manager.playback_position_frames(), 0);
    }

    #[test]
    fn test_seek_to_start_and_end() {
        let (_engine, manager) = setup();
        manager.load("short.flac").unwrap();
        manager.play().unwrap();

        manager.seek_to_end().unwrap();
        assert_eq!(manager.playback_position_frames(), 95_999);
        manager.seek_to_start().unwrap();
        assert_eq!(manager.playback_position_frames(), 0);
    }

    #[test]
    fn test_load_failure_is_recoverable() {
        let (_engine, manager) = setup();
        let events = manager.subscribe();

        let err = manager.load("missing.wav").unwrap_err();
        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(manager.state(), SessionState::Error);
        assert!(manager.error_message().unwrap().contains("missing.wav"));
        assert_eq!(manager.current_file_path(), Some(PathBuf::from("missing.wav")));
        assert_eq!(manager.total_frames(), 0);
        assert!(events.try_iter().any(|e| e.is_error()));

        manager.load("interview.wav").unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.error_message(), None);
    }

    #[test]
    fn test_load_replaces_playing_session() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        let events = manager.subscribe();

        manager.load("short.flac").unwrap();
        assert_eq!(engine.active_channels(), 0);
        assert_eq!(manager.sample_rate(), 48_000);
        assert_eq!(manager.current_file_path(), Some(PathBuf::from("short.flac")));
        assert_eq!(
            transitions(&events),
            vec![
                (SessionState::Playing, SessionState::Ready),
                (SessionState::Ready, SessionState::NoAudio),
                (SessionState::NoAudio, SessionState::Loading),
                (SessionState::Loading, SessionState::Ready),
            ]
        );
    }

    #[test]
    fn test_illegal_intents_leave_state_unchanged() {
        let (_engine, manager) = setup();
        assert_eq!(
            manager.play(),
            Err(SessionError::IllegalTransition {
                from: SessionState::NoAudio,
                to: SessionState::Playing,
            })
        );
        assert_eq!(
            manager.seek(10),
            Err(SessionError::NoAudioLoaded(SessionState::NoAudio))
        );

        manager.load("interview.wav").unwrap();
        assert!(manager.pause().is_err());
        assert!(manager.resume().is_err());
        assert!(manager.stop().is_err());
        assert_eq!(manager.state(), SessionState::Ready);
    }

    #[test]
    fn test_engine_failure_is_swallowed() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();

        // Release the channel behind the manager's back
        engine.stop(playback(&manager)).unwrap();

        assert_eq!(manager.pause(), Ok(()));
        assert_eq!(manager.state(), SessionState::Playing);
        assert_eq!(manager.seek(1_000), Ok(()));
        assert_eq!(manager.state(), SessionState::Playing);

        // Stop still releases the stale handle
        manager.stop().unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
    }

    #[test]
    fn test_playback_complete_returns_to_ready() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        let events = manager.subscribe();

        engine.advance(playback(&manager), 500_000).unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.context().playback_handle(), None);
        assert!(events.try_iter().any(|e| e.is_playback_completed()));
    }

    #[test]
    fn test_engine_error_enters_error_state() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();

        engine.fail(playback(&manager), "device unplugged").unwrap();
        assert_eq!(manager.state(), SessionState::Error);
        assert_eq!(manager.error_message().as_deref(), Some("device unplugged"));
        assert_eq!(manager.current_audio_handle(), None);
        assert_eq!(engine.active_channels(), 1);

        manager.close().unwrap();
        assert_eq!(manager.state(), SessionState::NoAudio);
        assert_eq!(engine.active_channels(), 0);
    }

    #[test]
    fn test_reload_after_engine_error_releases_channel() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        engine.fail(playback(&manager), "buffer underrun").unwrap();

        manager.load("short.flac").unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(engine.active_channels(), 0);
    }

    #[test]
    fn test_drop_releases_failed_channel() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        engine.fail(playback(&manager), "device unplugged").unwrap();

        drop(manager);
        assert_eq!(engine.active_channels(), 0);
    }

    #[test]
    fn test_replay_while_paused_keeps_place() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        engine.advance(playback(&manager), 88_200).unwrap();
        manager.pause().unwrap();
        let events = manager.subscribe();

        manager.replay_last_millis(200).unwrap();
        let audition = manager.audition_handle().unwrap();
        assert_ne!(Some(audition), manager.context().playback_handle());
        assert_eq!(engine.position(audition).unwrap(), 88_200 - 8_820);
        assert_eq!(engine.active_channels(), 2);

        // The audition stops where the playhead is; the session never moves
        engine.advance(audition, 10_000).unwrap();
        assert_eq!(engine.active_channels(), 1);
        assert_eq!(manager.state(), SessionState::Paused);
        assert_eq!(manager.playback_position_frames(), 88_200);
        assert!(events.try_recv().is_err());

        manager.resume().unwrap();
        assert_eq!(manager.playback_position_frames(), 88_200);
    }

    #[test]
    fn test_replay_from_ready_uses_pending_seek() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.seek(44_100).unwrap();

        manager.replay_last_millis(200).unwrap();
        let audition = manager.audition_handle().unwrap();
        assert_eq!(engine.position(audition).unwrap(), 44_100 - 8_820);
        assert_eq!(manager.state(), SessionState::Ready);
        assert_eq!(manager.context().pending_start_frame(), Some(44_100));

        // Starting playback cuts the audition short
        manager.play().unwrap();
        assert_eq!(engine.active_channels(), 1);
        assert_eq!(manager.playback_position_frames(), 44_100);
    }

    #[test]
    fn test_replay_at_start_plays_nothing() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.replay_last_millis(200).unwrap();
        assert_eq!(manager.audition_handle(), None);
        assert_eq!(engine.active_channels(), 0);
    }

    #[test]
    fn test_replay_rejected_while_playing() {
        let (engine, manager) = setup();
        assert_eq!(
            manager.replay_last_millis(200),
            Err(SessionError::NoAudioLoaded(SessionState::NoAudio))
        );

        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        assert_eq!(
            manager.replay_last_millis(200),
            Err(SessionError::NotAvailable {
                operation: "replay",
                state: SessionState::Playing,
            })
        );
        assert!(manager
            .step_and_replay(SeekDirection::Forward, 200)
            .is_err());
        assert_eq!(engine.active_channels(), 1);
    }

    #[test]
    fn test_step_and_replay() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();
        engine.advance(playback(&manager), 44_100).unwrap();
        manager.pause().unwrap();

        manager.step_and_replay(SeekDirection::Forward, 200).unwrap();
        assert_eq!(manager.state(), SessionState::Paused);
        assert_eq!(manager.playback_position_frames(), 44_100 + 8_820);
        let audition = manager.audition_handle().unwrap();
        assert_eq!(engine.position(audition).unwrap(), 44_100);

        manager.step_and_replay(SeekDirection::Backward, 200).unwrap();
        assert_eq!(manager.playback_position_frames(), 44_100);
        let second = manager.audition_handle().unwrap();
        assert_ne!(second, audition);
        assert_eq!(engine.position(second).unwrap(), 44_100 - 8_820);
        // The earlier audition was replaced, not left running
        assert_eq!(engine.active_channels(), 2);
    }

    #[test]
    fn test_step_and_replay_clamps_to_file() {
        let (engine, manager) = setup();
        manager.load("short.flac").unwrap();
        manager.seek_to_end().unwrap();

        manager.step_and_replay(SeekDirection::Forward, 200).unwrap();
        assert_eq!(manager.context().pending_start_frame(), Some(95_999));
        let audition = manager.audition_handle().unwrap();
        assert_eq!(engine.position(audition).unwrap(), 95_999 - 9_600);

        manager.seek_to_start().unwrap();
        manager.step_and_replay(SeekDirection::Backward, 200).unwrap();
        assert_eq!(manager.context().pending_start_frame(), Some(0));
        assert_eq!(manager.audition_handle(), None);
    }

    #[test]
    fn test_toggle_play_pause() {
        let (_engine, manager) = setup();
        manager.load("interview.wav").unwrap();

        manager.toggle_play_pause().unwrap();
        assert_eq!(manager.state(), SessionState::Playing);
        manager.toggle_play_pause().unwrap();
        assert_eq!(manager.state(), SessionState::Paused);
        manager.toggle_play_pause().unwrap();
        assert_eq!(manager.state(), SessionState::Playing);
    }

    #[test]
    fn test_snapshots_stay_consistent_under_callbacks() {
        let (engine, manager) = setup();
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();

        let feeder = {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..450 {
                    engine.advance_all(1_000);
                }
            })
        };

        let mut last = 0;
        while !feeder.is_finished() {
            let ctx = manager.context();
            assert_eq!(
                ctx.state().is_playback_active(),
                ctx.playback_handle().is_some()
            );
            if ctx.state() == SessionState::Playing {
                assert!(ctx.playhead_frame() >= last);
                last = ctx.playhead_frame();
            }
        }
        feeder.join().unwrap();
        assert_eq!(manager.state(), SessionState::Ready);
    }

    #[test]
    fn test_drop_unregisters_listener() {
        let (engine, manager) = setup();
        assert_eq!(engine.listener_count(), 1);
        manager.load("interview.wav").unwrap();
        manager.play().unwrap();

        drop(manager);
        assert_eq!(engine.listener_count(), 0);
        assert_eq!(engine.active_channels(), 0);
    }
}

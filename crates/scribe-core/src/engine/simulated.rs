//! Device-free engine used by tests and the headless harness
//!
//! Files are registered up front with their metadata; loading anything else
//! fails the same way a real backend would. Playback only advances when the
//! caller says so (`advance`), and every advance is reported to listeners
//! exactly like a backend callback thread would report it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{
    AudioEngine, AudioHandle, AudioMetadata, EngineError, EngineResult, PlaybackHandle,
    PlaybackListener, PlaybackState,
};

/// File extensions the simulated decoder accepts
const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "flac", "mp3", "ogg"];

struct Channel {
    audio: AudioHandle,
    position: u64,
    end_frame: u64,
    state: PlaybackState,
}

#[derive(Default)]
struct EngineState {
    next_id: u64,
    library: HashMap<PathBuf, AudioMetadata>,
    loaded: HashMap<AudioHandle, AudioMetadata>,
    channels: HashMap<PlaybackHandle, Channel>,
}

impl EngineState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn channel_mut(&mut self, playback: PlaybackHandle) -> EngineResult<&mut Channel> {
        self.channels
            .get_mut(&playback)
            .ok_or_else(|| EngineError::InvalidHandle(playback.to_string()))
    }
}

/// Notification collected under the state lock and delivered after it is released
enum Notification {
    Progress(PlaybackHandle, u64, u64),
    StateChanged(PlaybackHandle, PlaybackState, PlaybackState),
    Complete(PlaybackHandle),
    Error(PlaybackHandle, String),
}

/// In-memory audio engine with caller-driven playback
#[derive(Default)]
pub struct SimulatedEngine {
    state: Mutex<EngineState>,
    listeners: RwLock<Vec<Arc<dyn PlaybackListener>>>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` loadable with the given metadata
    pub fn register_file(&self, path: impl Into<PathBuf>, metadata: AudioMetadata) {
        self.state.lock().library.insert(path.into(), metadata);
    }

    /// Builder-style variant of [`register_file`](Self::register_file)
    pub fn with_file(self, path: impl Into<PathBuf>, metadata: AudioMetadata) -> Self {
        self.register_file(path, metadata);
        self
    }

    /// Advance a playing channel by `frames` and report progress
    ///
    /// Paused channels do not move. Reaching the end frame finishes and
    /// releases the channel. Returns the new position.
    pub fn advance(&self, playback: PlaybackHandle, frames: u64) -> EngineResult<u64> {
        let mut notifications = Vec::new();
        let position = {
            let mut state = self.state.lock();
            let channel = state.channel_mut(playback)?;
            if channel.state != PlaybackState::Playing {
                return Ok(channel.position);
            }

            channel.position = channel.position.saturating_add(frames).min(channel.end_frame);
            let position = channel.position;
            notifications.push(Notification::Progress(playback, position, channel.end_frame));

            if position >= channel.end_frame {
                notifications.push(Notification::StateChanged(
                    playback,
                    PlaybackState::Finished,
                    PlaybackState::Playing,
                ));
                notifications.push(Notification::Complete(playback));
                state.channels.remove(&playback);
            }
            position
        };
        self.notify(notifications);
        Ok(position)
    }

    /// Advance every playing channel by `frames`
    pub fn advance_all(&self, frames: u64) {
        let playing: Vec<PlaybackHandle> = self
            .state
            .lock()
            .channels
            .iter()
            .filter(|(_, channel)| channel.state == PlaybackState::Playing)
            .map(|(handle, _)| *handle)
            .collect();

        for playback in playing {
            // A channel can be released between collection and advance
            let _ = self.advance(playback, frames);
        }
    }

    /// Put a channel into the error state and report it
    pub fn fail(&self, playback: PlaybackHandle, message: &str) -> EngineResult<()> {
        let old_state = {
            let mut state = self.state.lock();
            let channel = state.channel_mut(playback)?;
            let old = channel.state;
            channel.state = PlaybackState::Error;
            old
        };
        self.notify(vec![
            Notification::Error(playback, message.to_string()),
            Notification::StateChanged(playback, PlaybackState::Error, old_state),
        ]);
        Ok(())
    }

    /// Channels held by the engine (not yet stopped or finished)
    pub fn active_channels(&self) -> usize {
        self.state.lock().channels.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        let listeners = self.listeners.read().clone();
        for notification in &notifications {
            for listener in &listeners {
                match notification {
                    Notification::Progress(handle, position, total) => {
                        listener.on_progress(*handle, *position, *total)
                    }
                    Notification::StateChanged(handle, new_state, old_state) => {
                        listener.on_state_changed(*handle, *new_state, *old_state)
                    }
                    Notification::Complete(handle) => listener.on_playback_complete(*handle),
                    Notification::Error(handle, message) => {
                        listener.on_playback_error(*handle, message)
                    }
                }
            }
        }
    }

    fn transport(
        &self,
        playback: PlaybackHandle,
        from: PlaybackState,
        to: PlaybackState,
    ) -> EngineResult<()> {
        {
            let mut state = self.state.lock();
            let channel = state.channel_mut(playback)?;
            if channel.state != from {
                return Err(EngineError::Backend(format!(
                    "{} is {}, expected {}",
                    playback, channel.state, from
                )));
            }
            channel.state = to;
        }
        self.notify(vec![Notification::StateChanged(playback, to, from)]);
        Ok(())
    }
}

impl AudioEngine for SimulatedEngine {
    fn load_audio(&self, path: &Path) -> EngineResult<AudioHandle> {
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return Err(EngineError::UnsupportedFormat(path.display().to_string()));
        }

        let mut state = self.state.lock();
        let metadata = state
            .library
            .get(path)
            .copied()
            .ok_or_else(|| EngineError::LoadFailed {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            })?;

        let handle = AudioHandle::new(state.next_id());
        state.loaded.insert(handle, metadata);
        log::debug!("load_audio: {} -> {}", path.display(), handle);
        Ok(handle)
    }

    fn metadata(&self, audio: AudioHandle) -> EngineResult<AudioMetadata> {
        self.state
            .lock()
            .loaded
            .get(&audio)
            .copied()
            .ok_or_else(|| EngineError::InvalidHandle(audio.to_string()))
    }

    fn play(
        &self,
        audio: AudioHandle,
        start_frame: u64,
        end_frame: u64,
    ) -> EngineResult<PlaybackHandle> {
        let playback = {
            let mut state = self.state.lock();
            let metadata = state
                .loaded
                .get(&audio)
                .copied()
                .ok_or_else(|| EngineError::InvalidHandle(audio.to_string()))?;

            let end_frame = end_frame.min(metadata.frame_count);
            let playback = PlaybackHandle::new(state.next_id());
            state.channels.insert(
                playback,
                Channel {
                    audio,
                    position: start_frame.min(end_frame),
                    end_frame,
                    state: PlaybackState::Playing,
                },
            );
            playback
        };
        self.notify(vec![Notification::StateChanged(
            playback,
            PlaybackState::Playing,
            PlaybackState::Stopped,
        )]);
        Ok(playback)
    }

    fn pause(&self, playback: PlaybackHandle) -> EngineResult<()> {
        self.transport(playback, PlaybackState::Playing, PlaybackState::Paused)
    }

    fn resume(&self, playback: PlaybackHandle) -> EngineResult<()> {
        self.transport(playback, PlaybackState::Paused, PlaybackState::Playing)
    }

    fn stop(&self, playback: PlaybackHandle) -> EngineResult<()> {
        let old_state = {
            let mut state = self.state.lock();
            let channel = state
                .channels
                .remove(&playback)
                .ok_or_else(|| EngineError::InvalidHandle(playback.to_string()))?;
            log::debug!("stop: released {} ({})", playback, channel.audio);
            channel.state
        };
        self.notify(vec![Notification::StateChanged(
            playback,
            PlaybackState::Stopped,
            old_state,
        )]);
        Ok(())
    }

    fn seek(&self, playback: PlaybackHandle, frame: u64) -> EngineResult<()> {
        let mut state = self.state.lock();
        let channel = state.channel_mut(playback)?;
        channel.position = frame.min(channel.end_frame);
        Ok(())
    }

    fn position(&self, playback: PlaybackHandle) -> EngineResult<u64> {
        let mut state = self.state.lock();
        Ok(state.channel_mut(playback)?.position)
    }

    fn add_playback_listener(&self, listener: Arc<dyn PlaybackListener>) {
        self.listeners.write().push(listener);
    }

    fn remove_playback_listener(&self, listener: &Arc<dyn PlaybackListener>) {
        self.listeners
            .write()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    const TEN_SECONDS: AudioMetadata = AudioMetadata {
        sample_rate: 44_100,
        frame_count: 441_000,
    };

    #[derive(Default)]
    struct Recorder {
        last_position: AtomicU64,
        completed: AtomicUsize,
        errors: AtomicUsize,
    }

    impl PlaybackListener for Recorder {
        fn on_progress(&self, _playback: PlaybackHandle, position_frames: u64, _total: u64) {
            self.last_position.store(position_frames, Ordering::SeqCst);
        }

        fn on_playback_complete(&self, _playback: PlaybackHandle) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_playback_error(&self, _playback: PlaybackHandle, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_load_registered_file() {
        let engine = SimulatedEngine::new().with_file("take1.wav", TEN_SECONDS);
        let handle = engine.load_audio(Path::new("take1.wav")).unwrap();
        assert_eq!(engine.metadata(handle).unwrap(), TEN_SECONDS);
    }

    #[test]
    fn test_load_failures() {
        let engine = SimulatedEngine::new();
        assert!(matches!(
            engine.load_audio(Path::new("missing.wav")),
            Err(EngineError::LoadFailed { .. })
        ));
        assert!(matches!(
            engine.load_audio(Path::new("notes.txt")),
            Err(EngineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_advance_reports_progress_and_completion() {
        let engine = SimulatedEngine::new().with_file("take1.wav", TEN_SECONDS);
        let recorder = Arc::new(Recorder::default());
        engine.add_playback_listener(recorder.clone());

        let audio = engine.load_audio(Path::new("take1.wav")).unwrap();
        let playback = engine.play(audio, 0, 1_000).unwrap();

        assert_eq!(engine.advance(playback, 400).unwrap(), 400);
        assert_eq!(recorder.last_position.load(Ordering::SeqCst), 400);

        assert_eq!(engine.advance(playback, 900).unwrap(), 1_000);
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
        assert_eq!(engine.active_channels(), 0);
        assert!(matches!(
            engine.position(playback),
            Err(EngineError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_paused_channel_does_not_move() {
        let engine = SimulatedEngine::new().with_file("take1.wav", TEN_SECONDS);
        let audio = engine.load_audio(Path::new("take1.wav")).unwrap();
        let playback = engine.play(audio, 100, 441_000).unwrap();

        engine.pause(playback).unwrap();
        assert_eq!(engine.advance(playback, 500).unwrap(), 100);
        assert!(engine.pause(playback).is_err());

        engine.resume(playback).unwrap();
        assert_eq!(engine.advance(playback, 500).unwrap(), 600);
    }

    #[test]
    fn test_stop_releases_channel() {
        let engine = SimulatedEngine::new().with_file("take1.wav", TEN_SECONDS);
        let audio = engine.load_audio(Path::new("take1.wav")).unwrap();
        let playback = engine.play(audio, 0, 441_000).unwrap();

        engine.stop(playback).unwrap();
        assert!(engine.stop(playback).is_err());
        assert!(engine.seek(playback, 10).is_err());
    }

    #[test]
    fn test_fail_notifies_listeners() {
        let engine = SimulatedEngine::new().with_file("take1.wav", TEN_SECONDS);
        let recorder = Arc::new(Recorder::default());
        engine.add_playback_listener(recorder.clone());
        let audio = engine.load_audio(Path::new("take1.wav")).unwrap();
        let playback = engine.play(audio, 0, 441_000).unwrap();

        engine.fail(playback, "device unplugged").unwrap();
        assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let engine = SimulatedEngine::new();
        let listener: Arc<dyn PlaybackListener> = Arc::new(Recorder::default());
        engine.add_playback_listener(listener.clone());
        assert_eq!(engine.listener_count(), 1);
        engine.remove_playback_listener(&listener);
        assert_eq!(engine.listener_count(), 0);
    }
}

use std::sync::Mutex;

/// Seam to the actual audio decode/mix engine. Implementations run on their
/// own thread; calls arrive already serialized by [`Player`].
pub trait AudioBackend: Send + Sync {
    fn set_paused(&self, paused: bool);
    fn set_music_volume(&self, volume: f64);
    fn play_announcement(&self, floor: usize, volume: f64);
}

/// Backend that only logs, used when no mixer is wired up.
pub struct LogBackend;

impl AudioBackend for LogBackend {
    fn set_paused(&self, paused: bool) {
        log::info!("playback {}", if paused { "paused" } else { "resumed" });
    }

    fn set_music_volume(&self, volume: f64) {
        log::debug!("music volume set to {:.2}", volume);
    }

    fn play_announcement(&self, floor: usize, volume: f64) {
        log::info!("announcing floor {} at volume {:.2}", floor, volume);
    }
}

#[derive(Clone, Copy, Debug)]
struct PlayerState {
    volume: f64,
    playing: bool,
}

/// Owns the mutable playback state (volume, paused flag) behind a single
/// mutex boundary. Several intents can land in one orchestrator cycle; this
/// keeps their effect on the mixer serialized.
pub struct Player {
    state: Mutex<PlayerState>,
    backend: Box<dyn AudioBackend>,
}

/// Announcements play above the ambient music.
const ANNOUNCE_VOLUME_BOOST: f64 = 2.0;

impl Player {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Player {
            state: Mutex::new(PlayerState {
                volume: 3.0,
                playing: false,
            }),
            backend,
        }
    }

    pub fn start(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = true;
        self.backend.set_paused(false);
    }

    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        self.backend.set_paused(true);
    }

    /// Volume is clamped to the mixer's [0, 3] range.
    pub fn set_volume(&self, volume: f64) {
        let clamped = volume.clamp(0.0, 3.0);
        let mut state = self.state.lock().unwrap();
        state.volume = clamped;
        self.backend.set_music_volume(clamped);
    }

    pub fn announce(&self, floor: usize) {
        let state = self.state.lock().unwrap();
        self.backend
            .play_announcement(floor, state.volume + ANNOUNCE_VOLUME_BOOST);
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().unwrap().volume
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum BackendCall {
        Paused(bool),
        Volume(f64),
        Announce(usize, f64),
    }

    /// Records every call for assertions.
    pub struct RecordingBackend {
        pub calls: Mutex<Vec<BackendCall>>,
    }

    impl RecordingBackend {
        pub fn new() -> Self {
            RecordingBackend {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl AudioBackend for RecordingBackend {
        fn set_paused(&self, paused: bool) {
            self.calls.lock().unwrap().push(BackendCall::Paused(paused));
        }

        fn set_music_volume(&self, volume: f64) {
            self.calls.lock().unwrap().push(BackendCall::Volume(volume));
        }

        fn play_announcement(&self, floor: usize, volume: f64) {
            self.calls
                .lock()
                .unwrap()
                .push(BackendCall::Announce(floor, volume));
        }
    }
}

use std::path::{Path, PathBuf};

use kira::manager::{AudioManager, AudioManagerSettings, DefaultBackend};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::tween::Tween;

use crate::project_config::AudioConfig;

/// Looping background music that follows the menu state.
///
/// Any failure (no device, missing file, undecodable file) is logged and
/// leaves the music off; the next `play` tries again.
pub struct MusicPlayer {
    manager: Option<AudioManager>,
    track: PathBuf,
    volume: f32,
    handle: Option<StaticSoundHandle>,
    playing: bool,
}

impl MusicPlayer {
    /// Open the default output device.
    pub fn new(project_root: &Path, config: &AudioConfig) -> Self {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| {
                tracing::warn!("Failed to initialize audio: {}. Music disabled.", e);
                e
            })
            .ok();
        if manager.is_some() {
            tracing::info!("Audio initialized (Kira)");
        }
        Self::with_manager(manager, project_root, config)
    }

    /// A player that never makes a sound, for headless runs.
    pub fn disabled(project_root: &Path, config: &AudioConfig) -> Self {
        Self::with_manager(None, project_root, config)
    }

    fn with_manager(manager: Option<AudioManager>, project_root: &Path, config: &AudioConfig) -> Self {
        Self {
            manager,
            track: project_root.join(&config.music),
            volume: config.volume.clamp(0.0, 1.0),
            handle: None,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn play(&mut self) {
        if self.playing {
            return;
        }
        if let Some(handle) = &mut self.handle {
            handle.resume(Tween::default());
            self.playing = true;
            tracing::info!("Music resumed");
            return;
        }
        match self.start() {
            Ok(handle) => {
                self.handle = Some(handle);
                self.playing = true;
                tracing::info!("Music started");
            }
            Err(e) => tracing::warn!("Music not started: {}", e),
        }
    }

    fn start(&mut self) -> Result<StaticSoundHandle, String> {
        let manager = self
            .manager
            .as_mut()
            .ok_or_else(|| "audio disabled".to_string())?;
        let data = StaticSoundData::from_file(&self.track)
            .map_err(|e| format!("Failed to load music {:?}: {}", self.track, e))?;
        manager
            .play(data.volume(self.volume as f64).loop_region(..))
            .map_err(|e| format!("Failed to play music: {}", e))
    }

    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        if let Some(handle) = &mut self.handle {
            handle.pause(Tween::default());
        }
        self.playing = false;
        tracing::info!("Music paused");
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(handle) = &mut self.handle {
            handle.set_volume(self.volume as f64, Tween::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_player_stays_silent() {
        let mut music = MusicPlayer::disabled(Path::new("."), &AudioConfig::default());
        music.play();
        assert!(!music.is_playing());
        music.pause();
        assert!(!music.is_playing());
    }

    #[test]
    fn test_volume_clamped() {
        let mut music = MusicPlayer::disabled(Path::new("."), &AudioConfig::default());
        assert!((music.volume() - 0.3).abs() < 1e-6);
        music.set_volume(4.0);
        assert_eq!(music.volume(), 1.0);
    }
}

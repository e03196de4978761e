//! Looped background music.
//!
//! The track starts at boot and loops forever. Session events pause, resume
//! and re-level it. A missing output device or track is logged and the game
//! runs silent.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::config::MAX_VOLUME;
use crate::session::SessionEvent;

/// Maps the 0..=128 session volume onto a linear sink gain.
pub fn volume_gain(volume: u8) -> f32 {
    volume.min(MAX_VOLUME) as f32 / MAX_VOLUME as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MusicCommand {
    Pause,
    Resume,
    SetGain(f32),
}

pub fn command_for(event: &SessionEvent) -> Option<MusicCommand> {
    match event {
        SessionEvent::MusicPaused => Some(MusicCommand::Pause),
        SessionEvent::MusicResumed => Some(MusicCommand::Resume),
        SessionEvent::VolumeChanged(volume) => Some(MusicCommand::SetGain(volume_gain(*volume))),
        _ => None,
    }
}

/// Something that plays the music track. `rodio::Sink` in the game.
pub trait MusicOutput {
    fn pause_music(&self);
    fn resume_music(&self);
    fn set_gain(&self, gain: f32);
}

impl MusicOutput for Sink {
    fn pause_music(&self) {
        self.pause();
    }

    fn resume_music(&self) {
        self.play();
    }

    fn set_gain(&self, gain: f32) {
        self.set_volume(gain);
    }
}

/// Applies the music side of `event` to `output`. Returns the command sent.
pub fn dispatch<O: MusicOutput>(output: &O, event: &SessionEvent) -> Option<MusicCommand> {
    let command = command_for(event)?;
    match command {
        MusicCommand::Pause => output.pause_music(),
        MusicCommand::Resume => output.resume_music(),
        MusicCommand::SetGain(gain) => output.set_gain(gain),
    }
    Some(command)
}

struct Audio {
    /// Dropping the stream stops all playback.
    _stream: OutputStream,
    sink: Sink,
}

pub struct MusicPlayer {
    audio: Option<Audio>,
}

impl MusicPlayer {
    /// Opens the default output device and starts `path` looping at `volume`.
    /// Any failure leaves a silent player.
    pub fn start(path: &Path, volume: u8) -> Self {
        match open_looped(path, volume) {
            Ok(audio) => {
                log::info!(
                    "Music: {} at volume {volume}/{MAX_VOLUME}",
                    path.display()
                );
                Self { audio: Some(audio) }
            }
            Err(e) => {
                log::warn!("Music disabled: {e}");
                Self { audio: None }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.audio.is_some()
    }

    pub fn handle(&self, event: &SessionEvent) {
        let Some(audio) = &self.audio else {
            return;
        };
        match dispatch(&audio.sink, event) {
            Some(MusicCommand::Pause) => log::info!("Music paused"),
            Some(MusicCommand::Resume) => log::info!("Music resumed"),
            Some(MusicCommand::SetGain(gain)) => log::debug!("Music gain {gain:.3}"),
            None => {}
        }
    }
}

fn open_looped(path: &Path, volume: u8) -> Result<Audio, String> {
    // Open the track first so a missing file never touches the device.
    let file =
        File::open(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?;
    let (stream, handle) =
        OutputStream::try_default().map_err(|e| format!("No audio output device: {e}"))?;
    let sink = Sink::try_new(&handle).map_err(|e| format!("Failed to open music sink: {e}"))?;
    sink.set_volume(volume_gain(volume));
    sink.append(source.repeat_infinite());
    Ok(Audio {
        _stream: stream,
        sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingOutput {
        calls: RefCell<Vec<MusicCommand>>,
    }

    impl MusicOutput for RecordingOutput {
        fn pause_music(&self) {
            self.calls.borrow_mut().push(MusicCommand::Pause);
        }

        fn resume_music(&self) {
            self.calls.borrow_mut().push(MusicCommand::Resume);
        }

        fn set_gain(&self, gain: f32) {
            self.calls.borrow_mut().push(MusicCommand::SetGain(gain));
        }
    }

    #[test]
    fn volume_maps_linearly_onto_gain() {
        assert_eq!(volume_gain(0), 0.0);
        assert_eq!(volume_gain(64), 0.5);
        assert_eq!(volume_gain(MAX_VOLUME), 1.0);
        assert_eq!(volume_gain(u8::MAX), 1.0);
    }

    #[test]
    fn pause_resume_and_volume_events_reach_the_output() {
        let output = RecordingOutput::default();
        let events = [
            SessionEvent::MusicPaused,
            SessionEvent::Collected { score: 1 },
            SessionEvent::MusicResumed,
            SessionEvent::VolumeChanged(32),
            SessionEvent::GameOver { score: 1 },
        ];
        for event in &events {
            dispatch(&output, event);
        }
        assert_eq!(
            output.calls.into_inner(),
            vec![
                MusicCommand::Pause,
                MusicCommand::Resume,
                MusicCommand::SetGain(0.25),
            ]
        );
    }

    #[test]
    fn gameplay_events_are_not_music_commands() {
        assert_eq!(command_for(&SessionEvent::PitFall), None);
        assert_eq!(command_for(&SessionEvent::CollectibleRespawned), None);
    }

    #[test]
    fn missing_track_leaves_a_silent_player() {
        let path = std::env::temp_dir().join(format!(
            "dash_music_missing_{}.mp3",
            std::process::id()
        ));
        let player = MusicPlayer::start(&path, 64);
        assert!(!player.is_active());
        player.handle(&SessionEvent::MusicPaused);
    }
}

//! Streaming music player on top of rodio.
//!
//! One track plays at a time on its own sink. Repeats are queued on the sink
//! a couple of plays ahead so loops are gapless, and `update` tops the queue
//! up every frame. Fades are computed here from frame time and folded into
//! the sink volume together with the player volume (0..=128).

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use k9_core::MAX_VOLUME;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::AudioError;
use crate::fade::{Fade, FadeDirection};
use crate::manifest::MusicLibrary;

/// Plays queued on the sink ahead of the one being heard.
const QUEUE_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayCount {
    Forever,
    /// Play this many times. Zero is treated as one.
    Times(u32),
}

struct Playback {
    id: String,
    bytes: Arc<[u8]>,
    sink: Sink,
    /// Plays still to be appended to the sink; `None` loops forever.
    pending: Option<u32>,
    #[cfg(test)]
    queue: Option<rodio::queue::SourcesQueueOutput<f32>>,
}

impl Playback {
    fn refill(&mut self) -> Result<(), AudioError> {
        while self.sink.len() < QUEUE_DEPTH && self.pending != Some(0) {
            self.sink.append(decode(&self.id, &self.bytes)?);
            if let Some(left) = self.pending.as_mut() {
                *left -= 1;
            }
        }
        Ok(())
    }

    /// Plays left including the one currently heard.
    fn remaining(&self) -> PlayCount {
        match self.pending {
            None => PlayCount::Forever,
            Some(left) => PlayCount::Times(left + self.sink.len().max(1) as u32),
        }
    }
}

fn decode(id: &str, bytes: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, AudioError> {
    Decoder::new(Cursor::new(bytes.clone())).map_err(|source| AudioError::Decode {
        id: id.to_string(),
        source,
    })
}

enum Output {
    Device {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    },
    /// Sinks with no device behind them; samples are pulled by hand.
    #[cfg(test)]
    Detached,
    Headless,
}

pub struct MusicPlayer {
    output: Output,
    library: MusicLibrary,
    playback: Option<Playback>,
    current_id: Option<String>,
    volume: u32,
    fade: Option<Fade>,
}

impl MusicPlayer {
    /// Open the default output device. Without one the player runs headless.
    pub fn new(library: MusicLibrary, initial_volume: u32) -> Self {
        match OutputStream::try_default() {
            Ok((stream, handle)) => {
                let mut player = Self::headless(library, initial_volume);
                player.output = Output::Device {
                    _stream: stream,
                    handle,
                };
                player
            }
            Err(e) => {
                log::warn!("Failed to open audio output: {}. Music will be unavailable.", e);
                Self::headless(library, initial_volume)
            }
        }
    }

    /// A player with no output device: volume and state bookkeeping work,
    /// playback returns [`AudioError::Unavailable`].
    ///
    /// `AppConfig` validation already rejects volumes above [`MAX_VOLUME`];
    /// callers building a player directly get the volume clamped.
    pub fn headless(library: MusicLibrary, initial_volume: u32) -> Self {
        if initial_volume > MAX_VOLUME {
            log::warn!(
                "Initial music volume {} exceeds {}, clamping",
                initial_volume,
                MAX_VOLUME
            );
        }
        Self {
            output: Output::Headless,
            library,
            playback: None,
            current_id: None,
            volume: initial_volume.min(MAX_VOLUME),
            fade: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.output, Output::Headless)
    }

    pub fn library(&self) -> &MusicLibrary {
        &self.library
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.library.ids()
    }

    /// The last track that started playing, even if it has since stopped.
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Play `id`, replacing whatever is playing now. On error the current
    /// track, its fade and its volume are left untouched.
    pub fn play(&mut self, id: &str, count: PlayCount, fade_in_ms: u32) -> Result<(), AudioError> {
        if !self.library.contains(id) {
            return Err(AudioError::UnknownTrack(id.to_string()));
        }
        self.start(id, count, Duration::ZERO, false)?;
        self.current_id = Some(id.to_string());
        self.fade = (fade_in_ms > 0).then(|| Fade::new(FadeDirection::In, fade_in_ms));
        self.apply_gain();
        log::info!("Playing music '{}' ({:?})", id, count);
        Ok(())
    }

    /// Ramp the volume down over `ms` and halt. Returns false when nothing
    /// is playing.
    pub fn fade_out(&mut self, ms: u32) -> bool {
        if self.playback.is_none() {
            return false;
        }
        if ms == 0 {
            self.stop();
            return true;
        }
        let mut fade = Fade::new(FadeDirection::Out, ms);
        // Continue from the level a fade-in has reached instead of jumping.
        let start_gain = self.fade.map_or(1.0, |f| f.gain());
        fade.advance(fade.duration * (1.0 - start_gain));
        self.fade = Some(fade);
        true
    }

    pub fn stop(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.sink.stop();
            log::debug!("Stopped music '{}'", playback.id);
        }
        self.fade = None;
    }

    pub fn pause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.sink.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(playback) = &self.playback {
            playback.sink.play();
        }
    }

    /// Stop, then play the current track again from the start, looping.
    pub fn restart(&mut self) -> Result<(), AudioError> {
        let Some(id) = self.current_id.clone() else {
            log::warn!("No music to restart");
            return Ok(());
        };
        self.stop();
        self.play(&id, PlayCount::Forever, 0)
    }

    /// Back to the start of the current play. A paused track stays paused.
    pub fn rewind(&mut self) -> Result<(), AudioError> {
        self.seek(Duration::ZERO)
    }

    /// Jump to `seconds` into the current track.
    pub fn set_position(&mut self, seconds: f64) -> Result<(), AudioError> {
        let offset = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::ZERO);
        self.seek(offset)
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.sink.empty() && !p.sink.is_paused())
    }

    pub fn is_paused(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.sink.is_paused())
    }

    pub fn is_fading_in(&self) -> bool {
        self.is_fading(FadeDirection::In)
    }

    pub fn is_fading_out(&self) -> bool {
        self.is_fading(FadeDirection::Out)
    }

    /// Set the volume and return the previous one. Values above
    /// [`MAX_VOLUME`] are refused and the current volume is returned.
    pub fn set_volume(&mut self, volume: u32) -> u32 {
        if volume > MAX_VOLUME {
            log::error!(
                "Tried to set music volume to {} (maximum is {})",
                volume,
                MAX_VOLUME
            );
            return self.volume;
        }
        let previous = self.volume;
        self.volume = volume;
        self.apply_gain();
        previous
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn max_volume(&self) -> u32 {
        MAX_VOLUME
    }

    /// Sink gain: player volume scaled by the active fade.
    pub fn effective_gain(&self) -> f32 {
        let fade_gain = self.fade.map_or(1.0, |f| f.gain());
        self.volume as f32 / MAX_VOLUME as f32 * fade_gain
    }

    /// Advance fades and keep the play queue topped up. Call once per frame.
    pub fn update(&mut self, dt: f32) {
        let Some(playback) = self.playback.as_mut() else {
            self.fade = None;
            return;
        };

        if !playback.sink.is_paused() {
            if let Some(fade) = self.fade.as_mut() {
                fade.advance(dt);
            }
        }

        if let Some(fade) = self.fade {
            if fade.is_finished() {
                match fade.direction {
                    FadeDirection::Out => {
                        self.stop();
                        return;
                    }
                    FadeDirection::In => self.fade = None,
                }
            }
        }

        if let Err(e) = playback.refill() {
            log::error!("{}", e);
            playback.pending = Some(0);
        }
        if playback.sink.empty() {
            log::info!("Music '{}' finished", playback.id);
            self.playback = None;
            self.fade = None;
            return;
        }

        self.apply_gain();
    }

    fn is_fading(&self, direction: FadeDirection) -> bool {
        self.playback.is_some() && self.fade.is_some_and(|f| f.direction == direction)
    }

    fn apply_gain(&self) {
        if let Some(playback) = &self.playback {
            playback.sink.set_volume(self.effective_gain());
        }
    }

    fn seek(&mut self, offset: Duration) -> Result<(), AudioError> {
        let Some(playback) = &self.playback else {
            log::warn!("No music is playing");
            return Ok(());
        };
        let id = playback.id.clone();
        let count = playback.remaining();
        let paused = playback.sink.is_paused();
        self.start(&id, count, offset, paused)?;
        self.apply_gain();
        Ok(())
    }

    fn open_sink(&self) -> Result<(Sink, Option<rodio::queue::SourcesQueueOutput<f32>>), AudioError> {
        match &self.output {
            Output::Device { handle, .. } => Ok((Sink::try_new(handle)?, None)),
            #[cfg(test)]
            Output::Detached => {
                let (sink, queue) = Sink::new_idle();
                Ok((sink, Some(queue)))
            }
            Output::Headless => Err(AudioError::Unavailable),
        }
    }

    /// Swap in a new sink for `id`. The old one is only stopped once the new
    /// one is ready. Gain is left to the caller.
    fn start(
        &mut self,
        id: &str,
        count: PlayCount,
        offset: Duration,
        paused: bool,
    ) -> Result<(), AudioError> {
        let track = self
            .library
            .get(id)
            .ok_or_else(|| AudioError::UnknownTrack(id.to_string()))?;
        let (sink, _queue) = self.open_sink()?;
        if paused {
            sink.pause();
        }
        let first = decode(id, &track.bytes)?;
        if offset.is_zero() {
            sink.append(first);
        } else {
            sink.append(first.skip_duration(offset));
        }

        let mut playback = Playback {
            id: id.to_string(),
            bytes: track.bytes.clone(),
            sink,
            pending: match count {
                PlayCount::Forever => None,
                PlayCount::Times(n) => Some(n.max(1) - 1),
            },
            #[cfg(test)]
            queue: _queue,
        };
        playback.refill()?;

        if let Some(old) = self.playback.replace(playback) {
            old.sink.stop();
        }
        Ok(())
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Track;
    use std::path::PathBuf;

    fn library() -> MusicLibrary {
        MusicLibrary::from_tracks(vec![Track {
            id: "title".to_string(),
            path: PathBuf::from("title.ogg"),
            bytes: Arc::from(Vec::<u8>::new()),
        }])
    }

    #[test]
    fn unknown_track_is_reported_before_device_check() {
        let mut player = MusicPlayer::headless(library(), 64);
        let err = player
            .play("missing", PlayCount::Forever, 0)
            .expect_err("unknown id should fail");
        assert!(matches!(err, AudioError::UnknownTrack(ref id) if id == "missing"));
        assert_eq!(player.current_id(), None);
    }

    #[test]
    fn headless_play_is_unavailable_and_changes_nothing() {
        let mut player = MusicPlayer::headless(library(), 64);
        let err = player
            .play("title", PlayCount::Times(2), 500)
            .expect_err("headless player cannot play");
        assert!(matches!(err, AudioError::Unavailable));
        assert_eq!(player.current_id(), None);
        assert!(!player.is_playing());
        assert!(!player.is_fading_in());
        assert_eq!(player.effective_gain(), 0.5);
    }

    #[test]
    fn set_volume_returns_previous_value() {
        let mut player = MusicPlayer::headless(library(), 64);
        assert_eq!(player.set_volume(100), 64);
        assert_eq!(player.set_volume(0), 100);
        assert_eq!(player.volume(), 0);
        assert_eq!(player.max_volume(), 128);
    }

    #[test]
    fn volume_overflow_is_refused() {
        let mut player = MusicPlayer::headless(library(), 64);
        assert_eq!(player.set_volume(129), 64);
        assert_eq!(player.volume(), 64);
        assert_eq!(player.set_volume(128), 64);
        assert_eq!(player.volume(), 128);
    }

    #[test]
    fn initial_volume_is_clamped() {
        let player = MusicPlayer::headless(library(), 500);
        assert_eq!(player.volume(), MAX_VOLUME);
        assert_eq!(player.effective_gain(), 1.0);
    }

    #[test]
    fn controls_without_playback_are_no_ops() {
        let mut player = MusicPlayer::headless(library(), 32);
        assert!(!player.fade_out(1000));
        player.pause();
        player.resume();
        player.stop();
        player.update(0.016);
        assert!(player.rewind().is_ok());
        assert!(player.set_position(12.5).is_ok());
        assert!(!player.is_paused());
        assert!(!player.is_fading_out());
        assert_eq!(player.effective_gain(), 0.25);
    }

    #[test]
    fn restart_without_track_does_nothing() {
        let mut player = MusicPlayer::headless(library(), 64);
        assert!(player.restart().is_ok());
    }

    /// 16-bit mono PCM WAV at 8 kHz holding a quiet square wave.
    fn wav(frames: usize) -> Arc<[u8]> {
        const SAMPLE_RATE: u32 = 8_000;
        let data_len = (frames * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + frames * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            let sample: i16 = if i / 20 % 2 == 0 { 1000 } else { -1000 };
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Arc::from(bytes)
    }

    fn track(id: &str, bytes: Arc<[u8]>) -> Track {
        Track {
            id: id.to_string(),
            path: PathBuf::from(format!("{id}.wav")),
            bytes,
        }
    }

    /// A player whose sinks are not connected to any device.
    fn detached(volume: u32) -> MusicPlayer {
        let library = MusicLibrary::from_tracks(vec![
            track("title", wav(800)),
            track("jingle", wav(64)),
            track("broken", Arc::from(b"not audio".to_vec())),
        ]);
        let mut player = MusicPlayer::headless(library, volume);
        player.output = Output::Detached;
        player
    }

    fn playback(player: &MusicPlayer) -> &Playback {
        player.playback.as_ref().expect("music should be playing")
    }

    #[test]
    fn repeats_are_queued_two_plays_deep() {
        let mut player = detached(64);
        player.play("title", PlayCount::Forever, 0).unwrap();
        assert!(player.is_available());
        assert!(player.is_playing());
        assert_eq!(playback(&player).sink.len(), QUEUE_DEPTH);
        assert_eq!(playback(&player).pending, None);
        assert_eq!(playback(&player).remaining(), PlayCount::Forever);

        player.play("title", PlayCount::Times(5), 0).unwrap();
        assert_eq!(playback(&player).sink.len(), QUEUE_DEPTH);
        assert_eq!(playback(&player).pending, Some(3));
        assert_eq!(playback(&player).remaining(), PlayCount::Times(5));

        player.update(0.016);
        assert_eq!(playback(&player).sink.len(), QUEUE_DEPTH);
        assert_eq!(playback(&player).pending, Some(3));
    }

    #[test]
    fn zero_plays_means_one() {
        let mut player = detached(64);
        for count in [PlayCount::Times(0), PlayCount::Times(1)] {
            player.play("title", count, 0).unwrap();
            assert_eq!(playback(&player).sink.len(), 1);
            assert_eq!(playback(&player).pending, Some(0));
            assert_eq!(playback(&player).remaining(), PlayCount::Times(1));
        }
    }

    #[test]
    fn seeking_keeps_remaining_plays_and_pause() {
        let mut player = detached(64);
        player.play("title", PlayCount::Times(3), 0).unwrap();
        player.set_position(0.05).unwrap();
        assert_eq!(playback(&player).remaining(), PlayCount::Times(3));
        assert_eq!(playback(&player).sink.len(), QUEUE_DEPTH);

        player.pause();
        player.rewind().unwrap();
        assert!(player.is_paused());
        assert!(!player.is_playing());
        assert_eq!(playback(&player).remaining(), PlayCount::Times(3));
        assert_eq!(playback(&player).sink.volume(), player.effective_gain());
    }

    #[test]
    fn failed_play_keeps_current_track() {
        let mut player = detached(64);
        player.play("title", PlayCount::Forever, 0).unwrap();

        let err = player
            .play("broken", PlayCount::Forever, 500)
            .expect_err("garbage bytes should not decode");
        assert!(matches!(err, AudioError::Decode { ref id, .. } if id == "broken"));
        assert_eq!(player.current_id(), Some("title"));
        assert_eq!(playback(&player).id, "title");
        assert!(player.is_playing());
        assert!(!player.is_fading_in());
        assert_eq!(player.effective_gain(), 0.5);
        assert_eq!(playback(&player).sink.volume(), 0.5);
    }

    #[test]
    fn play_with_fade_in_starts_silent() {
        let mut player = detached(128);
        player.play("title", PlayCount::Forever, 200).unwrap();
        assert!(player.is_fading_in());
        assert_eq!(playback(&player).sink.volume(), 0.0);

        player.update(0.1);
        assert!((player.effective_gain() - 0.5).abs() < 1e-4);
        player.update(0.2);
        assert!(!player.is_fading_in());
        assert_eq!(playback(&player).sink.volume(), 1.0);
    }

    #[test]
    fn finished_fade_out_stops_playback() {
        let mut player = detached(128);
        player.play("title", PlayCount::Forever, 0).unwrap();
        assert!(player.fade_out(100));

        player.update(0.05);
        assert!(player.is_fading_out());
        assert!((player.effective_gain() - 0.5).abs() < 1e-4);

        player.update(0.06);
        assert!(player.playback.is_none());
        assert!(!player.is_playing());
        assert!(!player.is_fading_out());
        assert_eq!(player.current_id(), Some("title"));
    }

    #[test]
    fn drained_sink_clears_playback() {
        let mut player = detached(64);
        player.play("jingle", PlayCount::Times(2), 0).unwrap();
        assert_eq!(playback(&player).pending, Some(0));

        let playback = player.playback.as_mut().unwrap();
        let queue = playback.queue.as_mut().unwrap();
        for _ in 0..100_000 {
            if playback.sink.empty() {
                break;
            }
            queue.next();
        }
        assert!(playback.sink.empty());

        player.update(0.016);
        assert!(player.playback.is_none());
        assert!(!player.is_playing());
        assert_eq!(player.current_id(), Some("jingle"));
    }

    #[test]
    fn track_ids_come_from_library() {
        let player = MusicPlayer::headless(library(), 64);
        assert_eq!(player.track_ids(), vec!["title".to_string()]);
        assert!(!player.is_available());
    }
}

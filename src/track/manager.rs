// Track management - CRUD over the track list plus mute/solo resolution

use super::{Track, TrackId, TrackSnapshot};
use crate::audio::player::LoopPlayer;

/// Colours cycled through by creation index
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#00ffff", // cyan
    "#ff6b35", // orange
    "#00ff88", // green
    "#ff00ff", // magenta
    "#ffff00", // yellow
    "#00aaff", // blue
    "#ff4444", // red
    "#aa00ff", // purple
];

/// Ordered track collection
#[derive(Debug)]
pub struct TrackManager {
    tracks: Vec<Track>,
    palette: Vec<String>,
    /// Tracks ever created; drives default names and colours
    created: usize,
}

impl TrackManager {
    pub fn new(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            tracks: Vec::new(),
            palette,
            created: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    /// Append a track named "Track N" with the next palette colour
    pub fn add(&mut self) -> &Track {
        let index = self.created;
        self.created += 1;

        let color = &self.palette[index % self.palette.len()];
        let track = Track::new(format!("Track {}", index + 1), color.clone());
        log::debug!("Added {} ({})", track.name(), track.id());
        self.tracks.push(track);
        self.apply_audibility();

        &self.tracks[self.tracks.len() - 1]
    }

    /// Stop and release the track's player, then drop it. Unknown ids are ignored.
    pub fn remove(&mut self, id: TrackId) -> bool {
        let Some(index) = self.tracks.iter().position(|t| t.id() == id) else {
            return false;
        };
        let mut track = self.tracks.remove(index);
        track.clear();
        log::debug!("Removed {} ({})", track.name(), id);
        self.apply_audibility();
        true
    }

    /// Release take and notes but keep the track
    pub fn clear(&mut self, id: TrackId) -> bool {
        match self.get_mut(id) {
            Some(track) => {
                track.clear();
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) {
        for track in &mut self.tracks {
            track.clear();
        }
    }

    pub fn set_volume(&mut self, id: TrackId, db: f32) -> bool {
        match self.get_mut(id) {
            Some(track) => {
                track.set_volume_db(db);
                true
            }
            None => false,
        }
    }

    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> bool {
        let Some(track) = self.get_mut(id) else {
            return false;
        };
        track.set_muted_flag(muted);
        self.apply_audibility();
        true
    }

    pub fn set_solo(&mut self, id: TrackId, solo: bool) -> bool {
        let Some(track) = self.get_mut(id) else {
            return false;
        };
        track.set_solo_flag(solo);
        self.apply_audibility();
        true
    }

    /// Whether a track is heard given every track's mute and solo flags
    pub fn is_audible(&self, id: TrackId) -> bool {
        let any_solo = self.tracks.iter().any(Track::is_solo);
        self.get(id)
            .is_some_and(|track| effective_audibility(track, any_solo))
    }

    /// Recompute audibility for every track and push it to live players
    pub fn apply_audibility(&mut self) {
        let any_solo = self.tracks.iter().any(Track::is_solo);
        for track in &mut self.tracks {
            let audible = effective_audibility(track, any_solo);
            if let Some(player) = track.player_mut() {
                player.set_audible(audible);
            }
        }
    }

    /// First track without an audio take
    pub fn first_without_buffer(&self) -> Option<TrackId> {
        self.tracks.iter().find(|t| !t.has_buffer()).map(Track::id)
    }

    /// Players of all tracks holding a take
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut LoopPlayer> {
        self.tracks.iter_mut().filter_map(Track::player_mut)
    }

    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks.iter().map(Track::snapshot).collect()
    }
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Solo is exclusive: with any solo active only soloed, unmuted tracks are heard
fn effective_audibility(track: &Track, any_solo: bool) -> bool {
    if any_solo {
        track.is_solo() && !track.is_muted()
    } else {
        !track.is_muted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::AudioBuffer;
    use crate::track::ContentKind;

    fn with_take(manager: &mut TrackManager, id: TrackId) {
        let player = LoopPlayer::new(AudioBuffer::new(vec![0.5; 10], 10), 1.0, 0.0);
        manager.get_mut(id).unwrap().content_mut().install(player);
        manager.apply_audibility();
    }

    #[test]
    fn test_names_and_colors_follow_creation_order() {
        let mut manager = TrackManager::default();
        let names: Vec<String> = (0..3).map(|_| manager.add().name().to_string()).collect();
        assert_eq!(names, ["Track 1", "Track 2", "Track 3"]);

        let colors: Vec<&str> = manager.iter().map(Track::color).collect();
        assert_eq!(colors, &DEFAULT_PALETTE[0..3]);
    }

    #[test]
    fn test_palette_cycles() {
        let mut manager = TrackManager::new(vec!["#111111".into(), "#222222".into()]);
        let colors: Vec<String> = (0..3).map(|_| manager.add().color().to_string()).collect();
        assert_eq!(colors, ["#111111", "#222222", "#111111"]);
    }

    #[test]
    fn test_names_do_not_repeat_after_removal() {
        let mut manager = TrackManager::default();
        manager.add();
        let second = manager.add().id();
        manager.remove(second);
        assert_eq!(manager.add().name(), "Track 3");
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut manager = TrackManager::default();
        manager.add();
        assert!(!manager.remove(TrackId::new()));
        assert!(!manager.clear(TrackId::new()));
        assert!(!manager.set_solo(TrackId::new(), true));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_solo_exclusivity() {
        let mut manager = TrackManager::default();
        let t1 = manager.add().id();
        let t2 = manager.add().id();
        let t3 = manager.add().id();
        for id in [t1, t2, t3] {
            with_take(&mut manager, id);
        }

        manager.set_solo(t1, true);
        manager.set_muted(t3, true);

        assert!(manager.is_audible(t1));
        assert!(!manager.is_audible(t2));
        assert!(!manager.is_audible(t3));

        let heard: Vec<bool> = manager.players_mut().map(|p| p.is_audible()).collect();
        assert_eq!(heard, [true, false, false]);
    }

    #[test]
    fn test_muted_solo_track_is_silent() {
        let mut manager = TrackManager::default();
        let t1 = manager.add().id();
        let t2 = manager.add().id();
        manager.set_solo(t1, true);
        manager.set_muted(t1, true);

        assert!(!manager.is_audible(t1));
        assert!(!manager.is_audible(t2));
    }

    #[test]
    fn test_unsolo_restores_mute_only_rule() {
        let mut manager = TrackManager::default();
        let t1 = manager.add().id();
        let t2 = manager.add().id();
        with_take(&mut manager, t2);

        manager.set_solo(t1, true);
        assert!(!manager.get(t2).unwrap().player().unwrap().is_audible());

        manager.set_solo(t1, false);
        assert!(manager.get(t2).unwrap().player().unwrap().is_audible());
    }

    #[test]
    fn test_first_without_buffer() {
        let mut manager = TrackManager::default();
        let t1 = manager.add().id();
        let t2 = manager.add().id();
        with_take(&mut manager, t1);
        assert_eq!(manager.first_without_buffer(), Some(t2));

        with_take(&mut manager, t2);
        assert_eq!(manager.first_without_buffer(), None);
    }

    #[test]
    fn test_clear_all() {
        let mut manager = TrackManager::default();
        let t1 = manager.add().id();
        with_take(&mut manager, t1);
        manager.clear_all();
        assert_eq!(manager.get(t1).unwrap().content().kind(), ContentKind::Empty);
    }
}

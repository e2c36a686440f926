use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::{Frame, Layer, LayerType};

const CUT_MARKER: &str = "-cut-";

/// Timeline view-model of one layer.
///
/// The optional fields come from the timeline widget, which may omit them;
/// an omitted field leaves the layer's value alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrack {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<Frame>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl TimelineTrack {
    pub fn from_layer(layer: &Layer) -> Self {
        let layer_type = layer.layer_type();
        Self {
            id: layer.id.clone(),
            name: layer.name.clone(),
            layer_type,
            start_frame: Some(layer.start_frame),
            end_frame: Some(layer.end_frame),
            color: layer_type.color().to_string(),
            visible: Some(layer.visible),
            locked: Some(layer.locked),
        }
    }

    /// Source layer id for a `<originalId>-cut-<n>` track id.
    pub fn cut_source(&self) -> Option<&str> {
        parse_cut_id(&self.id).map(|(original, _)| original)
    }

    fn write_onto(&self, layer: &mut Layer) {
        layer.start_frame = self.start_frame.unwrap_or(layer.start_frame);
        layer.end_frame = self.end_frame.unwrap_or(layer.end_frame);
        layer.visible = self.visible.unwrap_or(layer.visible);
        layer.locked = self.locked.unwrap_or(layer.locked);
    }
}

/// Splits `<originalId>-cut-<n>` into its parts. The last marker wins, so a
/// cut of a cut resolves to the earlier cut.
pub fn parse_cut_id(id: &str) -> Option<(&str, u32)> {
    let (original, n) = id.rsplit_once(CUT_MARKER)?;
    if original.is_empty() {
        return None;
    }
    n.parse().ok().map(|n| (original, n))
}

/// Layer id a chain of cuts starts from: everything before the first marker.
fn cut_root(id: &str) -> Option<&str> {
    id.split_once(CUT_MARKER)
        .map(|(root, _)| root)
        .filter(|root| !root.is_empty())
}

pub fn cut_id(original: &str, n: u32) -> String {
    format!("{original}{CUT_MARKER}{n}")
}

/// One track per layer, same order and frame range.
pub fn layers_to_tracks(layers: &[Layer]) -> Vec<TimelineTrack> {
    layers.iter().map(TimelineTrack::from_layer).collect()
}

/// Writes timeline edits back onto the layer collection.
///
/// Layers are matched to tracks by id and take the track's frame range,
/// visibility, and lock state. When the timeline reports more tracks than
/// there are layers, each extra `<originalId>-cut-<n>` track becomes a clone
/// of its source layer placed right after the source, in the order the
/// tracks arrived.
///
/// The source of a cut is looked up among the existing layers, then among
/// cuts cloned earlier in the same call, then by the root id before the first
/// `-cut-`. Cuts of cuts are grouped after the layer their chain starts from.
/// Extra tracks whose source cannot be resolved are dropped.
pub fn apply_track_edits(layers: &[Layer], updated_tracks: &[TimelineTrack]) -> Vec<Layer> {
    let tracks_by_id: HashMap<&str, &TimelineTrack> = updated_tracks
        .iter()
        .map(|track| (track.id.as_str(), track))
        .collect();

    let updated: Vec<Layer> = layers
        .iter()
        .map(|layer| {
            let mut layer = layer.clone();
            if let Some(track) = tracks_by_id.get(layer.id.as_str()) {
                track.write_onto(&mut layer);
            }
            layer
        })
        .collect();

    if updated_tracks.len() <= layers.len() {
        return updated;
    }

    let existing: HashMap<&str, &Layer> = updated.iter().map(|l| (l.id.as_str(), l)).collect();
    // (group id, clone) in arrival order
    let mut built: Vec<(String, Layer)> = Vec::new();
    let mut built_index: HashMap<&str, usize> = HashMap::new();

    for track in updated_tracks {
        let id = track.id.as_str();
        if existing.contains_key(id) || built_index.contains_key(id) {
            continue;
        }
        let from_layer = |source: &str| {
            existing
                .get(source)
                .map(|layer| (layer.id.clone(), Layer::clone(layer)))
        };
        let source = track.cut_source();
        let resolved = source
            .and_then(from_layer)
            .or_else(|| source.and_then(|s| built_index.get(s)).map(|&i| built[i].clone()))
            .or_else(|| cut_root(id).and_then(from_layer));
        let Some((group, mut clone)) = resolved else {
            tracing::debug!(track = %track.id, "dropping track without a resolvable source layer");
            continue;
        };
        clone.id = track.id.clone();
        if !track.name.is_empty() {
            clone.name = track.name.clone();
        }
        track.write_onto(&mut clone);
        built_index.insert(id, built.len());
        built.push((group, clone));
    }

    let mut cuts: HashMap<String, Vec<Layer>> = HashMap::new();
    for (group, clone) in built {
        cuts.entry(group).or_default().push(clone);
    }

    let mut output = Vec::with_capacity(updated_tracks.len());
    for layer in &updated {
        output.push(layer.clone());
        if let Some(clones) = cuts.remove(layer.id.as_str()) {
            output.extend(clones);
        }
    }
    output
}

/// Moves one layer from `from_index` to `to_index` (z-order change).
/// An out-of-range `from_index` leaves the order as is.
pub fn reorder_tracks(layers: &[Layer], from_index: usize, to_index: usize) -> Vec<Layer> {
    let mut next = layers.to_vec();
    if from_index >= next.len() {
        return next;
    }
    let layer = next.remove(from_index);
    let target = to_index.min(next.len());
    next.insert(target, layer);
    next
}

/// Cuts the track `track_id` at `frame`, the way the timeline's razor does.
///
/// The original keeps `[start, frame)` and a new `<id>-cut-<n>` track takes
/// `[frame, end)`, with the smallest `n` not already in use. Returns `None`
/// when the track is unknown or `frame` is not strictly inside it.
pub fn split_track_at(
    tracks: &[TimelineTrack],
    track_id: &str,
    frame: Frame,
) -> Option<Vec<TimelineTrack>> {
    let index = tracks.iter().position(|t| t.id == track_id)?;
    let track = &tracks[index];
    let (start, end) = (track.start_frame?, track.end_frame?);
    if frame <= start || frame >= end {
        return None;
    }

    let taken: HashSet<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
    let n = (1..)
        .find(|n| !taken.contains(cut_id(track_id, *n).as_str()))
        .unwrap_or(1);

    let mut head = track.clone();
    head.end_frame = Some(frame);
    let mut tail = track.clone();
    tail.id = cut_id(track_id, n);
    tail.name = format!("{} ({})", track.name, n + 1);
    tail.start_frame = Some(frame);

    let mut next = tracks.to_vec();
    next[index] = head;
    next.insert(index + 1, tail);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LayerKind, TextLayer};

    fn text(id: &str, start: Frame, end: Frame) -> Layer {
        Layer::new(id.to_uppercase(), start, end, LayerKind::Text(TextLayer::default())).with_id(id)
    }

    #[test]
    fn round_trip_is_identity() {
        let layers = vec![text("a", 0, 30), text("b", 10, 90), text("c", 50, 60)];
        let tracks = layers_to_tracks(&layers);
        assert_eq!(apply_track_edits(&layers, &tracks), layers);
    }

    #[test]
    fn same_cardinality_overwrites_range_and_flags() {
        let layers = vec![text("a", 0, 30), text("b", 10, 90)];
        let mut tracks = layers_to_tracks(&layers);
        tracks[1].start_frame = Some(20);
        tracks[1].end_frame = Some(70);
        tracks[1].locked = Some(true);
        tracks[0].visible = None;

        let next = apply_track_edits(&layers, &tracks);
        assert_eq!((next[1].start_frame, next[1].end_frame), (20, 70));
        assert!(next[1].locked);
        assert!(next[0].visible);
    }

    #[test]
    fn split_places_clone_after_source() {
        let layers = vec![text("l", 0, 100), text("m", 0, 10)];
        let mut tracks = layers_to_tracks(&layers);
        tracks[0].end_frame = Some(40);
        let mut cut = TimelineTrack::from_layer(&layers[0]);
        cut.id = "l-cut-1".to_string();
        cut.start_frame = Some(40);
        cut.end_frame = Some(100);
        tracks.push(cut);

        let next = apply_track_edits(&layers, &tracks);
        let ids: Vec<&str> = next.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l", "l-cut-1", "m"]);
        assert_eq!((next[0].start_frame, next[0].end_frame), (0, 40));
        assert_eq!((next[1].start_frame, next[1].end_frame), (40, 100));
        assert_eq!(next[0].kind, next[1].kind);
        assert_eq!(next[0].position, next[1].position);
    }

    #[test]
    fn multiple_cuts_follow_track_order() {
        let layers = vec![text("l", 0, 90)];
        let mut tracks = layers_to_tracks(&layers);
        tracks[0].end_frame = Some(30);
        for (id, start, end) in [("l-cut-2", 60, 90), ("l-cut-1", 30, 60)] {
            let mut cut = TimelineTrack::from_layer(&layers[0]);
            cut.id = id.to_string();
            cut.start_frame = Some(start);
            cut.end_frame = Some(end);
            tracks.push(cut);
        }

        let next = apply_track_edits(&layers, &tracks);
        let ids: Vec<&str> = next.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l", "l-cut-2", "l-cut-1"]);
    }

    #[test]
    fn cut_of_new_cut_resolves_in_same_batch() {
        let layers = vec![text("l", 0, 90), text("m", 0, 10)];
        let once = split_track_at(&layers_to_tracks(&layers), "l", 30).unwrap();
        let twice = split_track_at(&once, "l-cut-1", 60).unwrap();

        let next = apply_track_edits(&layers, &twice);
        let ids: Vec<&str> = next.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l", "l-cut-1", "l-cut-1-cut-1", "m"]);
        let ranges: Vec<(Frame, Frame)> =
            next.iter().map(|l| (l.start_frame, l.end_frame)).collect();
        assert_eq!(ranges, [(0, 30), (30, 60), (60, 90), (0, 10)]);
    }

    #[test]
    fn cut_ahead_of_its_source_falls_back_to_root() {
        let layers = vec![text("l", 0, 90)];
        let mut tracks = layers_to_tracks(&layers);
        tracks[0].end_frame = Some(30);
        for (id, start, end) in [("l-cut-1-cut-1", 60, 90), ("l-cut-1", 30, 60)] {
            let mut cut = TimelineTrack::from_layer(&layers[0]);
            cut.id = id.to_string();
            cut.start_frame = Some(start);
            cut.end_frame = Some(end);
            tracks.push(cut);
        }

        let next = apply_track_edits(&layers, &tracks);
        let ids: Vec<&str> = next.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l", "l-cut-1-cut-1", "l-cut-1"]);
        assert_eq!((next[1].start_frame, next[1].end_frame), (60, 90));
        assert_eq!(next[1].kind, next[0].kind);
    }

    #[test]
    fn unresolvable_cut_is_dropped() {
        let layers = vec![text("a", 0, 30)];
        let mut tracks = layers_to_tracks(&layers);
        let mut orphan = tracks[0].clone();
        orphan.id = "ghost-cut-1".to_string();
        tracks.push(orphan);
        let mut stray = tracks[0].clone();
        stray.id = "brand-new".to_string();
        tracks.push(stray);

        let next = apply_track_edits(&layers, &tracks);
        assert_eq!(next, layers);
    }

    #[test]
    fn reorder_moves_single_element() {
        let layers = vec![text("a", 0, 1), text("b", 0, 1), text("c", 0, 1)];
        let next = reorder_tracks(&layers, 0, 2);
        let ids: Vec<&str> = next.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);

        let unchanged = reorder_tracks(&layers, 7, 0);
        assert_eq!(unchanged, layers);
    }

    #[test]
    fn razor_split_picks_free_cut_number() {
        let layers = vec![text("a", 0, 100)];
        let tracks = layers_to_tracks(&layers);
        let once = split_track_at(&tracks, "a", 40).unwrap();
        assert_eq!(once[1].id, "a-cut-1");
        let twice = split_track_at(&once, "a", 20).unwrap();
        let ids: Vec<&str> = twice.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "a-cut-2", "a-cut-1"]);
        assert_eq!(twice[1].start_frame, Some(20));
        assert_eq!(twice[1].end_frame, Some(40));

        assert!(split_track_at(&tracks, "a", 0).is_none());
        assert!(split_track_at(&tracks, "a", 100).is_none());
        assert!(split_track_at(&tracks, "zzz", 10).is_none());
    }

    #[test]
    fn parse_cut_id_handles_nested_cuts() {
        assert_eq!(parse_cut_id("l-cut-3"), Some(("l", 3)));
        assert_eq!(parse_cut_id("l-cut-1-cut-2"), Some(("l-cut-1", 2)));
        assert_eq!(parse_cut_id("l-cut-x"), None);
        assert_eq!(parse_cut_id("plain"), None);
    }
}

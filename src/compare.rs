use crate::fingerprint::IdentificationResult;

/// Whether two identifications name the same track
///
/// Only matches can be equal, and only when title and artist are identical
/// byte for byte. This is the only thing stopping a track from being
/// dispatched again on every cycle.
pub fn is_same_track(a: &IdentificationResult, b: &IdentificationResult) -> bool {
    match (a, b) {
        (
            IdentificationResult::Matched {
                title: title_a,
                artist: artist_a,
                ..
            },
            IdentificationResult::Matched {
                title: title_b,
                artist: artist_b,
                ..
            },
        ) => title_a == title_b && artist_a == artist_b,
        _ => false,
    }
}

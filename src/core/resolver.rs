//! Per-frame identity resolution by majority vote over reference encodings.

use crate::core::detector::FaceBox;
use crate::core::recognizer::{cosine_similarity, EncodedFace};
use crate::storage::CredentialRecordSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Unknown,
    Known(String),
}

impl Identity {
    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Identity::Known(label) => Some(label),
            Identity::Unknown => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Known(label) => f.write_str(label),
            Identity::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFace {
    pub bounds: FaceBox,
    pub identity: Identity,
}

pub struct IdentityResolver {
    records: CredentialRecordSet,
    match_threshold: f32,
}

impl IdentityResolver {
    pub fn new(records: CredentialRecordSet, match_threshold: f32) -> Self {
        Self { records, match_threshold }
    }

    pub fn records(&self) -> &CredentialRecordSet {
        &self.records
    }

    /// One `(bounds, identity)` pair per face, in detection order.
    pub fn resolve_frame(&self, faces: &[EncodedFace]) -> Vec<ResolvedFace> {
        faces
            .iter()
            .map(|face| ResolvedFace {
                bounds: face.bounds.clone(),
                identity: self.resolve_face(&face.encoding),
            })
            .collect()
    }

    pub fn resolve_face(&self, encoding: &[f32]) -> Identity {
        let matched = self
            .records
            .entries
            .iter()
            .filter(|entry| cosine_similarity(encoding, &entry.encoding) >= self.match_threshold)
            .map(|entry| entry.label.as_str());

        majority_label(matched)
    }
}

/// Picks the most frequent label. Ties go to whichever label was seen first.
pub fn majority_label<'a>(matched: impl IntoIterator<Item = &'a str>) -> Identity {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in matched {
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }

    best.map_or(Identity::Unknown, |(label, _)| Identity::Known(label.to_string()))
}

/// The identity a whole frame presents to the session: the last known face in
/// detection order, or `Unknown` when no face is known.
pub fn frame_identity(faces: &[ResolvedFace]) -> Identity {
    faces
        .iter()
        .rev()
        .find(|face| face.identity.is_known())
        .map_or(Identity::Unknown, |face| face.identity.clone())
}

/// Default acceptance threshold for Euclidean distance between two face embeddings.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Identity label recorded for a detected face that matched nobody in the gallery.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// Face embedding vector, one per detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Embeddings of different length are never comparable and report
    /// an infinite distance.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A known person: name taken from the reference image file stem.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub embedding: Embedding,
}

/// Ordered collection of known identities, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    identities: Vec<Identity>,
}

impl Gallery {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self { identities }
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().map(|i| i.name.as_str())
    }
}

/// Result of matching a query embedding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Distance to the closest gallery entry; `None` when the gallery is empty.
    pub distance: Option<f32>,
    /// Name of the matched identity (if any).
    pub identity: Option<String>,
}

/// Strategy for comparing a query embedding against the gallery.
pub trait Matcher {
    fn compare(&self, query: &Embedding, gallery: &Gallery, threshold: f32) -> MatchResult;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// The argmin entry is accepted only when its distance is within the threshold.
/// On equal distances the earlier gallery entry wins.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, query: &Embedding, gallery: &Gallery, threshold: f32) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, identity) in gallery.identities().iter().enumerate() {
            let dist = query.euclidean_distance(&identity.embedding);
            if best_idx.is_none() || dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= threshold => MatchResult {
                matched: true,
                distance: Some(best_dist),
                identity: Some(gallery.identities()[idx].name.clone()),
            },
            Some(_) => MatchResult {
                matched: false,
                distance: Some(best_dist),
                identity: None,
            },
            None => MatchResult {
                matched: false,
                distance: None,
                identity: None,
            },
        }
    }
}

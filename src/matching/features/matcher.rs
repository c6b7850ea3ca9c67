/// Brute-force descriptor matching with the nearest-neighbour ratio test

/// Descriptor set of one image, one entry per keypoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    /// Bit strings compared by Hamming distance
    Binary(Vec<Vec<u8>>),
    /// Vectors compared by Euclidean distance
    Float(Vec<Vec<f32>>),
}

impl Descriptors {
    pub fn len(&self) -> usize {
        match self {
            Descriptors::Binary(d) => d.len(),
            Descriptors::Float(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A correspondence between a template keypoint and a screen keypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatch {
    /// Index into the template (query) descriptors
    pub query: usize,
    /// Index into the screen (train) descriptors
    pub train: usize,
    pub distance: f32,
}

pub fn hamming(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x ^ y).count_ones())
        .sum::<u32>() as f32
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// For every query descriptor find its two nearest train descriptors and
/// keep the pair iff `best < ratio * second`.
///
/// Needs at least two train descriptors; mismatched descriptor kinds yield
/// no matches.
pub fn ratio_matches(query: &Descriptors, train: &Descriptors, ratio: f32) -> Vec<FeatureMatch> {
    match (query, train) {
        (Descriptors::Binary(q), Descriptors::Binary(t)) => {
            knn2_ratio(q, t, ratio, |a, b| hamming(a, b))
        }
        (Descriptors::Float(q), Descriptors::Float(t)) => {
            knn2_ratio(q, t, ratio, |a, b| euclidean(a, b))
        }
        _ => Vec::new(),
    }
}

fn knn2_ratio<T>(
    query: &[T],
    train: &[T],
    ratio: f32,
    distance: impl Fn(&T, &T) -> f32,
) -> Vec<FeatureMatch> {
    if train.len() < 2 {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for (qi, q) in query.iter().enumerate() {
        let mut best = (usize::MAX, f32::INFINITY);
        let mut second = f32::INFINITY;
        for (ti, t) in train.iter().enumerate() {
            let d = distance(q, t);
            if d < best.1 {
                second = best.1;
                best = (ti, d);
            } else if d < second {
                second = d;
            }
        }
        if best.1 < ratio * second {
            matches.push(FeatureMatch {
                query: qi,
                train: best.0,
                distance: best.1,
            });
        }
    }
    matches
}

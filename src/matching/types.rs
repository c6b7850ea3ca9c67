/// Matching data types
use image::GrayImage;
use std::fmt;
use std::sync::Arc;

/// Full-screen grayscale capture shared read-only by the strategies of one
/// dispatch call.
pub type ScreenCapture = Arc<GrayImage>;

/// The five strategies, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    DirectLocate,
    TemplateCorrelation,
    OrbFeatures,
    SiftFeatures,
    AkazeFeatures,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::DirectLocate,
        StrategyKind::TemplateCorrelation,
        StrategyKind::OrbFeatures,
        StrategyKind::SiftFeatures,
        StrategyKind::AkazeFeatures,
    ];

    /// Stable identifier used in logs, config keys and candidates.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::DirectLocate => "direct-locate",
            StrategyKind::TemplateCorrelation => "template-correlation",
            StrategyKind::OrbFeatures => "orb-features",
            StrategyKind::SiftFeatures => "sift-features",
            StrategyKind::AkazeFeatures => "akaze-features",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StrategyKind::DirectLocate => "Direct Locate",
            StrategyKind::TemplateCorrelation => "Template Matching",
            StrategyKind::OrbFeatures => "ORB Feature Matching",
            StrategyKind::SiftFeatures => "SIFT Feature Matching",
            StrategyKind::AkazeFeatures => "AKAZE Feature Matching",
        }
    }

    /// Position in registration order, also the selection mask index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the strategy reads the shared capture. Direct locate does its
    /// own screen search.
    pub fn needs_capture(self) -> bool {
        self != StrategyKind::DirectLocate
    }

    /// Parse a strategy name, accepting the legacy short aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "direct-locate" | "pyautogui" => Some(StrategyKind::DirectLocate),
            "template-correlation" | "template" => Some(StrategyKind::TemplateCorrelation),
            "orb-features" | "orb" => Some(StrategyKind::OrbFeatures),
            "sift-features" | "sift" => Some(StrategyKind::SiftFeatures),
            "akaze-features" | "akaze" => Some(StrategyKind::AkazeFeatures),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which registered strategies take part in a dispatch. Entries beyond the
/// end count as disabled; extra entries are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMask(Vec<bool>);

impl SelectionMask {
    pub fn new(flags: Vec<bool>) -> Self {
        Self(flags)
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn all() -> Self {
        Self(vec![true; StrategyKind::ALL.len()])
    }

    pub fn only(kinds: &[StrategyKind]) -> Self {
        let mut flags = vec![false; StrategyKind::ALL.len()];
        for kind in kinds {
            flags[kind.index()] = true;
        }
        Self(flags)
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|&enabled| enabled)
    }
}

/// A single strategy's (or the fused) decision.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Screen coordinate to act on
    pub center: (i32, i32),
    /// Strategy-specific score: correlation in [0, 1] or a match count
    pub score: f64,
    /// Name of the strategy that produced it
    pub strategy: &'static str,
}

impl MatchCandidate {
    pub fn new(center: (i32, i32), score: f64, strategy: &'static str) -> Self {
        Self {
            center,
            score,
            strategy,
        }
    }
}

impl fmt::Display for MatchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) (score: {} using {})",
            self.center.0, self.center.1, self.score, self.strategy
        )
    }
}

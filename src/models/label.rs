use serde::{Deserialize, Serialize};

/// Fixed label buckets used by the PR table. Names are matched exactly, so
/// `Feature` is not `feature`; anything unrecognised lands in `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LabelCategory {
    Breaking,
    Feature,
    Bugfix,
    Maintenance,
    Other,
}

impl LabelCategory {
    pub fn from_name(name: &str) -> Self {
        match name {
            "backwards-incompatible" => LabelCategory::Breaking,
            "feature" | "enhancement" => LabelCategory::Feature,
            "bugfix" => LabelCategory::Bugfix,
            "maintenance" => LabelCategory::Maintenance,
            _ => LabelCategory::Other,
        }
    }
}

impl std::fmt::Display for LabelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelCategory::Breaking => write!(f, "breaking"),
            LabelCategory::Feature => write!(f, "feature"),
            LabelCategory::Bugfix => write!(f, "bugfix"),
            LabelCategory::Maintenance => write!(f, "maintenance"),
            LabelCategory::Other => write!(f, "other"),
        }
    }
}

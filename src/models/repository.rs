use serde::{Deserialize, Serialize};

/// What a tracked repository is, as recorded in the report tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Module,
    Tool,
}

impl std::fmt::Display for RepoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoKind::Module => write!(f, "module"),
            RepoKind::Tool => write!(f, "tool"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Repository {
    pub namespace: String,
    pub name: String,
    pub kind: RepoKind,
}

impl Repository {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, kind: RepoKind) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.namespace, self.name)
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

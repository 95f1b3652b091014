use std::fmt;

/// One of the two container steps of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Build,
    Package,
}

impl Phase {
    pub fn start_message(self) -> &'static str {
        match self {
            Phase::Build => "Building project.",
            Phase::Package => "Packaging project.",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Phase::Build => "Build succeeded.",
            Phase::Package => "Packaging succeeded.",
        }
    }

    /// What failed when the container exits non-zero
    pub fn failure_subject(self) -> &'static str {
        match self {
            Phase::Build => "Build script",
            Phase::Package => "Packaging command",
        }
    }

    pub fn container_label(self) -> &'static str {
        match self {
            Phase::Build => "build container",
            Phase::Package => "packaging container",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Build => write!(f, "build"),
            Phase::Package => write!(f, "package"),
        }
    }
}

use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use target_lexicon::OperatingSystem;

use crate::Error;

/// The operating system families that kiln distinguishes between when choosing how to isolate
/// actions.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum HostOs {
    Linux,
    /// macOS and the other Apple platforms built on the Darwin kernel.
    Darwin,
    FreeBsd,
    /// Any operating system without a sandbox implementation.
    Other,
}

impl HostOs {
    /// The operating system kiln was compiled for.
    pub fn from_env() -> Self {
        Self::from(target_lexicon::HOST.operating_system)
    }

    pub fn is_linux(self) -> bool {
        matches!(self, Self::Linux)
    }

    pub fn is_darwin(self) -> bool {
        matches!(self, Self::Darwin)
    }
}

impl From<OperatingSystem> for HostOs {
    fn from(os: OperatingSystem) -> Self {
        match os {
            OperatingSystem::Linux => Self::Linux,
            OperatingSystem::Darwin(_) => Self::Darwin,
            OperatingSystem::Freebsd => Self::FreeBsd,
            _ => Self::Other,
        }
    }
}

impl Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::FreeBsd => write!(f, "freebsd"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for HostOs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => return Ok(Self::Linux),
            "darwin" | "macos" => return Ok(Self::Darwin),
            "freebsd" => return Ok(Self::FreeBsd),
            "other" => return Ok(Self::Other),
            _ => {}
        }
        let inner =
            OperatingSystem::from_str(s).map_err(|()| Error::UnknownOs(s.to_string()))?;
        if matches!(inner, OperatingSystem::Unknown) {
            return Err(Error::UnknownOs(s.to_string()));
        }
        Ok(Self::from(inner))
    }
}

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Named configuration profile. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum InteractionMode {
    #[default]
    Casual,
    Focus,
    Accessibility,
}

/// Which output sinks a mode wants fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationPolicy {
    pub overlay: bool,
    pub voice: bool,
    pub notification: bool,
}

impl InteractionMode {
    pub const ALL: [InteractionMode; 3] = [
        InteractionMode::Casual,
        InteractionMode::Focus,
        InteractionMode::Accessibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Casual => "casual",
            InteractionMode::Focus => "focus",
            InteractionMode::Accessibility => "accessibility",
        }
    }

    pub fn presentation_policy(&self) -> PresentationPolicy {
        match self {
            InteractionMode::Casual => PresentationPolicy {
                overlay: true,
                voice: true,
                notification: true,
            },
            // Focus keeps interruptions visual and silent.
            InteractionMode::Focus => PresentationPolicy {
                overlay: true,
                voice: false,
                notification: false,
            },
            InteractionMode::Accessibility => PresentationPolicy {
                overlay: true,
                voice: true,
                notification: true,
            },
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "casual" => Ok(InteractionMode::Casual),
            "focus" => Ok(InteractionMode::Focus),
            "accessibility" => Ok(InteractionMode::Accessibility),
            other => Err(anyhow::anyhow!("unknown interaction mode '{other}'")),
        }
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Product lines sold by the quoting tool. Each family carries its own plan
/// catalog, payback thresholds, tax classes and proposal id prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    Radio,
    Fiber,
    Man,
    Vm,
    Pabx,
}

impl ProductFamily {
    pub const ALL: [ProductFamily; 5] = [
        ProductFamily::Radio,
        ProductFamily::Fiber,
        ProductFamily::Man,
        ProductFamily::Vm,
        ProductFamily::Pabx,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Radio => "radio",
            Self::Fiber => "fiber",
            Self::Man => "man",
            Self::Vm => "vm",
            Self::Pabx => "pabx",
        }
    }

    /// Prefix of every proposal base id minted for this family.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Radio => "RAD",
            Self::Fiber => "FIB",
            Self::Man => "MAN",
            Self::Vm => "VM",
            Self::Pabx => "PBX",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Radio => "Internet via Rádio",
            Self::Fiber => "Internet via Fibra",
            Self::Man => "Circuito MAN",
            Self::Vm => "Máquina Virtual",
            Self::Pabx => "PABX / SIP",
        }
    }

    pub fn capacity_unit(self) -> &'static str {
        match self {
            Self::Radio | Self::Fiber | Self::Man => "Mbps",
            Self::Vm => "vCPU",
            Self::Pabx => "ramais",
        }
    }
}

impl FromStr for ProductFamily {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "radio" => Ok(Self::Radio),
            "fiber" | "fibra" => Ok(Self::Fiber),
            "man" => Ok(Self::Man),
            "vm" => Ok(Self::Vm),
            "pabx" | "sip" => Ok(Self::Pabx),
            other => Err(format!(
                "unsupported product family `{other}` (expected radio|fiber|man|vm|pabx)"
            )),
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::{Deserialize, Serialize};

use crate::core::pam::{PamPattern, PamSide};

/// Strand a site sits on, relative to the input sequence
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Built-in nuclease presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Nuclease {
    /// SpCas9 with the canonical NGG PAM
    Cas9Ngg,
    /// SpCas9 with the weaker NAG PAM
    Cas9Nag,
    /// Cas12a (Cpf1) with a 5' TTTV PAM
    Cas12aTttv,
}

impl Nuclease {
    /// PAM pattern recognised by this nuclease
    #[must_use]
    pub fn pam(self) -> PamPattern {
        match self {
            Self::Cas9Ngg => PamPattern::new_unchecked("NGG", PamSide::ThreePrime),
            Self::Cas9Nag => PamPattern::new_unchecked("NAG", PamSide::ThreePrime),
            Self::Cas12aTttv => PamPattern::new_unchecked("TTTV", PamSide::FivePrime),
        }
    }

    /// Conventional protospacer length
    #[must_use]
    pub fn protospacer_length(self) -> usize {
        match self {
            Self::Cas9Ngg | Self::Cas9Nag => 20,
            Self::Cas12aTttv => 23,
        }
    }

    /// Cut position relative to the PAM-proximal end of the protospacer.
    ///
    /// Cas9 cuts 3 bp upstream of the PAM (inside the protospacer). Cas12a
    /// cuts distal to its 5' PAM, 18 nt into the protospacer on the
    /// non-target strand.
    #[must_use]
    pub fn cut_offset(self) -> usize {
        match self {
            Self::Cas9Ngg | Self::Cas9Nag => 3,
            Self::Cas12aTttv => 18,
        }
    }
}

impl std::fmt::Display for Nuclease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cas9Ngg => write!(f, "Cas9 (NGG)"),
            Self::Cas9Nag => write!(f, "Cas9 (NAG)"),
            Self::Cas12aTttv => write!(f, "Cas12a (TTTV)"),
        }
    }
}

//! Demographic tags and configuration mode enums.
//!
//! Every enum here deserializes from the upper-case tag used in parameter
//! files; an unknown tag is rejected by `serde` at load time.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── SexType ───────────────────────────────────────────────────────────────────

/// Sex behavior class.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum SexType {
    #[serde(rename = "HM")]
    Hm,
    #[serde(rename = "HF")]
    Hf,
    #[serde(rename = "MSM")]
    Msm,
    #[serde(rename = "MTF")]
    Mtf,
    #[serde(rename = "WSW")]
    Wsw,
    #[serde(rename = "MSW")]
    Msw,
}

impl SexType {
    pub const ALL: [SexType; 6] = [
        SexType::Hm,
        SexType::Hf,
        SexType::Msm,
        SexType::Mtf,
        SexType::Wsw,
        SexType::Msw,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            SexType::Hm  => "HM",
            SexType::Hf  => "HF",
            SexType::Msm => "MSM",
            SexType::Mtf => "MTF",
            SexType::Wsw => "WSW",
            SexType::Msw => "MSW",
        }
    }

    /// Male-bodied behavior classes.  Selects the male high-risk window length.
    pub fn is_male(self) -> bool {
        matches!(self, SexType::Hm | SexType::Msm | SexType::Msw)
    }

    /// Symmetric sex-compatibility relation.
    ///
    /// HM↔{HF,WSW,MTF}; MSM↔{MSM,WSW,HF,MTF,MSW}; WSW↔{MSM,WSW,HM};
    /// HF↔{HM,MSM}; MTF↔{HM,MSM}.
    pub fn sex_possible(self, other: SexType) -> bool {
        use SexType::*;
        let one_way = |a: SexType, b: SexType| match a {
            Hm  => matches!(b, Hf | Wsw | Mtf),
            Msm => matches!(b, Msm | Wsw | Hf | Mtf | Msw),
            Wsw => matches!(b, Msm | Wsw | Hm),
            Hf  => matches!(b, Hm | Msm),
            Mtf => matches!(b, Hm | Msm),
            Msw => false,
        };
        one_way(self, other) || one_way(other, self)
    }
}

impl fmt::Display for SexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ── DrugType ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum DrugType {
    /// No drug use.
    #[serde(rename = "NDU")]
    Ndu,
    /// Non-injection drug use.
    #[serde(rename = "NIDU")]
    Nidu,
    /// Injection drug use.
    #[serde(rename = "IDU")]
    Idu,
}

impl DrugType {
    pub const ALL: [DrugType; 3] = [DrugType::Ndu, DrugType::Nidu, DrugType::Idu];

    pub fn tag(self) -> &'static str {
        match self {
            DrugType::Ndu  => "NDU",
            DrugType::Nidu => "NIDU",
            DrugType::Idu  => "IDU",
        }
    }
}

impl fmt::Display for DrugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ── Race ──────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Race {
    #[serde(rename = "WHITE")]
    White,
    #[serde(rename = "BLACK")]
    Black,
}

impl Race {
    pub const ALL: [Race; 2] = [Race::White, Race::Black];

    pub fn tag(self) -> &'static str {
        match self {
            Race::White => "WHITE",
            Race::Black => "BLACK",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ── SexRole ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum SexRole {
    Insertive,
    Receptive,
    #[default]
    Versatile,
}

// ── Mode enums ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum PrepType {
    #[default]
    Oral,
    Inj,
}

/// How PrEP candidates are selected.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum PrepTargetModel {
    #[default]
    Allcomers,
    HighPN5,
    HighPN10,
    SRIns,
    MSM,
    /// Component-level enrollment once at `start_t`.
    RandomTrial,
    /// Fill to target from partner-count strata.
    Clinical,
    /// Direct enrollment of Black agents with probability `target`.
    Racial,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum AssortMode {
    #[default]
    Age,
    Race,
    Client,
    HR,
}

/// Named partner-count stratification used by clinical PrEP targeting.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub enum ClinicCategory {
    Mild,
    #[default]
    Mid,
    High,
}

/// Post-release treatment components.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum PostReleaseTreatment {
    /// Suppresses HAART discontinuation.
    ArtRetention,
    /// Suppresses needle sharing for the treated susceptible.
    IduBehavior,
    /// Suppresses the post-release high-risk window for HIV+ agents.
    HighRiskBehavior,
}

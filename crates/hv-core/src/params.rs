//! The immutable parameter bundle consumed at init.
//!
//! Loaded from JSON and validated once; every engine receives `&Params`.
//! Missing sections fall back to [`Params::default`], which is itself a
//! complete, valid baseline.
//!
//! ```rust
//! use hv_core::Params;
//!
//! let params = Params::from_json_str(r#"{ "sizing": { "n_pop": 500, "tmax": 12, "burn_duration": 0 } }"#)
//!     .unwrap();
//! assert_eq!(params.sizing.n_pop, 500);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{
    AssortMode, ClinicCategory, DrugType, PostReleaseTreatment, PrepTargetModel, PrepType, Race,
    SexType,
};
use crate::{HvError, HvResult};

// ── AdherenceTable ────────────────────────────────────────────────────────────

/// Per-act transmission probability indexed by donor adherence `0..=5`.
///
/// Serialized as a map with the string keys `"0"` … `"5"`; all six keys are
/// required.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdherenceTable(pub [f64; 6]);

impl AdherenceTable {
    /// Probability for adherence level `adh` (levels above 5 read level 5).
    #[inline]
    pub fn get(&self, adh: u8) -> f64 {
        self.0[usize::from(adh.min(5))]
    }

    pub fn uniform(p: f64) -> Self {
        AdherenceTable([p; 6])
    }
}

impl Serialize for AdherenceTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<String, f64> = self
            .0
            .iter()
            .enumerate()
            .map(|(i, p)| (i.to_string(), *p))
            .collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AdherenceTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let map = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let mut table = [0.0; 6];
        let mut seen = [false; 6];
        for (key, value) in map {
            let level: usize = key
                .parse()
                .ok()
                .filter(|l| *l <= 5)
                .ok_or_else(|| D::Error::custom(format!("invalid adherence level {key:?}")))?;
            table[level] = value;
            seen[level] = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(D::Error::custom(format!("missing adherence level \"{missing}\"")));
        }
        Ok(AdherenceTable(table))
    }
}

// ── Bins ──────────────────────────────────────────────────────────────────────

/// Categorical bin over an integer range `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub min:    u32,
    pub max:    u32,
    pub weight: f64,
}

impl Bin {
    pub const fn new(min: u32, max: u32, weight: f64) -> Self {
        Self { min, max, weight }
    }
}

/// Age bin with its (cumulative-order) selection probability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeBin {
    pub prob:    f64,
    pub min_age: u32,
    pub max_age: u32,
}

/// Partner-count stratum for clinical PrEP targeting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicBin {
    pub prob: f64,
    pub min:  u32,
    pub max:  u32,
}

// ── Sections ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Sizing {
    pub n_pop:         usize,
    /// Main-loop months.
    pub tmax:          u32,
    pub burn_duration: u32,
}

impl Default for Sizing {
    fn default() -> Self {
        Self { n_pop: 10_000, tmax: 120, burn_duration: 36 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Seeds {
    pub run_seed: u64,
    pub pop_seed: u64,
    pub net_seed: u64,
}

impl Default for Seeds {
    fn default() -> Self {
        Self { run_seed: 1, pop_seed: 2, net_seed: 3 }
    }
}

/// Feature switches.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub incar:           bool,
    pub prep:            bool,
    pub high_risk:       bool,
    pub art:             bool,
    /// Die-and-replace.
    pub die_and_replace: bool,
    /// Keep the population at `n_pop` (replacement on every death).
    pub static_n:        bool,
    pub agent_zero:      bool,
    /// Sexual transmission reads the condom-use bins instead of the
    /// demographic unsafe-sex probability.
    pub condom_bins:     bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            incar:           true,
            prep:            false,
            high_risk:       true,
            art:             true,
            die_and_replace: true,
            static_n:        true,
            agent_zero:      false,
            condom_bins:     true,
        }
    }
}

/// One demographic row: a (race, sex behavior) cell, or a race's IDU row.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicRow {
    /// Share of the race (ignored on the IDU row).
    pub proportion:             f64,
    pub hiv_prev:               f64,
    pub aids_prev:              f64,
    pub tested_prev:            f64,
    pub haart_prev:             f64,
    pub incar_prev:             f64,
    pub mean_partners:          f64,
    pub num_sex_acts:           f64,
    pub unsafe_sex:             f64,
    pub needle_share:           f64,
    pub test_freq:              f64,
    pub incar_rate:             f64,
    pub haart_adh:              f64,
    pub haart_disc:             f64,
    pub prep_disc:              f64,
    pub eligible_partner_types: Vec<SexType>,
}

impl Default for DemographicRow {
    fn default() -> Self {
        Self {
            proportion:             0.0,
            hiv_prev:               0.0,
            aids_prev:              0.0,
            tested_prev:            0.0,
            haart_prev:             0.0,
            incar_prev:             0.0,
            mean_partners:          1.0,
            num_sex_acts:           5.0,
            unsafe_sex:             0.5,
            needle_share:           0.0,
            test_freq:              0.0,
            incar_rate:             0.0,
            haart_adh:              0.0,
            haart_disc:             0.0,
            prep_disc:              0.0,
            eligible_partner_types: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceDemographics {
    /// Share of the whole population.
    pub proportion: f64,
    /// Probability a new agent of this race is IDU.
    pub pwid_prop:  f64,
    pub sex:        BTreeMap<SexType, DemographicRow>,
    pub idu:        DemographicRow,
}

impl Default for RaceDemographics {
    fn default() -> Self {
        Self {
            proportion: 0.0,
            pwid_prop:  0.0,
            sex:        BTreeMap::new(),
            idu:        DemographicRow::default(),
        }
    }
}

/// Calibration multipliers.  Inputs only; nothing here is fitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub needle_part_scaling: f64,
    pub needle_act_scaling:  f64,
    pub sexual_part_scaling: f64,
    pub sex_act_scaling:     f64,
    pub p_xmission_scaling:  f64,
    pub acute_scaling:       f64,
    pub rr_dx:               f64,
    pub rr_haart:            f64,
    pub test_freq:           f64,
    pub mortality:           f64,
    pub prog_aids:           f64,
    pub art_cov:             f64,
    pub incar_p:             f64,
    pub race_xmission:       f64,
    pub ptnr_sample_depth:   usize,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            needle_part_scaling: 1.0,
            needle_act_scaling:  1.0,
            sexual_part_scaling: 1.0,
            sex_act_scaling:     1.0,
            p_xmission_scaling:  1.0,
            acute_scaling:       4.3,
            rr_dx:               0.0,
            rr_haart:            1.0,
            test_freq:           1.0,
            mortality:           1.0,
            prog_aids:           1.0,
            art_cov:             1.0,
            incar_p:             1.0,
            race_xmission:       1.0,
            ptnr_sample_depth:   100,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionTables {
    /// Per-act sexual transmission keyed by the donor's sex behavior.
    pub sex:    BTreeMap<SexType, AdherenceTable>,
    pub needle: AdherenceTable,
}

impl Default for TransmissionTables {
    fn default() -> Self {
        let hetero = AdherenceTable([0.001, 0.001, 0.0008, 0.0006, 0.0004, 0.0002]);
        let anal   = AdherenceTable([0.0138, 0.0138, 0.0110, 0.0083, 0.0055, 0.0007]);
        let mut sex = BTreeMap::new();
        sex.insert(SexType::Hm,  hetero);
        sex.insert(SexType::Hf,  hetero);
        sex.insert(SexType::Wsw, hetero);
        sex.insert(SexType::Msm, anal);
        sex.insert(SexType::Mtf, anal);
        sex.insert(SexType::Msw, anal);
        Self {
            sex,
            needle: AdherenceTable([0.0063, 0.0063, 0.0050, 0.0038, 0.0025, 0.0008]),
        }
    }
}

/// MSM sexual-role proportions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDist {
    pub insertive: f64,
    pub receptive: f64,
    pub versatile: f64,
}

impl Default for RoleDist {
    fn default() -> Self {
        Self { insertive: 0.25, receptive: 0.25, versatile: 0.5 }
    }
}

/// Act-level behavior constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorParams {
    pub partner_turnover:          f64,
    pub mean_needle_acts:          f64,
    pub safe_needle_exchange_prev: f64,
    /// Residual unsafe-share probability for syringe-exchange enrollees.
    pub sne_unsafe_share:          f64,
    /// Unsafe-act probability by cumulative-act band `[0, 1, 2..=9, ≥10]`.
    pub condom_bins:               [f64; 4],
    pub msm_role_dist:             RoleDist,
    /// Minimum `mean_num_partners` of an HF candidate under `Client` mixing.
    pub client_partner_threshold:  f64,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            partner_turnover:          1.0,
            mean_needle_acts:          4.3,
            safe_needle_exchange_prev: 1.0,
            sne_unsafe_share:          0.02,
            condom_bins:               [0.443, 0.481, 0.514, 0.759],
            msm_role_dist:             RoleDist::default(),
            client_partner_threshold:  10.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepParams {
    pub prep_type:       PrepType,
    /// Fraction of HIV− agents to hold on PrEP.
    pub target:          f64,
    pub start_t:         u32,
    pub adherence:       f64,
    pub adh_efficacy:    f64,
    pub nonadh_efficacy: f64,
    pub fallout_t:       u32,
    pub resist:          f64,
    pub target_model:    PrepTargetModel,
    pub clinic_cat:      ClinicCategory,
    pub clinic_bins:     BTreeMap<ClinicCategory, Vec<ClinicBin>>,
    /// Resample bound for clinical fill-to-target.
    pub max_resamples:   usize,
    pub peak_load:       f64,
    /// Injectable half-life in days.
    pub halflife:        f64,
}

impl Default for PrepParams {
    fn default() -> Self {
        let mut clinic_bins = BTreeMap::new();
        clinic_bins.insert(ClinicCategory::Mild, vec![
            ClinicBin { prob: 0.0,  min: 0, max: 0 },
            ClinicBin { prob: 0.6,  min: 1, max: 1 },
            ClinicBin { prob: 0.4,  min: 2, max: 3 },
        ]);
        clinic_bins.insert(ClinicCategory::Mid, vec![
            ClinicBin { prob: 0.054, min: 0, max: 1 },
            ClinicBin { prob: 0.396, min: 2, max: 4 },
            ClinicBin { prob: 0.55,  min: 5, max: 1_000 },
        ]);
        clinic_bins.insert(ClinicCategory::High, vec![
            ClinicBin { prob: 0.0,  min: 0,  max: 4 },
            ClinicBin { prob: 0.5,  min: 5,  max: 9 },
            ClinicBin { prob: 0.5,  min: 10, max: 1_000 },
        ]);
        Self {
            prep_type:       PrepType::Oral,
            target:          0.1,
            start_t:         0,
            adherence:       0.82,
            adh_efficacy:    0.96,
            nonadh_efficacy: 0.76,
            fallout_t:       0,
            resist:          0.0,
            target_model:    PrepTargetModel::Allcomers,
            clinic_cat:      ClinicCategory::Mid,
            clinic_bins,
            max_resamples:   100,
            peak_load:       4.91,
            halflife:        40.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IncarParams {
    pub jail_min:         u32,
    pub jail_max:         u32,
    pub prison_min:       u32,
    pub prison_max:       u32,
    /// Probability an incarceration is a jail (rather than prison) stay.
    pub jail_prob:        f64,
    pub jail_test_prob:   f64,
    pub prison_test_prob: f64,
    pub art_enroll:       f64,
    pub art_adh:          f64,
    pub art_disc:         f64,
    pub ptnr_dissolution: f64,
    pub treatment_dur:    u32,
    pub treat_set:        BTreeSet<PostReleaseTreatment>,
}

impl Default for IncarParams {
    fn default() -> Self {
        Self {
            jail_min:         1,
            jail_max:         9,
            prison_min:       6,
            prison_max:       60,
            jail_prob:        0.8,
            jail_test_prob:   0.69,
            prison_test_prob: 0.5,
            art_enroll:       0.51,
            art_adh:          0.21,
            art_disc:         0.12,
            ptnr_dissolution: 0.55,
            treatment_dur:    12,
            treat_set:        BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HighRiskParams {
    /// Added to `mean_num_partners` on entering the high-risk window.
    pub partner_scale: f64,
    /// Probability a partner of a newly incarcerated agent becomes high-risk.
    pub proportion:    f64,
    pub m_dur:         u32,
    pub f_dur:         u32,
}

impl Default for HighRiskParams {
    fn default() -> Self {
        Self { partner_scale: 300.0 / 12.0, proportion: 0.3, m_dur: 6, f_dur: 6 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AssortParams {
    pub coeff:      f64,
    pub mode:       AssortMode,
    /// Row = seeker's age bin, column = partner's age bin.
    pub age_matrix: [[f64; 5]; 5],
}

impl Default for AssortParams {
    fn default() -> Self {
        Self {
            coeff:      0.0,
            mode:       AssortMode::Age,
            age_matrix: [
                [0.60, 0.25, 0.10, 0.04, 0.01],
                [0.20, 0.50, 0.20, 0.07, 0.03],
                [0.07, 0.20, 0.50, 0.18, 0.05],
                [0.03, 0.07, 0.20, 0.50, 0.20],
                [0.01, 0.04, 0.10, 0.25, 0.60],
            ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnershipParams {
    /// Relationship duration bins (months).
    pub duration_bins:  Vec<Bin>,
    /// Annual partner-count bins.  Empty means Poisson around the
    /// demographic row's `mean_partners`.
    pub frequency_bins: Vec<Bin>,
}

impl Default for PartnershipParams {
    fn default() -> Self {
        Self {
            duration_bins: vec![
                Bin::new(1, 6, 0.323),
                Bin::new(7, 12, 0.262),
                Bin::new(13, 24, 0.199),
                Bin::new(25, 36, 0.116),
                Bin::new(37, 48, 0.100),
            ],
            frequency_bins: vec![
                Bin::new(0, 0, 0.135),
                Bin::new(1, 1, 0.329),
                Bin::new(2, 2, 0.186),
                Bin::new(3, 4, 0.178),
                Bin::new(5, 9, 0.108),
                Bin::new(10, 20, 0.064),
            ],
        }
    }
}

/// Per-1000-person-year death rates.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityRates {
    pub hiv_neg:       f64,
    pub hiv_untreated: f64,
    /// HIV+ on HAART with adherence ≥ 2.
    pub hiv_haart:     f64,
    pub aids:          f64,
}

impl Default for MortalityRates {
    fn default() -> Self {
        Self { hiv_neg: 5.6, hiv_untreated: 17.6, hiv_haart: 8.6, aids: 34.4 }
    }
}

/// One-shot treatment enrollment triggered by cumulative diagnoses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentParams {
    pub init_treatment: usize,
    /// Syringe-exchange enrollment probability per IDU.
    pub treatment_cov:  f64,
}

impl Default for TreatmentParams {
    fn default() -> Self {
        Self { init_treatment: 99_999, treatment_cov: 0.0 }
    }
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Every input the engine reads.  Built once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub sizing:       Sizing,
    pub seeds:        Seeds,
    pub features:     Features,
    pub demographics: BTreeMap<Race, RaceDemographics>,
    pub age_bins:     Vec<AgeBin>,
    pub calibration:  Calibration,
    pub transmission: TransmissionTables,
    pub behavior:     BehaviorParams,
    pub prep:         PrepParams,
    pub incar:        IncarParams,
    pub high_risk:    HighRiskParams,
    pub assort:       AssortParams,
    pub partnership:  PartnershipParams,
    pub mortality:    BTreeMap<Race, MortalityRates>,
    pub treatment:    TreatmentParams,
}

impl Default for Params {
    fn default() -> Self {
        let mut demographics = BTreeMap::new();
        demographics.insert(Race::White, baseline_race(0.6, 0.05, 0.005));
        demographics.insert(Race::Black, baseline_race(0.4, 0.08, 0.02));

        let mut mortality = BTreeMap::new();
        mortality.insert(Race::White, MortalityRates::default());
        mortality.insert(Race::Black, MortalityRates {
            hiv_neg:       8.6,
            hiv_untreated: 26.6,
            hiv_haart:     13.1,
            aids:          43.7,
        });

        Self {
            sizing:       Sizing::default(),
            seeds:        Seeds::default(),
            features:     Features::default(),
            demographics,
            age_bins:     vec![
                AgeBin { prob: 0.18, min_age: 15, max_age: 24 },
                AgeBin { prob: 0.28, min_age: 25, max_age: 34 },
                AgeBin { prob: 0.24, min_age: 35, max_age: 44 },
                AgeBin { prob: 0.19, min_age: 45, max_age: 54 },
                AgeBin { prob: 0.11, min_age: 55, max_age: 80 },
            ],
            calibration:  Calibration::default(),
            transmission: TransmissionTables::default(),
            behavior:     BehaviorParams::default(),
            prep:         PrepParams::default(),
            incar:        IncarParams::default(),
            high_risk:    HighRiskParams::default(),
            assort:       AssortParams::default(),
            partnership:  PartnershipParams::default(),
            mortality,
            treatment:    TreatmentParams::default(),
        }
    }
}

fn baseline_race(proportion: f64, pwid_prop: f64, base_prev: f64) -> RaceDemographics {
    use SexType::*;

    let row = |proportion: f64, prev_scale: f64, partners: Vec<SexType>| DemographicRow {
        proportion,
        hiv_prev:               base_prev * prev_scale,
        aids_prev:              0.05,
        tested_prev:            0.8,
        haart_prev:             0.5,
        incar_prev:             0.01,
        mean_partners:          1.5,
        num_sex_acts:           5.0,
        unsafe_sex:             0.6,
        needle_share:           0.0,
        test_freq:              0.02,
        incar_rate:             0.001,
        haart_adh:              0.6,
        haart_disc:             0.01,
        prep_disc:              0.05,
        eligible_partner_types: partners,
    };

    let mut sex = BTreeMap::new();
    sex.insert(Hm,  row(0.45, 1.0, vec![Hf]));
    sex.insert(Hf,  row(0.45, 1.5, vec![Hm]));
    sex.insert(Msm, row(0.08, 20.0, vec![Msm]));
    sex.insert(Mtf, row(0.02, 30.0, vec![Hm, Msm]));

    RaceDemographics {
        proportion,
        pwid_prop,
        sex,
        idu: DemographicRow {
            hiv_prev:     base_prev * 10.0,
            aids_prev:    0.1,
            tested_prev:  0.8,
            haart_prev:   0.4,
            incar_prev:   0.05,
            needle_share: 0.3,
            ..DemographicRow::default()
        },
    }
}

impl Params {
    /// Parse and validate a JSON parameter document.
    pub fn from_json_str(s: &str) -> HvResult<Self> {
        let params: Params = serde_json::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse, and validate a JSON parameter file.
    pub fn from_json_path(path: &Path) -> HvResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let params = Self::from_json_str(&text)?;
        log::info!("loaded parameters from {}", path.display());
        Ok(params)
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// Demographic row for a (race, sex behavior) cell.
    pub fn row(&self, race: Race, sex: SexType) -> HvResult<&DemographicRow> {
        self.demographics
            .get(&race)
            .and_then(|d| d.sex.get(&sex))
            .ok_or_else(|| HvError::Config(format!("no demographic row for {race}/{sex}")))
    }

    /// Prevalence row: the race's IDU row for injectors, else the sex row.
    pub fn prevalence_row(&self, race: Race, sex: SexType, drug: DrugType) -> HvResult<&DemographicRow> {
        if drug == DrugType::Idu {
            self.demographics
                .get(&race)
                .map(|d| &d.idu)
                .ok_or_else(|| HvError::Config(format!("no demographics for race {race}")))
        } else {
            self.row(race, sex)
        }
    }

    pub fn idu_row(&self, race: Race) -> HvResult<&DemographicRow> {
        self.prevalence_row(race, SexType::Hm, DrugType::Idu)
    }

    pub fn mortality_rates(&self, race: Race) -> HvResult<&MortalityRates> {
        self.mortality
            .get(&race)
            .ok_or_else(|| HvError::Config(format!("no mortality rates for race {race}")))
    }

    pub fn sex_table(&self, sex: SexType) -> HvResult<&AdherenceTable> {
        self.transmission
            .sex
            .get(&sex)
            .ok_or_else(|| HvError::Config(format!("no sexual transmission table for {sex}")))
    }

    /// The clinical partner-count strata selected by `prep.clinic_cat`.
    pub fn clinic_bins(&self) -> &[ClinicBin] {
        self.prep
            .clinic_bins
            .get(&self.prep.clinic_cat)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Check every range constraint.  Called by the loaders; call it
    /// yourself after building `Params` in code.
    pub fn validate(&self) -> HvResult<()> {
        if self.demographics.is_empty() {
            return Err(HvError::Config("no races configured".into()));
        }
        if self.demographics.values().map(|d| d.proportion).sum::<f64>() <= 0.0 {
            return Err(HvError::Config("race proportions sum to zero".into()));
        }

        for (race, demo) in &self.demographics {
            non_negative(&format!("{race}.proportion"), demo.proportion)?;
            prob(&format!("{race}.pwid_prop"), demo.pwid_prop)?;
            if demo.sex.is_empty() {
                return Err(HvError::Config(format!("race {race} has no sex-behavior rows")));
            }
            if demo.sex.values().map(|r| r.proportion).sum::<f64>() <= 0.0 {
                return Err(HvError::Config(format!("race {race}: sex proportions sum to zero")));
            }
            for (sex, row) in &demo.sex {
                validate_row(&format!("{race}.{sex}"), row)?;
                for partner in &row.eligible_partner_types {
                    if !demo.sex.contains_key(partner) {
                        log::debug!("{race}.{sex}: eligible partner type {partner} has no row");
                    }
                }
                if !self.transmission.sex.contains_key(sex) {
                    return Err(HvError::Config(format!("no sexual transmission table for {sex}")));
                }
            }
            validate_row(&format!("{race}.IDU"), &demo.idu)?;
            if !self.mortality.contains_key(race) {
                return Err(HvError::Config(format!("no mortality rates for race {race}")));
            }
        }

        for (sex, table) in &self.transmission.sex {
            for p in table.0 {
                prob(&format!("transmission.sex.{sex}"), p)?;
            }
        }
        for p in self.transmission.needle.0 {
            prob("transmission.needle", p)?;
        }

        if self.age_bins.len() != 5 {
            return Err(HvError::Config(format!(
                "expected 5 age bins, got {}",
                self.age_bins.len()
            )));
        }
        for (i, bin) in self.age_bins.iter().enumerate() {
            non_negative(&format!("age_bins[{i}].prob"), bin.prob)?;
            if bin.min_age > bin.max_age {
                return Err(HvError::Config(format!("age_bins[{i}]: min_age > max_age")));
            }
        }

        let c = &self.calibration;
        for (name, v) in [
            ("needle_part_scaling", c.needle_part_scaling),
            ("needle_act_scaling", c.needle_act_scaling),
            ("sexual_part_scaling", c.sexual_part_scaling),
            ("sex_act_scaling", c.sex_act_scaling),
            ("p_xmission_scaling", c.p_xmission_scaling),
            ("acute_scaling", c.acute_scaling),
            ("rr_haart", c.rr_haart),
            ("test_freq", c.test_freq),
            ("mortality", c.mortality),
            ("prog_aids", c.prog_aids),
            ("art_cov", c.art_cov),
            ("incar_p", c.incar_p),
            ("race_xmission", c.race_xmission),
        ] {
            non_negative(&format!("calibration.{name}"), v)?;
        }
        prob("calibration.rr_dx", c.rr_dx)?;
        if c.ptnr_sample_depth == 0 {
            return Err(HvError::Config("calibration.ptnr_sample_depth must be ≥ 1".into()));
        }

        let b = &self.behavior;
        non_negative("behavior.partner_turnover", b.partner_turnover)?;
        non_negative("behavior.mean_needle_acts", b.mean_needle_acts)?;
        prob("behavior.safe_needle_exchange_prev", b.safe_needle_exchange_prev)?;
        prob("behavior.sne_unsafe_share", b.sne_unsafe_share)?;
        for p in b.condom_bins {
            prob("behavior.condom_bins", p)?;
        }

        let p = &self.prep;
        for (name, v) in [
            ("target", p.target),
            ("adherence", p.adherence),
            ("adh_efficacy", p.adh_efficacy),
            ("nonadh_efficacy", p.nonadh_efficacy),
            ("resist", p.resist),
        ] {
            prob(&format!("prep.{name}"), v)?;
        }
        non_negative("prep.peak_load", p.peak_load)?;
        if p.prep_type == PrepType::Inj && p.halflife <= 0.0 {
            return Err(HvError::Config("prep.halflife must be positive for injectable PrEP".into()));
        }
        for bins in p.clinic_bins.values() {
            for bin in bins {
                prob("prep.clinic_bins.prob", bin.prob)?;
                if bin.min > bin.max {
                    return Err(HvError::Config("prep.clinic_bins: min > max".into()));
                }
            }
        }

        let i = &self.incar;
        if i.jail_min > i.jail_max || i.jail_min == 0 {
            return Err(HvError::Config("incar: need 1 ≤ jail_min ≤ jail_max".into()));
        }
        if i.prison_min > i.prison_max || i.prison_min == 0 {
            return Err(HvError::Config("incar: need 1 ≤ prison_min ≤ prison_max".into()));
        }
        for (name, v) in [
            ("jail_prob", i.jail_prob),
            ("jail_test_prob", i.jail_test_prob),
            ("prison_test_prob", i.prison_test_prob),
            ("art_enroll", i.art_enroll),
            ("art_adh", i.art_adh),
            ("art_disc", i.art_disc),
            ("ptnr_dissolution", i.ptnr_dissolution),
        ] {
            prob(&format!("incar.{name}"), v)?;
        }

        non_negative("high_risk.partner_scale", self.high_risk.partner_scale)?;
        prob("high_risk.proportion", self.high_risk.proportion)?;

        prob("assort.coeff", self.assort.coeff)?;
        for row in &self.assort.age_matrix {
            for v in row {
                non_negative("assort.age_matrix", *v)?;
            }
        }

        validate_bins("partnership.duration_bins", &self.partnership.duration_bins)?;
        if self.partnership.duration_bins.iter().any(|b| b.min == 0) {
            return Err(HvError::Config("partnership.duration_bins must start at ≥ 1 month".into()));
        }
        if !self.partnership.frequency_bins.is_empty() {
            validate_bins("partnership.frequency_bins", &self.partnership.frequency_bins)?;
        }

        for (race, m) in &self.mortality {
            for v in [m.hiv_neg, m.hiv_untreated, m.hiv_haart, m.aids] {
                non_negative(&format!("mortality.{race}"), v)?;
            }
        }
        prob("treatment.treatment_cov", self.treatment.treatment_cov)?;

        Ok(())
    }
}

fn validate_row(name: &str, row: &DemographicRow) -> HvResult<()> {
    non_negative(&format!("{name}.proportion"), row.proportion)?;
    for (field, v) in [
        ("hiv_prev", row.hiv_prev),
        ("aids_prev", row.aids_prev),
        ("tested_prev", row.tested_prev),
        ("haart_prev", row.haart_prev),
        ("incar_prev", row.incar_prev),
        ("unsafe_sex", row.unsafe_sex),
        ("needle_share", row.needle_share),
        ("test_freq", row.test_freq),
        ("incar_rate", row.incar_rate),
        ("haart_adh", row.haart_adh),
        ("haart_disc", row.haart_disc),
        ("prep_disc", row.prep_disc),
    ] {
        prob(&format!("{name}.{field}"), v)?;
    }
    non_negative(&format!("{name}.mean_partners"), row.mean_partners)?;
    non_negative(&format!("{name}.num_sex_acts"), row.num_sex_acts)?;
    Ok(())
}

fn validate_bins(name: &str, bins: &[Bin]) -> HvResult<()> {
    if bins.is_empty() {
        return Err(HvError::Config(format!("{name} is empty")));
    }
    for bin in bins {
        non_negative(name, bin.weight)?;
        if bin.min > bin.max {
            return Err(HvError::Config(format!("{name}: bin min {} > max {}", bin.min, bin.max)));
        }
    }
    if bins.iter().map(|b| b.weight).sum::<f64>() <= 0.0 {
        return Err(HvError::Config(format!("{name}: weights sum to zero")));
    }
    Ok(())
}

fn prob(name: &str, v: f64) -> HvResult<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(HvError::Config(format!("{name} = {v} is not a probability")))
    }
}

fn non_negative(name: &str, v: f64) -> HvResult<()> {
    if v >= 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(HvError::Config(format!("{name} = {v} must be a finite non-negative number")))
    }
}

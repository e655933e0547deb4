//! The agent record.
//!
//! Demographics are write-once and only readable through accessors.  The
//! flags that are mirrored by a population set (`hiv`, `aids`, `tested`,
//! `haart`, `prep`, `incar`, `hr`) and the partner lists are likewise
//! private: change them through [`Population`](crate::Population) so set
//! membership and partner symmetry stay consistent.  Everything else is a
//! plain `pub` field.

use hv_core::{AgentId, DrugType, Race, RelId, SexRole, SexType};

/// Write-once demographic attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Demographics {
    pub sex_type:  SexType,
    pub drug_type: DrugType,
    pub race:      Race,
    /// Age in years.
    pub age:       u32,
    /// Age bin, 1..=5.
    pub age_bin:   u8,
}

#[derive(Clone, Debug)]
pub struct Agent {
    id:         AgentId,
    /// Incremented each time this id is reused for a replacement agent.
    generation: u32,
    demo:       Demographics,

    // ── Set-indexed flags (mutate through Population) ─────────────────────
    pub(crate) hiv:    bool,
    pub(crate) aids:   bool,
    pub(crate) tested: bool,
    pub(crate) haart:  bool,
    pub(crate) prep:   bool,
    pub(crate) incar:  bool,
    pub(crate) hr:     bool,

    pub(crate) partners:      Vec<AgentId>,
    pub(crate) relationships: Vec<RelId>,

    // ── Health ────────────────────────────────────────────────────────────
    /// Months since infection.  1 on the step of infection.
    pub hiv_time:  u32,
    /// HAART adherence, 0..=5.  0 while off HAART.
    pub haart_adh: u8,

    // ── PrEP ──────────────────────────────────────────────────────────────
    /// Remaining fallout months.
    pub prep_time:      u32,
    /// 1 if adherent.
    pub prep_adh:       u8,
    pub prep_load:      f64,
    /// Months since the last injectable dose; −1 marks a dose due this step.
    pub prep_last_dose: i32,
    pub prep_resist:    bool,
    /// Assigned to the treatment arm of a component-level trial.
    pub trial_treated:  bool,

    pub sne: bool,

    // ── Behavior ──────────────────────────────────────────────────────────
    pub mean_num_partners: f64,
    pub role:              SexRole,

    // ── Incarceration ─────────────────────────────────────────────────────
    /// Remaining months while incarcerated.
    pub incar_time:           u32,
    pub ever_incar:           bool,
    /// Remaining months of post-release treatment.
    pub incar_treatment_time: u32,

    // ── High-risk window ──────────────────────────────────────────────────
    pub hr_time: u32,
    pub ever_hr: bool,
    /// Amount added to `mean_num_partners` on entering the window.
    pub hr_bump: f64,
}

impl Agent {
    /// A fresh HIV-negative, untreated, unpartnered agent.
    pub fn new(id: AgentId, demo: Demographics) -> Self {
        Self {
            id,
            generation: 0,
            demo,
            hiv:    false,
            aids:   false,
            tested: false,
            haart:  false,
            prep:   false,
            incar:  false,
            hr:     false,
            partners:      Vec::new(),
            relationships: Vec::new(),
            hiv_time:  0,
            haart_adh: 0,
            prep_time:      0,
            prep_adh:       0,
            prep_load:      0.0,
            prep_last_dose: 0,
            prep_resist:    false,
            trial_treated:  false,
            sne: false,
            mean_num_partners: 0.0,
            role:              SexRole::Versatile,
            incar_time:           0,
            ever_incar:           false,
            incar_treatment_time: 0,
            hr_time: 0,
            ever_hr: false,
            hr_bump: 0.0,
        }
    }

    pub(crate) fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    // ── Identity / demographics ───────────────────────────────────────────

    #[inline] pub fn id(&self) -> AgentId { self.id }
    #[inline] pub fn generation(&self) -> u32 { self.generation }
    #[inline] pub fn demographics(&self) -> Demographics { self.demo }
    #[inline] pub fn sex_type(&self) -> SexType { self.demo.sex_type }
    #[inline] pub fn drug_type(&self) -> DrugType { self.demo.drug_type }
    #[inline] pub fn race(&self) -> Race { self.demo.race }
    #[inline] pub fn age(&self) -> u32 { self.demo.age }
    #[inline] pub fn age_bin(&self) -> u8 { self.demo.age_bin }

    #[inline]
    pub fn is_idu(&self) -> bool {
        self.demo.drug_type == DrugType::Idu
    }

    // ── Flags ─────────────────────────────────────────────────────────────

    #[inline] pub fn hiv(&self) -> bool { self.hiv }
    #[inline] pub fn aids(&self) -> bool { self.aids }
    #[inline] pub fn tested(&self) -> bool { self.tested }
    #[inline] pub fn haart(&self) -> bool { self.haart }
    #[inline] pub fn prep(&self) -> bool { self.prep }
    #[inline] pub fn incar(&self) -> bool { self.incar }
    #[inline] pub fn hr(&self) -> bool { self.hr }

    /// Acute infection: within the first three months.
    #[inline]
    pub fn acute(&self) -> bool {
        self.hiv && (1..=3).contains(&self.hiv_time)
    }

    // ── Partners ──────────────────────────────────────────────────────────

    #[inline]
    pub fn partners(&self) -> &[AgentId] {
        &self.partners
    }

    #[inline]
    pub fn relationships(&self) -> &[RelId] {
        &self.relationships
    }

    #[inline]
    pub fn has_partner(&self, other: AgentId) -> bool {
        self.partners.contains(&other)
    }
}

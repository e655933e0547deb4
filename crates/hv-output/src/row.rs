//! Plain data row types written by output backends.

use hv_sim::StepSummary;

/// Headline counts for one step of one replicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummaryRow {
    pub replicate: usize,
    pub summary:   StepSummary,
}

impl StepSummaryRow {
    pub const HEADER: [&'static str; 19] = [
        "replicate",
        "t",
        "n_pop",
        "hiv",
        "aids",
        "tested",
        "haart",
        "prep",
        "incar",
        "high_risk",
        "new_infections",
        "new_diagnosis",
        "new_hr_rolls",
        "new_incar_release",
        "deaths",
        "relationships",
        "formed",
        "dissolved",
        "prevalence",
    ];

    pub fn record(&self) -> Vec<String> {
        let s = &self.summary;
        let prevalence = if s.n_pop == 0 { 0.0 } else { s.hiv as f64 / s.n_pop as f64 };
        vec![
            self.replicate.to_string(),
            s.t.0.to_string(),
            s.n_pop.to_string(),
            s.hiv.to_string(),
            s.aids.to_string(),
            s.tested.to_string(),
            s.haart.to_string(),
            s.prep.to_string(),
            s.incar.to_string(),
            s.high_risk.to_string(),
            s.new_infections.to_string(),
            s.new_diagnosis.to_string(),
            s.new_hr_rolls.to_string(),
            s.new_incar_release.to_string(),
            s.deaths.to_string(),
            s.relationships.to_string(),
            s.formed.to_string(),
            s.dissolved.to_string(),
            format!("{prevalence:.6}"),
        ]
    }
}

/// One undirected relationship edge; `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRow {
    pub replicate: usize,
    pub t:         u32,
    pub a:         u32,
    pub b:         u32,
}

/// Component membership of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRow {
    pub replicate: usize,
    pub t:         u32,
    pub component: usize,
    pub agent:     u32,
    /// Size of the agent's component.
    pub size:      usize,
}

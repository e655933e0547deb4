//! One-shot syringe-exchange enrollment.

use hv_agent::{Population, SetKey};
use hv_core::{DrugType, Params, SimRng};

use crate::CareResult;

/// Flag each IDU agent `sne` with probability `treatment.treatment_cov`.
/// Returns the number enrolled.
pub fn enroll_sne(params: &Params, pop: &mut Population, rng: &mut SimRng) -> CareResult<usize> {
    let idu: Vec<_> = match pop.all().subset_by_key(SetKey::Drug(DrugType::Idu)) {
        Some(set) => set.snapshot(),
        None => pop.iter().filter(|a| a.is_idu()).map(|a| a.id()).collect(),
    };
    let mut enrolled = 0;
    for id in idu {
        if rng.gen_bool(params.treatment.treatment_cov) {
            pop.agent_mut(id)?.sne = true;
            enrolled += 1;
        }
    }
    log::info!("syringe exchange: enrolled {enrolled} IDU agents");
    Ok(enrolled)
}

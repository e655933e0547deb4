//! Independent replicates.
//!
//! Replicate `r` offsets each of the three base seeds by `r`, so replicate 0
//! reproduces a single run with the base seeds.  Replicates share nothing;
//! a failure in one is returned for that replicate only.  With the
//! `parallel` feature the replicates run on Rayon's thread pool.

use hv_core::{Params, Seeds};

use crate::{SimBuilder, SimObserver, SimResult};

/// Seeds for replicate `r`.
pub fn replicate_seeds(base: &Seeds, r: usize) -> Seeds {
    let r = r as u64;
    Seeds {
        run_seed: base.run_seed.wrapping_add(r),
        pop_seed: base.pop_seed.wrapping_add(r),
        net_seed: base.net_seed.wrapping_add(r),
    }
}

fn run_one<O, F>(params: &Params, r: usize, make_observer: &F) -> SimResult<O>
where
    O: SimObserver,
    F: Fn(usize) -> O,
{
    let mut observer = make_observer(r);
    let mut sim = SimBuilder::new(params.clone())
        .seeds(replicate_seeds(&params.seeds, r))
        .build()?;
    sim.run(&mut observer)?;
    Ok(observer)
}

/// Run `n` replicates of `params`, each with its own observer.  Results
/// come back in replicate order.
#[cfg(not(feature = "parallel"))]
pub fn run_replicates<O, F>(params: &Params, n: usize, make_observer: F) -> Vec<SimResult<O>>
where
    O: SimObserver + Send,
    F: Fn(usize) -> O + Sync,
{
    (0..n)
        .map(|r| {
            let result = run_one(params, r, &make_observer);
            if let Err(e) = &result {
                log::warn!("replicate {r} failed: {e}");
            }
            result
        })
        .collect()
}

/// Run `n` replicates of `params`, each with its own observer.  Results
/// come back in replicate order.
#[cfg(feature = "parallel")]
pub fn run_replicates<O, F>(params: &Params, n: usize, make_observer: F) -> Vec<SimResult<O>>
where
    O: SimObserver + Send,
    F: Fn(usize) -> O + Sync,
{
    use rayon::prelude::*;

    (0..n)
        .into_par_iter()
        .map(|r| {
            let result = run_one(params, r, &make_observer);
            if let Err(e) = &result {
                log::warn!("replicate {r} failed: {e}");
            }
            result
        })
        .collect()
}

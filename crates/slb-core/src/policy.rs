use crate::{ClassifiedSnapshot, Selection, SelectionReason};

/// The two candidate tiers, before any decision is made.
#[derive(Clone, Debug, Default)]
pub struct Tiers {
    pub past_cutoff: Vec<ClassifiedSnapshot>,
    /// Newer than cutoff but still locked and leased.
    pub locked_newer: Vec<ClassifiedSnapshot>,
}

pub fn partition(classified: &[ClassifiedSnapshot]) -> Tiers {
    let mut tiers = Tiers::default();
    for c in classified {
        if c.past_cutoff {
            tiers.past_cutoff.push(c.clone());
        } else if c.lease.is_locked_and_leased() {
            tiers.locked_newer.push(c.clone());
        }
    }
    tiers
}

/// Decide which snapshots to break.
///
/// Past-cutoff snapshots always win and `confirm` is not consulted. Only when
/// none are past cutoff is the locked-newer tier offered, through a single call
/// to `confirm` with the candidates.
pub fn select<F>(classified: &[ClassifiedSnapshot], confirm: F) -> Selection
where
    F: FnOnce(&[ClassifiedSnapshot]) -> bool,
{
    let tiers = partition(classified);

    if !tiers.past_cutoff.is_empty() {
        return Selection { to_break: tiers.past_cutoff, reason: SelectionReason::CutoffEligible };
    }

    if tiers.locked_newer.is_empty() {
        return Selection::empty();
    }

    if confirm(&tiers.locked_newer) {
        Selection { to_break: tiers.locked_newer, reason: SelectionReason::UserConfirmedFallback }
    } else {
        Selection::empty()
    }
}

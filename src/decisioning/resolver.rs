use super::domain::{Component, Decision};

/// Folded verdict for one component on one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub decision: Decision,
    pub terminal: bool,
}

/// Fold a component's ordered results (list first, rules second) into one
/// decision. Each non-undecided value overwrites the running decision, so a
/// resolved rule result wins over a resolved list result.
///
/// Termination is a production-only concern: it requires a declared
/// secondary decision, a running decision equal to the component's primary,
/// and a non-undecided primary. The shadow track never terminates.
pub(crate) fn resolve_track(
    component: &Component,
    decisions: &[Decision],
    production: bool,
) -> Resolution {
    let mut running = Decision::Undecided;
    for decision in decisions {
        if !decision.is_undecided() {
            running = *decision;
        }
    }

    let terminal = production
        && component.secondary().is_some()
        && running == component.primary()
        && !running.is_undecided();

    Resolution {
        decision: running,
        terminal,
    }
}

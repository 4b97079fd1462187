use super::*;
use crate::test_fixtures::{base_content, base_state, make_rng};
use rand_chacha::ChaCha8Rng;


// --- Shared test helpers ------------------------------------------------

fn test_session() -> FarmSession<ChaCha8Rng> {
    let content = base_content();
    let state = base_state(&content);
    FarmSession::new(content, state, make_rng())
}

fn plant(plot: usize, crop: &str) -> Intent {
    Intent::PlaceCrop {
        plot_id: plot_id_for_index(plot),
        crop_id: crop.into(),
    }
}

fn harvest(plot: usize) -> Intent {
    Intent::HarvestPlot {
        plot_id: plot_id_for_index(plot),
    }
}

fn give(session: &mut FarmSession<ChaCha8Rng>, kind: ResourceKind, amount: f64) {
    session.apply(|prev| {
        let mut next = prev.clone();
        *next.resources.get_mut(kind) += amount;
        next
    });
}

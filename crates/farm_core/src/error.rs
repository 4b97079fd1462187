use thiserror::Error;

use crate::TechId;

/// A player intent that was understood but could not be carried out.
/// The snapshot is never modified when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("not enough resources")]
    InsufficientResources,
    #[error("plot is already occupied")]
    PlotOccupied,
    #[error("crop is not ready to harvest")]
    NotReady,
    #[error("plot does not hold a crop")]
    NotACrop,
    #[error("requires tech {required_tech}")]
    Locked { required_tech: TechId },
    #[error("tech already purchased")]
    AlreadyPurchased,
    #[error("missing prerequisites: {}", format_ids(.missing))]
    PrerequisitesMissing { missing: Vec<TechId> },
}

fn format_ids(ids: &[TechId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

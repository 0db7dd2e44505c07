//! The six end-to-end scenarios of §8.3, grounded on
//! `godview_sim::scenarios::ScenarioId`'s enum-with-metadata pattern
//! (`name`, `description`, `all`, `Display`, `FromStr`) — narrowed from
//! 22 chaos-engineering DST variants down to the six single-sensor
//! pipeline behaviours below.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// S1 — a fixed background return converges to a locked cell.
    StaticConvergence,
    /// S2 — a single constant-velocity car pass confirms and tracks cleanly.
    ConstantVelocityPass,
    /// S3 — a near-square frame triggers the PCA axis-swap guard.
    PcaAxisSwap,
    /// S4 — a confirmed track coasts through a bounded occlusion.
    BriefOcclusion,
    /// S5 — two competing clusters resolve via Hungarian assignment.
    CompetingClusters,
    /// S6 — a background cell freezes on divergence, then reacquires.
    FreezeAndReacquire,
}

impl ScenarioId {
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::StaticConvergence,
            ScenarioId::ConstantVelocityPass,
            ScenarioId::PcaAxisSwap,
            ScenarioId::BriefOcclusion,
            ScenarioId::CompetingClusters,
            ScenarioId::FreezeAndReacquire,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::StaticConvergence => "static_convergence",
            ScenarioId::ConstantVelocityPass => "constant_velocity_pass",
            ScenarioId::PcaAxisSwap => "pca_axis_swap",
            ScenarioId::BriefOcclusion => "brief_occlusion",
            ScenarioId::CompetingClusters => "competing_clusters",
            ScenarioId::FreezeAndReacquire => "freeze_and_reacquire",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::StaticConvergence => {
                "200 identical frames at one fixed return; the cell locks and the point reads background"
            }
            ScenarioId::ConstantVelocityPass => {
                "a 4x2m cluster moving at 10 m/s confirms by frame 5 and tracks within tolerance"
            }
            ScenarioId::PcaAxisSwap => "a near-square frame mid-pass must not swap the smoothed heading by 90 degrees",
            ScenarioId::BriefOcclusion => "a confirmed track survives MaxMissesConfirmed-1 misses then reacquires",
            ScenarioId::CompetingClusters => "two clusters within gate of one track resolve via Hungarian assignment",
            ScenarioId::FreezeAndReacquire => "a cell freezes on a large divergence, then relearns after sustained pressure",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::all()
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}

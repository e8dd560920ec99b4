//! Main-mode classification for intermodal trips.
use crate::network::modes;
use crate::population::Leg;
use crate::scenario::{DRT_TELEPORTATION_SUFFIX, ROUTING_MODE_PT_WITH_DRT};
use indexmap::IndexSet;

/// Identifies the main mode of a trip whose legs may span DRT and transit.
///
/// The host transit router and the DRT extension each bring their own identifier, and neither
/// understands the other's legs; this one replaces both so that trips combining DRT with pt
/// are classified as the intermodal routing mode rather than as one of their parts.
pub struct IntermodalMainModeIdentifier {
    drt_modes: IndexSet<String>,
    pt_modes: IndexSet<String>,
}

impl IntermodalMainModeIdentifier {
    /// Create an identifier for the given DRT and pt mode sets.
    pub fn new<D, P>(drt_modes: D, pt_modes: P) -> IntermodalMainModeIdentifier
    where
        D: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        IntermodalMainModeIdentifier {
            drt_modes: drt_modes.into_iter().collect(),
            pt_modes: pt_modes.into_iter().collect(),
        }
    }

    /// The main mode of a trip.
    ///
    /// DRT combined with pt classifies as the intermodal routing mode; otherwise pt wins over
    /// DRT, DRT over everything else, and a trip without pt or DRT is classified by its first
    /// non-walk leg (walking counts as access/egress, not as the trip's purpose).
    pub fn identify_main_mode(&self, legs: &[&Leg]) -> String {
        let has_drt = legs.iter().any(|leg| self.is_drt_family(&leg.mode));
        let has_pt = legs
            .iter()
            .any(|leg| self.pt_modes.contains(leg.mode.as_str()));

        if has_drt && has_pt {
            return ROUTING_MODE_PT_WITH_DRT.to_string();
        }
        if has_pt {
            return modes::PT.to_string();
        }
        if has_drt {
            let drt_leg = legs
                .iter()
                .find(|leg| self.is_drt_family(&leg.mode))
                .unwrap();
            return self.base_drt_mode(&drt_leg.mode).to_string();
        }

        legs.iter()
            .map(|leg| leg.mode.as_str())
            .find(|mode| *mode != modes::WALK)
            .unwrap_or(modes::WALK)
            .to_string()
    }

    /// Whether the mode is a DRT mode or the teleported variant of one.
    fn is_drt_family(&self, mode: &str) -> bool {
        self.drt_modes.contains(mode) || self.base_drt_mode(mode) != mode
    }

    /// Strip the teleportation suffix if the remainder is a configured DRT mode.
    fn base_drt_mode<'a>(&self, mode: &'a str) -> &'a str {
        mode.strip_suffix(DRT_TELEPORTATION_SUFFIX)
            .filter(|base| self.drt_modes.contains(*base))
            .unwrap_or(mode)
    }
}

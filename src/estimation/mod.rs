pub mod boundaries;
pub mod energy;
pub mod normalize;

pub use boundaries::{boundaries_to_durations, detect_phone_boundaries, merge_closest_boundaries};
pub use energy::{estimate_energy_refined, refine_durations, segment_energies};
pub use normalize::{enforce_total, rescale_to_total, uniform_split};

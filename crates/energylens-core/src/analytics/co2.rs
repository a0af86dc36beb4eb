//! Energy to CO2 conversion

/// Fixed emission factor applied per joule
pub const CO2_PER_JOULE: f64 = 0.233;

/// Estimated emission for `energy_j` joules; unrounded
pub fn co2(energy_j: f64) -> f64 {
    energy_j * CO2_PER_JOULE
}

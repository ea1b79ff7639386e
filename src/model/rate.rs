//! Price → arrival-rate response.

/// Arrival rate at a given price: `lambda0 · exp(-beta · price)`.
///
/// Strictly decreasing in price for `beta > 0`, constant for `beta = 0`.
pub fn arrival_rate(lambda0: f64, beta: f64, price: f64) -> f64 {
    lambda0 * (-beta * price).exp()
}

/// Number of evenly spaced x positions between `min` and `max` for a bin width of `step`.
///
/// The span is rounded to one decimal first so accumulated float error in
/// tenth-scored columns cannot add or drop a bin.
pub fn bin_count(min: f64, max: f64, step: f64) -> usize {
    let span = ((max - min) * 10.0).round() / 10.0;
    (span / step + 0.5).floor() as usize + 1
}

/// Evenly spaced axis values from `min` to `max` inclusive.
pub fn x_domain(min: f64, max: f64, step: f64) -> Vec<f64> {
    let n = bin_count(min, max, step);
    if n == 1 {
        return vec![min];
    }

    let spacing = (max - min) / (n - 1) as f64;
    let mut domain: Vec<f64> = (0..n).map(|i| min + i as f64 * spacing).collect();
    // Pin the endpoint exactly
    domain[n - 1] = max;
    domain
}

/// Slot of `x` in a domain produced by [`x_domain`], if it lies on the grid.
pub fn grid_index(domain: &[f64], x: f64) -> Option<usize> {
    let first = *domain.first()?;
    if domain.len() == 1 {
        return ((x - first).abs() <= 1e-9 * first.abs().max(1.0)).then_some(0);
    }

    let spacing = (domain[domain.len() - 1] - first) / (domain.len() - 1) as f64;
    let pos = (x - first) / spacing;
    let idx = pos.round();
    if idx < 0.0 || idx as usize >= domain.len() || (pos - idx).abs() > 1e-6 {
        return None;
    }
    Some(idx as usize)
}

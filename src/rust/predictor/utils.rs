pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

/// True when `p` is a usable probability.
pub(crate) fn is_probability(p: f32) -> bool {
    p.is_finite() && (0.0..=1.0).contains(&p)
}

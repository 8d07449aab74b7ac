/// Peak normalization: divide by `max(|x|)`, leaving an all-zero series untouched.
///
/// Applied to energy, centroid and onset only. Chroma and MFCC stay in their
/// natural units; the wire format depends on that split.
pub fn peak_normalize(series: &mut [f32]) {
    let peak = series.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    if peak == 0.0 {
        return;
    }
    for x in series.iter_mut() {
        *x /= peak;
    }
}

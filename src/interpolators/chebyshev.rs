//! Compressed Chebyshev ephemeris interpolation.

use nalgebra::Vector3;

use crate::frames::Frame;
use crate::interpolators::StateInterpolator;
use crate::states::StateVector;
use crate::time::Epoch;

/// One Chebyshev segment: position coefficients per axis over
/// `[start, end]`, with the derivative coefficients precomputed.
#[derive(Clone, Debug)]
pub struct ChebyshevSegment {
    /// Segment start.
    pub start: Epoch,
    /// Segment end (inclusive).
    pub end: Epoch,
    /// Position series per axis.
    pub coefficients: [Vec<f64>; 3],
    /// Velocity series per axis (derivative of the above, already scaled
    /// to seconds).
    velocity_coefficients: [Vec<f64>; 3],
}

impl ChebyshevSegment {
    /// Build a segment from position coefficients; derivative series are
    /// computed here by the standard recurrence.
    #[must_use]
    pub fn new(start: Epoch, end: Epoch, coefficients: [Vec<f64>; 3]) -> Self {
        let span = end.difference(&start);
        let scale = 2.0 / span;
        let velocity_coefficients = [
            derivative_coefficients(&coefficients[0], scale),
            derivative_coefficients(&coefficients[1], scale),
            derivative_coefficients(&coefficients[2], scale),
        ];
        Self { start, end, coefficients, velocity_coefficients }
    }

    /// Normalized time `τ ∈ [−1, 1]` for an epoch in the segment.
    fn normalized(&self, epoch: &Epoch) -> f64 {
        let span = self.end.difference(&self.start);
        2.0 * epoch.difference(&self.start) / span - 1.0
    }

    fn evaluate(&self, epoch: &Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let tau = self.normalized(epoch);
        let position = Vector3::new(
            clenshaw(&self.coefficients[0], tau),
            clenshaw(&self.coefficients[1], tau),
            clenshaw(&self.coefficients[2], tau),
        );
        let velocity = Vector3::new(
            clenshaw(&self.velocity_coefficients[0], tau),
            clenshaw(&self.velocity_coefficients[1], tau),
            clenshaw(&self.velocity_coefficients[2], tau),
        );
        (position, velocity)
    }
}

/// Derivative coefficients of a Chebyshev series by the descending
/// recurrence `c_{k−1} = c_{k+1} + 2k·a_k`, scaled from normalized time
/// to seconds.
fn derivative_coefficients(a: &[f64], scale: f64) -> Vec<f64> {
    let n = a.len();
    if n < 2 {
        return vec![0.0];
    }
    // Two zero guard slots above the top let the recurrence run uniformly
    // from k = n−1 down to 1.
    let mut c = vec![0.0; n + 1];
    for k in (1..n).rev() {
        c[k - 1] = c[k + 1] + 2.0 * k as f64 * a[k];
    }
    // T0 carries half weight in the full-weight storage convention.
    c[0] /= 2.0;
    c.truncate(n - 1);
    for value in &mut c {
        *value *= scale;
    }
    c
}

/// Clenshaw evaluation of a Chebyshev series at `τ ∈ [−1, 1]`.
fn clenshaw(coefficients: &[f64], tau: f64) -> f64 {
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for &a in coefficients.iter().skip(1).rev() {
        let b0 = 2.0 * tau * b1 - b2 + a;
        b2 = b1;
        b1 = b0;
    }
    tau * b1 - b2 + coefficients[0]
}

/// Interpolator over a sequence of Chebyshev segments.
///
/// Segment spans are treated as closed intervals; a query landing exactly
/// on a shared boundary resolves to the earlier segment, whose endpoint
/// value it is. Queries past the final segment's end return `None`.
#[derive(Clone, Debug)]
pub struct ChebyshevInterpolator {
    segments: Vec<ChebyshevSegment>,
    frame: Frame,
}

impl ChebyshevInterpolator {
    /// Wrap epoch-sorted, contiguous segments.
    ///
    /// # Panics
    ///
    /// Panics when `segments` is empty.
    #[must_use]
    pub fn new(segments: Vec<ChebyshevSegment>, frame: Frame) -> Self {
        assert!(!segments.is_empty(), "at least one segment required");
        Self { segments, frame }
    }

    /// Compress another interpolator into Chebyshev segments.
    ///
    /// Samples the source at the Chebyshev nodes of each segment and
    /// projects onto the first `order` polynomials. Typical LEO
    /// ephemerides compress well at `order` 16 over segments of a few
    /// hundred seconds.
    #[must_use]
    pub fn compress(
        source: &dyn StateInterpolator,
        frame: Frame,
        segment_seconds: f64,
        order: usize,
    ) -> Self {
        let (start, end) = source.window();
        let total = end.difference(&start);
        let count = (total / segment_seconds).ceil().max(1.0) as usize;
        let span = total / count as f64;
        let nodes = order.max(2);

        let mut segments = Vec::with_capacity(count);
        for i in 0..count {
            let seg_start = start.roll(i as f64 * span);
            let seg_end = start.roll((i as f64 + 1.0) * span);
            // Sample positions at the Chebyshev nodes of the segment.
            let mut sampled: Vec<Vector3<f64>> = Vec::with_capacity(nodes);
            for k in 0..nodes {
                let theta = std::f64::consts::PI * (k as f64 + 0.5) / nodes as f64;
                let tau = theta.cos();
                let offset = (tau + 1.0) / 2.0 * span;
                let epoch = seg_start.roll(offset);
                let state = source
                    .interpolate(&epoch)
                    .expect("compression samples lie inside the source window");
                sampled.push(state.position);
            }
            // Discrete Chebyshev transform per axis.
            let mut coefficients: [Vec<f64>; 3] =
                [vec![0.0; nodes], vec![0.0; nodes], vec![0.0; nodes]];
            for (axis, series) in coefficients.iter_mut().enumerate() {
                for (j, value) in series.iter_mut().enumerate() {
                    let mut sum = 0.0;
                    for (k, point) in sampled.iter().enumerate() {
                        let theta = std::f64::consts::PI * (k as f64 + 0.5) / nodes as f64;
                        sum += point[axis] * (j as f64 * theta).cos();
                    }
                    *value = 2.0 * sum / nodes as f64;
                }
                series[0] /= 2.0;
            }
            segments.push(ChebyshevSegment::new(seg_start, seg_end, coefficients));
        }
        Self { segments, frame }
    }
}

impl StateInterpolator for ChebyshevInterpolator {
    fn window(&self) -> (Epoch, Epoch) {
        (
            self.segments[0].start,
            self.segments[self.segments.len() - 1].end,
        )
    }

    fn interpolate(&self, epoch: &Epoch) -> Option<StateVector> {
        if !self.in_window(epoch) {
            return None;
        }
        // Closed-interval lookup: first segment whose end bounds the
        // query. An exact final-end query selects the last segment rather
        // than running off the table.
        let segment = self
            .segments
            .iter()
            .find(|s| *epoch <= s.end)
            .unwrap_or(&self.segments[self.segments.len() - 1]);
        let (position, velocity) = segment.evaluate(epoch);
        Some(StateVector::new(*epoch, position, velocity, self.frame))
    }

    fn size_bytes(&self) -> usize {
        self.segments
            .iter()
            .map(|s| {
                std::mem::size_of::<ChebyshevSegment>()
                    + s.coefficients.iter().map(|c| c.len() * 8).sum::<usize>()
                    + s.velocity_coefficients.iter().map(|c| c.len() * 8).sum::<usize>()
            })
            .sum()
    }
}

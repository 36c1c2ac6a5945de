use crate::color::Color;
use crate::error::{LottieError, Result};
use crate::interpolate::{lerp, Interpolatable};

/// Gradient stops with a stop count fixed at construction.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct GradientColor {
    positions: Vec<f32>,
    colors: Vec<Color>,
}

impl GradientColor {
    /// Pairs `positions` with `colors`, truncating to the shorter list.
    pub fn new(mut positions: Vec<f32>, mut colors: Vec<Color>) -> Self {
        let n = positions.len().min(colors.len());
        positions.truncate(n);
        colors.truncate(n);
        GradientColor { positions, colors }
    }

    /// Imports Lottie's flat stop array.
    ///
    /// `raw` holds `color_points` colour stops as `[offset, r, g, b]`,
    /// optionally followed by alpha stops as `[offset, a]`. Alpha stops are
    /// sampled at each colour stop offset so the stop count stays at
    /// `color_points`.
    pub fn from_lottie(raw: &[f32], color_points: usize) -> Self {
        let color_len = (color_points * 4).min(raw.len() - raw.len() % 4);
        let (color_part, alpha_part) = raw.split_at(color_len);

        let alpha_stops: Vec<(f32, f32)> = alpha_part
            .chunks_exact(2)
            .map(|chunk| (chunk[0], chunk[1]))
            .collect();

        let mut positions = Vec::with_capacity(color_points);
        let mut colors = Vec::with_capacity(color_points);
        for chunk in color_part.chunks_exact(4) {
            let offset = chunk[0];
            let alpha = sample_alpha(&alpha_stops, offset).unwrap_or(1.0);
            positions.push(offset);
            colors.push(Color::from_floats(&[chunk[1], chunk[2], chunk[3], alpha]));
        }

        GradientColor { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Iterates `(offset, colour)` pairs.
    pub fn stops(&self) -> impl Iterator<Item = (f32, Color)> + '_ {
        self.positions.iter().copied().zip(self.colors.iter().copied())
    }
}

fn sample_alpha(stops: &[(f32, f32)], offset: f32) -> Option<f32> {
    let first = stops.first()?;
    if offset <= first.0 {
        return Some(first.1);
    }
    for pair in stops.windows(2) {
        let (p0, a0) = pair[0];
        let (p1, a1) = pair[1];
        if offset <= p1 {
            let span = p1 - p0;
            if span <= 0.0 {
                return Some(a1);
            }
            return Some(lerp(a0, a1, (offset - p0) / span));
        }
    }
    stops.last().map(|s| s.1)
}

impl Interpolatable for GradientColor {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        if self.len() != other.len() {
            return Err(LottieError::GradientStopMismatch {
                left: self.len(),
                right: other.len(),
            });
        }

        out.positions.clear();
        out.positions.extend(
            self.positions
                .iter()
                .zip(&other.positions)
                .map(|(a, b)| lerp(*a, *b, t)),
        );

        out.colors.clear();
        for (a, b) in self.colors.iter().zip(&other.colors) {
            out.colors.push(a.interpolate(b, t)?);
        }
        Ok(())
    }
}

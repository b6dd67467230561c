// src/oracle.rs - Closed-loop validation for traced fingertip paths
use crate::landmarks::PixelPoint;
use image::{GrayImage, Luma};
use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const SECTOR_COUNT: usize = 8;
const INK: Luma<u8> = Luma([255]);

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("cannot rasterize an empty path")]
    EmptyPath,
    #[error("path canvas {width}x{height} exceeds the {limit}px limit")]
    CanvasTooLarge { width: u32, height: u32, limit: u32 },
    #[error("circle fit is degenerate (samples are collinear)")]
    DegenerateFit,
}

/// Decides whether an accumulated path closes into a circle.
/// Implementations may fail; callers treat a failure as "no circle".
pub trait CircleOracle: Send {
    fn contains_circle(&self, path: &[PixelPoint]) -> Result<bool, OracleError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub min_points: usize,
    pub stroke_thickness: u32,
    pub min_radius_px: f64,
    /// RMS of the radial error divided by the radius.
    pub max_residual_ratio: f64,
    /// Angular sectors (out of 8) the path must visit.
    pub min_sectors: usize,
    pub max_canvas_side: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            min_points: 30,
            stroke_thickness: 10,
            min_radius_px: 15.0,
            max_residual_ratio: 0.25,
            min_sectors: 7,
            max_canvas_side: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vector2<f64>,
    pub radius: f64,
}

/// A path drawn with a thick stroke onto a canvas just large enough to hold it.
pub struct PathCanvas {
    image: GrayImage,
    // path coordinates of pixel (0, 0)
    origin: PixelPoint,
}

impl PathCanvas {
    pub fn render(path: &[PixelPoint], thickness: u32, max_side: u32) -> Result<Self, OracleError> {
        let first = path.first().ok_or(OracleError::EmptyPath)?;
        let pad = thickness as i32 + 1;

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in path {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let width = (max_x - min_x + 2 * pad + 1) as u32;
        let height = (max_y - min_y + 2 * pad + 1) as u32;
        if width > max_side || height > max_side {
            return Err(OracleError::CanvasTooLarge { width, height, limit: max_side });
        }

        let mut canvas = Self {
            image: GrayImage::new(width, height),
            origin: PixelPoint::new(min_x - pad, min_y - pad),
        };
        let radius = (thickness as f64 / 2.0).max(0.5);

        canvas.stamp(*first, radius);
        for segment in path.windows(2) {
            canvas.draw_line(segment[0], segment[1], radius);
        }
        Ok(canvas)
    }

    fn draw_line(&mut self, from: PixelPoint, to: PixelPoint, radius: f64) {
        let dx = (to.x - from.x) as f64;
        let dy = (to.y - from.y) as f64;
        let steps = dx.abs().max(dy.abs()).ceil() as i32;
        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
            let p = PixelPoint::new(
                (from.x as f64 + dx * t).round() as i32,
                (from.y as f64 + dy * t).round() as i32,
            );
            self.stamp(p, radius);
        }
    }

    fn stamp(&mut self, center: PixelPoint, radius: f64) {
        let r = radius.ceil() as i32;
        let cx = center.x - self.origin.x;
        let cy = center.y - self.origin.y;
        for y in (cy - r)..=(cy + r) {
            for x in (cx - r)..=(cx + r) {
                if x < 0
                    || y < 0
                    || x as u32 >= self.image.width()
                    || y as u32 >= self.image.height()
                {
                    continue;
                }
                let d = ((x - cx) as f64).hypot((y - cy) as f64);
                if d <= radius {
                    self.image.put_pixel(x as u32, y as u32, INK);
                }
            }
        }
    }

    /// Inked pixels, translated back into path coordinates.
    pub fn lit_pixels(&self) -> Vec<Vector2<f64>> {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0[0] > 0)
            .map(|(x, y, _)| {
                Vector2::new(
                    (x as i32 + self.origin.x) as f64,
                    (y as i32 + self.origin.y) as f64,
                )
            })
            .collect()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// Algebraic least-squares circle fit: solves
/// `x² + y² + D·x + E·y + F = 0` over the samples.
pub fn fit_circle(points: &[Vector2<f64>]) -> Result<Circle, OracleError> {
    if points.len() < 3 {
        return Err(OracleError::DegenerateFit);
    }

    // Center the samples to keep the normal equations well conditioned
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / points.len() as f64;

    let mut normal = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for p in points {
        let q = p - mean;
        let row = Vector3::new(q.x, q.y, 1.0);
        let sq = q.norm_squared();
        normal += row * row.transpose();
        rhs -= row * sq;
    }

    let inverse = normal.try_inverse().ok_or(OracleError::DegenerateFit)?;
    let solution = inverse * rhs;
    let center = Vector2::new(-solution[0] / 2.0, -solution[1] / 2.0);
    let radius_sq = center.norm_squared() - solution[2];
    if !radius_sq.is_finite() || radius_sq <= 0.0 {
        return Err(OracleError::DegenerateFit);
    }

    Ok(Circle {
        center: center + mean,
        radius: radius_sq.sqrt(),
    })
}

/// Rasterizes the path, fits a circle to the stroke and checks that the path
/// actually goes around it.
pub struct FitCircleOracle {
    config: OracleConfig,
}

impl FitCircleOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    fn sectors_visited(path: &[PixelPoint], circle: &Circle) -> usize {
        let mut visited = [false; SECTOR_COUNT];
        for p in path {
            let angle = (p.y as f64 - circle.center.y).atan2(p.x as f64 - circle.center.x);
            let turn = (angle + std::f64::consts::PI) / (2.0 * std::f64::consts::PI);
            let sector = ((turn * SECTOR_COUNT as f64) as usize).min(SECTOR_COUNT - 1);
            visited[sector] = true;
        }
        visited.iter().filter(|v| **v).count()
    }

    fn residual_ratio(path: &[PixelPoint], circle: &Circle) -> f64 {
        let sum_sq: f64 = path
            .iter()
            .map(|p| {
                let d = (Vector2::new(p.x as f64, p.y as f64) - circle.center).norm();
                (d - circle.radius).powi(2)
            })
            .sum();
        (sum_sq / path.len() as f64).sqrt() / circle.radius
    }
}

impl Default for FitCircleOracle {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

impl CircleOracle for FitCircleOracle {
    fn contains_circle(&self, path: &[PixelPoint]) -> Result<bool, OracleError> {
        if path.len() < self.config.min_points {
            return Ok(false);
        }

        let canvas = PathCanvas::render(
            path,
            self.config.stroke_thickness,
            self.config.max_canvas_side,
        )?;
        let circle = fit_circle(&canvas.lit_pixels())?;

        if circle.radius < self.config.min_radius_px {
            debug!("circle rejected: radius {:.1}px too small", circle.radius);
            return Ok(false);
        }

        let residual = Self::residual_ratio(path, &circle);
        if residual > self.config.max_residual_ratio {
            debug!("circle rejected: residual ratio {:.3}", residual);
            return Ok(false);
        }

        let sectors = Self::sectors_visited(path, &circle);
        if sectors < self.config.min_sectors {
            debug!("circle rejected: path visits {} of {} sectors", sectors, SECTOR_COUNT);
            return Ok(false);
        }

        debug!(
            "circle found: center ({:.1}, {:.1}) radius {:.1}",
            circle.center.x, circle.center.y, circle.radius
        );
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod paths {
    use crate::landmarks::PixelPoint;

    /// `count` points evenly spaced on a circle, starting at angle 0.
    /// Positive `turns` sweeps toward +y, which is clockwise on screen.
    pub fn arc(cx: f64, cy: f64, radius: f64, count: usize, turns: f64) -> Vec<PixelPoint> {
        (0..count)
            .map(|i| {
                let theta = turns * 2.0 * std::f64::consts::PI * i as f64 / count as f64;
                PixelPoint::new(
                    (cx + radius * theta.cos()).round() as i32,
                    (cy + radius * theta.sin()).round() as i32,
                )
            })
            .collect()
    }
}

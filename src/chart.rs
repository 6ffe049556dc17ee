//! Chart rendering for history windows.
//!
//! Produces one PNG with three panels: player count over time, response time
//! over time, and the online/offline ratio. Charts are a convenience
//! feature: every rendering failure is absorbed into "no chart" instead of
//! propagating.

use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::address::ServerAddress;
use crate::db::{ServerStatus, StatusObservation};

const CHART_WIDTH: u32 = 900;
const CHART_HEIGHT: u32 = 1080;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("draw error: {0}")]
    Draw(String),
}

fn to_draw<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

/// Renders status charts into a fixed output directory.
pub struct ChartRenderer {
    out_dir: PathBuf,
}

impl ChartRenderer {
    /// One-time renderer setup; creates the output directory.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self, ChartError> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self { out_dir })
    }

    /// Deterministic output path for a (name, address, window) triple, so a
    /// re-render of the same query overwrites the previous image.
    pub fn output_path(&self, name: &str, address: &ServerAddress, hours: u32) -> PathBuf {
        self.out_dir.join(format!(
            "{}_{}_{}_{}h.png",
            name, address.host, address.port, hours
        ))
    }

    /// Render a chart for the window, or `None` when the history is empty or
    /// rendering fails.
    pub fn render(
        &self,
        name: &str,
        address: &ServerAddress,
        hours: u32,
        history: &[StatusObservation],
    ) -> Option<PathBuf> {
        if history.is_empty() {
            return None;
        }
        let path = self.output_path(name, address, hours);
        match draw_chart(&path, name, hours, history) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("chart unavailable for {address}: {e}");
                None
            }
        }
    }
}

fn draw_chart(
    path: &Path,
    name: &str,
    hours: u32,
    history: &[StatusObservation],
) -> Result<(), ChartError> {
    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(to_draw)?;

    let labels = time_labels(history, hours);
    let panels = root.split_evenly((3, 1));
    draw_players(&panels[0], name, hours, history, &labels)?;
    draw_response_times(&panels[1], history, &labels)?;
    draw_uptime_ratio(&panels[2], history)?;

    root.present().map_err(to_draw)?;
    Ok(())
}

/// Pre-formatted tick labels, one per observation. The mesh picks ~6 of
/// them, so tick density stays constant regardless of the window length.
fn time_labels(history: &[StatusObservation], hours: u32) -> Vec<String> {
    let fmt = if hours <= 24 { "%H:%M" } else { "%m-%d %H:%M" };
    history
        .iter()
        .map(|o| o.checked_at.format(fmt).to_string())
        .collect()
}

fn draw_players(
    area: &DrawingArea<BitMapBackend, Shift>,
    name: &str,
    hours: u32,
    history: &[StatusObservation],
    labels: &[String],
) -> Result<(), ChartError> {
    let values: Vec<f64> = history
        .iter()
        .map(|o| o.online_players.unwrap_or(0) as f64)
        .collect();
    let y_max = values.iter().cloned().fold(1.0_f64, f64::max) * 1.1;
    let x_max = values.len().saturating_sub(1).max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{} - players online (last {}h)", name, hours),
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..x_max, 0.0..y_max)
        .map_err(to_draw)?;

    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&|idx| labels.get(*idx).cloned().unwrap_or_default())
        .y_desc("players")
        .draw()
        .map_err(to_draw)?;

    chart
        .draw_series(AreaSeries::new(
            (0..values.len()).map(|i| (i, values[i])),
            0.0,
            BLUE.mix(0.2),
        ))
        .map_err(to_draw)?;
    chart
        .draw_series(LineSeries::new(
            (0..values.len()).map(|i| (i, values[i])),
            &BLUE,
        ))
        .map_err(to_draw)?;

    Ok(())
}

fn draw_response_times(
    area: &DrawingArea<BitMapBackend, Shift>,
    history: &[StatusObservation],
    labels: &[String],
) -> Result<(), ChartError> {
    let points: Vec<(usize, f64)> = history
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.response_time_ms.map(|ms| (i, ms)))
        .collect();

    if points.is_empty() {
        return draw_placeholder(area, "no response time data");
    }

    let y_max = points.iter().map(|p| p.1).fold(1.0_f64, f64::max) * 1.1;
    // Same x axis as the player panel so the panels line up.
    let x_max = history.len().saturating_sub(1).max(1);

    let mut chart = ChartBuilder::on(area)
        .caption("response time (ms)", ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..x_max, 0.0..y_max)
        .map_err(to_draw)?;

    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&|idx| labels.get(*idx).cloned().unwrap_or_default())
        .y_desc("ms")
        .draw()
        .map_err(to_draw)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &RED))
        .map_err(to_draw)?;

    Ok(())
}

fn draw_uptime_ratio(
    area: &DrawingArea<BitMapBackend, Shift>,
    history: &[StatusObservation],
) -> Result<(), ChartError> {
    let online = history
        .iter()
        .filter(|o| o.status == ServerStatus::Online)
        .count() as f64;
    let offline = history.len() as f64 - online;

    if online == 0.0 && offline == 0.0 {
        return draw_placeholder(area, "no status data");
    }

    let (w, h) = area.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = f64::from(w.min(h)) * 0.35;
    let sizes = vec![online, offline];
    let colors = vec![GREEN, RED];
    let slice_labels = vec![
        format!("online ({})", online as i64),
        format!("offline ({})", offline as i64),
    ];

    area.draw(&Text::new(
        "online / offline".to_string(),
        (center.0 - 70, 16),
        ("sans-serif", 22),
    ))
    .map_err(to_draw)?;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &slice_labels);
    pie.start_angle(-90.0);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    area.draw(&pie).map_err(to_draw)?;

    Ok(())
}

fn draw_placeholder(
    area: &DrawingArea<BitMapBackend, Shift>,
    message: &str,
) -> Result<(), ChartError> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        ((w / 2) as i32 - 80, (h / 2) as i32),
        ("sans-serif", 20),
    ))
    .map_err(to_draw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn addr() -> ServerAddress {
        ServerAddress::new("mc.example.com", 25565)
    }

    fn sample_history(n: usize) -> Vec<StatusObservation> {
        let base = Utc::now();
        (0..n)
            .map(|i| {
                if i % 4 == 3 {
                    StatusObservation::offline(
                        &addr(),
                        base + Duration::minutes(i as i64 * 5),
                        "timed out",
                    )
                } else {
                    StatusObservation::online(
                        &addr(),
                        base + Duration::minutes(i as i64 * 5),
                        (i % 10) as i64,
                        30.0 + i as f64,
                    )
                }
            })
            .collect()
    }

    #[test]
    fn empty_history_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path()).unwrap();
        assert_eq!(renderer.render("Main", &addr(), 24, &[]), None);
    }

    #[test]
    fn output_path_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path()).unwrap();
        let a = renderer.output_path("Main", &addr(), 24);
        let b = renderer.output_path("Main", &addr(), 24);
        assert_eq!(a, b);
        assert!(a.ends_with("Main_mc.example.com_25565_24h.png"));
        assert_ne!(a, renderer.output_path("Main", &addr(), 48));
    }

    #[test]
    fn render_writes_the_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path()).unwrap();
        // Rendering errors are absorbed into None, so only assert on the
        // file when a path comes back.
        if let Some(path) = renderer.render("Main", &addr(), 24, &sample_history(20)) {
            assert!(path.exists());
        }
    }
}

// src/data.rs
use crate::classifier::GestureLabel;
use crate::trajectory::{RevolutionEvent, RotationDirection};
use crate::voting::ConfirmedEvent;
use anyhow::Result;
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Gesture,
    Revolution,
}

/// One CSV row. Gesture rows leave the revolution columns empty and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub timestamp: f64,
    pub frame: u64,
    pub kind: EventKind,
    pub label: Option<String>,
    pub modified_by_call: Option<bool>,
    pub direction: Option<String>,
    pub count: Option<u32>,
}

pub struct EventExporter {
    output_dir: PathBuf,
    session_name: String,
    records: Vec<EventRecord>,
    frames_seen: u64,
}

impl EventExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            records: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Total frames processed, for the report. Frames without events are not stored.
    pub fn set_frames_seen(&mut self, frames: u64) {
        self.frames_seen = frames;
    }

    pub fn add_gesture(&mut self, frame: u64, timestamp: f64, event: &ConfirmedEvent) {
        self.records.push(EventRecord {
            timestamp,
            frame,
            kind: EventKind::Gesture,
            label: Some(event.label.as_str().to_string()),
            modified_by_call: Some(event.modified_by_call),
            direction: None,
            count: None,
        });
    }

    pub fn add_revolution(&mut self, frame: u64, timestamp: f64, event: &RevolutionEvent) {
        self.records.push(EventRecord {
            timestamp,
            frame,
            kind: EventKind::Revolution,
            label: None,
            modified_by_call: None,
            direction: Some(event.direction.as_str().to_string()),
            count: Some(event.count),
        });
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("events.csv");
        std::fs::create_dir_all(self.session_dir())?;

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(csv_path)
    }

    pub fn generate_report(&self) -> Result<PathBuf> {
        let report_path = self.session_dir().join("report.html");
        std::fs::create_dir_all(self.session_dir())?;

        std::fs::write(&report_path, self.create_html_report())?;
        Ok(report_path)
    }

    fn gesture_count(&self, label: GestureLabel) -> usize {
        let name = label.as_str();
        self.records
            .iter()
            .filter(|r| r.kind == EventKind::Gesture && r.label.as_deref() == Some(name))
            .count()
    }

    fn revolution_count(&self, direction: RotationDirection) -> usize {
        let name = direction.as_str();
        self.records
            .iter()
            .filter(|r| r.kind == EventKind::Revolution && r.direction.as_deref() == Some(name))
            .count()
    }

    fn create_html_report(&self) -> String {
        let rows: String = [
            GestureLabel::Up,
            GestureLabel::Down,
            GestureLabel::Left,
            GestureLabel::Right,
            GestureLabel::Fist,
            GestureLabel::Ok,
            GestureLabel::Two,
            GestureLabel::Call,
        ]
        .iter()
        .map(|label| {
            format!(
                "        <div class=\"stat-item\"><span class=\"stat-label\">{}:</span> <span class=\"stat-value\">{}</span></div>\n",
                label.as_str(),
                self.gesture_count(*label)
            )
        })
        .collect();

        let modified = self
            .records
            .iter()
            .filter(|r| r.modified_by_call == Some(true))
            .count();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Gesture Session Report - {name}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; }}
    </style>
</head>
<body>
    <h1>Gesture Session Report</h1>
    <div class="stats">
        <h2>Session: {name}</h2>
        <div class="stat-item"><span class="stat-label">Frames:</span> <span class="stat-value">{frames}</span></div>
        <div class="stat-item"><span class="stat-label">Events:</span> <span class="stat-value">{events}</span></div>
        <div class="stat-item"><span class="stat-label">After call:</span> <span class="stat-value">{modified}</span></div>
{rows}        <div class="stat-item"><span class="stat-label">Clockwise revolutions:</span> <span class="stat-value">{cw}</span></div>
        <div class="stat-item"><span class="stat-label">Counter-clockwise revolutions:</span> <span class="stat-value">{ccw}</span></div>
    </div>
</body>
</html>
"#,
            name = self.session_name,
            frames = self.frames_seen,
            events = self.records.len(),
            modified = modified,
            rows = rows,
            cw = self.revolution_count(RotationDirection::Clockwise),
            ccw = self.revolution_count(RotationDirection::CounterClockwise),
        )
    }
}

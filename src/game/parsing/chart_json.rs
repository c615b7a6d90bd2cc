use crate::game::chart::{Chart, ChartError, normalize};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

// --- SERIALIZABLE MIRROR STRUCTS ---
// Field names follow the external chart document; unknown fields are ignored.

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawChart {
    #[serde(default)]
    pub format_version: Option<u32>,
    #[serde(default)]
    pub judge_line_list: Vec<RawLine>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawLine {
    // Optional at the document level so a missing bpm surfaces as a chart error
    // with the line index instead of an opaque decode failure.
    #[serde(default)]
    pub bpm: Option<f32>,
    #[serde(default)]
    pub notes_above: Vec<RawNote>,
    #[serde(default)]
    pub notes_below: Vec<RawNote>,
    #[serde(default)]
    pub judge_line_move_events: Vec<RawEvent>,
    #[serde(default)]
    pub judge_line_rotate_events: Vec<RawEvent>,
    #[serde(default)]
    pub judge_line_disappear_events: Vec<RawEvent>,
    #[serde(default)]
    pub speed_events: Vec<RawSpeedEvent>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    #[serde(rename = "type")]
    pub kind: u8,
    pub time: f32,
    pub position_x: f32,
    #[serde(default = "default_note_speed")]
    pub speed: f32,
    #[serde(default)]
    pub hold_time: Option<f32>,
    #[serde(default)]
    pub floor_position: Option<f32>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub start_time: f32,
    pub end_time: f32,
    pub start: f32,
    pub end: f32,
    #[serde(default)]
    pub start2: f32,
    #[serde(default)]
    pub end2: f32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawSpeedEvent {
    pub start_time: f32,
    pub end_time: f32,
    pub value: f32,
}

const fn default_note_speed() -> f32 {
    1.0
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed Chart: {0}")]
    Chart(#[from] ChartError),
}

pub fn parse_raw_chart(text: &str) -> Result<RawChart, LoadError> {
    Ok(serde_json::from_str(text)?)
}

/// Decodes and normalizes a chart document held in memory.
pub fn parse_chart(text: &str) -> Result<Chart, LoadError> {
    let raw = parse_raw_chart(text)?;
    Ok(normalize(&raw)?)
}

/// Reads, decodes and normalizes a chart document from disk.
pub fn load_chart<P: AsRef<Path>>(path: P) -> Result<Chart, LoadError> {
    let started = Instant::now();
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let chart = parse_chart(&text)?;
    info!(
        "Loaded chart '{}' in {:.2}ms.",
        path.display(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(chart)
}

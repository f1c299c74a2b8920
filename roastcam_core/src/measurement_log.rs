//! Append-only record of accepted measurements and its CSV export.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::color::Lab;
use crate::quality::GateName;
use crate::roi::Mode;

/// One accepted averaged measurement. Values are already rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementLogEntry {
    pub time: DateTime<Utc>,
    pub lab: Lab,
    pub score: f64,
    pub category: &'static str,
    pub model: &'static str,
    pub scale: f64,
    pub offset: f64,
    pub glare: f64,
    pub wb_deviation: f64,
    pub readiness: f64,
    /// Passes that contributed to the averages
    pub frames: usize,
    pub gate: GateName,
    pub mode: Mode,
    pub device: String,
}

pub const CSV_HEADER: [&str; 15] = [
    "time", "L", "a", "b", "Agtron", "category", "model", "scale", "offset", "glare", "wbDev",
    "ready", "gate", "mode", "device",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementLog {
    entries: Vec<MeasurementLogEntry>,
}

impl MeasurementLog {
    pub fn push(&mut self, entry: MeasurementLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MeasurementLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write every entry as CSV with all fields quoted.
    pub fn write_csv<W: Write>(&self, out: W) -> csv::Result<()> {
        let mut w = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(out);
        w.write_record(CSV_HEADER)?;
        for e in &self.entries {
            w.write_record([
                e.time.to_rfc3339_opts(SecondsFormat::Millis, true),
                format!("{:.1}", e.lab.l),
                format!("{:.1}", e.lab.a),
                format!("{:.1}", e.lab.b),
                format!("{:.1}", e.score),
                e.category.to_string(),
                e.model.to_string(),
                e.scale.to_string(),
                e.offset.to_string(),
                format!("{:.1}", e.glare),
                format!("{:.1}", e.wb_deviation),
                format!("{:.0}", e.readiness),
                e.gate.to_string(),
                e.mode.to_string(),
                e.device.clone(),
            ])?;
        }
        w.flush()?;
        Ok(())
    }
}

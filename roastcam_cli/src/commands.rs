//! Pipeline assembly and command execution.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use roastcam_capture::{FileSettingsStore, Scene, SimulatedCamera, StillImageSource, save_png};
use roastcam_core::error::{Result as CoreResult, RoastError};
use roastcam_core::{
    CalibrationPoint, GateName, Lab, LayoutRegions, MeasurementLogEntry, Mode, ModelKind,
    PassOutcome, PassResult, Pipeline, PipelineCfg, Scheme, build_pipeline, gauge_percent,
};
use roastcam_traits::FrameSource;
use serde_json::json;

use crate::cli::{
    CardKind, Commands, FitKind, GateArg, ModeArg, ModelCmd, PointCmd, SchemeArg, SourceArgs,
};

pub type Meter = Pipeline<Box<dyn FrameSource>, LayoutRegions, FileSettingsStore>;

/// Build the pipeline over the selected frame source and restore saved settings.
pub fn assemble(
    cfg: &roastcam_config::Config,
    source: &SourceArgs,
    cancel: Arc<AtomicBool>,
) -> CoreResult<Meter> {
    let regions = LayoutRegions::for_buffer(cfg.capture.width, cfg.capture.height);
    let frames: Box<dyn FrameSource> = match &source.image {
        Some(path) => {
            tracing::info!(path = %path.display(), "using still image source");
            Box::new(StillImageSource::new(path))
        }
        None => {
            let layout = regions.layout();
            let mut scene = Scene::new(layout.sample, layout.reference);
            if let Some(c) = source.sim_sample {
                scene.sample = c;
            }
            if let Some(c) = source.sim_reference {
                scene.reference = c;
            }
            scene.glare_fraction = source.sim_glare;
            scene.drift_per_frame = source.sim_drift;
            Box::new(SimulatedCamera::new(
                cfg.capture.width,
                cfg.capture.height,
                scene,
            ))
        }
    };
    let store = FileSettingsStore::new(&cfg.storage.settings_path);
    let mut meter = build_pipeline(
        frames,
        regions,
        store,
        PipelineCfg::from(cfg),
        None,
        Some(cancel),
    )?;
    // An unreadable settings file must not block `reset` or `model import`
    match meter.load() {
        Ok(true) => tracing::debug!(path = %cfg.storage.settings_path, "settings loaded"),
        Ok(false) => {}
        Err(e) if matches!(
            e.downcast_ref::<RoastError>(),
            Some(RoastError::MalformedImport(_))
        ) =>
        {
            tracing::warn!(
                path = %cfg.storage.settings_path,
                error = %e,
                "ignoring unreadable settings file; using defaults"
            );
        }
        Err(e) => return Err(e),
    }
    Ok(meter)
}

fn emit(json_mode: bool, value: serde_json::Value, text: impl FnOnce() -> String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{}", text());
    }
}

fn pass_text(r: &PassResult, model: &str) -> String {
    let mut s = format!(
        "L*={:.1} a*={:.1} b*={:.1}\nAgtron≈{:.1} ({}, {model}) gauge={:.0}%\nglare={:.1}% wbDev={:.1} stability={:.2} ready={:.0}",
        r.lab.l,
        r.lab.a,
        r.lab.b,
        r.score,
        r.category.name,
        gauge_percent(r.score),
        r.glare,
        r.wb_deviation,
        r.stability,
        r.readiness,
    );
    for a in &r.advisories {
        s.push_str(&format!("\nhint: {a}"));
    }
    s
}

fn entry_text(e: &MeasurementLogEntry) -> String {
    format!(
        "Agtron {:.1} ({}) L*={:.1} a*={:.1} b*={:.1} model={} frames={} ready={:.0} gate={} mode={}",
        e.score, e.category, e.lab.l, e.lab.a, e.lab.b, e.model, e.frames, e.readiness, e.gate, e.mode
    )
}

fn point_json(p: &CalibrationPoint) -> serde_json::Value {
    json!({ "agtron": p.reference_score, "L": p.lab.l, "a": p.lab.a, "b": p.lab.b })
}

const fn scheme_of(s: SchemeArg) -> Scheme {
    match s {
        SchemeArg::Gourmet => Scheme::Gourmet,
        SchemeArg::Commercial => Scheme::Commercial,
    }
}

const fn gate_of(g: GateArg) -> GateName {
    match g {
        GateArg::Strict => GateName::Strict,
        GateArg::Normal => GateName::Normal,
        GateArg::Relaxed => GateName::Relaxed,
    }
}

const fn mode_of(m: ModeArg) -> Mode {
    match m {
        ModeArg::Ground => Mode::Ground,
        ModeArg::Bean => Mode::Bean,
    }
}

pub fn run(meter: &mut Meter, cmd: Commands, json_mode: bool) -> CoreResult<()> {
    match cmd {
        Commands::Analyze { passes } => {
            meter.start()?;
            let mut last = None;
            for _ in 0..passes.max(1) {
                if let Some(PassOutcome::Analysis(r)) = meter.on_tick()? {
                    last = Some(r);
                }
            }
            meter.stop();
            let model = meter.session().scorer.model_name();
            match last {
                Some(r) => emit(json_mode, json!({ "pass": r, "model": model }), || {
                    pass_text(&r, model)
                }),
                None => emit(json_mode, json!({ "pass": null }), || {
                    "no usable samples in the frame".to_string()
                }),
            }
        }
        Commands::Measure {
            frames,
            delay_ms,
            csv,
        } => {
            meter.start()?;
            let m = meter.config().measure;
            let frames = frames.unwrap_or(m.frames);
            let delay = delay_ms.map_or(m.delay, std::time::Duration::from_millis);
            let result = meter.measure(frames, delay);
            meter.stop();
            let entry = result?;
            if let Some(path) = csv {
                let file = fs::File::create(&path)
                    .wrap_err_with(|| format!("create CSV {}", path.display()))?;
                meter.export_csv(file)?;
            }
            emit(json_mode, json!({ "measurement": entry }), || entry_text(&entry));
        }
        Commands::Calibrate { card } => {
            meter.start()?;
            let result = match card {
                CardKind::White => meter.calibrate_white(),
                CardKind::Gray => meter.calibrate_gray(),
            };
            meter.stop();
            let wb = result?;
            meter.save()?;
            let g = wb.gains;
            emit(
                json_mode,
                json!({ "gains": g, "means": wb.means }),
                || format!("gains r={:.3} g={:.3} b={:.3}", g.r, g.g, g.b),
            );
        }
        Commands::Point { action } => run_point(meter, action, json_mode)?,
        Commands::Fit { kind } => {
            let kind = match kind {
                FitKind::Linear => ModelKind::Linear,
                FitKind::Poly => ModelKind::Polynomial,
            };
            let report = meter.fit_model(kind)?;
            meter.save()?;
            let weights = report.model.weights();
            emit(
                json_mode,
                json!({
                    "model": kind.name(),
                    "weights": weights,
                    "rmse": report.rmse,
                    "r2": report.r2,
                    "n": report.n,
                    "lambda": report.lambda,
                }),
                || {
                    format!(
                        "{} fit over {} points: rmse={:.2} r2={:.3} w={weights:?}",
                        kind.name(),
                        report.n,
                        report.rmse,
                        report.r2
                    )
                },
            );
        }
        Commands::Set {
            scale,
            offset,
            scheme,
            gate,
            mode,
        } => {
            if let Some(v) = scale {
                meter.set_scale(v)?;
            }
            if let Some(v) = offset {
                meter.set_offset(v)?;
            }
            if let Some(s) = scheme {
                meter.set_scheme(scheme_of(s));
            }
            if let Some(g) = gate {
                meter.set_gate(gate_of(g));
            }
            if let Some(m) = mode {
                meter.set_mode(mode_of(m));
            }
            meter.save()?;
            let s = meter.session();
            emit(
                json_mode,
                json!({
                    "scale": s.scorer.formula.scale,
                    "offset": s.scorer.formula.offset,
                    "scheme": s.scheme,
                    "gate": s.gate,
                    "mode": s.mode,
                }),
                || {
                    format!(
                        "scale={} offset={} scheme={} gate={} mode={}",
                        s.scorer.formula.scale, s.scorer.formula.offset, s.scheme, s.gate, s.mode
                    )
                },
            );
        }
        Commands::Model { action } => match action {
            ModelCmd::Export { out } => {
                let bytes = meter.export_model()?;
                match out {
                    Some(path) => {
                        fs::write(&path, &bytes)
                            .wrap_err_with(|| format!("write {}", path.display()))?;
                        emit(json_mode, json!({ "exported": path }), || {
                            format!("settings written to {}", path.display())
                        });
                    }
                    None => println!("{}", String::from_utf8_lossy(&bytes)),
                }
            }
            ModelCmd::Import { file } => {
                let bytes =
                    fs::read(&file).wrap_err_with(|| format!("read {}", file.display()))?;
                meter.import_model(&bytes)?;
                let model = meter.session().scorer.model_name();
                emit(json_mode, json!({ "imported": file, "model": model }), || {
                    format!("settings imported (model: {model})")
                });
            }
            ModelCmd::Clear => {
                meter.clear_model();
                meter.save()?;
                emit(json_mode, json!({ "model": "formula" }), || {
                    "fitted model cleared".to_string()
                });
            }
        },
        Commands::Snapshot { out } => {
            meter.start()?;
            let result = meter.snapshot_region();
            meter.stop();
            let frame = result?;
            save_png(&frame, &out)?;
            emit(
                json_mode,
                json!({ "snapshot": out, "width": frame.width, "height": frame.height }),
                || format!("snapshot {}x{} written to {}", frame.width, frame.height, out.display()),
            );
        }
        Commands::Reset => {
            meter.reset()?;
            emit(json_mode, json!({ "reset": true }), || "settings reset".to_string());
        }
        Commands::SelfCheck => {
            meter.start()?;
            let outcome = meter.analyze_once();
            meter.stop();
            let ok = matches!(outcome?, PassOutcome::Analysis(_));
            emit(json_mode, json!({ "ok": ok }), || {
                let msg = if ok {
                    "OK"
                } else {
                    "frame source delivered no usable samples"
                };
                msg.to_string()
            });
        }
    }
    Ok(())
}

fn run_point(meter: &mut Meter, action: PointCmd, json_mode: bool) -> CoreResult<()> {
    match action {
        PointCmd::Add { agtron, lab } => {
            let point = match lab {
                Some([l, a, b]) => {
                    let lab = Lab::new(l, a, b);
                    meter.add_calibration_point(agtron, lab)?;
                    CalibrationPoint::new(agtron, lab)
                }
                None => {
                    meter.start()?;
                    let result = meter.capture_calibration_point(agtron);
                    meter.stop();
                    result?
                }
            };
            meter.save()?;
            let n = meter.session().points.len();
            emit(json_mode, json!({ "point": point_json(&point), "count": n }), || {
                format!(
                    "point {n}: agtron={:.1} L*={:.1} a*={:.1} b*={:.1}",
                    point.reference_score, point.lab.l, point.lab.a, point.lab.b
                )
            });
        }
        PointCmd::Import { file } => {
            let added = import_points(meter, &file)?;
            meter.save()?;
            let n = meter.session().points.len();
            emit(json_mode, json!({ "added": added, "count": n }), || {
                format!("{added} points imported ({n} total)")
            });
        }
        PointCmd::Clear => {
            meter.clear_points();
            meter.save()?;
            emit(json_mode, json!({ "count": 0 }), || "calibration points cleared".to_string());
        }
        PointCmd::List => {
            let points = &meter.session().points;
            if json_mode {
                let list: Vec<_> = points.iter().map(point_json).collect();
                println!("{}", json!({ "points": list }));
            } else if points.is_empty() {
                println!("no calibration points");
            } else {
                for (i, p) in points.iter().enumerate() {
                    println!(
                        "{:>3}  agtron={:.1}  L*={:.2} a*={:.2} b*={:.2}",
                        i + 1,
                        p.reference_score,
                        p.lab.l,
                        p.lab.a,
                        p.lab.b
                    );
                }
            }
        }
    }
    Ok(())
}

fn import_points(meter: &mut Meter, file: &Path) -> CoreResult<usize> {
    let rows = roastcam_config::load_calibration_csv(file)?;
    for row in &rows {
        let p = CalibrationPoint::from(row);
        meter.add_calibration_point(p.reference_score, p.lab)?;
    }
    Ok(rows.len())
}

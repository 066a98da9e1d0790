use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use arcstr::ArcStr;
use log::{error, info};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::cacti::{CharacterizationRecord, Characterizer};
use crate::cli::progress::{BatchProgress, MacroProgress};
use crate::config::sram::{Memory, MemoryConfig};
use crate::config::Process;
use crate::dims::{macro_dimensions, ArrayParams, Dimensions};
use crate::error::RamgenError;
use crate::grid::ceil_to;
use crate::layout::obs::{obstructions, Obstruction};
use crate::layout::power::{power_rails, PowerNet};
use crate::layout::{layout_pins, PinLayout};
use crate::lef::{generate_lef, PhysicalView};
use crate::liberty::{generate_lib, LibParams, DEFAULT_INPUT_CAP_PF, DEFAULT_SETUP_HOLD_NS};
use crate::paths::{out_dir, out_lef, out_lib};
use crate::tech_override::{self, TechOverride};
use crate::Result;

/// A fully computed macro, ready to be written out.
#[derive(Debug, Clone)]
pub struct MacroPlan {
    pub memory: Memory,
    /// Technology node after characterization.
    pub tech_nm: u32,
    pub layout: PinLayout,
    pub power: [PowerNet; 2],
    pub obstructions: Vec<Obstruction>,
    pub lib_params: LibParams,
}

impl MacroPlan {
    pub fn physical_view(&self) -> PhysicalView<'_> {
        PhysicalView {
            memory: &self.memory,
            geometry: self.layout.geometry,
            pins: &self.layout.pins,
            power: &self.power,
            obstructions: &self.obstructions,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Characterize,
    GeneratePlan,
    GenerateLef,
    GenerateLib,
}

impl TaskKey {
    /// Tasks in execution order.
    pub const ALL: [TaskKey; 4] = [
        Self::Characterize,
        Self::GeneratePlan,
        Self::GenerateLef,
        Self::GenerateLib,
    ];

    pub fn desc(&self) -> &'static str {
        match self {
            Self::Characterize => "Characterize",
            Self::GeneratePlan => "Generate plan",
            Self::GenerateLef => "Generate LEF",
            Self::GenerateLib => "Generate LIB",
        }
    }
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a MacroPlan,
    pub tasks: &'a HashSet<TaskKey>,
    /// Emit the LEF property block.
    pub properties: bool,
    pub ctx: Option<&'a mut MacroProgress>,
}

/// Whether the external characterizer runs for this technology.
///
/// It is skipped only when a custom technology file is in use and the process
/// is not marked hybrid.
pub fn needs_characterization(process: &Process, overrides: Option<&TechOverride>) -> bool {
    overrides.is_none() || process.hybrid
}

fn to_decimal(param: &'static str, value: f64) -> crate::error::Result<Decimal> {
    Decimal::try_from(value).map_err(|_| {
        RamgenError::Characterization(format!("{param} is not a finite number: {value}"))
    })
}

/// A scalar from the technology override, else from characterization.
fn resolve(
    key: &'static str,
    measured: Option<f64>,
    overrides: Option<&TechOverride>,
) -> crate::error::Result<f64> {
    if let Some(value) = overrides.and_then(|tech| tech.get(key)) {
        info!("{key} overridden: {value}");
        return Ok(value);
    }
    measured.ok_or_else(|| {
        RamgenError::config(
            key,
            "not provided by the custom technology and no characterization was run",
        )
    })
}

/// A device pitch in micrometres from the technology override, else from the process.
fn device_pitch(
    key: &'static str,
    configured: Option<Decimal>,
    overrides: &TechOverride,
) -> crate::error::Result<Decimal> {
    match overrides.get(key) {
        Some(nm) => Ok(to_decimal(key, nm)? / Decimal::ONE_THOUSAND),
        None => configured.ok_or_else(|| {
            RamgenError::config(key, "required by the area model for custom technologies")
        }),
    }
}

/// The outline handed to pin layout, rounded up to the snap increments.
fn seed_dimensions(
    process: &Process,
    memory: &Memory,
    overrides: Option<&TechOverride>,
    characterization: Option<&CharacterizationRecord>,
) -> crate::error::Result<Dimensions> {
    let raw = match (overrides, characterization) {
        (Some(tech), _) => {
            let cpp = device_pitch(
                tech_override::CONTACTED_POLY_PITCH_NM,
                process.contacted_poly_pitch,
                tech,
            )?;
            let fin = device_pitch(tech_override::FIN_PITCH_NM, process.fin_pitch, tech)?;
            macro_dimensions(&ArrayParams::new(
                memory,
                cpp,
                fin,
                process.column_mux_factor,
            ))
        }
        (None, Some(record)) => Dimensions {
            width: to_decimal("width_um", record.width_um)?,
            height: to_decimal("height_um", record.height_um)?,
        },
        (None, None) => {
            return Err(RamgenError::config(
                "custom_tech_name",
                "no characterization result and no custom technology to size the macro",
            ))
        }
    };

    Ok(Dimensions {
        width: ceil_to(raw.width, process.snap_width),
        height: ceil_to(raw.height, process.snap_height),
    })
}

/// Computes the complete physical and timing description of one macro.
///
/// Performs no I/O: characterization results and technology overrides are
/// passed in.
pub fn generate_plan(
    process: &Process,
    memory: &Memory,
    overrides: Option<&TechOverride>,
    characterization: Option<&CharacterizationRecord>,
) -> Result<MacroPlan> {
    let tech_nm = characterization
        .map(|record| record.tech_nm)
        .unwrap_or(process.tech_nm);

    let seed = seed_dimensions(process, memory, overrides, characterization)?;
    info!(
        "{}: seed dimensions {} x {} um",
        memory.name, seed.width, seed.height
    );

    let layout = layout_pins(process, memory, seed)?;
    let geometry = layout.geometry;
    info!(
        "{}: final dimensions {} x {} um, pin pitch {} um",
        memory.name, geometry.width, geometry.height, layout.pitch
    );

    let power = power_rails(process, geometry);
    let obstructions = obstructions(process, geometry, tech_nm)?;

    let area_um2 = (geometry.width * geometry.height)
        .to_f64()
        .ok_or_else(|| anyhow!("macro area is out of range"))?;

    let lib_params = LibParams::builder()
        .memory(memory.clone())
        .voltage(process.voltage)
        .area_um2(area_um2)
        .access_time_ns(resolve(
            tech_override::ACCESS_TIME_NS,
            characterization.map(|r| r.access_time_ns),
            overrides,
        )?)
        .cycle_time_ns(resolve(
            tech_override::CYCLE_TIME_NS,
            characterization.map(|r| r.cycle_time_ns),
            overrides,
        )?)
        .fo4_ps(resolve(
            tech_override::FO4_PS,
            characterization.map(|r| r.fo4_ps),
            overrides,
        )?)
        .standby_leakage_mw(resolve(
            tech_override::STANDBY_LEAKAGE_PER_BANK_MW,
            characterization.map(|r| r.standby_leakage_per_bank_mw),
            overrides,
        )?)
        .pin_dynamic_power_mw(resolve(
            tech_override::PIN_DYNAMIC_POWER_MW,
            characterization.map(|r| r.dyn_write_energy_nj),
            overrides,
        )?)
        .t_setup_ns(resolve(
            tech_override::T_SETUP_NS,
            Some(DEFAULT_SETUP_HOLD_NS),
            overrides,
        )?)
        .t_hold_ns(resolve(
            tech_override::T_HOLD_NS,
            Some(DEFAULT_SETUP_HOLD_NS),
            overrides,
        )?)
        .cap_input_pf(resolve(
            tech_override::CAP_INPUT_PF,
            Some(DEFAULT_INPUT_CAP_PF),
            overrides,
        )?)
        .build()?;

    Ok(MacroPlan {
        memory: memory.clone(),
        tech_nm,
        layout,
        power,
        obstructions,
        lib_params,
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

/// Writes the views of `plan` into `work_dir`.
///
/// Every view is rendered before any file is created.
pub fn execute_plan(params: ExecutePlanParams) -> Result<()> {
    let ExecutePlanParams {
        work_dir,
        plan,
        tasks,
        properties,
        mut ctx,
    } = params;

    let name = plan.memory.name.as_str();

    let lef = if tasks.contains(&TaskKey::GenerateLef) {
        Some(generate_lef(&plan.physical_view(), properties)?)
    } else {
        None
    };
    let lib = if tasks.contains(&TaskKey::GenerateLib) {
        Some(generate_lib(&plan.lib_params)?)
    } else {
        None
    };

    std::fs::create_dir_all(work_dir)?;

    if let Some(lef) = lef {
        let path = out_lef(work_dir, name);
        std::fs::write(&path, lef).with_context(|| format!("failed to write {path:?}"))?;
        try_finish_task!(ctx, TaskKey::GenerateLef);
    }
    if let Some(lib) = lib {
        let path = out_lib(work_dir, name);
        std::fs::write(&path, lib).with_context(|| format!("failed to write {path:?}"))?;
        try_finish_task!(ctx, TaskKey::GenerateLib);
    }

    Ok(())
}

pub struct BatchParams<'a> {
    pub process: &'a Process,
    pub output_dir: &'a Path,
    pub characterizer: &'a dyn Characterizer,
    pub custom_tech_dir: Option<&'a Path>,
    pub tasks: &'a HashSet<TaskKey>,
    pub properties: bool,
    /// Number of macros generated concurrently.
    pub jobs: usize,
}

/// The result of generating one macro of a batch.
#[derive(Debug)]
pub struct MacroOutcome {
    pub name: ArcStr,
    /// The macro's output directory on success.
    pub result: Result<PathBuf>,
}

fn load_overrides(params: &BatchParams) -> Result<Option<TechOverride>> {
    let (Some(dir), Some(tech_name)) = (
        params.custom_tech_dir,
        params.process.custom_tech_name.as_deref(),
    ) else {
        return Ok(None);
    };
    Ok(TechOverride::find(dir, tech_name)?)
}

/// Runs every step for one macro description.
pub fn run_macro(
    params: &BatchParams,
    overrides: Option<&TechOverride>,
    config: &MemoryConfig,
    mut ctx: Option<&mut MacroProgress>,
) -> Result<PathBuf> {
    let memory = config
        .validate()
        .with_context(|| format!("invalid macro `{}`", config.name))?;
    let work_dir = out_dir(params.output_dir, &memory.name);

    let characterization = if needs_characterization(params.process, overrides) {
        let record = params
            .characterizer
            .characterize(&memory, params.process, &work_dir)
            .with_context(|| format!("failed to characterize `{}`", memory.name))?;
        Some(record)
    } else {
        info!("{}: using custom technology without characterization", memory.name);
        None
    };
    try_finish_task!(ctx, TaskKey::Characterize);

    let plan = generate_plan(params.process, &memory, overrides, characterization.as_ref())
        .with_context(|| format!("failed to plan `{}`", memory.name))?;
    try_finish_task!(ctx, TaskKey::GeneratePlan);

    execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        tasks: params.tasks,
        properties: params.properties,
        ctx: ctx.as_deref_mut(),
    })?;

    Ok(work_dir)
}

/// Generates every macro of a batch on up to `params.jobs` worker threads.
///
/// Failures are isolated per macro; outcomes are returned in input order.
pub fn run_batch(
    params: &BatchParams,
    srams: &[MemoryConfig],
    progress: Option<&BatchProgress>,
) -> Result<Vec<MacroOutcome>> {
    let overrides = load_overrides(params)?;
    if let Some(tech) = &overrides {
        info!("applying custom technology overrides from {:?}", tech.path);
    }

    let queue: Vec<_> = srams
        .iter()
        .enumerate()
        .map(|(idx, config)| {
            let ctx = progress.map(|progress| progress.add_macro(&config.name, params.tasks));
            (idx, config, ctx)
        })
        .collect();
    let queue = Mutex::new(queue.into_iter());
    let jobs = params.jobs.clamp(1, srams.len().max(1));

    let mut outcomes: Vec<Option<MacroOutcome>> = srams.iter().map(|_| None).collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let next = match queue.lock() {
                            Ok(mut queue) => queue.next(),
                            Err(_) => None,
                        };
                        let Some((idx, config, mut ctx)) = next else {
                            break;
                        };
                        if let Some(ctx) = ctx.as_mut() {
                            ctx.start();
                        }
                        let result = run_macro(params, overrides.as_ref(), config, ctx.as_mut());
                        if let Some(ctx) = ctx.as_mut() {
                            ctx.check(&result);
                        }
                        if let Err(err) = &result {
                            error!("{}: {err:#}", config.name);
                        }
                        done.push((
                            idx,
                            MacroOutcome {
                                name: config.name.clone(),
                                result,
                            },
                        ));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (idx, outcome) in done {
                        outcomes[idx] = Some(outcome);
                    }
                }
                Err(_) => error!("a batch worker panicked"),
            }
        }
    });

    Ok(outcomes
        .into_iter()
        .zip(srams)
        .map(|(outcome, config)| {
            outcome.unwrap_or_else(|| MacroOutcome {
                name: config.name.clone(),
                result: Err(anyhow!("generation of `{}` did not complete", config.name)),
            })
        })
        .collect())
}

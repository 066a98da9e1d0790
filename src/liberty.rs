use derive_builder::Builder;
use serde::Serialize;
use tera::Context;

use crate::config::sram::{Memory, PortClass};
use crate::error::Result;
use crate::TEMPLATES;

/// Setup and hold time used when no technology override provides one.
pub const DEFAULT_SETUP_HOLD_NS: f64 = 0.050;

/// Input pin capacitance used when no technology override provides one.
pub const DEFAULT_INPUT_CAP_PF: f64 = 0.005;

/// Slew table spans 1x to 25x an FO4 delay.
const MAX_SLEW_FO4: f64 = 25.0;

/// Load table spans 1x to 100x a minimum input.
const MAX_LOAD_INPUTS: f64 = 100.0;

/// Clock pins are assumed to present a 5x driver load.
const CLK_CAP_INPUTS: f64 = 5.0;

/// Scalars characterizing one macro for timing and power analysis.
#[derive(Debug, Clone, Builder)]
#[builder(derive(Debug))]
pub struct LibParams {
    pub memory: Memory,
    /// Nominal supply voltage.
    pub voltage: f64,
    /// Macro area in square micrometres.
    pub area_um2: f64,
    /// Standby leakage of one bank in milliwatts.
    pub standby_leakage_mw: f64,
    /// Clock-to-q delay.
    pub access_time_ns: f64,
    pub cycle_time_ns: f64,
    #[builder(default = "DEFAULT_SETUP_HOLD_NS")]
    pub t_setup_ns: f64,
    #[builder(default = "DEFAULT_SETUP_HOLD_NS")]
    pub t_hold_ns: f64,
    pub pin_dynamic_power_mw: f64,
    #[builder(default = "DEFAULT_INPUT_CAP_PF")]
    pub cap_input_pf: f64,
    pub fo4_ps: f64,
}

impl LibParams {
    #[inline]
    pub fn builder() -> LibParamsBuilder {
        LibParamsBuilder::default()
    }
}

#[derive(Serialize)]
struct TimingParams {
    name: String,
    slew_index: String,
    load_index: String,
    min_slew: String,
    max_slew: String,
    max_load: String,
    tcq: String,
    tsetup: String,
    thold: String,
    min_period: String,
    input_cap: String,
    clk_cap: String,
    clk_power: String,
    pin_power: String,
}

#[derive(Serialize)]
struct PortClassParams {
    ports: Vec<String>,
    reads: bool,
    writes: bool,
}

#[derive(Serialize)]
struct LibTemplateParams {
    name: String,
    voltage: String,
    area: String,
    leakage: String,
    data_width: usize,
    addr_width: usize,
    wmask_width: usize,
    timing: TimingParams,
    classes: Vec<PortClassParams>,
}

#[inline]
fn fmt3(value: f64) -> String {
    format!("{value:.3}")
}

impl From<&LibParams> for LibTemplateParams {
    fn from(params: &LibParams) -> Self {
        let memory = &params.memory;

        let fo4_ns = params.fo4_ps / 1e3;
        let min_slew = fo4_ns;
        let max_slew = MAX_SLEW_FO4 * fo4_ns;
        let min_load = params.cap_input_pf;
        let max_load = MAX_LOAD_INPUTS * params.cap_input_pf;

        let timing = TimingParams {
            name: memory.name.to_string(),
            slew_index: format!("{}, {}", fmt3(min_slew), fmt3(max_slew)),
            load_index: format!("{}, {}", fmt3(min_load), fmt3(max_load)),
            min_slew: fmt3(min_slew),
            max_slew: fmt3(max_slew),
            max_load: fmt3(max_load),
            tcq: fmt3(params.access_time_ns),
            tsetup: fmt3(params.t_setup_ns),
            thold: fmt3(params.t_hold_ns),
            min_period: fmt3(params.cycle_time_ns),
            input_cap: fmt3(params.cap_input_pf),
            clk_cap: fmt3(CLK_CAP_INPUTS * params.cap_input_pf),
            clk_power: fmt3(params.pin_dynamic_power_mw * 1e3),
            pin_power: fmt3(params.pin_dynamic_power_mw * 1e1),
        };

        let classes = PortClass::ALL
            .iter()
            .filter_map(|&class| {
                let count = memory.ports.group(class).count;
                (count > 0).then(|| PortClassParams {
                    ports: (0..count).map(|i| format!("{class}{i}")).collect(),
                    reads: class.reads(),
                    writes: class.writes(),
                })
            })
            .collect();

        Self {
            name: memory.name.to_string(),
            voltage: params.voltage.to_string(),
            area: fmt3(params.area_um2),
            leakage: fmt3(params.standby_leakage_mw * 1e3),
            data_width: memory.width,
            addr_width: memory.addr_width(),
            wmask_width: memory.wmask_width(),
            timing,
            classes,
        }
    }
}

pub fn generate_lib(params: &LibParams) -> Result<String> {
    let template = "sram.lib";
    let params = LibTemplateParams::from(params);

    Ok(TEMPLATES.render(template, &Context::from_serialize(params)?)?)
}

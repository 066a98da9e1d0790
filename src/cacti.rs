//! Electrical characterization through CACTI.
//!
//! CACTI reads a configuration file and appends a comma-separated record of
//! its results to `<config>.out`. Only the last record is consumed.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;
use tera::Context;

use crate::config::sram::Memory;
use crate::config::Process;
use crate::error::{RamgenError, Result};
use crate::paths::{out_cacti_cfg, out_cacti_log, out_cacti_results};
use crate::TEMPLATES;

/// Default upper bound on a single CACTI run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of fields consumed from a CACTI result record.
const RECORD_FIELDS: usize = 14;

/// Results of characterizing one macro, as reported by CACTI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterizationRecord {
    pub tech_nm: u32,
    pub capacity_bytes: u64,
    pub associativity: u32,
    pub output_width_bits: u32,
    pub access_time_ns: f64,
    pub cycle_time_ns: f64,
    pub dyn_write_energy_nj: f64,
    pub standby_leakage_per_bank_mw: f64,
    pub area_mm2: f64,
    pub fo4_ps: f64,
    pub width_um: f64,
    pub height_um: f64,
}

/// A source of electrical characterization for a macro.
pub trait Characterizer: Send + Sync {
    /// Characterizes `memory`, keeping any intermediate files in `work_dir`.
    fn characterize(
        &self,
        memory: &Memory,
        process: &Process,
        work_dir: &Path,
    ) -> Result<CharacterizationRecord>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CactiCharacterizer {
    /// Directory containing the `cacti` executable.
    pub cacti_dir: PathBuf,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct CactiConfigParams {
    name: String,
    total_size: usize,
    block_size: usize,
    rw_ports: usize,
    r_ports: usize,
    w_ports: usize,
    tech_um: String,
    bus_width: usize,
    banks: u32,
    cache_type: String,
}

impl CactiCharacterizer {
    pub fn new(cacti_dir: impl Into<PathBuf>) -> Self {
        Self {
            cacti_dir: cacti_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, cfg_path: &Path, work_dir: &Path) -> Result<()> {
        let command = format!("./cacti -infile {}", cfg_path.display());
        let log = std::fs::File::create(out_cacti_log(work_dir))?;

        let child = Command::new(self.cacti_dir.join("cacti"))
            .arg("-infile")
            .arg(cfg_path)
            .stdout(log.try_clone()?)
            .stderr(log)
            .current_dir(&self.cacti_dir)
            .spawn()?;

        let status = wait_with_timeout(child, self.timeout).map_err(|err| match err {
            WaitError::Io(err) => RamgenError::Io(err),
            WaitError::TimedOut => RamgenError::Timeout {
                command: command.clone(),
                timeout: self.timeout,
            },
        })?;

        if !status.success() {
            return Err(RamgenError::Command {
                command,
                status: status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "killed by signal".to_string()),
            });
        }
        Ok(())
    }
}

enum WaitError {
    Io(std::io::Error),
    TimedOut,
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> std::result::Result<ExitStatus, WaitError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            // The child may exit between the poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            return Err(WaitError::TimedOut);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

pub fn generate_cacti_config(memory: &Memory, process: &Process) -> Result<String> {
    let params = CactiConfigParams {
        name: memory.name.to_string(),
        total_size: memory.total_size_bytes(),
        block_size: memory.width_in_bytes(),
        rw_ports: memory.ports.read_write.count,
        r_ports: memory.ports.read.count,
        w_ports: memory.ports.write.count,
        tech_um: process.tech_um().normalize().to_string(),
        bus_width: memory.width_in_bytes() * 8,
        banks: memory.banks.count(),
        cache_type: memory.cache_type.clone(),
    };
    Ok(TEMPLATES.render("cacti.cfg", &Context::from_serialize(params)?)?)
}

impl Characterizer for CactiCharacterizer {
    fn characterize(
        &self,
        memory: &Memory,
        process: &Process,
        work_dir: &Path,
    ) -> Result<CharacterizationRecord> {
        std::fs::create_dir_all(work_dir)?;
        // CACTI runs from its own directory, so every path handed to it is absolute.
        let work_dir = std::fs::canonicalize(work_dir)?;

        let cfg_path = out_cacti_cfg(&work_dir);
        std::fs::write(&cfg_path, generate_cacti_config(memory, process)?)?;

        info!("{}: running CACTI in {:?}", memory.name, self.cacti_dir);
        self.run(&cfg_path, &work_dir)?;

        let output = std::fs::read_to_string(out_cacti_results(&work_dir))?;
        let record = parse_cacti_output(&output)?;
        debug!("{}: {record:?}", memory.name);
        Ok(record)
    }
}

fn field<T: FromStr>(fields: &[&str], idx: usize, name: &str) -> Result<T> {
    fields[idx].trim().parse().map_err(|_| {
        RamgenError::Characterization(format!(
            "field {idx} ({name}) is not a valid number: `{}`",
            fields[idx].trim()
        ))
    })
}

/// Parses the last non-empty record of a CACTI output file.
pub fn parse_cacti_output(output: &str) -> Result<CharacterizationRecord> {
    let line = output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| RamgenError::Characterization("empty CACTI output".to_string()))?;

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < RECORD_FIELDS {
        return Err(RamgenError::Characterization(format!(
            "expected at least {RECORD_FIELDS} fields, found {}",
            fields.len()
        )));
    }

    Ok(CharacterizationRecord {
        tech_nm: field(&fields, 0, "tech_nm")?,
        capacity_bytes: field(&fields, 1, "capacity_bytes")?,
        associativity: field(&fields, 2, "associativity")?,
        output_width_bits: field(&fields, 3, "output_width_bits")?,
        access_time_ns: field(&fields, 4, "access_time_ns")?,
        cycle_time_ns: field(&fields, 5, "cycle_time_ns")?,
        // 6 and 7 are search and read energy
        dyn_write_energy_nj: field(&fields, 8, "dyn_write_energy_nj")?,
        standby_leakage_per_bank_mw: field(&fields, 9, "standby_leakage_per_bank_mW")?,
        area_mm2: field(&fields, 10, "area_mm2")?,
        fo4_ps: field(&fields, 11, "fo4_ps")?,
        width_um: field(&fields, 12, "width_um")?,
        height_um: field(&fields, 13, "height_um")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::process::tests::process_config;
    use crate::config::sram::tests::memory_config;

    pub(crate) const CACTI_RECORD: &str =
        "7, 4096, 1, 32, 0.3125, 0.4211, 0.001, 0.0021, 0.0035, 0.25, 0.0042, 12.5, 41.3, 37.2";

    #[test]
    fn parses_last_record() {
        let output = format!("Tech node (nm), Capacity (bytes), ...\n{CACTI_RECORD}\n\n");
        let record = parse_cacti_output(&output).unwrap();
        assert_eq!(record.tech_nm, 7);
        assert_eq!(record.capacity_bytes, 4096);
        assert_eq!(record.associativity, 1);
        assert_eq!(record.output_width_bits, 32);
        assert_relative_eq!(record.access_time_ns, 0.3125);
        assert_relative_eq!(record.cycle_time_ns, 0.4211);
        assert_relative_eq!(record.dyn_write_energy_nj, 0.0035);
        assert_relative_eq!(record.standby_leakage_per_bank_mw, 0.25);
        assert_relative_eq!(record.area_mm2, 0.0042);
        assert_relative_eq!(record.fo4_ps, 12.5);
        assert_relative_eq!(record.width_um, 41.3);
        assert_relative_eq!(record.height_um, 37.2);
    }

    #[test]
    fn short_record_is_rejected() {
        let err = parse_cacti_output("7, 4096, 1, 32\n").unwrap_err();
        assert!(matches!(err, RamgenError::Characterization(_)));
        let err = parse_cacti_output("").unwrap_err();
        assert!(matches!(err, RamgenError::Characterization(_)));
    }

    #[test]
    fn garbled_field_is_rejected() {
        let garbled = CACTI_RECORD.replace("0.3125", "n/a");
        let err = parse_cacti_output(&garbled).unwrap_err();
        assert!(matches!(err, RamgenError::Characterization(ref msg) if msg.contains("access_time_ns")));
    }

    #[test]
    fn config_file_contents() {
        let process = process_config().validate().unwrap();
        let mut config = memory_config("cfg");
        config.width = 30;
        config.banks = 2;
        let cfg = generate_cacti_config(&config.validate().unwrap(), &process).unwrap();
        // 30 bits round up to 4 bytes per word
        assert!(cfg.contains("-size (bytes) 4096\n"));
        assert!(cfg.contains("-block size (bytes) 4\n"));
        assert!(cfg.contains("-read-write port 1\n"));
        assert!(cfg.contains("-exclusive read port 0\n"));
        assert!(cfg.contains("-UCA bank count 2\n"));
        assert!(cfg.contains("-technology (u) 0.007\n"));
        assert!(cfg.contains("-output/input bus width 32\n"));
        assert!(cfg.contains("-cache type \"cache\"\n"));
    }

    #[cfg(unix)]
    fn fake_cacti(script: &str) -> tempfile::TempDir {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cacti");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    }

    #[cfg(unix)]
    #[test]
    fn runs_cacti_in_work_dir() {
        let cacti = fake_cacti(&format!(
            "#!/bin/sh\necho header > \"$2.out\"\necho '{CACTI_RECORD}' >> \"$2.out\"\n"
        ));
        let work = tempfile::tempdir().unwrap();
        let process = process_config().validate().unwrap();
        let memory = memory_config("fake").validate().unwrap();

        let record = CactiCharacterizer::new(cacti.path())
            .characterize(&memory, &process, work.path())
            .unwrap();
        assert_eq!(record.tech_nm, 7);
        assert!(work.path().join("cacti.cfg").exists());
        assert!(work.path().join("cacti.cfg.out").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_cacti_is_reported() {
        let cacti = fake_cacti("#!/bin/sh\nexit 3\n");
        let work = tempfile::tempdir().unwrap();
        let process = process_config().validate().unwrap();
        let memory = memory_config("fail").validate().unwrap();

        let err = CactiCharacterizer::new(cacti.path())
            .characterize(&memory, &process, work.path())
            .unwrap_err();
        assert!(matches!(err, RamgenError::Command { ref status, .. } if status == "3"));
    }

    #[cfg(unix)]
    #[test]
    fn slow_cacti_times_out() {
        let cacti = fake_cacti("#!/bin/sh\nsleep 10\n");
        let work = tempfile::tempdir().unwrap();
        let process = process_config().validate().unwrap();
        let memory = memory_config("slow").validate().unwrap();

        let start = Instant::now();
        let err = CactiCharacterizer::new(cacti.path())
            .with_timeout(Duration::from_millis(200))
            .characterize(&memory, &process, work.path())
            .unwrap_err();
        assert!(matches!(err, RamgenError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn missing_output_is_io_error() {
        let cacti = fake_cacti("#!/bin/sh\nexit 0\n");
        let work = tempfile::tempdir().unwrap();
        let process = process_config().validate().unwrap();
        let memory = memory_config("quiet").validate().unwrap();

        let err = CactiCharacterizer::new(cacti.path())
            .characterize(&memory, &process, work.path())
            .unwrap_err();
        assert!(matches!(err, RamgenError::Io(_)));
    }
}

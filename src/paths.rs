use std::path::{Path, PathBuf};

/// Directory holding every output of the macro `name`.
pub fn out_dir(output_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(output_dir.as_ref()).join(name)
}

pub fn out_lef(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.lef"))
}

pub fn out_lib(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.lib"))
}

pub fn out_cacti_cfg(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("cacti.cfg")
}

/// CACTI writes its results next to the input file with an `.out` suffix.
pub fn out_cacti_results(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("cacti.cfg.out")
}

pub fn out_cacti_log(work_dir: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("cacti.log")
}

/// Technology override file for the custom technology `tech_name`.
pub fn custom_tech_file(custom_tech_dir: impl AsRef<Path>, tech_name: &str) -> PathBuf {
    PathBuf::from(custom_tech_dir.as_ref()).join(format!("{tech_name}.yml"))
}

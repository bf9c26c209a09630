use anyhow::Result;
use jobq_core::{Paths, RawConfig};

/// Pure file I/O — `config` never opens the Store.
pub fn set(paths: &Paths, key: &str, value: i64) -> Result<()> {
    let mut raw = RawConfig::load(&paths.config_path());
    raw.set_int(key, value);
    raw.save(&paths.config_path())?;
    println!("Set {key} = {value}");
    Ok(())
}

pub fn show(paths: &Paths) -> Result<()> {
    let raw = RawConfig::load(&paths.config_path());
    println!("{}", serde_json::to_string_pretty(&raw.as_value())?);
    Ok(())
}

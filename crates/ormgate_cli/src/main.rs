//! CLI smoke check for `ormgate_core`.
//!
//! Usage: `ormgate_cli <sqlite-path | params.json> [log-dir]`
//!
//! Connects, runs a schema update, reports liveness and disconnects. Output
//! is one `key=value` line per step so scripts can grep it.

use ormgate_core::{
    core_version, default_log_level, init_logging, ConnectParams, MappingSet, OrmFacade,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        eprintln!("usage: ormgate_cli <sqlite-path | params.json> [log-dir]");
        return ExitCode::from(2);
    };

    if let Some(log_dir) = args.next() {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let params = match load_params(&target) {
        Ok(params) => params,
        Err(err) => {
            eprintln!("invalid connection parameters: {err}");
            return ExitCode::from(2);
        }
    };

    println!("ormgate_core version={}", core_version());
    let facade = OrmFacade::sqlite(MappingSet::new());
    let connected = facade.connect(&params);
    println!("connect={connected}");
    if !connected {
        return ExitCode::FAILURE;
    }
    println!("is_connected={}", facade.is_connected());
    println!("update_schema={}", facade.update_schema());
    println!("disconnect={}", facade.disconnect());
    ExitCode::SUCCESS
}

fn load_params(target: &str) -> Result<ConnectParams, ormgate_core::ConfigError> {
    let is_json = Path::new(target)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return ConnectParams::from_json_file(target);
    }
    let params = ConnectParams::sqlite(target);
    params.validate()?;
    Ok(params)
}

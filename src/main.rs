pub mod cli;

use std::io;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, shells::Bash};
use log::{error, info};

use renogy_modbus::device::{self, Device};
use renogy_modbus::protocol;
use renogy_modbus::regs::{self, Register};
use renogy_modbus::{DeviceKind, Reading, RetryPolicy};

use cli::{Cli, Parser, RegName};

enum OutputFormat {
    Plain,
    Json,
}

fn slice_to_column<T: ToString>(data: &[T]) -> String {
    data.iter()
        .map(|x| x.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

fn format_line(reg: &Register, reading: &Reading) -> String {
    if reg.unit.is_empty() {
        format!("{}: {}", reg.label, reading)
    } else {
        format!("{}: {} {}", reg.label, reading, reg.unit)
    }
}

fn cmd_list_registers(kind: DeviceKind, fmt: OutputFormat) -> Result<String> {
    let regs = regs::list_registers(kind);
    Ok(match fmt {
        OutputFormat::Plain => slice_to_column(regs),
        OutputFormat::Json => json::stringify(regs.iter().map(|reg| reg.name).collect::<Vec<_>>()),
    })
}

fn cmd_find_slave_address(cli: &Cli, fmt: OutputFormat) -> Result<String> {
    let mut master = device::open_bus(&cli.portname, cli.force)?;

    info!("Finding slave addresses...");
    let ids = protocol::scan(&mut master, cli.scan_range.iter().copied());

    Ok(match fmt {
        OutputFormat::Plain if ids.is_empty() => "No modbus devices found".to_string(),
        OutputFormat::Plain => format!(
            "Found modbus devices at addresses:\n{}",
            slice_to_column(&ids)
        ),
        OutputFormat::Json => json::stringify(ids),
    })
}

fn select_registers(kind: DeviceKind, names: &[RegName]) -> Result<Vec<&'static Register>> {
    if names.is_empty() {
        return Ok(regs::list_registers(kind).iter().collect());
    }

    names
        .iter()
        .map(|name| {
            regs::find_register(kind, name)
                .ok_or_else(|| anyhow!("Register {} not found for {}", &**name, kind))
        })
        .collect()
}

fn cmd_read(device: &mut dyn Device, regs: &[&Register], fmt: OutputFormat) -> Result<String> {
    let mut readings = Vec::with_capacity(regs.len());
    for &reg in regs {
        let reading = device
            .read(reg)
            .with_context(|| format!("Failed to read {}", reg.name))?;
        readings.push((reg, reading));
    }

    Ok(match fmt {
        OutputFormat::Plain => readings
            .iter()
            .map(|(reg, reading)| format_line(reg, reading))
            .collect::<Vec<String>>()
            .join("\n"),
        OutputFormat::Json => {
            let mut obj = json::JsonValue::new_object();
            for (reg, reading) in readings {
                obj[reg.name] = reading.into();
            }
            obj.dump()
        }
    })
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(
            Bash,
            &mut cli::Cli::command(),
            "renogy-tool",
            &mut io::stdout(),
        );

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    if cli.list_registers {
        return cmd_list_registers(cli.device, fmt);
    }

    if cli.find_slave_address {
        return cmd_find_slave_address(&cli, fmt);
    }

    let selected = select_registers(cli.device, &cli.names)?;
    let retry = RetryPolicy::new(cli.retries, Duration::from_millis(cli.retry_delay_ms));
    let reader = device::open_session(&cli.portname, cli.slaveaddress, retry, cli.force)
        .with_context(|| format!("Can't open {} on '{}'", cli.device, cli.portname))?;
    let mut device_box = device::make_device(cli.device, reader);

    cmd_read(device_box.as_mut(), &selected, fmt)
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

use std::fs;

use crate::backend::asm::{parse_module, RISCV32};
use crate::backend::{allocate_module, AllocationReport, AllocationSettings};
use crate::error;
use crate::options::Options;

// Reads, allocates and prints every input file
// Errors are reported per file, the remaining files are still processed
pub fn drive(options: Options) -> Result<(), ()> {
    log::info!("driver started");
    let settings = AllocationSettings::from(&options.allocation);
    let mut output = String::new();
    let mut failed = false;

    for filename in &options.input {
        match allocate_file(filename, &settings) {
            Ok((text, reports)) => {
                output.push_str(&text);
                if options.allocation.report {
                    for report in &reports {
                        eprintln!("{}", summary(report));
                    }
                }
            }
            Err(()) => failed = true,
        }
    }

    match &options.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &output) {
                error!(path, "could not write output: {}", e);
                return Err(());
            }
        }
        None => print!("{}", output),
    }

    if failed {
        Err(())
    } else {
        Ok(())
    }
}

fn allocate_file(
    filename: &str,
    settings: &AllocationSettings,
) -> Result<(String, Vec<AllocationReport>), ()> {
    log::info!("Allocating {}", filename);
    let text = fs::read_to_string(filename).map_err(|e| {
        error!(filename, "could not read input: {}", e);
    })?;

    let mut module = parse_module(&text, &RISCV32).map_err(|e| {
        let location = format!("{}:{}:{}", filename, e.span.line(), e.span.column());
        error!(location, "{}", e.kind);
    })?;

    let reports = allocate_module(&mut module, &RISCV32, settings).map_err(|e| {
        error!(filename, "{}", e);
    })?;

    Ok((module.to_string(), reports))
}

fn summary(report: &AllocationReport) -> String {
    format!(
        "{}: {} rounds, {} spilled, {} moves coalesced, {} moves removed, {} callee saved, frame {} bytes",
        report.function,
        report.rounds,
        report.spilled.len(),
        report.coalesced_moves,
        report.removed_moves,
        report.callee_saved.len(),
        report.frame_size
    )
}

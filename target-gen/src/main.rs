pub mod commands;

use std::num::ParseIntError;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gd32f30x_flash_target::Variant;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    blob::{cmd_blob, cmd_decode},
    export::cmd_export,
    test::{cmd_test, TestOptions},
};

#[derive(clap::Parser)]
#[clap(
    name = "target-gen",
    version,
    about = "Export, encode and dry-run the GD32F30x flash agent descriptions.",
    long_about = None
)]
enum TargetGen {
    /// Export the flash properties of a variant as YAML.
    Export {
        /// The device variant: hd, xd, cl or option-bytes.
        #[clap(long, short, default_value = "hd")]
        variant: Variant,
        /// The file to write, standard output if omitted.
        output: Option<PathBuf>,
    },
    /// Write the binary `FlashDevice` description of a variant.
    Blob {
        /// The device variant: hd, xd, cl or option-bytes.
        #[clap(long, short, default_value = "hd")]
        variant: Variant,
        /// The file to write.
        output: PathBuf,
    },
    /// Decode a binary `FlashDevice` description and print it as YAML.
    Decode {
        /// A file containing the description.
        input: PathBuf,
        /// Offset of the description inside the file.
        #[clap(long, value_parser = parse_u32, default_value = "0")]
        offset: u32,
    },
    /// Run the agent against the simulated controller: erase, program and verify.
    Test {
        /// The device variant: hd, xd, cl or option-bytes.
        #[clap(long, short, default_value = "hd")]
        variant: Variant,
        /// Address of the first sector to exercise, the device start if omitted.
        #[clap(long, value_parser = parse_u32)]
        address: Option<u32>,
        /// Number of bytes to program, one page if omitted.
        #[clap(long, value_parser = parse_u32)]
        length: Option<u32>,
        /// Polls for which the simulated controller reports BUSY after each command.
        #[clap(long, default_value_t = 0)]
        busy_polls: u32,
        /// Pretend the watchdog was started by hardware.
        #[clap(long)]
        hardware_watchdog: bool,
    },
}

fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    parse_int::parse(input)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match TargetGen::parse() {
        TargetGen::Export { variant, output } => cmd_export(variant, output.as_deref())?,
        TargetGen::Blob { variant, output } => cmd_blob(variant, &output)?,
        TargetGen::Decode { input, offset } => cmd_decode(&input, offset)?,
        TargetGen::Test {
            variant,
            address,
            length,
            busy_polls,
            hardware_watchdog,
        } => cmd_test(&TestOptions {
            variant,
            address,
            length,
            busy_polls,
            hardware_watchdog,
        })?,
    }

    Ok(())
}

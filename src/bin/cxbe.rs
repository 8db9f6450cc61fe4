//! Convert a Win32 PE built for the Xbox subsystem into an XBE image.
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xbe_relink::cli::{default_output_path, run, warning_sink, write_dumpinfo};
use xbe_relink::pe::PortableExecutable;
use xbe_relink::translate::{pe_to_xbe, PeToXbeOptions};
use xbe_relink::xbe::xor::Mode;

/// Convert a Win32 PE/EXE built for the Xbox subsystem into an XBE.
#[derive(Parser)]
#[command(name = "cxbe", version, about)]
struct Args {
    /// Input .exe file.
    input: PathBuf,
    /// Output .xbe file. Defaults to the input path with its extension
    /// swapped to `.xbe`.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a struct/field dump of the built XBE to this path.
    #[arg(long)]
    dumpinfo: Option<PathBuf>,
    /// Title stamped into the certificate.
    #[arg(short, long, default_value = "Untitled")]
    title: String,
    /// Obfuscation to apply: `retail` or `debug`.
    #[arg(long, default_value = "retail")]
    mode: Mode,
}

fn main() -> ExitCode {
    let args = Args::parse();
    run(|| {
        let binary = std::fs::read(&args.input)?;
        let pe = PortableExecutable::load(&binary)?;

        let options = PeToXbeOptions::new(args.title, args.mode);
        let mut sink = warning_sink();
        let mut xbe = pe_to_xbe(&pe, options, &mut sink)?;

        write_dumpinfo(args.dumpinfo.as_deref(), &xbe, &mut sink);

        let output = args.out.unwrap_or_else(|| default_output_path(&args.input, "xbe"));
        std::fs::write(output, xbe.emit())?;
        Ok(())
    })
}

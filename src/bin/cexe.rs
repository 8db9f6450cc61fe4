//! Convert an Xbox Executable back into a Win32 PE/EXE.
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xbe_relink::cli::{default_output_path, run, warning_sink, write_dumpinfo};
use xbe_relink::translate::xbe_to_pe;
use xbe_relink::xbe::Xbe;

/// Convert an XBE image back into a Win32 PE/EXE.
#[derive(Parser)]
#[command(name = "cexe", version, about)]
struct Args {
    /// Input .xbe file.
    input: PathBuf,
    /// Output .exe file. Defaults to the input path with its extension
    /// swapped to `.exe`.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a struct/field dump of the source XBE to this path.
    #[arg(long)]
    dumpinfo: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    run(|| {
        let binary = std::fs::read(&args.input)?;
        let xbe = Xbe::load(&binary)?;
        let mut sink = warning_sink();
        write_dumpinfo(args.dumpinfo.as_deref(), &xbe, &mut sink);

        let (pe, mode) = xbe_to_pe(&xbe)?;
        eprintln!("detected obfuscation mode: {mode}");

        let output = args.out.unwrap_or_else(|| default_output_path(&args.input, "exe"));
        std::fs::write(output, pe.emit())?;
        Ok(())
    })
}

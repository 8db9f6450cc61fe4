//! Convert a Win32 PE built for the Xbox subsystem into a DXT debug monitor
//! loadable image, identity-mapping every section.
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xbe_relink::cli::{default_output_path, run, warning_sink, write_dumpinfo};
use xbe_relink::pe::PortableExecutable;
use xbe_relink::translate::pe_to_dxt;

/// Convert a Win32 PE/EXE into a DXT debug monitor loadable image.
#[derive(Parser)]
#[command(name = "cdxt", version, about)]
struct Args {
    /// Input .exe file.
    input: PathBuf,
    /// Output .dxt file. Defaults to the input path with its extension
    /// swapped to `.dxt`.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a struct/field dump of the built DXT image to this path.
    #[arg(long)]
    dumpinfo: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    run(|| {
        let binary = std::fs::read(&args.input)?;
        let mut pe = PortableExecutable::load(&binary)?;

        pe_to_dxt::translate(&mut pe)?;

        let mut sink = warning_sink();
        write_dumpinfo(args.dumpinfo.as_deref(), &pe, &mut sink);

        let output = args.out.unwrap_or_else(|| default_output_path(&args.input, "dxt"));
        std::fs::write(output, pe.emit())?;
        Ok(())
    })
}

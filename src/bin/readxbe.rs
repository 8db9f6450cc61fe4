//! Dump the header, certificate, section table, and library versions of an
//! XBE image. Read-only: never writes a file.
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xbe_relink::cli::{run, warning_sink, write_dumpinfo};
use xbe_relink::xbe::Xbe;

/// Print an XBE image's structure to stdout.
#[derive(Parser)]
#[command(name = "readxbe", version, about)]
struct Args {
    /// Input .xbe file.
    input: PathBuf,
    /// Also write the same struct/field dump to this path.
    #[arg(long)]
    dumpinfo: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    run(|| {
        let binary = std::fs::read(&args.input)?;
        let xbe = Xbe::load(&binary)?;
        println!("{xbe}");
        if let Err(e) = xbe.verify_digests() {
            eprintln!("warning: {e}");
        }

        let mut sink = warning_sink();
        write_dumpinfo(args.dumpinfo.as_deref(), &xbe, &mut sink);
        Ok(())
    })
}

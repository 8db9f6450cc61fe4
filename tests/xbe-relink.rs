use datatest_stable::Result;
use std::fs;
use std::path::Path;
use xbe_relink::pe::PortableExecutable;
use xbe_relink::xbe::Xbe;

fn pe_gauntlet(path: &Path) -> Result<()> {
    let binary = fs::read(path)?;
    let pe = PortableExecutable::load(&binary)?;

    assert_eq!(pe.optional.win32_version_value, 0);
    assert_eq!(pe.optional.loader_flags, 0);
    assert_eq!(pe.optional.data_directories.architecture.size, 0);
    assert_eq!(pe.optional.data_directories.reserved.size, 0);

    Ok(())
}

fn xbe_gauntlet(path: &Path) -> Result<()> {
    let binary = fs::read(path)?;
    let xbe = Xbe::load(&binary)?;

    xbe.verify_digests()?;
    assert_eq!(xbe.sections.len(), xbe.header.section_count as usize);

    Ok(())
}

datatest_stable::harness! {
    { test = pe_gauntlet, root = "tests/pe", pattern = r"\.((dat)|(exe)|(dll))$" },
    { test = xbe_gauntlet, root = "tests/xbe", pattern = r"\.xbe$" },
}

use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::{copy_items, dir::CopyOptions};

/// Mirrors `assets/` (typeface font, matcap textures) into `OUT_DIR` so the
/// native binary and the web bundle ship the same files.
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.exists() {
        return Ok(());
    }

    let mut options = CopyOptions::new();
    options.overwrite = true;
    copy_items(&[assets], env::var("OUT_DIR")?, &options)?;

    Ok(())
}

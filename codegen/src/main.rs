//! Regenerates `spb-types/src/generated/sparkplug_payload.rs` from `protos/sparkplug_b.proto`.

use std::io::{Error, ErrorKind, Result};
use std::path::Path;

fn main() -> Result<()> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace = dir
        .parent()
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "codegen must live inside the workspace"))?;
    let protodir = workspace.join("protos");
    let sparkplug_proto = "sparkplug_b.proto";

    let outdir = workspace.join("spb-types/src/generated");

    prost_build::Config::new()
        .out_dir(&outdir)
        .compile_protos(&[sparkplug_proto], &[protodir])?;

    std::fs::rename(
        outdir.join("org.eclipse.tahu.protobuf.rs"),
        outdir.join("sparkplug_payload.rs"),
    )?;

    Ok(())
}

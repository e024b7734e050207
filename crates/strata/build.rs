use std::error::Error;

use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    EmitBuilder::builder()
        .cargo_target_triple()
        .git_sha(true)
        .emit()?;
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=STRATA_PROFILE={profile}");
    Ok(())
}

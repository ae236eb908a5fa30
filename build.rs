use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

/// Point Windows users at a vcpkg FFmpeg when `ffmpeg-sys-next` has nothing
/// explicit to go on. The caption filters additionally need an FFmpeg built
/// with freetype, which vcpkg only provides with the `freetype` feature.
fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT").map(PathBuf::from) else {
        warn("FFMPEG_DIR is not set. Install FFmpeg with `vcpkg install ffmpeg[freetype]` and set VCPKG_ROOT or FFMPEG_DIR.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    report_vcpkg_install(&vcpkg_root.join("installed").join(triplet));
}

fn report_vcpkg_install(ffmpeg_dir: &Path) {
    if !ffmpeg_dir.exists() {
        warn(format!(
            "VCPKG_ROOT is set but no FFmpeg install was found at {}.",
            ffmpeg_dir.display()
        ));
        return;
    }

    warn(format!(
        "Using vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} to make discovery explicit.",
        ffmpeg_dir.display()
    ));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("Set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build.");
    }
}

//! End-to-end exercises of the `esi` binary (spec.md §6 exit codes).

use std::process::Command;

use esi_volume::{write_volume, Volume};

fn esi_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_esi"))
}

#[test]
fn all_background_mri_exits_with_code_two() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blank.esv");
    let output = dir.path().join("out.esv");
    write_volume(&input, &Volume::new(8, 8, 8, 1.0)).unwrap();

    let status = esi_bin()
        .arg(&input)
        .arg("--recipe")
        .arg("1a")
        .arg("--out")
        .arg(&output)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(2));
    assert!(!output.exists());
}

#[test]
fn missing_input_file_exits_with_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("does-not-exist.esv");
    let output = dir.path().join("out.esv");

    let status = esi_bin()
        .arg(&input)
        .arg("--out")
        .arg(&output)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[test]
fn ellipsoid_mri_strips_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("head.esv");
    let output = dir.path().join("brain.esv");

    let side = 48usize;
    let mut mri = Volume::new(side, side, side, 1.0);
    let center = side as f64 / 2.0;
    let a = side as f64 * 0.28;
    for idx in 0..mri.data().len() {
        let (i, j, k) = mri.data().xyz_of(idx);
        let dx = (i as f64 - center) / a;
        let dy = (j as f64 - center) / a;
        let dz = (k as f64 - center) / a;
        let r2 = dx * dx + dy * dy + dz * dz;
        let value = if r2 <= 1.0 {
            200.0
        } else if r2 <= 1.3 {
            50.0
        } else {
            0.0
        };
        mri.set(i, j, k, value).unwrap();
    }
    write_volume(&input, &mri).unwrap();

    let status = esi_bin()
        .arg(&input)
        .arg("--recipe")
        .arg("1a")
        .arg("--out")
        .arg(&output)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(output.exists());
}

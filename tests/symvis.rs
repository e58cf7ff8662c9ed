//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of SYMVIS.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::{fs, path::PathBuf, process::Command};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Fresh output directory unique to the calling test.
fn output_dir(test: &str) -> Result<PathBuf, std::io::Error> {
    let dir = std::env::temp_dir()
        .join(format!("symvis-test-{}-{}", std::process::id(), test));

    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }

    Ok(dir)
}

#[test]
fn invalid_argument() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("-q");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn missing_config_argument() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("CONFIG"));

    Ok(())
}

#[test]
fn missing_output_dir() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("-o DIR"));

    Ok(())
}

#[test]
fn invalid_dual_mode() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("--defines").arg("x");
    cmd.arg("--dual").arg("dynamic");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("--dual static|shared"));

    Ok(())
}

#[test]
fn config_does_not_exist() -> TestResult {
    let dir = output_dir("config_does_not_exist")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/does-not-exist.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert()
        .failure()
        .code(exitcode::NOINPUT)
        .stderr(predicate::str::contains("does-not-exist.xml"))
        .stderr(predicate::str::contains("fatal:"));

    assert!(!dir.exists());

    Ok(())
}

#[test]
fn bad_root_element() -> TestResult {
    let dir = output_dir("bad_root_element")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/bad-root.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("`package`"));

    Ok(())
}

#[test]
fn unknown_platform() -> TestResult {
    let dir = output_dir("unknown_platform")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("-o").arg(&dir);
    cmd.arg("-p").arg("plan9");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("unknown platform `plan9`"));

    assert!(!dir.exists());

    Ok(())
}

#[test]
fn cyclic_dependency_writes_nothing() -> TestResult {
    let dir = output_dir("cyclic_dependency_writes_nothing")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/cycle.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("cyclic"))
        .stderr(predicate::str::contains("liba -> libb -> liba"));

    assert!(!dir.exists());

    Ok(())
}

#[test]
fn unresolved_dual_use_writes_nothing() -> TestResult {
    let dir = output_dir("unresolved_dual_use_writes_nothing")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/unresolved.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("libdual"));

    assert!(!dir.exists());

    Ok(())
}

#[test]
fn dual_option_resolves_dual_use() -> TestResult {
    let dir = output_dir("dual_option_resolves_dual_use")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/unresolved.xml");
    cmd.arg("-o").arg(&dir);
    cmd.arg("--dual").arg("static");
    cmd.assert().success();

    let libdual = fs::read_to_string(dir.join("libdual_export.h"))?;
    assert!(libdual.contains("#define LIBDUAL_PUBLIC\n"));

    assert!(dir.join("prog_export.h").exists());

    fs::remove_dir_all(&dir)?;

    Ok(())
}

#[test]
fn writes_headers_per_consumer() -> TestResult {
    let dir = output_dir("writes_headers_per_consumer")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert().success();

    let mut written = fs::read_dir(&dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into()))
        .collect::<Result<Vec<String>, _>>()?;
    written.sort();

    assert_eq!(
        vec![
            "libinner_export.h",
            "libouter_export.libouter.h",
            "libouter_export.x.h",
            "libouter_export.y.h",
            "x_export.h",
            "y_export.h",
        ],
        written,
    );

    let inner = fs::read_to_string(dir.join("libinner_export.h"))?;
    assert!(inner.contains("#if defined(LIBINNER_EXPORTS)\n"));
    assert!(inner
        .contains("#  define LIBINNER_PUBLIC __declspec(dllexport)\n"));
    assert!(inner
        .contains("#  define LIBINNER_PUBLIC __declspec(dllimport)\n"));

    let for_x = fs::read_to_string(dir.join("libouter_export.x.h"))?;
    assert!(for_x.contains("__declspec(dllimport)"));

    let for_y = fs::read_to_string(dir.join("libouter_export.y.h"))?;
    assert!(for_y.contains("#define LIBOUTER_PUBLIC\n"));
    assert!(!for_y.contains("__declspec"));

    fs::remove_dir_all(&dir)?;

    Ok(())
}

#[test]
fn platform_option_overrides_config() -> TestResult {
    let dir = output_dir("platform_option_overrides_config")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("-o").arg(&dir);
    cmd.arg("--platform").arg("linux");
    cmd.assert().success();

    let inner = fs::read_to_string(dir.join("libinner_export.h"))?;
    assert!(inner.contains(
        "#define LIBINNER_PUBLIC [[gnu::visibility(\"default\")]]\n"
    ));
    assert!(!inner.contains("#if defined"));

    fs::remove_dir_all(&dir)?;

    Ok(())
}

#[test]
fn prints_compile_defines() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("--defines").arg("y");
    cmd.assert()
        .success()
        .stdout("Y_STATIC\nLIBOUTER_STATIC\n");

    Ok(())
}

#[test]
fn compile_defines_unknown_module() -> TestResult {
    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("--defines").arg("z");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("`z`"));

    Ok(())
}

#[test]
fn rerun_removes_stale_consumer_headers() -> TestResult {
    let dir = output_dir("rerun_removes_stale_consumer_headers")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert().success();

    assert!(dir.join("libouter_export.x.h").exists());

    // Unrelated files in the output directory must survive.
    fs::write(dir.join("notes.txt"), "keep")?;
    fs::write(dir.join("other_export.h"), "keep")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/outer-shared.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert().success();

    let mut written = fs::read_dir(&dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into()))
        .collect::<Result<Vec<String>, _>>()?;
    written.sort();

    assert_eq!(
        vec![
            "libinner_export.h",
            "libouter_export.h",
            "notes.txt",
            "other_export.h",
            "x_export.h",
            "y_export.h",
        ],
        written,
    );

    fs::remove_dir_all(&dir)?;

    Ok(())
}

#[test]
fn colliding_header_names_write_nothing() -> TestResult {
    let dir = output_dir("colliding_header_names_write_nothing")?;

    let mut cmd = Command::cargo_bin("symvis")?;
    cmd.arg("tests/data/collision.xml");
    cmd.arg("-o").arg(&dir);
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("`sub_lib_export.h`"));

    assert!(!dir.exists());

    Ok(())
}

//! Fake runtime executables written as POSIX shell scripts.
//!
//! Realism level: **FAKE**: the scripts answer `--version` and emulate the
//! side effects the installers rely on (creating `node_modules`, a venv
//! layout, a synced `.venv`). Only usable on unix hosts.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable script at `path`, creating parent directories.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn write_script(path: &Path, body: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("write_script: failed to create {}: {e}", parent.display()));
    }
    fs::write(path, format!("#!/bin/sh\n{body}"))
        .unwrap_or_else(|e| panic!("write_script: failed to write {}: {e}", path.display()));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|e| panic!("write_script: failed to chmod {}: {e}", path.display()));
    }
    path.to_path_buf()
}

/// Body of a fake `node` binary reporting `v{version}`.
///
/// Any other invocation (e.g. `node npm-cli.js ci ...`) creates
/// `node_modules` in the working directory, or exits 1 with an npm-style
/// error when `fail_install` is set.
pub fn node_script(version: &str, fail_install: bool) -> String {
    let install = if fail_install {
        "echo 'npm ERR! code EUSAGE' >&2\nexit 1\n".to_string()
    } else {
        "mkdir -p node_modules\necho \"added 0 packages\"\n".to_string()
    };
    format!(
        "if [ \"$1\" = \"--version\" ]; then\n  echo v{version}\n  exit 0\nfi\n{install}"
    )
}

/// A complete fake `node` executable, shebang included, for placing inside
/// served archives.
pub fn node_executable(version: &str) -> String {
    format!("#!/bin/sh\n{}", node_script(version, false))
}

/// Lay out a fake extracted Node.js distribution at `node_dir`
/// (`bin/node` plus `lib/node_modules/npm/bin/npm-cli.js`).
pub fn fake_node_dist(node_dir: &Path, version: &str) {
    write_script(&node_dir.join("bin/node"), &node_script(version, false));
    let npm_cli = node_dir.join("lib/node_modules/npm/bin/npm-cli.js");
    if let Some(parent) = npm_cli.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("fake_node_dist: failed to create {}: {e}", parent.display()));
    }
    fs::write(&npm_cli, "// npm\n")
        .unwrap_or_else(|e| panic!("fake_node_dist: failed to write npm-cli.js: {e}"));
}

/// Populate `bin_dir` with `node` and `npm` scripts, as found on a PATH.
pub fn fake_path_node(bin_dir: &Path, version: &str) {
    write_script(&bin_dir.join("node"), &node_script(version, false));
    write_script(
        &bin_dir.join("npm"),
        "mkdir -p node_modules\necho \"added 0 packages\"\n",
    );
}

/// A fake Python interpreter reporting `Python {version}`.
///
/// `-m venv <dir>` creates `<dir>/bin/pip` (which accepts any arguments) and
/// `<dir>/bin/<server_binary>`.
pub fn fake_python(path: &Path, version: &str, server_binary: &str) -> PathBuf {
    let body = format!(
        r#"if [ "$1" = "--version" ]; then
  echo "Python {version}"
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  mkdir -p "$3/bin"
  printf '#!/bin/sh\necho "Successfully installed"\n' > "$3/bin/pip"
  chmod 755 "$3/bin/pip"
  printf '#!/bin/sh\n' > "$3/bin/{server_binary}"
  chmod 755 "$3/bin/{server_binary}"
  exit 0
fi
echo "unexpected arguments: $*" >&2
exit 2
"#
    );
    write_script(path, &body)
}

/// A fake `uv` whose `sync` creates `.venv/bin/python` and
/// `.venv/bin/<server_binary>` in the working directory.
pub fn fake_uv(path: &Path, server_binary: &str) -> PathBuf {
    let body = format!(
        r#"if [ "$1" = "--version" ]; then
  echo "uv 0.9.26"
  exit 0
fi
if [ "$1" = "sync" ]; then
  mkdir -p .venv/bin
  printf '#!/bin/sh\n' > .venv/bin/python
  printf '#!/bin/sh\n' > .venv/bin/{server_binary}
  chmod 755 .venv/bin/python .venv/bin/{server_binary}
  echo "Resolved 1 package"
  exit 0
fi
exit 2
"#
    );
    write_script(path, &body)
}

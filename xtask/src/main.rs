//! Development tasks for spin
//!
//! Usage:
//!   cargo xtask install [--prefix DIR]    Install release binary and man pages (requires sudo)
//!   cargo xtask uninstall [--prefix DIR]  Remove installed files (requires sudo)
//!   cargo xtask dist                      Build release binary and man pages for distribution

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const DEFAULT_PREFIX: &str = "/usr/local";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let prefix = args
        .iter()
        .position(|a| a == "--prefix")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFIX));

    let result = match args[0].as_str() {
        "install" => install(&prefix),
        "uninstall" => uninstall(&prefix),
        "dist" => dist().map(|_| ()),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
spin development tasks

Usage: cargo xtask <COMMAND> [OPTIONS]

Commands:
  install    Build release binary and install it with its man pages (requires sudo)
  uninstall  Remove spin and its man pages (requires sudo)
  dist       Build optimized release binary and man pages for distribution

Options:
  --prefix DIR   Installation prefix (default: /usr/local)

Examples:
  cargo xtask install                 # Install to /usr/local
  cargo xtask install --prefix /usr   # Install system-wide
  cargo xtask uninstall
"#
    );
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

/// Man pages rendered by build.rs into target/release/build/spin-*/out/man
fn find_man_pages(root: &Path) -> Vec<PathBuf> {
    let build_dir = root.join("target/release/build");
    let Ok(entries) = std::fs::read_dir(&build_dir) else {
        return Vec::new();
    };

    let mut pages: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("spin-"))
                .unwrap_or(false)
        })
        .filter_map(|p| std::fs::read_dir(p.join("out/man")).ok())
        .flat_map(|dir| dir.filter_map(|e| e.ok()).map(|e| e.path()))
        .filter(|p| p.extension().map(|x| x == "1").unwrap_or(false))
        .collect();
    pages.sort();
    pages.dedup_by(|a, b| a.file_name() == b.file_name());
    pages
}

/// Build the release binary (and man pages); returns the binary path
fn dist() -> anyhow::Result<PathBuf> {
    let root = project_root()?;

    println!("==> Building release binary...");

    let status = Command::new("cargo")
        .args(["build", "--release"])
        .env("SPIN_GEN_MANPAGES", "1")
        .current_dir(&root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }

    let binary = root.join("target/release/spin");
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    println!("==> Built: {:?}", binary);

    for page in find_man_pages(&root) {
        println!("    man page: {:?}", page);
    }

    let _ = Command::new(&binary).arg("--version").status();

    Ok(binary)
}

fn sudo_install(source: &Path, target: &Path, mode: &str) -> anyhow::Result<()> {
    let status = Command::new("sudo")
        .arg("install")
        .arg(format!("-Dm{}", mode))
        .arg(source)
        .arg(target)
        .status()?;

    if !status.success() {
        anyhow::bail!("Install of {:?} failed (sudo required)", target);
    }
    Ok(())
}

/// Build release binary and install under `prefix`
fn install(prefix: &Path) -> anyhow::Result<()> {
    let binary = dist()?;
    let root = project_root()?;

    let target = prefix.join("bin/spin");
    println!("==> Installing to {:?}...", target);
    sudo_install(&binary, &target, "755")?;

    let man_dir = prefix.join("share/man/man1");
    for page in find_man_pages(&root) {
        if let Some(name) = page.file_name() {
            sudo_install(&page, &man_dir.join(name), "644")?;
        }
    }

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {:?}", target);
    println!("Run 'spin check' to see which devices were detected.");

    Ok(())
}

/// Remove spin and its man pages from `prefix`
fn uninstall(prefix: &Path) -> anyhow::Result<()> {
    let binary = prefix.join("bin/spin");
    println!("==> Removing {:?}...", binary);

    let status = Command::new("sudo").arg("rm").arg("-f").arg(&binary).status()?;
    if !status.success() {
        anyhow::bail!("Uninstall failed (sudo required)");
    }

    let man_dir = prefix.join("share/man/man1");
    if let Ok(entries) = std::fs::read_dir(&man_dir) {
        let pages: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n == "spin.1" || (n.starts_with("spin-") && n.ends_with(".1")))
                    .unwrap_or(false)
            })
            .collect();
        if !pages.is_empty() {
            let _ = Command::new("sudo").arg("rm").arg("-f").args(&pages).status();
        }
    }

    println!("==> Uninstalled successfully!");
    Ok(())
}

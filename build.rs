//! Renders spin(1) plus one page per client command (spin-toggle(1),
//! spin-rotate(1), spin-status(1), ...) from the clap definitions.
//! `cargo xtask install` picks them up from OUT_DIR/man.

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs::{self, File};
use std::io::Error;
use std::path::PathBuf;

// Include the CLI module
include!("src/cli.rs");

fn main() -> Result<(), Error> {
    // debug builds skip this unless SPIN_GEN_MANPAGES is set
    let profile = env::var("PROFILE").unwrap_or_default();
    let generate = env::var("SPIN_GEN_MANPAGES").is_ok() || profile == "release";

    if !generate {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| "target".to_string()));
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let cmd = Cli::command();
    render(&cmd, "spin", &man_dir)?;

    let mut pages = 1;
    for subcommand in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        let page = format!("spin-{}", subcommand.get_name());
        render(subcommand, &page, &man_dir)?;
        pages += 1;
    }

    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=SPIN_GEN_MANPAGES");
    println!(
        "cargo:warning=spin: {} man pages in {}",
        pages,
        man_dir.display()
    );

    Ok(())
}

fn render(cmd: &clap::Command, page: &str, man_dir: &std::path::Path) -> Result<(), Error> {
    let mut file = File::create(man_dir.join(format!("{}.1", page)))?;
    Man::new(cmd.clone()).title(page).render(&mut file)
}

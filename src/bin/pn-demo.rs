//! Round-robin packet dispatcher running on the net engine.
//!
//! Builds the dispatcher net (two channels alternating via select places,
//! a package counter with an external reset flag) and pushes a number of
//! packages through it, printing the marking after each dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Arg, Command};
use itertools::Itertools;

use ptnet::{NetRuntime, condition};

const PLACES: [&str; 7] = [
    "InputWaitPackage",
    "WaitPackage",
    "ChannelA",
    "ChannelB",
    "SelectA",
    "SelectB",
    "PackageCounter",
];

fn make_parser() -> Command {
    Command::new("pn-demo")
        .about("Round-robin packet dispatcher running on the ptnet engine")
        .arg(
            Arg::new("packages")
                .short('n')
                .long("packages")
                .help("Number of packages to dispatch")
                .default_value("4"),
        )
        .arg(
            Arg::new("reset-at")
                .long("reset-at")
                .value_name("K")
                .help("Raise the counter reset flag before dispatching package K"),
        )
}

fn build_dispatcher(net: &NetRuntime, reset: Arc<AtomicBool>) -> Result<()> {
    net.add_place("InputWaitPackage", 0, None, None, true)?;
    net.add_place("WaitPackage", 1, None, None, false)?;
    net.add_place("ChannelA", 0, None, None, false)?;
    net.add_place("ChannelB", 0, None, None, false)?;
    net.add_place("SelectA", 1, None, None, false)?;
    net.add_place("SelectB", 0, None, None, false)?;
    net.add_place("PackageCounter", 0, None, None, false)?;

    net.create_transition(
        &["InputWaitPackage", "WaitPackage", "SelectA"],
        &["ChannelA"],
        Vec::new(),
        &[],
    )?;
    net.create_transition(
        &["InputWaitPackage", "WaitPackage", "SelectB"],
        &["ChannelB"],
        Vec::new(),
        &[],
    )?;
    net.create_transition(
        &["ChannelA"],
        &["WaitPackage", "SelectB", "PackageCounter"],
        Vec::new(),
        &[],
    )?;
    net.create_transition(
        &["ChannelB"],
        &["WaitPackage", "SelectA", "PackageCounter"],
        Vec::new(),
        &[],
    )?;
    net.create_transition(
        &["PackageCounter"],
        &[],
        vec![condition(move || reset.load(Ordering::SeqCst))],
        &[],
    )?;
    Ok(())
}

fn print_marking(net: &NetRuntime) -> Result<()> {
    let marking = PLACES
        .iter()
        .map(|place| {
            net.number_of_tokens(place)
                .map(|tokens| format!("{place}={tokens}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    println!("  {}", marking.iter().join("  "));
    Ok(())
}

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let env = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(env);
    }

    let matches = make_parser().get_matches();
    let packages: u64 = matches
        .get_one::<String>("packages")
        .expect("has default")
        .parse()
        .context("invalid --packages")?;
    let reset_at: Option<u64> = matches
        .get_one::<String>("reset-at")
        .map(|raw| raw.parse().context("invalid --reset-at"))
        .transpose()?;

    let reset = Arc::new(AtomicBool::new(false));
    let net = NetRuntime::new();
    build_dispatcher(&net, Arc::clone(&reset))?;
    net.diagnostics().log();

    println!("initial marking");
    print_marking(&net)?;

    for package in 1..=packages {
        if reset_at == Some(package) {
            reset.store(true, Ordering::SeqCst);
            println!("raising counter reset flag");
        }
        net.increment_input_place("InputWaitPackage")
            .context("dispatch failed")?;
        println!("after package {package}");
        print_marking(&net)?;
    }

    Ok(())
}

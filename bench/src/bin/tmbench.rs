use std::env;
use std::io;
use std::process::ExitCode;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use tmsync_bench::harness::{
    parse_config, run_repetitions, select_policy, Registry, Report, RunSpec, Statistics,
};

/// Messages from the main thread to the reporter.
enum Message {
    Begin(RunSpec),
    Repetition(Report),
}

fn usage() -> ExitCode {
    eprintln!("usage: tmbench [none|mutex|tm] < tests.cfg");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let arg = args.next();
    if args.next().is_some() {
        return usage();
    }
    let policy = match select_policy(arg.as_deref()) {
        Ok(policy) => policy,
        Err(e) => {
            eprintln!("{e}");
            return usage();
        }
    };
    eprintln!("Tester running with {} synchronization", policy.label());

    let registry = Registry::builtin();

    // The channel of messages between the main thread and the reporter.
    let (report_sender, report_receiver) = unbounded();

    // The one-shot channel of stats between the reporter and the main thread.
    let (stat_sender, stat_receiver) = bounded(0);

    // The reporter prints each repetition, and a summary line after the last one of a run line.
    let reporter = thread::spawn(move || {
        let mut stats = Statistics::default();
        for message in report_receiver {
            match message {
                Message::Begin(spec) => {
                    println!(
                        "Running {} with {} threads, input size {}, repeat count {}",
                        spec.name, spec.threads, spec.input_size, spec.repeat
                    );
                    stats.begin(&spec);
                }
                Message::Repetition(report) => {
                    println!("{report}");
                    let summary = stats.add_report(&report);
                    if report.is_last() {
                        println!("{}", summary.line(&report.spec, policy));
                    }
                }
            }
        }
        let _ = stat_sender.send(stats);
    });

    println!("Waiting for configuration data from stdin...");
    let mut executed = 0;
    for spec in parse_config(io::stdin().lock()) {
        let spec = match spec {
            Ok(spec) => spec,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let Some(mut bench) = registry.create(&spec.name, policy) else {
            eprintln!("Test not found: {}", spec.name);
            continue;
        };
        if let Err(e) = spec.validate(policy) {
            eprintln!("Skipping {}: {e}", spec.name);
            continue;
        }
        if spec.repeat == 0 {
            continue;
        }

        if report_sender.send(Message::Begin(spec.clone())).is_err() {
            break;
        }
        let _ = run_repetitions(bench.as_mut(), &spec, |report| {
            let _ = report_sender.send(Message::Repetition(report));
        });
        executed += 1;
    }

    // Closing the channel lets the reporter finish.
    drop(report_sender);
    let stats = stat_receiver.recv().ok();
    let _ = reporter.join();

    if let Some(stats) = stats {
        let failed: Vec<_> = stats.failures().map(|spec| spec.name.as_str()).collect();
        if !failed.is_empty() {
            eprintln!("Failed: {}", failed.join(", "));
        }
    }

    if executed > 0 {
        ExitCode::SUCCESS
    } else {
        eprintln!("No tests were run under {}", policy.label());
        ExitCode::FAILURE
    }
}

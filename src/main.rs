use clap::Parser;
use fia_estimator::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    let Some(command) = args.command else {
        show_help_and_commands();
        process::exit(0);
    };

    match commands::run(command) {
        Ok(_output) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

fn show_help_and_commands() {
    println!("fia-estimate {}", env!("CARGO_PKG_VERSION"));
    println!("Design-based estimates of forest attributes from FIA database tables");
    println!();
    println!("USAGE:");
    println!("    fia-estimate <COMMAND> --data <DIR> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    area           Land area as a percentage of the land type");
    println!("    area-change    Gain, loss or net change of land-type area");
    println!("    volume         Tree volume per acre");
    println!("    biomass        Dry biomass (tons) per acre");
    println!("    tpa            Trees or basal area per acre");
    println!("    mortality      Annual mortality per acre");
    println!("    removals       Annual removals per acre");
    println!("    growth         Net annual growth per acre");
    println!("    help           Print this message or the help of the given subcommand(s)");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Forest area by ownership group:");
    println!("    fia-estimate area --data ./GA --grp-by OWNGRPCD");
    println!();
    println!("    # Net volume of large pines on timberland, with totals, as CSV:");
    println!("    fia-estimate volume --data ./GA --land-type timber \\");
    println!("                        --tree-domain \"DIA >= 10 AND SPCD IN (131, 110)\" \\");
    println!("                        --totals --format csv");
    println!();
    println!("    # Periodic mortality for one evaluation:");
    println!("    fia-estimate mortality --data ./GA --evalid 132303 --periodic");
    println!();
    println!("For detailed help on any command, use:");
    println!("    fia-estimate <COMMAND> --help");
}

use LigPyro::cli::cli_main::run;

pub fn main() {
    if let Err(e) = run() {
        eprintln!("\x1b[31mError: {}\x1b[0m", e);
        std::process::exit(1);
    }
}

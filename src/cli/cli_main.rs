use crate::ReactorsIVP::BatchReactorIVP::{BatchReactorTask, SimulationConfig};
use crate::ReactorsIVP::ode_solver::SolverType;
use crate::ReactorsIVP::task_parser_batch_IVP::{BatchTaskFile, ReportRequest};
use crate::Utils::load_from_file::{load_reaction_data, load_species_data};
use crate::Utils::results_output::ConversionReport;
use crate::errors::KineticsError;
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ligpyro")]
#[command(about = "LigPyro - batch reactor pyrolysis kinetics", long_about = None)]
struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task described by a JSON file
    Run {
        /// Path to the task file
        #[arg(short, long)]
        task: PathBuf,
        /// Print every n-th time point
        #[arg(long, default_value_t = 100)]
        print_every: usize,
        /// Plot the concentrations in the terminal
        #[arg(long)]
        plot: bool,
    },
    /// Run a simulation from species and reaction tables
    Simulate {
        /// Species table (CSV)
        #[arg(long)]
        species: PathBuf,
        /// Reaction table (CSV)
        #[arg(long)]
        reactions: PathBuf,
        /// Temperature in K
        #[arg(long)]
        temperature: f64,
        /// Start time in seconds
        #[arg(long, default_value_t = 0.0)]
        t_start: f64,
        /// End time in seconds
        #[arg(long)]
        t_end: f64,
        /// Number of output points, 0 for every solver step
        #[arg(long, default_value_t = 1000)]
        points: usize,
        /// bdf (stiff), radau3, radau7, be or rk45
        #[arg(long, default_value = "bdf")]
        method: SolverType,
        #[arg(long)]
        rtol: Option<f64>,
        #[arg(long)]
        atol: Option<f64>,
        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Species to build a conversion report for
        #[arg(long)]
        report: Option<String>,
        /// Conversion searched for in the report
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
        /// Print every n-th time point
        #[arg(long, default_value_t = 100)]
        print_every: usize,
        /// Plot the concentrations in the terminal
        #[arg(long)]
        plot: bool,
    },
}

pub fn run() -> Result<(), KineticsError> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Run {
            task,
            print_every,
            plot,
        } => cmd_run(&task, print_every, plot),
        Commands::Simulate {
            species,
            reactions,
            temperature,
            t_start,
            t_end,
            points,
            method,
            rtol,
            atol,
            output,
            report,
            threshold,
            print_every,
            plot,
        } => {
            let mut config = SimulationConfig::new(temperature, t_end);
            config.t_start = t_start;
            config.n_points = points;
            config.solver.method = method;
            if let Some(rtol) = rtol {
                config.solver.rtol = rtol;
            }
            if let Some(atol) = atol {
                config.solver.atol = atol;
            }
            let species = load_species_data(&species.to_string_lossy())?;
            let reactions = load_reaction_data(&reactions.to_string_lossy())?;
            let mut task = BatchReactorTask::new(species, reactions, config);
            let report = report.map(|reactant| ReportRequest {
                reactant,
                threshold,
            });
            execute(
                &mut task,
                output.as_deref(),
                report.as_ref(),
                print_every,
                plot,
            )
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("logger is already initialized");
    }
}

fn cmd_run(task_path: &Path, print_every: usize, plot: bool) -> Result<(), KineticsError> {
    let task_file = BatchTaskFile::from_file(task_path)?;
    let mut task = task_file.into_task()?;
    execute(
        &mut task,
        task_file.output_csv.as_deref(),
        task_file.report.as_ref(),
        print_every,
        plot,
    )
}

/// Solves the task, prints and saves what was computed. After a solver failure the partial
/// trajectory is still printed and saved before the error is returned.
fn execute(
    task: &mut BatchReactorTask,
    output: Option<&Path>,
    report: Option<&ReportRequest>,
    print_every: usize,
    plot: bool,
) -> Result<(), KineticsError> {
    let outcome = task.solve().map(|_| ());
    let Some(result) = task.result() else {
        return outcome;
    };
    result.pretty_print(print_every);
    if plot {
        result.plot_in_terminal();
    }
    if let Some(path) = output {
        result.save_csv(path)?;
    }
    if let Err(e) = outcome {
        error!("simulation stopped early, partial results shown: {}", e);
        return Err(e);
    }
    if let Some(stats) = task.stats() {
        info!("solver statistics: {:?}", stats);
    }
    if let Some(request) = report {
        ConversionReport::from_result(result, &request.reactant, request.threshold)?
            .pretty_print();
    }
    Ok(())
}

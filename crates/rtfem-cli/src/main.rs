//! Command-line front end: parses the flag table into a set of overrides,
//! builds a `Problem` from an input deck, applies the overrides on top of
//! whatever the deck's own `*OPTIONS` card set, and drives it to completion.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use rtfem_deck::{apply_deck, Deck, ProblemBuilder};
use rtfem_io::{load_restart, save_restart, write_spatial_snapshot, PointSeriesWriter};
use rtfem_solver::{backend_by_name, default_backend, DiffusionModel, Driver, DriverStatus};

fn usage() {
    eprintln!("usage: rtfem [options] <input.inp>");
    eprintln!();
    eprintln!("options:");
    eprintln!("  -info                   print build/version info and exit");
    eprintln!("  -help                   print this message and exit");
    eprintln!("  -solver NAME            select linear backend (dense-lu, supernodal-csc, multifrontal-blas)");
    eprintln!("  -ff X                   fill factor passed to the multifrontal/supernodal backends");
    eprintln!("  -debug NAME             enable a named debug dump (residu, matrix, numbering)");
    eprintln!("  -level N                printing verbosity");
    eprintln!("  -with MODULE            select a driver variant");
    eprintln!("  -models, -modules       list available models and exit");
    eprintln!("  -readonly FILE          load FILE as the starting state, write no output afterward");
    eprintln!("  -graph METHOD           mesh graph reordering method");
    eprintln!("  -iperm                  also compute the inverse permutation for -graph");
    eprintln!("  -eordering M            element ordering method");
    eprintln!("  -nordering M            node ordering method");
    eprintln!("  -postprocessing METHOD  select a post-processor");
    eprintln!("  -miscellaneous          implementation-defined diagnostics");
    eprintln!("  -test                   implementation-defined self-test hook");
}

fn print_info() {
    println!("rtfem {}", env!("CARGO_PKG_VERSION"));
    println!("coupled nonlinear transient PDE solver on unstructured meshes");
}

fn print_models() {
    println!("available models:");
    println!("  diffusion");
}

#[derive(Default)]
struct Overrides {
    solver: Option<String>,
    fill_factor: Option<f64>,
    debug: Vec<String>,
    print_level: Option<u32>,
    driver_variant: Option<String>,
    restart_path: Option<String>,
    graph_method: Option<String>,
    eordering: Option<String>,
    nordering: Option<String>,
    postprocessing: Option<String>,
}

enum Action {
    Info,
    Help,
    ListModels,
    Run,
}

struct Parsed {
    action: Action,
    input: Option<String>,
    overrides: Overrides,
    iperm: bool,
    miscellaneous: bool,
    test: bool,
}

fn parse_args(args: &[String]) -> Result<Parsed, String> {
    let mut action = Action::Run;
    let mut input = None;
    let mut overrides = Overrides::default();
    let mut iperm = false;
    let mut miscellaneous = false;
    let mut test = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        macro_rules! value {
            ($flag:expr) => {{
                i += 1;
                args.get(i).ok_or_else(|| format!("{} requires a value", $flag))?.clone()
            }};
        }
        match arg {
            "-info" => action = Action::Info,
            "-help" => action = Action::Help,
            "-models" | "-modules" => action = Action::ListModels,
            "-solver" => overrides.solver = Some(value!("-solver")),
            "-ff" => {
                let raw = value!("-ff");
                overrides.fill_factor = Some(raw.parse().map_err(|_| format!("-ff value '{raw}' is not a number"))?);
            }
            "-debug" => overrides.debug.push(value!("-debug")),
            "-level" => {
                let raw = value!("-level");
                overrides.print_level = Some(raw.parse().map_err(|_| format!("-level value '{raw}' is not a number"))?);
            }
            "-with" => overrides.driver_variant = Some(value!("-with")),
            "-readonly" => overrides.restart_path = Some(value!("-readonly")),
            "-graph" => overrides.graph_method = Some(value!("-graph")),
            "-iperm" => iperm = true,
            "-eordering" => overrides.eordering = Some(value!("-eordering")),
            "-nordering" => overrides.nordering = Some(value!("-nordering")),
            "-postprocessing" => overrides.postprocessing = Some(value!("-postprocessing")),
            "-miscellaneous" => miscellaneous = true,
            "-test" => test = true,
            other if other.starts_with('-') => return Err(format!("Unknown option: {other}")),
            other => input = Some(other.to_string()),
        }
        i += 1;
    }

    Ok(Parsed { action, input, overrides, iperm, miscellaneous, test })
}

fn init_logging(print_level: u32) {
    let level = match print_level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn apply_overrides(options: &mut rtfem_solver::Options, overrides: &Overrides) {
    if let Some(v) = &overrides.solver {
        options.solver = v.clone();
    }
    if let Some(v) = overrides.fill_factor {
        options.fill_factor = v;
    }
    for name in &overrides.debug {
        options.debug.insert(name.clone());
    }
    if let Some(v) = overrides.print_level {
        options.print_level = v;
    }
    if let Some(v) = &overrides.driver_variant {
        options.driver_variant = v.clone();
    }
    if let Some(v) = &overrides.restart_path {
        options.restart_path = Some(v.clone());
        options.readonly = true;
    }
    if let Some(v) = &overrides.graph_method {
        options.graph_method = Some(v.clone());
    }
    if let Some(v) = &overrides.eordering {
        options.eordering = Some(v.clone());
    }
    if let Some(v) = &overrides.nordering {
        options.nordering = Some(v.clone());
    }
    if let Some(v) = &overrides.postprocessing {
        options.postprocessing = Some(v.clone());
    }
}

fn run(parsed: &Parsed) -> Result<DriverStatus, String> {
    let input = parsed.input.as_ref().ok_or("no input deck given")?;
    let deck = Deck::parse_file(input).map_err(|e| format!("{input}: {e}"))?;

    let mut builder = ProblemBuilder::new();
    builder.register_model(Arc::new(DiffusionModel::new()));
    apply_deck(&mut builder, &deck).map_err(|e| e.to_string())?;

    let mut problem = builder.build().map_err(|e| e.to_string())?;
    apply_overrides(&mut problem.options, &parsed.overrides);

    let backend = backend_by_name(&problem.options.solver).unwrap_or_else(|err| {
        log::warn!("{err}, falling back to the default backend");
        default_backend()
    });

    let driver = Driver::new(&problem, backend);
    let mut ring = driver.initialize().map_err(|e| e.to_string())?;
    let mut start_idate = 0;

    if let Some(path) = problem.options.restart_path.clone() {
        load_restart(&path, &problem, &mut ring).map_err(|e| e.to_string())?;
        start_idate = problem.dates.index_at_or_before(ring.current().t);
    }

    let status = driver.run(&mut ring, start_idate);

    if !problem.options.readonly {
        let stem = Path::new(input).file_stem().and_then(|s| s.to_str()).unwrap_or("job");

        if let Err(e) = save_restart(format!("{stem}.rst"), &problem, &ring) {
            log::warn!("failed to write restart snapshot: {e}");
        }

        let mut node_ids: Vec<u64> = problem.mesh.nodes().map(|n| n.id).collect();
        node_ids.sort_unstable();
        if !node_ids.is_empty() {
            match PointSeriesWriter::create(format!("{stem}.csv"), node_ids) {
                Ok(mut writer) => {
                    if let Err(e) = writer.write_step(&problem.mesh, ring.current(), ring.explicit_terms()) {
                        log::warn!("failed to write point series: {e}");
                    }
                }
                Err(e) => log::warn!("failed to open point series file: {e}"),
            }

            if let Err(e) =
                write_spatial_snapshot(format!("{stem}.snapshot.csv"), &problem.mesh, ring.current(), ring.explicit_terms())
            {
                log::warn!("failed to write spatial snapshot: {e}");
            }
        }
    }

    Ok(status)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        return ExitCode::from(2);
    }

    let parsed = match parse_args(&args) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    init_logging(parsed.overrides.print_level.unwrap_or(0));

    if parsed.iperm {
        log::info!("-iperm requested alongside -graph {:?}", parsed.overrides.graph_method);
    }
    if parsed.miscellaneous {
        log::info!("-miscellaneous diagnostics requested");
    }
    if parsed.test {
        log::info!("-test hook requested");
    }

    match parsed.action {
        Action::Help => {
            usage();
            ExitCode::SUCCESS
        }
        Action::Info => {
            print_info();
            ExitCode::SUCCESS
        }
        Action::ListModels => {
            print_models();
            ExitCode::SUCCESS
        }
        Action::Run => match run(&parsed) {
            Ok(DriverStatus::ConvergedAllDates) => ExitCode::SUCCESS,
            Ok(DriverStatus::StoppedAtDate(idate)) => {
                eprintln!("stopped at date index {idate}");
                ExitCode::from(1)
            }
            Ok(DriverStatus::Aborted(reason)) => {
                eprintln!("aborted: {reason}");
                ExitCode::from(1)
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::from(1)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solver_and_level_flags() {
        let args: Vec<String> =
            ["-solver", "supernodal-csc", "-level", "2", "job.inp"].into_iter().map(String::from).collect();
        let parsed = parse_args(&args).unwrap();
        assert_eq!(parsed.overrides.solver.as_deref(), Some("supernodal-csc"));
        assert_eq!(parsed.overrides.print_level, Some(2));
        assert_eq!(parsed.input.as_deref(), Some("job.inp"));
    }

    #[test]
    fn readonly_flag_carries_its_path() {
        let args: Vec<String> = ["-readonly", "snap.rst", "job.inp"].into_iter().map(String::from).collect();
        let parsed = parse_args(&args).unwrap();
        assert_eq!(parsed.overrides.restart_path.as_deref(), Some("snap.rst"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let args: Vec<String> = vec!["-bogus".to_string()];
        let err = parse_args(&args).unwrap_err();
        assert!(err.contains("Unknown option"));
    }

    #[test]
    fn missing_value_is_rejected() {
        let args: Vec<String> = vec!["-solver".to_string()];
        let err = parse_args(&args).unwrap_err();
        assert!(err.contains("-solver"));
    }
}

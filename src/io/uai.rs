use std::{
    fmt::Display,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    mem,
    path::Path,
    str::FromStr,
    time::Instant,
};

use log::{debug, info, warn};

use crate::{
    errors::{MrfError, Result},
    network::markov_network::{MarkovNetwork, NetworkDescription, RawFactor},
};

// Reading and writing networks in the MARKOV variant of the UAI model format:
//
//   MARKOV
//   <number of variables>
//   <domain size of every variable, on one line>
//   <number of functions>
//   <scope length> <variables...>      one line per function
//   <table length> <values...>         one block per function, values may span lines

// States for reading UAI files
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UAIState {
    ModelType,
    NumberOfVariables,
    DomainSizes,
    NumberOfFunctions,
    FunctionScopes(usize),            // function index
    NumberOfTableValues(usize),       // function index
    TableValues(usize, usize, usize), // function index, entries read so far, function table size
    EndOfFile,
}

fn malformed(line: usize, reason: impl Into<String>) -> MrfError {
    MrfError::MalformedInput {
        line,
        reason: reason.into(),
    }
}

// Parses every whitespace-separated token of `string`
pub fn string_to_vec<T>(string: &str, line: usize) -> Result<Vec<T>>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    string
        .split_whitespace()
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|err| malformed(line, format!("cannot parse '{}': {}", token, err)))
        })
        .collect()
}

pub fn vec_to_string<T: ToString>(v: &[T]) -> String {
    v.iter()
        .map(|elem| elem.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

fn parse_single<T>(string: &str, line: usize, what: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    let mut tokens = string_to_vec::<T>(string, line)?;
    if tokens.len() != 1 {
        return Err(malformed(
            line,
            format!("expected a single {}, found {} tokens", what, tokens.len()),
        ));
    }
    Ok(tokens.swap_remove(0))
}

/// Reads a network description in MARKOV format.
///
/// Every line is checked against the header (domain sizes, scopes, and table lengths must agree)
/// and the first violation is reported as [`MrfError::MalformedInput`] with its 1-based line
/// number. A file that ends before every table is complete reports line 0.
pub fn read_uai<R: BufRead>(reader: R) -> Result<NetworkDescription> {
    let mut state = UAIState::ModelType;

    let mut num_variables = 0;
    let mut domain_sizes: Vec<usize> = Vec::new();
    let mut num_functions = 0;
    let mut function_scopes: Vec<Vec<usize>> = Vec::new();
    let mut table_sizes: Vec<usize> = Vec::new();
    let mut function_entries: Vec<f64> = Vec::new();
    let mut factors = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line_number = line_idx + 1;
        let line = line.map_err(|err| malformed(line_number, err.to_string()))?;
        let trimmed_line = line.trim();

        if trimmed_line.is_empty() {
            continue;
        }

        let mut values_on_line = trimmed_line;
        match state {
            UAIState::ModelType => {
                debug!("Reading model type");
                if trimmed_line != "MARKOV" {
                    return Err(malformed(
                        line_number,
                        format!("unsupported model type '{}'", trimmed_line),
                    ));
                }
                state = UAIState::NumberOfVariables;
                continue;
            }
            UAIState::NumberOfVariables => {
                debug!("Reading number of variables");
                num_variables = parse_single(trimmed_line, line_number, "number of variables")?;
                state = UAIState::DomainSizes;
                continue;
            }
            UAIState::DomainSizes => {
                debug!("Reading domain sizes");
                domain_sizes = string_to_vec(trimmed_line, line_number)?;
                if domain_sizes.len() != num_variables {
                    return Err(malformed(
                        line_number,
                        format!(
                            "expected {} domain sizes, found {}",
                            num_variables,
                            domain_sizes.len()
                        ),
                    ));
                }
                if let Some(variable) = domain_sizes.iter().position(|size| *size == 0) {
                    return Err(malformed(
                        line_number,
                        format!("variable {} has an empty domain", variable),
                    ));
                }
                state = UAIState::NumberOfFunctions;
                continue;
            }
            UAIState::NumberOfFunctions => {
                debug!("Reading number of functions");
                num_functions = parse_single(trimmed_line, line_number, "number of functions")?;
                function_scopes = Vec::with_capacity(num_functions);
                table_sizes = Vec::with_capacity(num_functions);
                factors = Vec::with_capacity(num_functions);
                state = match num_functions {
                    0 => UAIState::EndOfFile,
                    _ => UAIState::FunctionScopes(0),
                };
                continue;
            }
            UAIState::FunctionScopes(function_idx) => {
                debug!("Reading scope of function {}", function_idx);
                let function_desc: Vec<usize> = string_to_vec(trimmed_line, line_number)?;
                let (scope_len, function_scope) = function_desc.split_at(1);
                if scope_len[0] != function_scope.len() {
                    return Err(malformed(
                        line_number,
                        format!(
                            "scope declares {} variables but lists {}",
                            scope_len[0],
                            function_scope.len()
                        ),
                    ));
                }
                for (position, variable) in function_scope.iter().enumerate() {
                    if *variable >= num_variables {
                        return Err(malformed(
                            line_number,
                            format!("unknown variable {}", variable),
                        ));
                    }
                    if function_scope[..position].contains(variable) {
                        return Err(malformed(
                            line_number,
                            format!("variable {} repeated in scope", variable),
                        ));
                    }
                }
                let table_size = function_scope.iter().try_fold(1usize, |size, variable| {
                    size.checked_mul(domain_sizes[*variable])
                });
                let Some(table_size) = table_size else {
                    return Err(malformed(
                        line_number,
                        format!("table of function {} is too large", function_idx),
                    ));
                };
                function_scopes.push(function_scope.to_vec());
                table_sizes.push(table_size);
                state = if function_idx + 1 < num_functions {
                    UAIState::FunctionScopes(function_idx + 1)
                } else {
                    UAIState::NumberOfTableValues(0)
                };
                continue;
            }
            UAIState::NumberOfTableValues(function_idx) => {
                debug!("Reading function table size of function {}", function_idx);
                let (count, rest) = match trimmed_line.split_once(char::is_whitespace) {
                    Some((count, rest)) => (count, rest),
                    None => (trimmed_line, ""),
                };
                let num_entries: usize = parse_single(count, line_number, "table length")?;
                let expected = table_sizes[function_idx];
                if num_entries != expected {
                    return Err(malformed(
                        line_number,
                        format!(
                            "function {} needs {} table values, header declares {}",
                            function_idx, expected, num_entries
                        ),
                    ));
                }
                function_entries = Vec::with_capacity(num_entries);
                state = UAIState::TableValues(function_idx, 0, num_entries);
                values_on_line = rest;
            }
            UAIState::TableValues(..) => {}
            UAIState::EndOfFile => {
                warn!("Ignored trailing line at the end of file: {}", line);
                continue;
            }
        }

        // The table length may share its line with the first values
        if let UAIState::TableValues(function_idx, cur_entries, num_entries) = state {
            let mut new_entries: Vec<f64> = string_to_vec(values_on_line, line_number)?;
            let new_cur_entries = cur_entries + new_entries.len();
            if new_cur_entries > num_entries {
                return Err(malformed(
                    line_number,
                    format!(
                        "function {} has more than {} table values",
                        function_idx, num_entries
                    ),
                ));
            }
            function_entries.append(&mut new_entries);

            if new_cur_entries < num_entries {
                debug!(
                    "Reading function {}. Collected {} out of {} entries.",
                    function_idx, new_cur_entries, num_entries
                );
                state = UAIState::TableValues(function_idx, new_cur_entries, num_entries);
                continue;
            }
            debug!(
                "Reading function {}. Collected all {} entries.",
                function_idx, num_entries
            );

            factors.push(RawFactor {
                scope: mem::take(&mut function_scopes[function_idx]),
                values: mem::take(&mut function_entries),
            });

            // Proceed to the next function
            state = if function_idx + 1 < num_functions {
                UAIState::NumberOfTableValues(function_idx + 1)
            } else {
                UAIState::EndOfFile
            };
        }
    }

    if state != UAIState::EndOfFile {
        return Err(malformed(0, format!("file ended early while in state {:?}", state)));
    }

    debug!("UAI import complete.");
    Ok(NetworkDescription {
        domain_sizes,
        factors,
    })
}

// Opens, reads and builds the network stored at `path`
pub fn read_uai_file(path: impl AsRef<Path>) -> Result<MarkovNetwork> {
    let path = path.as_ref();
    debug!("In read_uai_file() for file {:?}", path);
    let time_start = Instant::now();

    let file = File::open(path).map_err(|source| MrfError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let description = read_uai(BufReader::new(file))?;
    let network = MarkovNetwork::from_description(description)?;

    info!(
        "Loaded network with {} variables and {} factors from {:?}. Elapsed time {:?}.",
        network.num_variables(),
        network.num_factors(),
        path,
        time_start.elapsed()
    );
    Ok(network)
}

/// Writes the current factors of a network in MARKOV format.
///
/// Scopes are written in the order they were supplied, so reading the output back yields
/// factors with identical scopes and tables.
pub fn write_uai<W: Write>(network: &MarkovNetwork, writer: &mut W) -> io::Result<()> {
    let time_start = Instant::now();

    debug!("Writing preamble: graph type, variables, and domain sizes");
    let domain_sizes: Vec<usize> = network.domains().iter().collect();
    writeln!(writer, "MARKOV")?;
    writeln!(writer, "{}", network.num_variables())?;
    writeln!(writer, "{}", vec_to_string(&domain_sizes))?;

    debug!("Writing number of functions");
    writeln!(writer, "{}", network.num_factors())?;

    debug!("Writing function scopes");
    for (_, factor) in network.factors().iter() {
        let scope = factor.supplied_scope();
        writeln!(writer, "{} {}", scope.len(), vec_to_string(&scope))?;
    }

    debug!("Writing function tables");
    for (_, factor) in network.factors().iter() {
        writeln!(writer)?;
        writeln!(writer, "{}", factor.size())?;
        writeln!(writer, "{}", factor)?;
    }

    debug!("UAI export complete. Elapsed time {:?}.", time_start.elapsed());
    Ok(())
}

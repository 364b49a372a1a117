//! Loading of the species and reaction tables.
//!
//! Species table columns: `SpeciesID, MolecularWeight, Phase, InitialConcentration`
//!
//! Reaction table columns: `ReactionID, Stoichiometry, Orders, Phase, A, Ea, Reversible` where
//! `Stoichiometry` and `Orders` are JSON objects `{"species": number}` (quoted CSV fields with
//! doubled quotes) and `Reversible` is one of `true/false/1/0` in any case.
use crate::Kinetics::reaction::ReactionRecord;
use crate::Kinetics::species::{Phase, Species};
use crate::errors::KineticsError;
use log::{error, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    pub fn load_species(&self) -> Result<Vec<Species>, KineticsError> {
        load_species_data(&self.file_name)
    }
    pub fn load_reactions(&self) -> Result<Vec<ReactionRecord>, KineticsError> {
        load_reaction_data(&self.file_name)
    }
}

#[derive(Debug, Deserialize)]
struct SpeciesRow {
    #[serde(rename = "SpeciesID")]
    id: String,
    #[serde(rename = "MolecularWeight")]
    molecular_weight: f64,
    #[serde(rename = "Phase")]
    phase: String,
    #[serde(rename = "InitialConcentration")]
    initial_concentration: f64,
}

#[derive(Debug, Deserialize)]
struct ReactionRow {
    #[serde(rename = "ReactionID")]
    id: String,
    #[serde(rename = "Stoichiometry")]
    stoichiometry: String,
    #[serde(rename = "Orders")]
    orders: String,
    #[serde(rename = "Phase")]
    phase: String,
    A: f64,
    Ea: f64,
    #[serde(rename = "Reversible")]
    reversible: String,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader)
}

fn parse_error(source: &str, record: usize, message: String) -> KineticsError {
    KineticsError::Parse {
        file: source.to_string(),
        record,
        message,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_json_map(
    s: &str,
    column: &str,
    source: &str,
    record: usize,
) -> Result<BTreeMap<String, f64>, KineticsError> {
    serde_json::from_str::<BTreeMap<String, f64>>(s).map_err(|e| {
        parse_error(
            source,
            record,
            format!("column {} is not a JSON map of numbers: {}", column, e),
        )
    })
}

/// Reads the species table. `source` names the input in error messages.
/// Records are counted from 1, the header is not a record.
pub fn read_species<R: Read>(reader: R, source: &str) -> Result<Vec<Species>, KineticsError> {
    let mut rdr = csv_reader(reader);
    let mut species = Vec::new();
    for (i, row) in rdr.deserialize::<SpeciesRow>().enumerate() {
        let record = i + 1;
        let row = row.map_err(|e| parse_error(source, record, e.to_string()))?;
        let phase = row
            .phase
            .parse::<Phase>()
            .map_err(|e| parse_error(source, record, e))?;
        species.push(Species::new(
            &row.id,
            row.molecular_weight,
            phase,
            row.initial_concentration,
        ));
    }
    Ok(species)
}

/// Reads the reaction table; JSON columns are decoded here, species names are checked later
/// when the reactions are resolved against the registry.
pub fn read_reactions<R: Read>(
    reader: R,
    source: &str,
) -> Result<Vec<ReactionRecord>, KineticsError> {
    let mut rdr = csv_reader(reader);
    let mut reactions = Vec::new();
    for (i, row) in rdr.deserialize::<ReactionRow>().enumerate() {
        let record = i + 1;
        let row = row.map_err(|e| parse_error(source, record, e.to_string()))?;
        let stoichiometry = parse_json_map(&row.stoichiometry, "Stoichiometry", source, record)?;
        let orders = parse_json_map(&row.orders, "Orders", source, record)?;
        let phase = row
            .phase
            .parse::<Phase>()
            .map_err(|e| parse_error(source, record, e))?;
        let reversible = parse_bool(&row.reversible).ok_or_else(|| {
            parse_error(
                source,
                record,
                format!("Reversible must be true/false/1/0, got '{}'", row.reversible),
            )
        })?;
        reactions.push(ReactionRecord::new(
            &row.id,
            stoichiometry,
            orders,
            phase,
            row.A,
            row.Ea,
            reversible,
        ));
    }
    Ok(reactions)
}

fn open(file_name: &str) -> Result<File, KineticsError> {
    File::open(Path::new(file_name)).map_err(|e| {
        error!("failed to open file '{}': {}", file_name, e);
        KineticsError::Io(e)
    })
}

pub fn load_species_data(file_name: &str) -> Result<Vec<Species>, KineticsError> {
    let species = read_species(open(file_name)?, file_name)?;
    info!("{} species loaded from {}", species.len(), file_name);
    Ok(species)
}

pub fn load_reaction_data(file_name: &str) -> Result<Vec<ReactionRecord>, KineticsError> {
    let reactions = read_reactions(open(file_name)?, file_name)?;
    info!("{} reactions loaded from {}", reactions.len(), file_name);
    Ok(reactions)
}

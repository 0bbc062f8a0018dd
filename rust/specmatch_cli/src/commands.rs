use serde::Serialize;
use specmatch::SimilarityParams;
use std::fs::File;
use std::io::{
    self,
    BufWriter,
    Write,
};
use std::path::Path;
use std::time::Instant;
use tracing::{
    info,
    instrument,
};

use crate::cli::{
    ScoreArgs,
    SerializationFormat,
    WriteTemplateArgs,
};
use crate::error::CliError;
use crate::processing::{
    SpectrumEntry,
    SpectrumInput,
    score_and_serialize,
};

/// Main function for the 'score' subcommand.
#[instrument]
pub fn main_score(args: ScoreArgs) -> Result<(), CliError> {
    let params = read_params(args.params.as_deref())?;
    params.validate()?;
    info!("Using similarity parameters: {:#?}", params);

    info!("Loading query spectra from {}", args.queries.display());
    let queries = read_spectra(&args.queries)?;
    info!("Loading library spectra from {}", args.library.display());
    let library = read_spectra(&args.library)?;
    info!(
        "Loaded {} query and {} library spectra",
        queries.len(),
        library.len()
    );

    std::fs::create_dir_all(&args.output_path)?;
    let put_path = args.output_path.join("results.json");

    let start = Instant::now();
    let file = File::create(&put_path)?;
    let mut ser = JsonStreamSerializer::new(BufWriter::new(file), args.format);
    let nhits = score_and_serialize(&queries, &library, &params, args.top_n, &mut ser)?;
    ser.finish()?;

    println!("Wrote {} hits to {}", nhits, put_path.display());
    println!("Total scoring and serialization took {:#?}", start.elapsed());
    Ok(())
}

/// Reads the similarity parameters, falling back to the defaults.
pub fn read_params(path: Option<&Path>) -> Result<SimilarityParams, CliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(SimilarityParams::default()),
    }
}

/// Reads a json list of `{"id": .., "mz": [..], "intensity": [..]}` records.
pub fn read_spectra(path: &Path) -> Result<Vec<SpectrumEntry>, CliError> {
    let content = std::fs::read_to_string(path)?;
    let inputs: Vec<SpectrumInput> = serde_json::from_str(&content).map_err(|e| {
        CliError::DataReading(format!(
            "Failed to read spectra from {}: {}",
            path.display(),
            e
        ))
    })?;
    inputs.into_iter().map(SpectrumEntry::try_from).collect()
}

const PARAMS_TEMPLATE: &str = r#"{
  "tolerance": { "absolute": 0.005, "ppm": 10.0 },
  "anchor": "library",
  "weights": "sqrt",
  "unmatched": "keep_all",
  "min_matched_signals": 1,
  "normalization": null,
  "modification_aware": false,
  "remove_precursor": null
}"#;

const MASSBANK_PARAMS_TEMPLATE: &str = r#"{
  "tolerance": { "absolute": 0.01, "ppm": 0.0 },
  "weights": { "intensity": 0.53, "mz": 1.3 },
  "unmatched": "keep_library_only",
  "min_matched_signals": 3,
  "normalization": "highest_as_100"
}"#;

const MODIFIED_COSINE_PARAMS_TEMPLATE: &str = r#"{
  "tolerance": { "absolute": 0.02, "ppm": 0.0 },
  "weights": "sqrt",
  "unmatched": "keep_all",
  "min_matched_signals": 4,
  "modification_aware": true,
  "remove_precursor": { "absolute": 0.02, "ppm": 0.0 }
}"#;

const SPECTRA_TEMPLATE: &str = r#"[
    {
        "id": 0,
        "mz": [ 91.0542, 119.0491, 147.0441, 165.0546 ],
        "intensity": [ 12.0, 100.0, 55.5, 8.25 ],
        "precursor_mz": 182.0812
    },
    {
        "id": "caffeine",
        "mz": [ 110.0713, 123.0427, 138.0662, 195.0877 ],
        "intensity": [ 4.0, 3.5, 100.0, 62.0 ],
        "precursor_mz": 195.0877
    }
]"#;

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let default_path = target_dir.join("params_template.json");
    let massbank_path = target_dir.join("massbank_params_template.json");
    let modified_path = target_dir.join("modified_cosine_params_template.json");
    std::fs::write(&default_path, PARAMS_TEMPLATE)?;
    std::fs::write(&massbank_path, MASSBANK_PARAMS_TEMPLATE)?;
    std::fs::write(&modified_path, MODIFIED_COSINE_PARAMS_TEMPLATE)?;
    println!(
        "Wrote parameter templates to:\n- {}\n- {}\n- {}",
        default_path.display(),
        massbank_path.display(),
        modified_path.display()
    );

    let spectra_path = target_dir.join("spectra_template.json");
    std::fs::write(&spectra_path, SPECTRA_TEMPLATE)?;
    println!("Wrote spectra template to: {}", spectra_path.display());
    Ok(())
}

pub struct JsonStreamSerializer<W: Write> {
    writer: W,
    format: SerializationFormat,
    is_first: bool,
}

impl<W: Write> JsonStreamSerializer<W> {
    pub fn new(writer: W, format: SerializationFormat) -> Self {
        Self {
            writer,
            format,
            is_first: true,
        }
    }

    /// Serializes an item based on the selected format.
    pub fn serialize<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            SerializationFormat::Ndjson => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                self.writer.write_all(b"\n")?;
            }
            SerializationFormat::Json | SerializationFormat::PrettyJson => {
                if self.is_first {
                    self.writer.write_all(b"[")?;
                    self.is_first = false;
                } else {
                    self.writer.write_all(b",")?;
                }

                if matches!(self.format, SerializationFormat::PrettyJson) {
                    serde_json::to_writer_pretty(&mut self.writer, item)
                } else {
                    serde_json::to_writer(&mut self.writer, item)
                }
                .map_err(io::Error::other)?;
            }
        }
        Ok(())
    }

    /// Closes the json array, if any, and flushes.
    pub fn finish(mut self) -> io::Result<()> {
        match self.format {
            SerializationFormat::Json | SerializationFormat::PrettyJson => {
                if self.is_first {
                    self.writer.write_all(b"[]")?;
                } else {
                    self.writer.write_all(b"]")?;
                }
            }
            SerializationFormat::Ndjson => {}
        }
        self.writer.flush()
    }
}

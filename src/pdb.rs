//! Download of protein structures from the Protein Data Bank.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use curl::easy::Easy;
use flate2::read::MultiGzDecoder;
use tempfile::NamedTempFile;
use url::Url;

use crate::output;

pub const RCSB_DOWNLOAD_URL: &str = "https://files.rcsb.org/download/";

/// Validates and lower-cases PDB identifiers.
///
/// An identifier is four ASCII alphanumeric characters, not all digits.
pub fn validate_pdb_ids<I, S>(ids: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut validated = Vec::new();
    for (i, id) in ids.into_iter().enumerate() {
        let id = id.as_ref();
        let well_formed = id.len() == 4
            && id.chars().all(|c| c.is_ascii_alphanumeric())
            && !id.chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            bail!("error in pdb {}: {id}", i + 1);
        }
        validated.push(id.to_ascii_lowercase());
    }
    Ok(validated)
}

/// Resolves command-line inputs into PDB identifiers.
///
/// If the first input names an existing file, identifiers are read from it,
/// one per line. Otherwise the inputs themselves are the identifiers.
pub fn read_pdb_id_list(inputs: &[String]) -> Result<Vec<String>> {
    let Some(first) = inputs.first() else {
        bail!("no PDB IDs given");
    };

    let path = Path::new(first);
    if !path.is_file() {
        tracing::info!("Assuming input is a list of PDB IDs");
        return validate_pdb_ids(inputs);
    }

    tracing::info!("Assuming input as a file with a list of PDB IDs");
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read PDB ID list {}", path.display()))?;
    validate_pdb_ids(contents.lines().map(str::trim).filter(|line| !line.is_empty()))
}

/// Fetches gzipped PDB entries from a download server.
#[derive(Debug, Clone)]
pub struct PdbClient {
    base: Url,
}

impl PdbClient {
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    /// Client for the RCSB file server.
    pub fn rcsb() -> Result<Self> {
        Ok(Self::new(Url::parse(RCSB_DOWNLOAD_URL)?))
    }

    pub fn entry_url(&self, id: &str) -> Result<Url> {
        self.base
            .join(&format!("{id}.pdb.gz"))
            .with_context(|| format!("failed to build download URL for {id}"))
    }

    /// Downloads one entry and writes it to `<output_dir>/<ID>.pdb`.
    pub fn fetch(&self, id: &str, output_dir: &Path) -> Result<PathBuf> {
        let url = self.entry_url(id)?;
        let target = output_dir.join(format!("{}.pdb", id.to_ascii_uppercase()));

        let body = download(&url).with_context(|| format!("failed to download {url}"))?;

        let mut staging = NamedTempFile::new_in(output_dir)
            .with_context(|| format!("failed to create temporary file in {}", output_dir.display()))?;
        let mut decoder = MultiGzDecoder::new(body.as_slice());
        io::copy(&mut decoder, &mut staging)
            .with_context(|| format!("failed to decompress {url}"))?;
        staging.flush()?;
        output::publish(staging, &target)
            .with_context(|| format!("failed to write {}", target.display()))?;

        tracing::info!("Loaded {id} to {}", target.display());
        Ok(target)
    }
}

fn download(url: &Url) -> Result<Vec<u8>> {
    let mut easy = Easy::new();
    easy.url(url.as_str())?;
    easy.follow_location(true)?;
    easy.accept_encoding("identity")?;
    easy.fail_on_error(true)?;

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    Ok(body)
}

/// Resolves `inputs` and downloads every entry into `output_dir`.
///
/// Stops at the first failure.
pub fn fetch_pdb(inputs: &[String], output_dir: &Path, client: &PdbClient) -> Result<Vec<PathBuf>> {
    let ids = read_pdb_id_list(inputs)?;
    ids.iter()
        .map(|id| client.fetch(id, output_dir))
        .collect()
}
